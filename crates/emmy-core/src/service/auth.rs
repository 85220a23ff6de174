//! The authorization handshake and the notion of "current account".

use emmy_oauth::{AuthorizationCodeFlow, CallbackParams};
use tracing::{info, warn};
use url::Url;

use super::gmail::GmailClient;
use crate::credential::CredentialStore;
use crate::error::ExchangeFailure;
use crate::{Error, Result};

/// Drives the authorization code flow and records the resulting
/// credential under the account's own email address.
#[derive(Debug, Clone)]
pub struct AuthorizationService {
    flow: AuthorizationCodeFlow,
    gmail: GmailClient,
    store: CredentialStore,
}

impl AuthorizationService {
    /// Creates the service.
    #[must_use]
    pub const fn new(
        flow: AuthorizationCodeFlow,
        gmail: GmailClient,
        store: CredentialStore,
    ) -> Self {
        Self { flow, gmail, store }
    }

    /// The credential store this service writes to.
    #[must_use]
    pub const fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Builds a fresh consent URL requesting the send scope with offline
    /// access and a forced account chooser.
    ///
    /// A new random `state` is generated per call. It is not checked on
    /// callback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the client configuration cannot
    /// produce a URL.
    pub fn begin_authorization(&self) -> Result<Url> {
        let state = AuthorizationCodeFlow::generate_state();
        self.flow
            .authorization_url(Some(&state))
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Completes the handshake from the provider's callback parameters.
    ///
    /// Exchanges the code, resolves the account address from the profile
    /// endpoint, stores the credential under that address and returns it.
    /// Nothing is stored if any step fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthorizationExchange`] if the callback carries an
    /// error or no code, the exchange is rejected, or the profile lookup
    /// fails.
    pub async fn complete_authorization(&self, callback: &CallbackParams) -> Result<String> {
        let code = callback.code().map_err(|e| {
            warn!(error = %e, "callback without usable code");
            ExchangeFailure::OAuth(e)
        })?;

        let token = self.flow.exchange_code(code).await.map_err(|e| {
            warn!(error = %e, "authorization code exchange failed");
            ExchangeFailure::OAuth(e)
        })?;

        let profile = self.gmail.profile(&token).await.map_err(|e| {
            warn!(error = %e, "profile lookup after exchange failed");
            ExchangeFailure::Profile(e)
        })?;

        self.store.put(&profile.email_address, &token).await?;
        info!(identity = %profile.email_address, "authorization complete");
        Ok(profile.email_address)
    }

    /// Returns the email of some authenticated account, if any.
    ///
    /// With several stored accounts the choice is stable (lowest address)
    /// but otherwise unspecified.
    ///
    /// # Errors
    ///
    /// Returns a storage error, including [`Error::CorruptCredential`].
    pub async fn current_identity(&self) -> Result<Option<String>> {
        Ok(self.store.get_any().await?.map(|(identity, _)| identity))
    }

    /// Forgets the account's credential. Unknown accounts are ignored.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn logout(&self, identity: &str) -> Result<()> {
        self.store.delete(identity).await?;
        info!(identity, "logged out");
        Ok(())
    }
}
