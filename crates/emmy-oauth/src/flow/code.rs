//! Authorization Code Flow implementation.

use super::OAuthClient;
use crate::error::Result;
use crate::token::Token;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use url::Url;

/// Authorization Code Flow for `OAuth2`.
///
/// Holds no per-user state: the authorization URL is built on demand and
/// the code exchange only needs the code handed back by the provider.
#[derive(Debug, Clone)]
pub struct AuthorizationCodeFlow {
    client: OAuthClient,
}

impl AuthorizationCodeFlow {
    /// Creates a new authorization code flow.
    #[must_use]
    pub const fn new(client: OAuthClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    #[must_use]
    pub const fn client(&self) -> &OAuthClient {
        &self.client
    }

    /// Generates a random `state` value (22 URL-safe characters).
    #[must_use]
    pub fn generate_state() -> String {
        let random_bytes: [u8; 16] = rand::thread_rng().r#gen();
        URL_SAFE_NO_PAD.encode(random_bytes)
    }

    /// Builds the authorization URL for user consent.
    ///
    /// The URL carries the provider's default scopes and its extra
    /// authorization parameters (offline access, prompt).
    ///
    /// # Errors
    ///
    /// Returns an error if the provider configuration is invalid.
    pub fn authorization_url(&self, state: Option<&str>) -> Result<Url> {
        self.client.provider.validate()?;
        let mut url = self.client.provider.auth_url.clone();

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("client_id", &self.client.client_id)
                .append_pair("response_type", "code");

            if let Some(redirect_uri) = &self.client.redirect_uri {
                pairs.append_pair("redirect_uri", redirect_uri);
            }

            pairs.append_pair("scope", &self.client.provider.default_scopes.join(" "));

            if let Some(state_val) = state {
                pairs.append_pair("state", state_val);
            }

            for (key, value) in &self.client.provider.auth_params {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Exchanges the authorization code for an access token.
    ///
    /// Codes are single use; a second exchange of the same code is rejected
    /// by the provider and surfaces as [`crate::Error::OAuth`].
    ///
    /// # Errors
    ///
    /// Returns an error if the token exchange fails.
    pub async fn exchange_code(&self, code: &str) -> Result<Token> {
        self.client.exchange_code(code).await
    }
}
