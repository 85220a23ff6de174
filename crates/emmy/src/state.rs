//! Wiring of the core services from configuration.

use emmy_core::{
    AuthorizationService, CredentialStore, DispatchGateway, Error, GeminiClient, GmailClient,
};
use emmy_oauth::{AuthorizationCodeFlow, OAuthClient, Provider};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::config::Config;

/// Services shared by the HTTP handlers and CLI commands.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Authorization handshake and identity.
    pub auth: AuthorizationService,
    /// Message sending.
    pub dispatch: DispatchGateway,
    /// Draft generation, absent without a Gemini key.
    pub generator: Option<GeminiClient>,
}

impl AppState {
    /// Opens the credential database and builds every service.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the `OAuth2`
    /// provider configuration is invalid.
    pub async fn open(config: &Config) -> emmy_core::Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let path = config.database_path.to_str().ok_or_else(|| {
            Error::Config(format!(
                "database path is not valid UTF-8: {}",
                config.database_path.display()
            ))
        })?;

        let store = CredentialStore::new(path).await?;
        info!(path, "opened credential store");
        Self::with_store(config, store)
    }

    /// Builds every service around an existing store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the `OAuth2` endpoints do not parse.
    pub fn with_store(config: &Config, store: CredentialStore) -> emmy_core::Result<Self> {
        let http = reqwest::Client::new();

        let provider = Provider::google_at(&config.google_auth_url, &config.google_token_url)
            .map_err(|e| Error::Config(format!("invalid Google OAuth2 endpoint: {e}")))?;
        let mut oauth = OAuthClient::new(&config.client_id, provider)
            .with_redirect_uri(&config.redirect_uri)
            .with_http_client(http.clone());
        if let Some(secret) = &config.client_secret {
            oauth = oauth.with_client_secret(secret.expose_secret());
        }

        let gmail = GmailClient::new(http.clone()).with_base_url(&config.gmail_api_base);

        let generator = config.gemini_api_key.as_ref().map(|key| {
            GeminiClient::new(http.clone(), key.expose_secret())
                .with_model(&config.gemini_model)
                .with_base_url(&config.gemini_api_base)
        });
        if generator.is_none() {
            warn!("GEMINI_API_KEY is not set, drafting is disabled");
        }

        Ok(Self {
            auth: AuthorizationService::new(
                AuthorizationCodeFlow::new(oauth.clone()),
                gmail.clone(),
                store.clone(),
            ),
            dispatch: DispatchGateway::new(store, oauth, gmail),
            generator,
        })
    }

    /// The draft generator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no Gemini key is configured.
    pub fn generator(&self) -> emmy_core::Result<&GeminiClient> {
        self.generator
            .as_ref()
            .ok_or_else(|| Error::Config("GEMINI_API_KEY is not set".into()))
    }
}
