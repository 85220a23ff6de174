//! `OAuth2` provider configurations.

use crate::error::{Error, Result};
use url::Url;

/// Gmail scope allowing messages to be sent on the user's behalf.
pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

/// Google authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Google").
    pub name: String,
    /// Authorization endpoint URL.
    pub auth_url: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Default scopes.
    pub default_scopes: Vec<String>,
    /// Extra query parameters appended to every authorization URL.
    pub auth_params: Vec<(String, String)>,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URLs are invalid.
    pub fn new(
        name: impl Into<String>,
        auth_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            auth_url: Url::parse(auth_url.as_ref())?,
            token_url: Url::parse(token_url.as_ref())?,
            default_scopes: Vec::new(),
            auth_params: Vec::new(),
        })
    }

    /// Sets the default scopes.
    #[must_use]
    pub fn with_default_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    /// Adds an extra authorization URL parameter.
    #[must_use]
    pub fn with_auth_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth_params.push((key.into(), value.into()));
        self
    }

    /// Google `OAuth2` provider configuration.
    ///
    /// Requests the Gmail send scope, offline access (so a refresh token is
    /// issued) and forces the consent and account chooser screens on every
    /// authorization.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn google() -> Result<Self> {
        Self::google_at(GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL)
    }

    /// Google configuration against other endpoints, such as a local
    /// emulator.
    ///
    /// # Errors
    ///
    /// Returns an error if either URL does not parse.
    pub fn google_at(auth_url: impl AsRef<str>, token_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self::new("Google", auth_url, token_url)?
            .with_default_scopes(vec![GMAIL_SEND_SCOPE.to_string()])
            .with_auth_param("access_type", "offline")
            .with_auth_param("prompt", "consent select_account"))
    }

    /// Validates that required URLs are set and at least one scope is requested.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.auth_url.as_str().is_empty() {
            return Err(Error::InvalidConfig("auth_url is empty".into()));
        }
        if self.token_url.as_str().is_empty() {
            return Err(Error::InvalidConfig("token_url is empty".into()));
        }
        if self.default_scopes.is_empty() {
            return Err(Error::InvalidConfig("no scopes configured".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_google_provider() {
        let provider = Provider::google().unwrap();
        assert_eq!(provider.name, "Google");
        assert_eq!(provider.default_scopes, vec![GMAIL_SEND_SCOPE.to_string()]);
        assert!(
            provider
                .auth_params
                .contains(&("access_type".into(), "offline".into()))
        );
        provider.validate().unwrap();
    }

    #[test]
    fn test_google_at_other_endpoints() {
        let provider =
            Provider::google_at("http://127.0.0.1:9000/auth", "http://127.0.0.1:9000/token")
                .unwrap();
        assert_eq!(provider.token_url.as_str(), "http://127.0.0.1:9000/token");
        assert_eq!(provider.default_scopes, vec![GMAIL_SEND_SCOPE.to_string()]);
        assert_eq!(provider.auth_params.len(), 2);

        assert!(Provider::google_at("nope", GOOGLE_TOKEN_URL).is_err());
    }

    #[test]
    fn test_custom_provider_requires_scope() {
        let provider = Provider::new(
            "Custom",
            "https://auth.example.com/authorize",
            "https://auth.example.com/token",
        )
        .unwrap();
        assert!(matches!(provider.validate(), Err(Error::InvalidConfig(_))));

        let provider = provider.with_default_scopes(vec!["email".to_string()]);
        provider.validate().unwrap();
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            Provider::new("Bad", "not a url", "https://x.example/token"),
            Err(Error::UrlError(_))
        ));
    }
}
