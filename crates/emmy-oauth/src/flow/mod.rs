//! `OAuth2` authorization flows.

mod callback;
mod code;

pub use callback::CallbackParams;
pub use code::AuthorizationCodeFlow;

use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::token::{ErrorResponse, Token, TokenResponse};
use reqwest::{Client, Response};
use tracing::debug;

/// Common `OAuth2` client configuration.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID from provider.
    pub client_id: String,
    /// Client secret (optional for public clients).
    pub client_secret: Option<String>,
    /// Redirect URI for authorization code flow.
    pub redirect_uri: Option<String>,
    /// Provider configuration.
    pub provider: Provider,
    /// HTTP client.
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            provider,
            http_client: Client::new(),
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Uses a shared HTTP client instead of a private one.
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Refreshes an access token using a refresh token.
    ///
    /// The refresh token of `token` is carried over when the provider does
    /// not issue a new one, as Google does for refresh grants.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails or if the token has no refresh token.
    pub async fn refresh_token(&self, token: &Token) -> Result<Token> {
        let refresh_token = token.refresh_token()?;

        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ];

        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let mut new_token = Self::parse_token_response(response).await?;

        if new_token.refresh_token.is_none() {
            new_token.refresh_token.clone_from(&token.refresh_token);
        }
        if new_token.scopes.is_empty() {
            new_token.scopes.clone_from(&token.scopes);
        }

        debug!(provider = %self.provider.name, "refreshed access token");
        Ok(new_token)
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    pub(crate) async fn exchange_code(&self, code: &str) -> Result<Token> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
        ];

        if let Some(uri) = &self.redirect_uri {
            params.push(("redirect_uri", uri.as_str()));
        }

        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let token = Self::parse_token_response(response).await?;
        debug!(provider = %self.provider.name, "exchanged authorization code");
        Ok(token)
    }

    /// Decodes a token endpoint response, mapping error bodies to [`Error::OAuth`].
    async fn parse_token_response(response: Response) -> Result<Token> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(serde_json::from_str::<ErrorResponse>(&body).map_or_else(
                |_| Error::InvalidResponse(format!("token endpoint returned {status}: {body}")),
                ErrorResponse::into_error,
            ));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)?;
        Token::from_response(token_response)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mock_provider(server: &MockServer) -> Provider {
        Provider::new(
            "Mock",
            format!("{}/authorize", server.uri()),
            format!("{}/token", server.uri()),
        )
        .unwrap()
        .with_default_scopes(vec!["mail.send".into()])
    }

    #[test]
    fn test_oauth_client_with_secret() {
        let provider = Provider::google().unwrap();
        let client = OAuthClient::new("test_client_id", provider)
            .with_client_secret("secret")
            .with_redirect_uri("http://localhost:8080");

        assert_eq!(client.client_id, "test_client_id");
        assert_eq!(client.client_secret.as_deref(), Some("secret"));
        assert_eq!(
            client.redirect_uri.as_deref(),
            Some("http://localhost:8080")
        );
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.token",
                "token_type": "Bearer",
                "expires_in": 3599,
                "refresh_token": "1//refresh",
                "scope": "mail.send"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OAuthClient::new("id", mock_provider(&server)).with_client_secret("s");
        let token = client.exchange_code("abc").await.unwrap();
        assert_eq!(token.access_token, "ya29.token");
        assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(token.scopes, vec!["mail.send".to_string()]);
    }

    #[tokio::test]
    async fn test_exchange_code_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Bad Request"
            })))
            .mount(&server)
            .await;

        let client = OAuthClient::new("id", mock_provider(&server));
        let err = client.exchange_code("used-code").await.unwrap_err();
        assert!(matches!(err, Error::OAuth { ref error, .. } if error == "invalid_grant"));
    }

    #[tokio::test]
    async fn test_exchange_code_non_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = OAuthClient::new("id", mock_provider(&server));
        let err = client.exchange_code("abc").await.unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(ref msg) if msg.contains("502")));
    }

    #[tokio::test]
    async fn test_refresh_preserves_refresh_token_and_scopes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .mount(&server)
            .await;

        let client = OAuthClient::new("id", mock_provider(&server));
        let old = Token::new("stale", "Bearer")
            .with_refresh_token("keep-me")
            .with_scopes(vec!["mail.send".into()]);
        let new = client.refresh_token(&old).await.unwrap();
        assert_eq!(new.access_token, "fresh");
        assert_eq!(new.refresh_token.as_deref(), Some("keep-me"));
        assert_eq!(new.scopes, old.scopes);
        assert!(new.is_valid());
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let client = OAuthClient::new("id", Provider::google().unwrap());
        let err = client
            .refresh_token(&Token::new("a", "Bearer"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoRefreshToken));
    }
}
