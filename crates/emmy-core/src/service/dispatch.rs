//! Sending assembled messages on behalf of an authenticated account.

use emmy_oauth::{OAuthClient, Token};
use tracing::{info, warn};

use super::compose::TransportPayload;
use super::gmail::{ApiError, GmailClient};
use crate::credential::CredentialStore;
use crate::{Error, Result};

/// Submits messages through the Gmail API using the stored credential of
/// the sending account.
#[derive(Debug, Clone)]
pub struct DispatchGateway {
    store: CredentialStore,
    oauth: OAuthClient,
    gmail: GmailClient,
}

impl DispatchGateway {
    /// Creates a gateway.
    ///
    /// `oauth` is used to refresh expired credentials.
    #[must_use]
    pub const fn new(store: CredentialStore, oauth: OAuthClient, gmail: GmailClient) -> Self {
        Self {
            store,
            oauth,
            gmail,
        }
    }

    /// Returns an unexpired credential for the account.
    ///
    /// An expired credential is refreshed and the refreshed one persisted
    /// before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthenticated`] when there is no record, or the
    /// record is expired and the provider refuses to refresh it. A refresh
    /// that fails in transport or returns an unreadable reply is
    /// [`Error::Dispatch`]; the stored record is left untouched either way.
    pub async fn live_credential(&self, identity: &str) -> Result<Token> {
        let token = self
            .store
            .get(identity)
            .await?
            .ok_or_else(|| Error::not_authenticated(identity, "no stored credential"))?;

        if token.is_valid() {
            return Ok(token);
        }

        if token.refresh_token.is_none() {
            return Err(Error::not_authenticated(
                identity,
                "credential expired and has no refresh token",
            ));
        }

        match self.oauth.refresh_token(&token).await {
            Ok(refreshed) => {
                self.store.put(identity, &refreshed).await?;
                info!(identity, "refreshed expired credential");
                Ok(refreshed)
            }
            Err(e) => {
                warn!(identity, error = %e, "credential refresh failed");
                Err(refresh_failure(identity, e))
            }
        }
    }

    /// Sends the payload from the given account.
    ///
    /// Returns the provider message id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthenticated`] without a live credential (no
    /// request is made in that case) and [`Error::Dispatch`] when the
    /// provider rejects the send.
    pub async fn send(&self, identity: &str, payload: &TransportPayload) -> Result<String> {
        let token = self.live_credential(identity).await?;

        let sent = self
            .gmail
            .send_raw(&token, &payload.raw)
            .await
            .map_err(|e| {
                warn!(identity, error = %e, "send rejected");
                Error::Dispatch(e)
            })?;

        info!(identity, id = %sent.id, "message sent");
        Ok(sent.id)
    }
}

fn refresh_failure(identity: &str, error: emmy_oauth::Error) -> Error {
    match error {
        emmy_oauth::Error::OAuth { .. }
        | emmy_oauth::Error::NoRefreshToken
        | emmy_oauth::Error::AccessDenied => {
            Error::not_authenticated(identity, format!("credential refresh failed: {error}"))
        }
        emmy_oauth::Error::Http(e) => Error::Dispatch(ApiError::Http(e)),
        other => Error::Dispatch(ApiError::Decode(format!(
            "credential refresh failed: {other}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use emmy_oauth::Provider;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn gateway(server: &MockServer) -> DispatchGateway {
        gateway_at(&server.uri()).await
    }

    async fn gateway_at(base: &str) -> DispatchGateway {
        let store = CredentialStore::in_memory().await.unwrap();
        let provider = Provider::new("test", format!("{base}/auth"), format!("{base}/token"))
            .unwrap()
            .with_default_scopes(vec!["scope".into()]);
        let oauth = OAuthClient::new("client", provider).with_client_secret("secret");
        let gmail = GmailClient::new(reqwest::Client::new()).with_base_url(base);
        DispatchGateway::new(store, oauth, gmail)
    }

    fn expired_token() -> Token {
        Token::new("at-old", "Bearer")
            .with_refresh_token("rt-1")
            .with_expires_at(Utc::now() - Duration::minutes(5))
    }

    fn live_token(access: &str) -> Token {
        Token::new(access, "Bearer").with_expires_at(Utc::now() + Duration::hours(1))
    }

    fn payload() -> TransportPayload {
        TransportPayload { raw: "eA==".into() }
    }

    #[tokio::test]
    async fn test_send_with_stored_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/me/messages/send"))
            .and(header("authorization", "Bearer at-live"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "m-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway(&server).await;
        gateway
            .store
            .put("user@example.com", &live_token("at-live"))
            .await
            .unwrap();

        let id = gateway.send("user@example.com", &payload()).await.unwrap();
        assert_eq!(id, "m-1");
    }

    #[tokio::test]
    async fn test_send_without_credential_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let gateway = gateway(&server).await;
        let err = gateway
            .send("nobody@example.com", &payload())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotAuthenticated { ref identity, .. } if identity == "nobody@example.com"));
        assert_eq!(err.kind(), "NotAuthenticated");
    }

    #[tokio::test]
    async fn test_send_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/me/messages/send"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "Invalid To header"}
            })))
            .mount(&server)
            .await;

        let gateway = gateway(&server).await;
        gateway
            .store
            .put("user@example.com", &live_token("at"))
            .await
            .unwrap();

        let err = gateway
            .send("user@example.com", &payload())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "DispatchError");
        assert!(err.to_string().contains("Invalid To header"));
    }

    #[tokio::test]
    async fn test_expired_credential_is_refreshed_and_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=rt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-new",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/users/me/messages/send"))
            .and(header("authorization", "Bearer at-new"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "m-2"})),
            )
            .mount(&server)
            .await;

        let gateway = gateway(&server).await;
        let expired = Token::new("at-old", "Bearer")
            .with_refresh_token("rt-1")
            .with_expires_at(Utc::now() - Duration::minutes(5));
        gateway
            .store
            .put("user@example.com", &expired)
            .await
            .unwrap();

        let id = gateway.send("user@example.com", &payload()).await.unwrap();
        assert_eq!(id, "m-2");

        let stored = gateway.store.get("user@example.com").await.unwrap().unwrap();
        assert_eq!(stored.access_token, "at-new");
        assert_eq!(stored.refresh_token.as_deref(), Some("rt-1"));
        assert!(stored.is_valid());
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token() {
        let server = MockServer::start().await;
        let gateway = gateway(&server).await;
        let expired =
            Token::new("at-old", "Bearer").with_expires_at(Utc::now() - Duration::minutes(5));
        gateway
            .store
            .put("user@example.com", &expired)
            .await
            .unwrap();

        let err = gateway
            .live_credential("user@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NotAuthenticated");
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            })))
            .mount(&server)
            .await;

        let gateway = gateway(&server).await;
        let expired = Token::new("at-old", "Bearer")
            .with_refresh_token("revoked")
            .with_expires_at(Utc::now() - Duration::minutes(5));
        gateway
            .store
            .put("user@example.com", &expired)
            .await
            .unwrap();

        let err = gateway
            .send("user@example.com", &payload())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NotAuthenticated");

        // The stale record is left alone
        let stored = gateway.store.get("user@example.com").await.unwrap().unwrap();
        assert_eq!(stored.access_token, "at-old");
    }

    #[tokio::test]
    async fn test_refresh_server_error_is_dispatch_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
            .mount(&server)
            .await;

        let gateway = gateway(&server).await;
        gateway
            .store
            .put("user@example.com", &expired_token())
            .await
            .unwrap();

        let err = gateway
            .live_credential("user@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "DispatchError");
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_refresh_transport_failure_is_dispatch_error() {
        // Nothing listens on a port that was just released
        let base = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://{}", listener.local_addr().unwrap())
        };

        let gateway = gateway_at(&base).await;
        gateway
            .store
            .put("user@example.com", &expired_token())
            .await
            .unwrap();

        let err = gateway
            .live_credential("user@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dispatch(ApiError::Http(_))));

        let stored = gateway.store.get("user@example.com").await.unwrap().unwrap();
        assert_eq!(stored.access_token, "at-old");
    }
}
