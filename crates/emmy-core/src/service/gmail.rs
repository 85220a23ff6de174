//! Gmail REST API client.
//!
//! Only the two endpoints Emmy needs: the profile lookup that resolves the
//! authenticated account address, and message send.

use emmy_oauth::Token;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default Gmail API base.
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Errors from a remote JSON API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body, or the raw body.
        message: String,
    },

    /// The response body was not what the endpoint documents.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Reads a failed response into a [`ApiError::Status`].
    ///
    /// Google APIs wrap errors as `{"error": {"message": ...}}`; anything
    /// else is kept verbatim.
    pub(crate) async fn from_response(response: Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GoogleErrorBody>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        Self::Status { status, message }
    }
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Deserialize)]
struct GoogleErrorDetail {
    message: String,
}

/// The authenticated user's mailbox profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Primary address of the mailbox.
    pub email_address: String,
}

/// Reply from the send endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    /// Provider message id.
    pub id: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    raw: &'a str,
}

/// Gmail API client.
#[derive(Debug, Clone)]
pub struct GmailClient {
    http: Client,
    base_url: String,
}

impl GmailClient {
    /// Creates a client against the public Gmail API.
    #[must_use]
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: DEFAULT_GMAIL_API_BASE.to_string(),
        }
    }

    /// Points the client at another API base (used by tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetches the mailbox profile for the token's owner.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// body without an email address.
    pub async fn profile(&self, token: &Token) -> Result<Profile, ApiError> {
        let url = format!("{}/users/me/profile", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }

        let profile: Profile = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        if profile.email_address.is_empty() {
            return Err(ApiError::Decode("empty emailAddress".into()));
        }

        debug!(email = %profile.email_address, "resolved profile");
        Ok(profile)
    }

    /// Submits a base64url encoded message for delivery.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// body without a message id.
    pub async fn send_raw(&self, token: &Token, raw: &str) -> Result<SentMessage, ApiError> {
        let url = format!("{}/users/me/messages/send", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token.access_token)
            .json(&SendRequest { raw })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}
