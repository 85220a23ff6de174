//! Error types for the core library.

use thiserror::Error;

use crate::service::ApiError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The authorization code could not be turned into a stored credential.
    /// The user has to restart the handshake.
    #[error("Authorization exchange failed: {0}")]
    AuthorizationExchange(#[from] ExchangeFailure),

    /// No usable credential for the account. The user has to (re)authorize.
    #[error("Not authenticated: {identity}: {reason}")]
    NotAuthenticated {
        /// Account the caller asked for.
        identity: String,
        /// Why no live credential is available.
        reason: String,
    },

    /// The mail provider rejected or failed to process the send.
    #[error("Dispatch failed: {0}")]
    Dispatch(#[source] ApiError),

    /// The text generation service failed.
    #[error("Draft generation failed: {0}")]
    Generation(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored credential blob did not decode.
    #[error("Stored credential for {identity} is corrupt: {source}")]
    CorruptCredential {
        /// Account whose record is corrupt.
        identity: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Message assembly failed.
    #[error("Message assembly failed: {0}")]
    Mime(#[from] emmy_mime::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure behind [`Error::AuthorizationExchange`].
#[derive(Debug, Error)]
pub enum ExchangeFailure {
    /// The callback carried an error, no code, or the code exchange failed.
    #[error(transparent)]
    OAuth(#[from] emmy_oauth::Error),

    /// The token was issued but the profile endpoint could not resolve the
    /// account address.
    #[error("profile lookup failed: {0}")]
    Profile(#[source] ApiError),
}

impl Error {
    /// Stable name of the error kind, used in API error payloads.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AuthorizationExchange(_) => "AuthorizationExchangeError",
            Self::NotAuthenticated { .. } => "NotAuthenticated",
            Self::Dispatch(_) => "DispatchError",
            Self::Generation(_) => "GenerationError",
            Self::Database(_) => "DatabaseError",
            Self::CorruptCredential { .. } => "CorruptCredential",
            Self::Serde(_) => "SerializationError",
            Self::Mime(_) => "InvalidMessage",
            Self::Config(_) => "ConfigError",
        }
    }

    pub(crate) fn not_authenticated(identity: &str, reason: impl Into<String>) -> Self {
        Self::NotAuthenticated {
            identity: identity.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
