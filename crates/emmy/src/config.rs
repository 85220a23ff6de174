//! Environment-driven configuration.
//!
//! Everything is read from `EMMY_*` variables (plus `GEMINI_API_KEY`) after
//! `.env` has been loaded. Secrets are kept in [`SecretString`] so they
//! never end up in `Debug` output or logs.

use std::net::SocketAddr;
use std::path::PathBuf;

use emmy_core::{DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL, DEFAULT_GMAIL_API_BASE, Error};
use emmy_oauth::{GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL};
use secrecy::SecretString;

/// Redirect URI registered for the local backend.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/oauth2callback";

/// Address the HTTP API binds to.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Process configuration.
#[derive(Debug)]
pub struct Config {
    /// Google `OAuth2` client id.
    pub client_id: String,
    /// Google `OAuth2` client secret (absent for public clients).
    pub client_secret: Option<SecretString>,
    /// Where Google sends the user after consent.
    pub redirect_uri: String,
    /// Google authorization endpoint.
    pub google_auth_url: String,
    /// Google token endpoint.
    pub google_token_url: String,
    /// `SQLite` file holding the credentials.
    pub database_path: PathBuf,
    /// Gemini API key; drafting is disabled without it.
    pub gemini_api_key: Option<SecretString>,
    /// Gemini model name.
    pub gemini_model: String,
    /// HTTP API listen address.
    pub listen_addr: SocketAddr,
    /// Gmail API base URL.
    pub gmail_api_base: String,
    /// Gemini API base URL.
    pub gemini_api_base: String,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a
    /// value does not parse.
    pub fn load_from_env() -> emmy_core::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load_from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> emmy_core::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let client_id = var("EMMY_GOOGLE_CLIENT_ID").ok_or_else(|| {
            Error::Config("missing required environment variable EMMY_GOOGLE_CLIENT_ID".into())
        })?;

        let database_path = match var("EMMY_DATABASE_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_database_path()?,
        };

        let listen_addr = var("EMMY_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = parse_addr("EMMY_LISTEN_ADDR", &listen_addr)?;

        Ok(Self {
            client_id,
            client_secret: var("EMMY_GOOGLE_CLIENT_SECRET").map(secret),
            redirect_uri: var("EMMY_REDIRECT_URI")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            google_auth_url: var("EMMY_GOOGLE_AUTH_URL")
                .unwrap_or_else(|| GOOGLE_AUTH_URL.to_string()),
            google_token_url: var("EMMY_GOOGLE_TOKEN_URL")
                .unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string()),
            database_path,
            gemini_api_key: var("GEMINI_API_KEY").map(secret),
            gemini_model: var("EMMY_GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            listen_addr,
            gmail_api_base: var("EMMY_GMAIL_API_BASE")
                .unwrap_or_else(|| DEFAULT_GMAIL_API_BASE.to_string()),
            gemini_api_base: var("EMMY_GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
        })
    }
}

fn secret(value: String) -> SecretString {
    SecretString::new(value.into())
}

fn default_database_path() -> emmy_core::Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("emmy").join("emmy.db"))
        .ok_or_else(|| {
            Error::Config("no data directory on this platform; set EMMY_DATABASE_PATH".into())
        })
}

fn parse_addr(key: &str, value: &str) -> emmy_core::Result<SocketAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid socket address in {key}: '{value}'")))
}
