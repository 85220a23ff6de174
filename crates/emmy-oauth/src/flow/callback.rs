//! Parsing of the provider's redirect back to the application.

use crate::error::{Error, Result};
use serde::Deserialize;
use url::Url;

/// Query parameters of the authorization callback.
///
/// Either `code` (success) or `error` (user denied, invalid request) is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    /// One-time authorization code.
    pub code: Option<String>,
    /// Echoed `state` value.
    pub state: Option<String>,
    /// Error code, e.g. `access_denied`.
    pub error: Option<String>,
    /// Optional human-readable error description.
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parses a raw query string (without the leading `?`).
    ///
    /// Unknown parameters (`scope`, `authuser`, ...) are ignored.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }
        params
    }

    /// Parses the query of a full callback URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is not a valid absolute URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        Ok(Self::from_query(url.query().unwrap_or_default()))
    }

    /// Returns the authorization code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] when the user declined consent, an
    /// [`Error::OAuth`] for any other provider error, and
    /// [`Error::MissingCode`] when neither a code nor an error is present.
    pub fn code(&self) -> Result<&str> {
        if let Some(error) = &self.error {
            if error == "access_denied" {
                return Err(Error::AccessDenied);
            }
            return Err(Error::oauth_error(
                error.clone(),
                self.error_description.clone().unwrap_or_default(),
            ));
        }
        self.code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(Error::MissingCode)
    }
}
