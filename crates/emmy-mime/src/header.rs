//! MIME header handling.

use crate::encoding::encode_rfc2047;
use crate::error::{Error, Result};
use std::fmt;

/// Ordered collection of email headers.
///
/// Names keep the case they were added with and are emitted in insertion
/// order; lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    ///
    /// CR and LF in the value are replaced by spaces so a value can never
    /// start a new header line.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or contains characters not
    /// allowed in a header field name.
    pub fn add(&mut self, name: impl Into<String>, value: impl AsRef<str>) -> Result<()> {
        let name = name.into();
        validate_name(&name)?;
        self.headers.push((name, fold_value(value.as_ref())));
        Ok(())
    }

    /// Adds a free-text header value, RFC 2047 encoding it unless it is
    /// plain ASCII.
    ///
    /// CR and LF are replaced as in [`Self::add`] before encoding; long
    /// encoded values are folded across continuation lines.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add`].
    pub fn add_text(&mut self, name: impl Into<String>, value: &str) -> Result<()> {
        let name = name.into();
        validate_name(&name)?;
        self.headers.push((name, encode_rfc2047(&fold_value(value), "utf-8")));
        Ok(())
    }

    /// Moves every header of `other` to the end of this collection.
    pub fn append(&mut self, other: Self) {
        self.headers.extend(other.headers);
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
        return Err(Error::InvalidHeader(format!("invalid header name {name:?}")));
    }
    Ok(())
}

fn fold_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
