//! MIME message structure and generation.

use crate::content_type::ContentType;
use crate::encoding::{encode_base64_wrapped, encode_base64url};
use crate::error::{Error, Result};
use crate::header::Headers;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fmt;

/// Longest line allowed in a 7bit body (RFC 5322 section 2.1.1).
const MAX_7BIT_LINE: usize = 998;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// Base64 encoding.
    Base64,
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::Base64 => write!(f, "base64"),
        }
    }
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Original filename, emitted verbatim.
    pub filename: String,
    /// Content type of the data.
    pub content_type: ContentType,
    /// Raw file contents.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Creates an `application/octet-stream` attachment.
    #[must_use]
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: ContentType::application_octet_stream(),
            data,
        }
    }

    /// Overrides the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }
}

/// MIME message part.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body, already transfer-encoded.
    pub body: String,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(headers: Headers, body: String) -> Self {
        Self { headers, body }
    }

    /// Builds a `text/plain` part, picking 7bit for short-lined ASCII and
    /// base64 UTF-8 otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if header construction fails.
    pub fn text(text: &str) -> Result<Self> {
        let mut headers = Headers::new();
        let body = if is_7bit_safe(text) {
            headers.add("Content-Type", ContentType::text_plain("us-ascii").to_string())?;
            headers.add("MIME-Version", "1.0")?;
            headers.add("Content-Transfer-Encoding", TransferEncoding::SevenBit.to_string())?;
            normalize_newlines(text)
        } else {
            headers.add("Content-Type", ContentType::text_plain("utf-8").to_string())?;
            headers.add("MIME-Version", "1.0")?;
            headers.add("Content-Transfer-Encoding", TransferEncoding::Base64.to_string())?;
            encode_base64_wrapped(text.as_bytes())
        };
        Ok(Self::new(headers, body))
    }

    /// Builds a base64 attachment part with a `Content-Disposition` naming
    /// the file.
    ///
    /// # Errors
    ///
    /// Returns an error if header construction fails.
    pub fn attachment(attachment: &Attachment) -> Result<Self> {
        let mut headers = Headers::new();
        headers.add("Content-Type", attachment.content_type.to_string())?;
        headers.add("MIME-Version", "1.0")?;
        headers.add("Content-Transfer-Encoding", TransferEncoding::Base64.to_string())?;
        headers.add(
            "Content-Disposition",
            format!("attachment; filename={}", attachment.filename),
        )?;
        Ok(Self::new(headers, encode_base64_wrapped(&attachment.data)))
    }
}

/// Message body layout.
#[derive(Debug, Clone)]
enum Body {
    Single(String),
    Multipart { boundary: String, parts: Vec<Part> },
}

/// MIME message ready for transport.
#[derive(Debug, Clone)]
pub struct Message {
    /// Message headers.
    pub headers: Headers,
    body: Body,
}

impl Message {
    /// Checks if this is a multipart message.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self.body, Body::Multipart { .. })
    }

    /// Returns the parts of a multipart message (empty for single-part).
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        match &self.body {
            Body::Single(_) => &[],
            Body::Multipart { parts, .. } => parts,
        }
    }

    /// Gets the To header.
    #[must_use]
    pub fn to(&self) -> Option<&str> {
        self.headers.get("to")
    }

    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("subject")
    }

    /// Serializes the message to RFC 5322 bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Serializes and base64url-encodes the message, the form expected in
    /// the `raw` field of Gmail's `users.messages.send`.
    #[must_use]
    pub fn to_raw(&self) -> String {
        encode_base64url(&self.to_bytes())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n", self.headers)?;
        match &self.body {
            Body::Single(body) => f.write_str(body),
            Body::Multipart { boundary, parts } => {
                for part in parts {
                    write!(f, "--{boundary}\r\n{}\r\n{}", part.headers, part.body)?;
                    if !part.body.ends_with("\r\n") {
                        f.write_str("\r\n")?;
                    }
                }
                write!(f, "--{boundary}--\r\n")
            }
        }
    }
}

/// Builder for outgoing messages.
///
/// Without attachments the result is a single `text/plain` message; with
/// one or more attachments it is `multipart/mixed` with the text first.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    to: Option<String>,
    from: Option<String>,
    subject: Option<String>,
    text_body: String,
    attachments: Vec<Attachment>,
    boundary: Option<String>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the recipient.
    #[must_use]
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Sets the sender. Gmail substitutes the authenticated address when
    /// this is omitted.
    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.text_body = body.into();
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Fixes the multipart boundary instead of generating a random one.
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Builds the message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingHeader`] without a recipient, or an error
    /// from header construction.
    pub fn build(self) -> Result<Message> {
        let to = self
            .to
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::MissingHeader("to".into()))?;

        let mut addressing = Headers::new();
        addressing.add("to", to)?;
        if let Some(from) = self.from {
            addressing.add("from", from)?;
        }
        addressing.add_text("subject", self.subject.as_deref().unwrap_or_default())?;

        let text = Part::text(&self.text_body)?;

        if self.attachments.is_empty() {
            let mut headers = text.headers;
            headers.append(addressing);
            return Ok(Message {
                headers,
                body: Body::Single(text.body),
            });
        }

        let boundary = self.boundary.unwrap_or_else(generate_boundary);
        let mut headers = Headers::new();
        headers.add("Content-Type", ContentType::multipart_mixed(&boundary).to_string())?;
        headers.add("MIME-Version", "1.0")?;
        headers.append(addressing);

        let mut parts = Vec::with_capacity(self.attachments.len() + 1);
        parts.push(text);
        for attachment in &self.attachments {
            parts.push(Part::attachment(attachment)?);
        }

        Ok(Message {
            headers,
            body: Body::Multipart { boundary, parts },
        })
    }
}

/// Generates a boundary that cannot occur in base64 or typical prose.
fn generate_boundary() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("===============emmy{suffix}==")
}

fn is_7bit_safe(text: &str) -> bool {
    text.is_ascii() && text.lines().all(|line| line.len() <= MAX_7BIT_LINE)
}

/// Converts bare LF line endings to CRLF.
fn normalize_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 32);
    let mut prev = '\0';
    for ch in text.chars() {
        if ch == '\n' && prev != '\r' {
            out.push('\r');
        }
        out.push(ch);
        prev = ch;
    }
    out
}
