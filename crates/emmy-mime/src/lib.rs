//! # emmy-mime
//!
//! MIME message generation for the Emmy mail assistant.
//!
//! ## Features
//!
//! - **Message generation**: single-part `text/plain` or `multipart/mixed`
//!   with binary attachments
//! - **Encoding**: Base64 (line wrapped), base64url for mail API `raw`
//!   payloads, RFC 2047 header encoding
//! - **Content types**: construction, parsing and rendering
//!
//! ## Quick Start
//!
//! ```ignore
//! use emmy_mime::{Attachment, MessageBuilder};
//!
//! let message = MessageBuilder::new()
//!     .to("recipient@example.com")
//!     .subject("Report")
//!     .text_body("Please find the report attached.")
//!     .attach(Attachment::new("report.pdf", bytes))
//!     .build()?;
//!
//! // Gmail `users.messages.send` expects this in the `raw` field.
//! let raw = message.to_raw();
//! ```
//!
//! Attachment filenames are emitted verbatim in `Content-Disposition`;
//! callers must validate untrusted names themselves.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Attachment, Message, MessageBuilder, Part, TransferEncoding};
