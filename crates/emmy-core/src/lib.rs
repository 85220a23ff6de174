//! # emmy-core
//!
//! Core business logic for the Emmy mail assistant.
//!
//! This crate provides:
//! - **Credential Store** - durable `OAuth2` credentials keyed by account email (`SQLite`)
//! - **Authorization** - the authorization code handshake and identity lookup
//! - **Compose** - assembly of the transport payload, with optional attachment
//! - **Dispatch** - sending through the Gmail API with a live (refreshed) credential
//! - **Drafting** - text generation and defensive parsing of its output
//!
//! Components receive their dependencies (pool, HTTP client, endpoints)
//! explicitly; nothing here holds global state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod credential;
mod error;
pub mod service;

pub use credential::CredentialStore;
pub use error::{Error, ExchangeFailure, Result};
pub use service::{
    ApiError, AuthorizationService, DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL,
    DEFAULT_GMAIL_API_BASE, DEFAULT_SUBJECT, DispatchGateway, DraftGenerator, GeminiClient,
    GeneratedDraft, GmailClient, MalformedDraft, OutgoingDraft, Profile, SentMessage,
    TransportPayload, build_payload, generate_draft, parse_draft,
};

pub use emmy_mime::Attachment;
pub use emmy_oauth::{CallbackParams, Token};
