//! Service layer.
//!
//! Bridges the HTTP and CLI front ends with the credential store, the
//! `OAuth2` flow, MIME assembly and the remote Google APIs.

pub mod auth;
pub mod compose;
pub mod dispatch;
pub mod draft;
pub mod gmail;

pub use auth::AuthorizationService;
pub use compose::{OutgoingDraft, TransportPayload, build_payload};
pub use dispatch::DispatchGateway;
pub use draft::{
    DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL, DEFAULT_SUBJECT, DraftGenerator, GeminiClient,
    GeneratedDraft, MalformedDraft, generate_draft, parse_draft,
};
pub use gmail::{ApiError, DEFAULT_GMAIL_API_BASE, GmailClient, Profile, SentMessage};
