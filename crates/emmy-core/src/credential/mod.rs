//! Credential storage.
//!
//! One durable record per account email, holding the serialized `OAuth2`
//! token. Records survive restarts and are replaced wholesale on write.

mod repository;

pub use repository::CredentialStore;
