//! # emmy-oauth
//!
//! `OAuth2` authorization for the Emmy mail assistant.
//!
//! ## Features
//!
//! - **Authorization Code Flow**: authorization URL construction with offline
//!   access and forced account selection, callback parsing, code exchange
//! - **Token management**: expiry checking and refresh
//! - **Provider configuration**: Google preset (Gmail send scope) or any
//!   custom `OAuth2` provider
//!
//! ## Quick Start
//!
//! ```ignore
//! use emmy_oauth::{AuthorizationCodeFlow, CallbackParams, OAuthClient, Provider};
//!
//! let client = OAuthClient::new("client_id", Provider::google()?)
//!     .with_client_secret("secret")
//!     .with_redirect_uri("http://localhost:8080/oauth2callback");
//! let flow = AuthorizationCodeFlow::new(client);
//!
//! // Step 1: send the user here.
//! let url = flow.authorization_url(None)?;
//!
//! // Step 2: the provider redirects back with `?code=...&state=...`.
//! let params = CallbackParams::from_query("code=4/abc&state=xyz");
//! let token = flow.exchange_code(params.code()?).await?;
//!
//! if token.is_expired() {
//!     let token = flow.client().refresh_token(&token).await?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod flow;
pub mod provider;
pub mod token;

pub use error::{Error, Result};
pub use flow::{AuthorizationCodeFlow, CallbackParams, OAuthClient};
pub use provider::{GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, Provider};
pub use token::Token;
