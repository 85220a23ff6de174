//! HTTP API.
//!
//! Thin JSON handlers over [`AppState`]. Every failure is answered with
//! `{"kind": ..., "message": ...}` and a status derived from the error kind.

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use emmy_core::{Attachment, CallbackParams, GeneratedDraft, OutgoingDraft};
use emmy_mime::ContentType;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::state::AppState;

/// Largest request body accepted. Leaves room for a base64 encoded
/// attachment at Gmail's 25 MB message limit plus the JSON around it.
pub const MAX_REQUEST_BODY: usize = 36 * 1024 * 1024;

/// Builds the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Authorization
        .route("/auth-url", get(auth_url))
        .route("/auth", get(auth_redirect))
        .route("/oauth2callback", get(oauth_callback))
        .route("/get_authenticated_user", get(authenticated_user))
        .route("/logout", post(logout))
        // Mail
        .route("/send_email", post(send_email))
        .route("/generate", post(generate))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .with_state(state)
}

/// Serves the API until the process is stopped.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP API listening");
    axum::serve(listener, router(state)).await
}

/// Error answered by a handler.
#[derive(Debug)]
pub enum ApiError {
    /// Failure from the core services.
    Core(emmy_core::Error),
    /// Malformed or incomplete request.
    InvalidInput(String),
    /// The requested resource does not exist.
    NotFound(String),
    /// The request body exceeds [`MAX_REQUEST_BODY`].
    PayloadTooLarge(String),
}

impl From<emmy_core::Error> for ApiError {
    fn from(err: emmy_core::Error) -> Self {
        Self::Core(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge(format!("request body exceeds {MAX_REQUEST_BODY} bytes"));
        }
        Self::InvalidInput(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        use emmy_core::Error;

        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Core(err) => match err {
                Error::AuthorizationExchange(_) | Error::Mime(_) => StatusCode::BAD_REQUEST,
                Error::NotAuthenticated { .. } => StatusCode::FORBIDDEN,
                Error::Generation(_) => StatusCode::BAD_GATEWAY,
                Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
                Error::Dispatch(_)
                | Error::Database(_)
                | Error::CorruptCredential { .. }
                | Error::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::NotFound(_) => "NotFound",
            Self::PayloadTooLarge(_) => "PayloadTooLarge",
            Self::Core(err) => err.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Core(err) => err.to_string(),
            Self::InvalidInput(msg) | Self::NotFound(msg) | Self::PayloadTooLarge(msg) => {
                msg.clone()
            }
        };

        if status.is_server_error() {
            error!(kind = self.kind(), %message, "request failed");
        } else {
            debug!(kind = self.kind(), %message, "request rejected");
        }

        let body = ErrorBody {
            kind: self.kind(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
struct AuthUrlResponse {
    auth_url: String,
}

async fn auth_url(State(state): State<AppState>) -> ApiResult<AuthUrlResponse> {
    let url = state.auth.begin_authorization()?;
    Ok(Json(AuthUrlResponse {
        auth_url: url.into(),
    }))
}

async fn auth_redirect(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let url = state.auth.begin_authorization()?;
    Ok(Redirect::to(url.as_str()))
}

#[derive(Serialize)]
struct CallbackResponse {
    message: &'static str,
    email: String,
}

async fn oauth_callback(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> ApiResult<CallbackResponse> {
    let params = CallbackParams::from_query(query.as_deref().unwrap_or_default());
    let email = state.auth.complete_authorization(&params).await?;
    Ok(Json(CallbackResponse {
        message: "Authentication successful",
        email,
    }))
}

#[derive(Serialize)]
struct UserResponse {
    email: String,
}

async fn authenticated_user(State(state): State<AppState>) -> ApiResult<UserResponse> {
    state
        .auth
        .current_identity()
        .await?
        .map(|email| Json(UserResponse { email }))
        .ok_or_else(|| ApiError::NotFound("no authenticated user".into()))
}

#[derive(Deserialize)]
struct LogoutRequest {
    user_email: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn logout(
    State(state): State<AppState>,
    payload: Result<Json<LogoutRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(request) = payload?;
    let identity = required("user_email", &request.user_email)?;
    state.auth.logout(identity).await?;
    Ok(Json(MessageResponse {
        message: "Logged out",
    }))
}

#[derive(Deserialize)]
struct AttachmentRequest {
    filename: String,
    content_base64: String,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Deserialize)]
struct SendEmailRequest {
    user_email: String,
    recipient: String,
    subject: String,
    body: String,
    #[serde(default)]
    attachment: Option<AttachmentRequest>,
}

#[derive(Serialize)]
struct SendEmailResponse {
    message: &'static str,
    id: String,
}

async fn send_email(
    State(state): State<AppState>,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> ApiResult<SendEmailResponse> {
    let Json(request) = payload?;
    let identity = required("user_email", &request.user_email)?;
    let recipient = required("recipient", &request.recipient)?;

    let mut draft = OutgoingDraft::new(recipient, request.subject, request.body);
    if let Some(attachment) = request.attachment {
        draft = draft.with_attachment(decode_attachment(attachment)?);
    }

    let payload = emmy_core::build_payload(&draft)?;
    let id = state.dispatch.send(identity, &payload).await?;
    Ok(Json(SendEmailResponse {
        message: "Email sent successfully",
        id,
    }))
}

fn decode_attachment(request: AttachmentRequest) -> Result<Attachment, ApiError> {
    let filename = required("attachment.filename", &request.filename)?;
    let data = STANDARD
        .decode(request.content_base64.trim())
        .map_err(|e| ApiError::InvalidInput(format!("attachment is not valid base64: {e}")))?;

    let mut attachment = Attachment::new(filename, data);
    if let Some(content_type) = request.content_type.as_deref() {
        let content_type = ContentType::parse(content_type)
            .map_err(|e| ApiError::InvalidInput(format!("attachment content type: {e}")))?;
        attachment = attachment.with_content_type(content_type);
    }
    Ok(attachment)
}

#[derive(Deserialize)]
struct GenerateRequest {
    instruction: String,
}

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<GeneratedDraft> {
    let Json(request) = payload?;
    let generator = state.generator()?;
    let draft = emmy_core::generate_draft(generator, &request.instruction).await?;
    Ok(Json(draft))
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::InvalidInput(format!("{field} is required")));
    }
    Ok(value)
}
