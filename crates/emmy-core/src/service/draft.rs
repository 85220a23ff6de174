//! Email drafting through a text generation model.
//!
//! The model is asked for a `Subject:` line followed by a `Body:` section.
//! Its answer is free text and is parsed defensively: whatever comes back,
//! [`parse_draft`] produces a subject and a body, recording what it had to
//! fall back on instead of failing.

use std::future::Future;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Subject used when the model output has none.
pub const DEFAULT_SUBJECT: &str = "Generated Email";

/// Default Gemini API base.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

const SUBJECT_MARKER: &str = "Subject:";
const BODY_MARKER: &str = "Body:";

/// A source of free-form draft text.
pub trait DraftGenerator {
    /// Returns the raw model output for the instruction.
    fn generate(&self, instruction: &str) -> impl Future<Output = Result<String>> + Send;
}

/// A parsed draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedDraft {
    /// Subject line, never empty.
    pub subject: String,
    /// Body text, trimmed.
    pub body: String,
    /// Fallbacks applied while parsing. Empty for well-formed output.
    #[serde(skip)]
    pub issues: Vec<MalformedDraft>,
}

/// Ways model output can deviate from the expected shape.
///
/// These are recorded on [`GeneratedDraft`] and logged, never returned as
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedDraft {
    /// No `Subject:` marker; the default subject and the whole text as body.
    MissingSubject,
    /// `Subject:` present but nothing after it; the default subject.
    EmptySubject,
    /// No `Body:` marker; the text after the subject line as body.
    MissingBody,
}

/// Parses model output into a subject and body.
///
/// Leading and trailing markdown emphasis around the subject (`**`) is
/// dropped.
#[must_use]
pub fn parse_draft(text: &str) -> GeneratedDraft {
    let mut issues = Vec::new();

    let Some(subject_at) = text.find(SUBJECT_MARKER) else {
        warn!("draft output has no subject marker, using default subject");
        return GeneratedDraft {
            subject: DEFAULT_SUBJECT.to_string(),
            body: text.trim().to_string(),
            issues: vec![MalformedDraft::MissingSubject],
        };
    };

    let after = &text[subject_at + SUBJECT_MARKER.len()..];
    let line_end = after.find('\n').unwrap_or(after.len());
    let body_at = after.find(BODY_MARKER);
    let subject_end = body_at.map_or(line_end, |at| at.min(line_end));

    let mut subject = after[..subject_end]
        .trim_matches(|c: char| c == '*' || c.is_whitespace())
        .to_string();
    if subject.is_empty() {
        warn!("draft output has an empty subject, using default subject");
        subject = DEFAULT_SUBJECT.to_string();
        issues.push(MalformedDraft::EmptySubject);
    }

    let body = if let Some(at) = body_at {
        after[at + BODY_MARKER.len()..]
            .trim_start_matches(|c: char| c == '*' || c.is_whitespace())
            .trim_end()
    } else {
        warn!("draft output has no body marker, using text after subject");
        issues.push(MalformedDraft::MissingBody);
        after[line_end..].trim()
    };

    GeneratedDraft {
        subject,
        body: body.to_string(),
        issues,
    }
}

/// Generates and parses a draft for the instruction.
///
/// # Errors
///
/// Returns [`Error::Generation`] if the instruction is blank or the
/// generator fails. Malformed output is not an error.
pub async fn generate_draft<G: DraftGenerator + Sync>(
    generator: &G,
    instruction: &str,
) -> Result<GeneratedDraft> {
    let instruction = instruction.trim();
    if instruction.is_empty() {
        return Err(Error::Generation("instruction is empty".into()));
    }

    let text = generator.generate(instruction).await?;
    debug!(chars = text.len(), "received draft text");
    Ok(parse_draft(&text))
}

fn build_prompt(instruction: &str) -> String {
    format!(
        "Write a complete, ready to send email for the following request.\n\
         Request: {instruction}\n\n\
         Do not use placeholders such as [Name] and do not invent facts that \
         are not in the request.\n\
         Reply in exactly this format:\n\
         Subject: <one line subject>\n\
         Body:\n\
         <email body>"
    )
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Serialize, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Client for Gemini's `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a client for the default model.
    #[must_use]
    pub fn new(http: Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_API_BASE.to_string(),
        }
    }

    /// Selects the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Points the client at another API base (used by tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn request(&self, instruction: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![TextPart {
                    text: build_prompt(instruction),
                }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("model returned {status}: {body}")));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("unreadable model reply: {e}")))?;

        let text: String = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(Error::Generation("model returned no text".into()));
        }
        Ok(text)
    }
}

impl DraftGenerator for GeminiClient {
    fn generate(&self, instruction: &str) -> impl Future<Output = Result<String>> + Send {
        self.request(instruction)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Canned(&'static str);

    impl DraftGenerator for Canned {
        async fn generate(&self, _instruction: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_well_formed() {
        let draft = parse_draft("Subject: Meeting moved\nBody:\nHi team,\n\nSee you at 3.\n");
        assert_eq!(draft.subject, "Meeting moved");
        assert_eq!(draft.body, "Hi team,\n\nSee you at 3.");
        assert!(draft.issues.is_empty());
    }

    #[test]
    fn test_markdown_emphasis() {
        let draft = parse_draft("**Subject:** Lunch?\n\n**Body:**\nWant to grab lunch?");
        assert_eq!(draft.subject, "Lunch?");
        assert_eq!(draft.body, "Want to grab lunch?");
    }

    #[test]
    fn test_preamble_is_ignored() {
        let draft = parse_draft("Sure! Here is your email:\n\nSubject: Hello\nBody: Hi Bob");
        assert_eq!(draft.subject, "Hello");
        assert_eq!(draft.body, "Hi Bob");
    }

    #[test]
    fn test_single_line() {
        let draft = parse_draft("Subject: Quick note Body: Thanks for today.");
        assert_eq!(draft.subject, "Quick note");
        assert_eq!(draft.body, "Thanks for today.");
    }

    #[test]
    fn test_missing_subject() {
        let draft = parse_draft("  Just a plain paragraph.  ");
        assert_eq!(draft.subject, DEFAULT_SUBJECT);
        assert_eq!(draft.body, "Just a plain paragraph.");
        assert_eq!(draft.issues, vec![MalformedDraft::MissingSubject]);
    }

    #[test]
    fn test_empty_subject() {
        let draft = parse_draft("Subject:\nBody:\nHello");
        assert_eq!(draft.subject, DEFAULT_SUBJECT);
        assert_eq!(draft.body, "Hello");
        assert_eq!(draft.issues, vec![MalformedDraft::EmptySubject]);
    }

    #[test]
    fn test_missing_body_marker() {
        let draft = parse_draft("Subject: Update\n\nThe release shipped.");
        assert_eq!(draft.subject, "Update");
        assert_eq!(draft.body, "The release shipped.");
        assert_eq!(draft.issues, vec![MalformedDraft::MissingBody]);
    }

    #[test]
    fn test_empty_output() {
        let draft = parse_draft("");
        assert_eq!(draft.subject, DEFAULT_SUBJECT);
        assert_eq!(draft.body, "");
    }

    #[tokio::test]
    async fn test_generate_draft() {
        let draft = generate_draft(&Canned("Subject: Hi\nBody:\nHello"), "say hi")
            .await
            .unwrap();
        assert_eq!(draft.subject, "Hi");
        assert_eq!(draft.body, "Hello");
    }

    #[tokio::test]
    async fn test_generate_draft_blank_instruction() {
        let err = generate_draft(&Canned("unused"), "   ").await.unwrap_err();
        assert_eq!(err.kind(), "GenerationError");
    }

    #[tokio::test]
    async fn test_gemini_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "key-1"))
            .and(body_string_contains("thank the team"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{"text": "Subject: Thanks\n"}, {"text": "Body:\nGreat work."}]
                    },
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(Client::new(), "key-1")
            .with_model("gemini-test")
            .with_base_url(server.uri());

        let draft = generate_draft(&client, "thank the team").await.unwrap();
        assert_eq!(draft.subject, "Thanks");
        assert_eq!(draft.body, "Great work.");
    }

    #[tokio::test]
    async fn test_gemini_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(Client::new(), "bad").with_base_url(server.uri());
        let err = client.generate("anything").await.unwrap_err();
        assert_eq!(err.kind(), "GenerationError");
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn test_gemini_no_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})),
            )
            .mount(&server)
            .await;

        let client = GeminiClient::new(Client::new(), "k").with_base_url(server.uri());
        let err = client.generate("anything").await.unwrap_err();
        assert_eq!(err.kind(), "GenerationError");
    }

    #[test]
    fn test_debug_hides_key() {
        let client = GeminiClient::new(Client::new(), "secret-key");
        assert!(!format!("{client:?}").contains("secret-key"));
    }
}
