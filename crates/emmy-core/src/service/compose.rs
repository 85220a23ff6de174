//! Turning a recipient, subject and body into the provider's transport form.

use emmy_mime::{Attachment, MessageBuilder};
use serde::Serialize;

use crate::Result;

/// Sender placeholder understood by Gmail as "the authenticated mailbox".
const SELF_SENDER: &str = "me";

/// A message ready for assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingDraft {
    /// Recipient address, used verbatim.
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
    /// Optional single attachment.
    pub attachment: Option<Attachment>,
}

impl OutgoingDraft {
    /// Creates a draft without attachment.
    #[must_use]
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            attachment: None,
        }
    }

    /// Attaches a file.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Encoded message in the shape the send endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportPayload {
    /// base64url of the full RFC 5322 message.
    pub raw: String,
}

/// Assembles the MIME message for a draft and encodes it for transport.
///
/// Without an attachment this is a single `text/plain` part; with one it
/// is `multipart/mixed` with the text first and the file second.
///
/// # Errors
///
/// Returns [`crate::Error::Mime`] if the recipient is empty.
pub fn build_payload(draft: &OutgoingDraft) -> Result<TransportPayload> {
    let mut builder = MessageBuilder::new()
        .to(draft.recipient.as_str())
        .from(SELF_SENDER)
        .subject(draft.subject.as_str())
        .text_body(draft.body.as_str());

    if let Some(attachment) = &draft.attachment {
        builder = builder.attach(attachment.clone());
    }

    let message = builder.build()?;
    Ok(TransportPayload {
        raw: message.to_raw(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use emmy_mime::encoding::decode_base64url;

    fn decode(payload: &TransportPayload) -> String {
        String::from_utf8(decode_base64url(&payload.raw).unwrap()).unwrap()
    }

    #[test]
    fn test_plain_payload() {
        let payload =
            build_payload(&OutgoingDraft::new("a@x.com", "Hi", "Hello there")).unwrap();
        let text = decode(&payload);

        assert!(text.contains("to: a@x.com\r\n"));
        assert!(text.contains("from: me\r\n"));
        assert!(text.contains("subject: Hi\r\n"));
        assert!(text.contains("text/plain"));
        assert!(text.ends_with("Hello there"));
        assert!(!text.contains("multipart"));
    }

    #[test]
    fn test_payload_with_attachment() {
        let draft = OutgoingDraft::new("a@x.com", "Report", "See attached")
            .with_attachment(Attachment::new("r.pdf", vec![0x25, 0x50, 0x44, 0x46]));
        let text = decode(&build_payload(&draft).unwrap());

        assert!(text.contains("multipart/mixed"));
        assert!(text.contains("Content-Disposition: attachment; filename=r.pdf"));
        assert!(text.contains("JVBERg=="));

        let text_at = text.find("See attached").unwrap();
        let file_at = text.find("filename=r.pdf").unwrap();
        assert!(text_at < file_at);
    }

    #[test]
    fn test_payload_is_url_safe() {
        let body = "?>?>?>".repeat(40);
        let payload = build_payload(&OutgoingDraft::new("a@x.com", "s", body)).unwrap();
        assert!(!payload.raw.contains('+'));
        assert!(!payload.raw.contains('/'));
    }

    #[test]
    fn test_empty_recipient() {
        let err = build_payload(&OutgoingDraft::new("", "s", "b")).unwrap_err();
        assert_eq!(err.kind(), "InvalidMessage");
    }

    #[test]
    fn test_serializes_as_raw() {
        let payload = TransportPayload { raw: "eA==".into() };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"raw": "eA=="})
        );
    }
}
