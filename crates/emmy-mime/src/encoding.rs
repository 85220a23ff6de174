//! MIME encoding utilities.
//!
//! Supports Base64 (plain and line wrapped), base64url and RFC 2047 header
//! encoding.

use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};

/// Maximum encoded line length for Base64 bodies (RFC 2045).
pub const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 split into CRLF-terminated lines of at most
/// [`MAX_LINE_LENGTH`] characters.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);

    // Base64 output is pure ASCII, so byte chunks are valid str slices.
    for line in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        result.push_str(&String::from_utf8_lossy(line));
        result.push_str("\r\n");
    }

    result
}

/// Decodes Base64 data, ignoring embedded whitespace and line breaks.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Encodes data as padded base64url, the encoding mail APIs expect for raw
/// RFC 5322 messages.
#[must_use]
pub fn encode_base64url(data: &[u8]) -> String {
    URL_SAFE.encode(data)
}

/// Decodes padded base64url data.
///
/// # Errors
///
/// Returns an error if the input is not valid base64url.
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    URL_SAFE.decode(data).map_err(Into::into)
}

/// Longest encoded word RFC 2047 allows.
pub const MAX_ENCODED_WORD: usize = 75;

/// Encodes a header value using RFC 2047 encoding.
///
/// Format: `=?charset?B?encoded-text?=`. Plain ASCII values without `=?`
/// sequences are returned unchanged. Longer values become several encoded
/// words of at most [`MAX_ENCODED_WORD`] characters, split on character
/// boundaries and folded onto continuation lines.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    if text.is_ascii() && !text.contains("=?") {
        return text.to_string();
    }

    // "=?" charset "?B?" ... "?="
    let budget = MAX_ENCODED_WORD.saturating_sub(charset.len() + 7) / 4 * 3;

    let mut chunks = Vec::new();
    let mut start = 0;
    for (at, ch) in text.char_indices() {
        if at > start && at + ch.len_utf8() - start > budget {
            chunks.push(&text[start..at]);
            start = at;
        }
    }
    chunks.push(&text[start..]);

    chunks
        .iter()
        .map(|chunk| format!("=?{charset}?B?{}?=", encode_base64(chunk.as_bytes())))
        .collect::<Vec<_>>()
        .join("\r\n ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(decode_base64(&encoded).unwrap(), data);
    }

    #[test]
    fn test_base64url_uses_url_alphabet_with_padding() {
        // 0xfb 0xff encodes to "+/8=" in the standard alphabet.
        assert_eq!(encode_base64(&[0xfb, 0xff]), "+/8=");
        assert_eq!(encode_base64url(&[0xfb, 0xff]), "-_8=");
        assert_eq!(decode_base64url("-_8=").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_wrapped_short_input() {
        assert_eq!(encode_base64_wrapped(b"hello"), "aGVsbG8=\r\n");
        assert_eq!(encode_base64_wrapped(b""), "");
    }

    #[test]
    fn test_rfc2047_encode() {
        assert_eq!(encode_rfc2047("Hello", "utf-8"), "Hello");

        let encoded = encode_rfc2047("Héllo", "utf-8");
        assert_eq!(encoded, "=?utf-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_rfc2047_long_value_is_split() {
        let text = "Grüße aus München ".repeat(20);
        let encoded = encode_rfc2047(&text, "utf-8");
        assert!(encoded.contains("\r\n "));

        let mut decoded = Vec::new();
        for word in encoded.split("\r\n ") {
            assert!(word.len() <= MAX_ENCODED_WORD, "word too long: {word}");
            let payload = word
                .strip_prefix("=?utf-8?B?")
                .and_then(|w| w.strip_suffix("?="))
                .unwrap();
            let bytes = decode_base64(payload).unwrap();
            // Each word holds whole characters
            assert!(std::str::from_utf8(&bytes).is_ok());
            decoded.extend(bytes);
        }
        assert_eq!(String::from_utf8(decoded).unwrap(), text);
    }

    proptest! {
        #[test]
        fn wrapped_lines_respect_limit(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let wrapped = encode_base64_wrapped(&data);
            for line in wrapped.split("\r\n") {
                prop_assert!(line.len() <= MAX_LINE_LENGTH);
            }
            prop_assert_eq!(decode_base64(&wrapped).unwrap(), data);
        }
    }
}
