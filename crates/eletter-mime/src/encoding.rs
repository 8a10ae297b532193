//! MIME transfer and header encodings.
//!
//! Base64 (RFC 2045), Quoted-Printable (RFC 2045), and encoded-word
//! header values (RFC 2047).

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum encoded line length for body transfer encodings.
const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as a single unwrapped Base64 string.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 wrapped at 76 columns with CRLF line breaks,
/// as required for message bodies.
#[must_use]
pub fn encode_base64_mime(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);
    for chunk in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        // Chunks of an ASCII string are valid UTF-8
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str("\r\n");
    }
    out
}

/// Decodes Base64 data, ignoring interleaved whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Encodes text as Quoted-Printable (RFC 2045).
///
/// Line breaks in the input (`\n` or `\r\n`) become hard CRLF breaks;
/// everything else is encoded byte-by-byte with soft breaks keeping
/// encoded lines at 76 columns. Trailing whitespace on a line is encoded
/// so it survives transport.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut out = String::new();
    let mut first = true;
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if !first {
            out.push_str("\r\n");
        }
        first = false;
        encode_qp_line(line.as_bytes(), &mut out);
    }
    out
}

fn encode_qp_line(line: &[u8], out: &mut String) {
    let mut column = 0;
    for (i, byte) in line.iter().copied().enumerate() {
        let last = i + 1 == line.len();
        // Literal bytes: printable ASCII minus '='; whitespace only when
        // not at end of line
        let literal = matches!(byte, b'!'..=b'<' | b'>'..=b'~')
            || (matches!(byte, b' ' | b'\t') && !last);
        let width = if literal { 1 } else { 3 };
        if column + width > MAX_LINE_LENGTH - 1 {
            out.push_str("=\r\n");
            column = 0;
        }
        if literal {
            out.push(byte as char);
        } else {
            let _ = write!(out, "={byte:02X}");
        }
        column += width;
    }
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// # Errors
///
/// Returns an error on an incomplete or invalid escape sequence.
pub fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'=' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        // Soft line break: "=\r\n" or "=\n"
        if bytes.get(i + 1) == Some(&b'\r') && bytes.get(i + 2) == Some(&b'\n') {
            i += 3;
            continue;
        }
        if bytes.get(i + 1) == Some(&b'\n') {
            i += 2;
            continue;
        }
        let hex = bytes
            .get(i + 1..i + 3)
            .ok_or_else(|| Error::InvalidEncoding("incomplete escape sequence".to_string()))?;
        let hex = std::str::from_utf8(hex)
            .map_err(|_| Error::InvalidEncoding("invalid escape sequence".to_string()))?;
        let byte = u8::from_str_radix(hex, 16)
            .map_err(|e| Error::InvalidEncoding(format!("invalid hex escape: {e}")))?;
        out.push(byte);
        i += 3;
    }
    Ok(out)
}

/// Encodes a header value as an RFC 2047 encoded word when it contains
/// non-ASCII characters; plain ASCII passes through untouched.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }
    format!("=?utf-8?B?{}?=", encode_base64(text.as_bytes()))
}

/// Decodes RFC 2047 encoded words in a header value.
///
/// Plain text between encoded words is preserved; whitespace between two
/// adjacent encoded words is dropped, per the RFC.
///
/// # Errors
///
/// Returns an error on a malformed encoded word or undecodable payload.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut out = String::new();
    let mut rest = text;
    let mut after_word = false;
    while let Some(start) = rest.find("=?") {
        let lead = &rest[..start];
        if !(after_word && lead.trim().is_empty()) {
            out.push_str(lead);
        }
        let Some((word, tail)) = split_encoded_word(&rest[start..]) else {
            out.push_str(&rest[start..start + 2]);
            rest = &rest[start + 2..];
            after_word = false;
            continue;
        };
        out.push_str(&decode_encoded_word(word)?);
        rest = tail;
        after_word = true;
    }
    out.push_str(rest);
    Ok(out)
}

/// Splits `=?charset?enc?payload?=...` into the encoded word and the rest.
fn split_encoded_word(s: &str) -> Option<(&str, &str)> {
    // s starts with "=?"; find the closing "?=" after two more '?'
    let inner = &s[2..];
    let q1 = inner.find('?')?;
    let q2 = inner[q1 + 1..].find('?')? + q1 + 1;
    let end = inner[q2 + 1..].find("?=")? + q2 + 1;
    Some((&s[..end + 4], &s[end + 4..]))
}

fn decode_encoded_word(word: &str) -> Result<String> {
    let inner = word
        .strip_prefix("=?")
        .and_then(|w| w.strip_suffix("?="))
        .ok_or_else(|| Error::InvalidEncoding(word.to_string()))?;
    let mut pieces = inner.splitn(3, '?');
    let _charset = pieces.next();
    let encoding = pieces.next().unwrap_or_default();
    let payload = pieces
        .next()
        .ok_or_else(|| Error::InvalidEncoding(word.to_string()))?;
    let bytes = match encoding {
        "B" | "b" => decode_base64(payload)?,
        "Q" | "q" => decode_quoted_printable(&payload.replace('_', " "))?,
        _ => return Err(Error::InvalidEncoding(format!("unknown encoding: {encoding}"))),
    };
    // Charsets other than UTF-8 are decoded leniently
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode_decode() {
        let encoded = encode_base64(b"Hello, World!");
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(decode_base64(&encoded).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_base64_mime_wraps() {
        let data = vec![0u8; 100];
        let encoded = encode_base64_mime(&data);
        assert!(encoded.lines().all(|l| l.len() <= 76));
        assert_eq!(decode_base64(&encoded).unwrap(), data);
    }

    #[test]
    fn test_qp_plain_text_unchanged() {
        assert_eq!(encode_quoted_printable("Hello, World!"), "Hello, World!");
    }

    #[test]
    fn test_qp_encodes_non_ascii() {
        let encoded = encode_quoted_printable("Héllo");
        assert_eq!(encoded, "H=C3=A9llo");
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), "Héllo".as_bytes());
    }

    #[test]
    fn test_qp_hard_line_breaks() {
        let encoded = encode_quoted_printable("one\ntwo\n");
        assert_eq!(encoded, "one\r\ntwo\r\n");
    }

    #[test]
    fn test_qp_trailing_space_encoded() {
        let encoded = encode_quoted_printable("trailing \nnext");
        assert_eq!(encoded, "trailing=20\r\nnext");
    }

    #[test]
    fn test_qp_soft_break_decode() {
        assert_eq!(
            decode_quoted_printable("Hello=\r\nWorld").unwrap(),
            b"HelloWorld"
        );
    }

    #[test]
    fn test_qp_long_line_wraps() {
        let line = "x".repeat(200);
        let encoded = encode_quoted_printable(&line);
        assert!(encoded.lines().all(|l| l.len() <= 76));
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), line.as_bytes());
    }

    #[test]
    fn test_rfc2047_ascii_passthrough() {
        assert_eq!(encode_rfc2047("Hello"), "Hello");
        assert_eq!(decode_rfc2047("Hello").unwrap(), "Hello");
    }

    #[test]
    fn test_rfc2047_b_round_trip() {
        let encoded = encode_rfc2047("Héllo");
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert_eq!(decode_rfc2047(&encoded).unwrap(), "Héllo");
    }

    #[test]
    fn test_rfc2047_q_decode() {
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo?=").unwrap(), "Héllo");
    }

    #[test]
    fn test_rfc2047_mixed_text() {
        assert_eq!(
            decode_rfc2047("Re: =?utf-8?Q?caf=C3=A9?= hours").unwrap(),
            "Re: café hours"
        );
    }

    #[test]
    fn test_rfc2047_adjacent_words_join() {
        assert_eq!(
            decode_rfc2047("=?utf-8?Q?Zo=C3=AB?= =?utf-8?Q?_Fa=C3=A7ade?=").unwrap(),
            "Zoë Façade"
        );
    }

    proptest! {
        #[test]
        fn prop_base64_round_trip(data: Vec<u8>) {
            prop_assert_eq!(decode_base64(&encode_base64_mime(&data)).unwrap(), data);
        }

        #[test]
        fn prop_qp_round_trip(text in "[ -~éß\n]{0,200}") {
            let decoded = decode_quoted_printable(&encode_quoted_printable(&text)).unwrap();
            let expected = text.replace('\n', "\r\n");
            prop_assert_eq!(decoded, expected.into_bytes());
        }

        #[test]
        fn prop_rfc2047_round_trip(text in "[a-zA-Z0-9 .éüñçß]{0,40}") {
            prop_assert_eq!(decode_rfc2047(&encode_rfc2047(&text)).unwrap(), text);
        }
    }
}
