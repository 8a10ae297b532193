//! MIME message structure and handling.
//!
//! A [`Message`] is the in-memory form of an email: a header block plus a
//! body that is either leaf content (text or bytes), an ordered list of
//! child messages (multipart), or an embedded message (`message/rfc822`).
//! Transfer encodings exist only at the wire boundary — [`Message::parse`]
//! decodes them and [`Message::to_wire`] reapplies them; the in-memory
//! tree always holds decoded content.

use crate::content_type::{ContentType, split_parameters, unquote};
use crate::encoding::{
    decode_base64, decode_quoted_printable, encode_base64_mime, encode_quoted_printable,
    encode_rfc2047,
};
use crate::error::{Error, Result};
use crate::header::{Headers, canonical_name};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses a transfer encoding from a header value.
    ///
    /// Unrecognized values (including "7bit") fall back to `SevenBit`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }
}

impl std::fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Message body content.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Body {
    /// Decoded textual content of a `text/*` leaf.
    Text(String),
    /// Decoded binary content of any other leaf.
    Binary(Vec<u8>),
    /// Child messages of a `multipart/*` container, in order.
    Multipart(Vec<Message>),
    /// The embedded message of a `message/rfc822` part.
    Rfc822(Box<Message>),
}

/// MIME message: a header block and a body.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// Message headers.
    pub headers: Headers,
    /// Message body.
    pub body: Body,
}

impl Message {
    /// Creates a textual leaf message with the given content type.
    #[must_use]
    pub fn text(content: impl Into<String>, content_type: &ContentType) -> Self {
        let mut headers = Headers::new();
        headers.set("content-type", content_type.to_string());
        Self {
            headers,
            body: Body::Text(content.into()),
        }
    }

    /// Creates a binary leaf message with the given content type.
    #[must_use]
    pub fn binary(content: Vec<u8>, content_type: &ContentType) -> Self {
        let mut headers = Headers::new();
        headers.set("content-type", content_type.to_string());
        Self {
            headers,
            body: Body::Binary(content),
        }
    }

    /// Creates a multipart container message.
    #[must_use]
    pub fn multipart(content_type: &ContentType, children: Vec<Self>) -> Self {
        let mut headers = Headers::new();
        headers.set("content-type", content_type.to_string());
        Self {
            headers,
            body: Body::Multipart(children),
        }
    }

    /// Creates a `message/rfc822` part embedding another message.
    #[must_use]
    pub fn rfc822(inner: Self) -> Self {
        let mut headers = Headers::new();
        headers.set("content-type", ContentType::message_rfc822().to_string());
        Self {
            headers,
            body: Body::Rfc822(Box::new(inner)),
        }
    }

    /// Returns the message's content type.
    ///
    /// A missing or unparseable `Content-Type` header defaults to
    /// `text/plain`, per RFC 2045.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.headers
            .get("content-type")
            .and_then(|value| ContentType::parse(value).ok())
            .unwrap_or_else(|| ContentType::new("text", "plain"))
    }

    /// Checks whether the body is a multipart container.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        matches!(self.body, Body::Multipart(_))
    }

    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("subject")
    }

    /// Gets the Date header.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.headers.get("date")
    }

    /// Gets the leaf text content, if this is a textual leaf.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        match &self.body {
            Body::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the `Content-Disposition` type, lowercased
    /// ("attachment", "inline", ...), if the header is present.
    #[must_use]
    pub fn disposition(&self) -> Option<String> {
        let value = self.headers.get("content-disposition")?;
        let kind = split_parameters(value).next()?.trim().to_ascii_lowercase();
        if kind.is_empty() { None } else { Some(kind) }
    }

    /// Returns the part's filename, from the `Content-Disposition`
    /// `filename` parameter or the `Content-Type` `name` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        if let Some(value) = self.headers.get("content-disposition")
            && let Some(filename) = find_parameter(value, "filename")
        {
            return Some(filename);
        }
        self.content_type().parameters.get("name").cloned()
    }

    /// Parses a message from its transmitted textual form.
    ///
    /// Headers are unfolded, multipart bodies are split on their boundary
    /// and parsed recursively, `message/rfc822` bodies are parsed as
    /// embedded messages, and transfer encodings are decoded. Text bodies
    /// are normalized to `\n` line endings.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed headers, a multipart content type
    /// without a boundary parameter, or undecodable content.
    pub fn parse(raw: &str) -> Result<Self> {
        let (header_text, body_text) = split_header_block(raw);
        let headers = Headers::parse(header_text)?;
        let content_type = headers
            .get("content-type")
            .and_then(|value| ContentType::parse(value).ok())
            .unwrap_or_else(|| ContentType::new("text", "plain"));

        if content_type.is_multipart() {
            let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
            let children = split_multipart(body_text, boundary)?
                .into_iter()
                .map(|part| Self::parse(&part))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Self {
                headers,
                body: Body::Multipart(children),
            });
        }

        let encoding = headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse);
        if content_type.is_message() && content_type.sub_type == "rfc822" {
            let inner = Self::parse(&decode_body_text(body_text, encoding)?)?;
            return Ok(Self {
                headers,
                body: Body::Rfc822(Box::new(inner)),
            });
        }

        let body = if content_type.is_text() {
            Body::Text(decode_body_text(body_text, encoding)?.replace("\r\n", "\n"))
        } else {
            Body::Binary(decode_body_bytes(body_text, encoding)?)
        };
        Ok(Self { headers, body })
    }

    /// Serializes the message to its transmitted form: CRLF line endings,
    /// transfer-encoded bodies (quoted-printable for text, base64 for
    /// binary), generated multipart boundaries, and RFC 2047 encoded
    /// header values.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        self.write_part(&mut out, true);
        out
    }

    fn write_part(&self, out: &mut String, top_level: bool) {
        if top_level && !self.headers.contains("mime-version") {
            out.push_str("MIME-Version: 1.0\r\n");
        }
        match &self.body {
            Body::Text(content) => {
                self.write_headers(out, &[]);
                write_header(out, "content-transfer-encoding", "quoted-printable");
                out.push_str("\r\n");
                out.push_str(&encode_quoted_printable(content));
                out.push_str("\r\n");
            }
            Body::Binary(content) => {
                self.write_headers(out, &[]);
                write_header(out, "content-transfer-encoding", "base64");
                out.push_str("\r\n");
                out.push_str(&encode_base64_mime(content));
            }
            Body::Rfc822(inner) => {
                self.write_headers(out, &[]);
                out.push_str("\r\n");
                inner.write_part(out, false);
            }
            Body::Multipart(children) => {
                let boundary = self
                    .content_type()
                    .boundary()
                    .map_or_else(next_boundary, String::from);
                let content_type = self
                    .content_type()
                    .with_parameter("boundary", boundary.clone());
                self.write_headers(out, &["content-type"]);
                write_header(out, "content-type", &content_type.to_string());
                out.push_str("\r\n");
                for child in children {
                    let _ = write!(out, "--{boundary}\r\n");
                    child.write_part(out, false);
                }
                let _ = write!(out, "--{boundary}--\r\n");
            }
        }
    }

    fn write_headers(&self, out: &mut String, skip: &[&str]) {
        for (name, value) in self.headers.iter() {
            if skip.contains(&name) || name == "content-transfer-encoding" {
                continue;
            }
            write_header(out, name, value);
        }
    }
}

fn write_header(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, "{}: {}\r\n", canonical_name(name), encode_rfc2047(value));
}

/// Process-wide boundary counter; deterministic, no RNG needed.
static BOUNDARY_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_boundary() -> String {
    let n = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("==============={n:016}==")
}

/// Splits raw message text into its header block and body.
fn split_header_block(raw: &str) -> (&str, &str) {
    for separator in ["\r\n\r\n", "\n\n"] {
        if let Some(idx) = raw.find(separator) {
            return (&raw[..idx], &raw[idx + separator.len()..]);
        }
    }
    (raw, "")
}

/// Splits a multipart body into its raw parts, discarding the preamble
/// before the first boundary and the epilogue after the closing one.
fn split_multipart(body: &str, boundary: &str) -> Result<Vec<String>> {
    let delimiter = format!("--{boundary}");
    let closing = format!("--{boundary}--");
    let mut parts = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    for line in body.lines() {
        let trimmed = line.trim_end();
        if trimmed == closing {
            if let Some(lines) = current.take() {
                parts.push(lines.join("\r\n"));
            }
            break;
        }
        if trimmed == delimiter {
            if let Some(lines) = current.take() {
                parts.push(lines.join("\r\n"));
            }
            current = Some(Vec::new());
            continue;
        }
        if let Some(lines) = current.as_mut() {
            lines.push(line.strip_suffix('\r').unwrap_or(line));
        }
    }
    // Tolerate a missing closing delimiter
    if let Some(lines) = current.take() {
        parts.push(lines.join("\r\n"));
    }
    if parts.is_empty() {
        return Err(Error::InvalidMultipart(format!(
            "no parts delimited by boundary {boundary:?}"
        )));
    }
    Ok(parts)
}

fn decode_body_bytes(body: &str, encoding: TransferEncoding) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::Base64 => decode_base64(body),
        TransferEncoding::QuotedPrintable => decode_quoted_printable(body),
        _ => Ok(body.as_bytes().to_vec()),
    }
}

fn decode_body_text(body: &str, encoding: TransferEncoding) -> Result<String> {
    let bytes = decode_body_bytes(body, encoding)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Finds a parameter in a `value; k=v` header value, unquoting it.
fn find_parameter(value: &str, name: &str) -> Option<String> {
    for piece in split_parameters(value).skip(1) {
        if let Some((key, val)) = piece.split_once('=')
            && key.trim().eq_ignore_ascii_case(name)
        {
            return Some(unquote(val.trim()).into_owned());
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn text_message(content: &str) -> Message {
        Message::text(content, &ContentType::text_plain())
    }

    #[test]
    fn test_content_type_default() {
        let message = Message {
            headers: Headers::new(),
            body: Body::Text("hi".into()),
        };
        assert_eq!(message.content_type().essence(), "text/plain");
    }

    #[test]
    fn test_disposition_and_filename() {
        let mut message = Message::binary(vec![1, 2], &ContentType::octet_stream());
        message
            .headers
            .set("content-disposition", "attachment; filename=\"a b.bin\"");
        assert_eq!(message.disposition().as_deref(), Some("attachment"));
        assert_eq!(message.filename().as_deref(), Some("a b.bin"));
    }

    #[test]
    fn test_filename_from_name_param() {
        let ct = ContentType::octet_stream().with_parameter("name", "data.bin");
        let message = Message::binary(vec![], &ct);
        assert_eq!(message.filename().as_deref(), Some("data.bin"));
    }

    #[test]
    fn test_parse_simple() {
        let raw = concat!(
            "From: sender@example.com\r\n",
            "Subject: Test\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "\r\n",
            "Hello, World!\r\n",
        );
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.subject(), Some("Test"));
        assert_eq!(message.body_text(), Some("Hello, World!\n"));
    }

    #[test]
    fn test_parse_quoted_printable() {
        let raw = concat!(
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "H=C3=A9llo\r\n",
        );
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.body_text(), Some("Héllo\n"));
    }

    #[test]
    fn test_parse_multipart() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=\"b1\"\r\n",
            "\r\n",
            "preamble is discarded\r\n",
            "--b1\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "part one\r\n",
            "--b1\r\n",
            "Content-Type: application/octet-stream\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "AQID\r\n",
            "--b1--\r\n",
            "epilogue\r\n",
        );
        let message = Message::parse(raw).unwrap();
        assert!(message.is_multipart());
        let Body::Multipart(children) = &message.body else {
            panic!("expected multipart body");
        };
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].body_text(), Some("part one"));
        assert_eq!(children[1].body, Body::Binary(vec![1, 2, 3]));
    }

    #[test]
    fn test_parse_multipart_missing_boundary() {
        let raw = "Content-Type: multipart/mixed\r\n\r\nbody\r\n";
        assert!(matches!(
            Message::parse(raw),
            Err(Error::MissingBoundary)
        ));
    }

    #[test]
    fn test_parse_rfc822() {
        let raw = concat!(
            "Content-Type: message/rfc822\r\n",
            "\r\n",
            "Subject: Inner\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "inner body\r\n",
        );
        let message = Message::parse(raw).unwrap();
        let Body::Rfc822(inner) = &message.body else {
            panic!("expected embedded message");
        };
        assert_eq!(inner.subject(), Some("Inner"));
        assert_eq!(inner.body_text(), Some("inner body\n"));
    }

    #[test]
    fn test_to_wire_parse_round_trip() {
        let children = vec![
            text_message("plain text body\n"),
            Message::binary(vec![0, 159, 146, 150], &ContentType::octet_stream()),
        ];
        let mut message = Message::multipart(&ContentType::multipart_mixed(), children);
        message.headers.add("subject", "Round trip");

        let wire = message.to_wire();
        let parsed = Message::parse(&wire).unwrap();
        assert_eq!(parsed.subject(), Some("Round trip"));
        let Body::Multipart(parts) = &parsed.body else {
            panic!("expected multipart body");
        };
        assert_eq!(parts[0].body_text(), Some("plain text body\n"));
        assert_eq!(parts[1].body, Body::Binary(vec![0, 159, 146, 150]));
    }

    #[test]
    fn test_to_wire_encodes_non_ascii_headers() {
        let mut message = text_message("hi\n");
        message.headers.add("subject", "Héllo");
        let wire = message.to_wire();
        assert!(wire.contains("Subject: =?utf-8?B?"));
        let parsed = Message::parse(&wire).unwrap();
        assert_eq!(parsed.subject().map(String::from), Some("=?utf-8?B?SMOpbGxv?=".into()));
    }

    #[test]
    fn test_wire_has_crlf_and_mime_version() {
        let wire = text_message("hi\n").to_wire();
        assert!(wire.starts_with("MIME-Version: 1.0\r\n"));
        assert!(wire.contains("Content-Transfer-Encoding: quoted-printable\r\n"));
    }
}
