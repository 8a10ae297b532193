//! MIME content type handling.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Characters that may not appear in an RFC 2045 token.
const TSPECIALS: &str = "()<>@,;:\\\"/[]?=";

/// Checks whether `s` is a valid RFC 2045 token (usable as a content
/// maintype, subtype, or parameter name).
#[must_use]
pub fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_graphic() && !TSPECIALS.contains(c))
}

/// MIME content type with parameters.
///
/// Parameters are kept in a sorted map so rendering is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: BTreeMap<String, String>,
}

impl ContentType {
    /// Creates a new content type with no parameters.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Creates a text/plain content type with a UTF-8 charset.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// Creates a text/html content type with a UTF-8 charset.
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html").with_parameter("charset", "utf-8")
    }

    /// Creates an application/octet-stream content type.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Creates a message/rfc822 content type.
    #[must_use]
    pub fn message_rfc822() -> Self {
        Self::new("message", "rfc822")
    }

    /// Creates a multipart/mixed content type.
    #[must_use]
    pub fn multipart_mixed() -> Self {
        Self::new("multipart", "mixed")
    }

    /// Creates a multipart/alternative content type.
    #[must_use]
    pub fn multipart_alternative() -> Self {
        Self::new("multipart", "alternative")
    }

    /// Creates a multipart/related content type.
    #[must_use]
    pub fn multipart_related() -> Self {
        Self::new("multipart", "related")
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Removes a parameter, returning the modified content type.
    #[must_use]
    pub fn without_parameter(mut self, key: &str) -> Self {
        self.parameters.remove(key);
        self
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type == "text"
    }

    /// Checks if this is a message content type.
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.main_type == "message"
    }

    /// Returns `maintype/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value two"`. Type and
    /// subtype are lowercased and must be valid RFC 2045 tokens; parameter
    /// values may be quoted.
    ///
    /// # Errors
    ///
    /// Returns an error if the type/subtype pair is missing or malformed.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = split_parameters(s);
        let type_str = parts
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(s.to_string()))?;
        if !is_token(main_type) || !is_token(sub_type) {
            return Err(Error::InvalidContentType(s.to_string()));
        }

        let mut content_type = Self::new(main_type, sub_type);
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            if let Some((key, value)) = param.split_once('=') {
                let key = key.trim().to_ascii_lowercase();
                content_type
                    .parameters
                    .insert(key, unquote(value.trim()).into_owned());
            }
        }
        Ok(content_type)
    }

    /// Guesses a content type from a filename extension.
    ///
    /// Compressed files report the compression's own type (a `.tar.gz` is
    /// `application/gzip`, not a tar). Unknown extensions fall back to
    /// `application/octet-stream`.
    #[must_use]
    pub fn from_filename(filename: &str) -> Self {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let essence = match ext.as_str() {
            "gz" | "tgz" | "taz" | "svgz" => "application/gzip",
            "z" => "application/x-compress",
            "bz2" | "tbz2" => "application/x-bzip2",
            "xz" | "txz" => "application/x-xz",
            "txt" | "text" | "log" => "text/plain",
            "html" | "htm" => "text/html",
            "css" => "text/css",
            "csv" => "text/csv",
            "md" | "markdown" => "text/markdown",
            "json" => "application/json",
            "xml" => "application/xml",
            "pdf" => "application/pdf",
            "zip" => "application/zip",
            "tar" => "application/x-tar",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "svg" => "image/svg+xml",
            "webp" => "image/webp",
            "mp3" => "audio/mpeg",
            "mp4" => "video/mp4",
            "eml" => "message/rfc822",
            _ => "application/octet-stream",
        };
        let (main_type, sub_type) = essence.split_once('/').unwrap_or(("application", "octet-stream"));
        Self::new(main_type, sub_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;
        for (key, value) in &self.parameters {
            if is_token(value) {
                write!(f, "; {key}={value}")?;
            } else {
                write!(f, "; {key}=\"{}\"", escape_quoted(value))?;
            }
        }
        Ok(())
    }
}

/// Escapes `\` and `"` for use inside a quoted parameter value.
#[must_use]
pub fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Strips surrounding quotes from a parameter value, undoing `\`-escapes.
#[must_use]
pub fn unquote(value: &str) -> std::borrow::Cow<'_, str> {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return std::borrow::Cow::Borrowed(value);
    };
    if !inner.contains('\\') {
        return std::borrow::Cow::Owned(inner.to_string());
    }
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    std::borrow::Cow::Owned(out)
}

/// Splits a `value; k=v; k="v;v"` string on semicolons outside quotes.
pub(crate) fn split_parameters(s: &str) -> impl Iterator<Item = &str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' && in_quotes {
            escaped = true;
        } else if c == '"' {
            in_quotes = !in_quotes;
        } else if c == ';' && !in_quotes {
            pieces.push(&s[start..i]);
            start = i + 1;
        }
    }
    pieces.push(&s[start..]);
    pieces.into_iter()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let ct = ContentType::parse("text/plain").unwrap();
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_parse_lowercases() {
        let ct = ContentType::parse("TEXT/PLAIN").unwrap();
        assert_eq!(ct.essence(), "text/plain");
    }

    #[test]
    fn test_parse_params() {
        let ct = ContentType::parse("text/markdown; charset=utf-8; variant=GFM").unwrap();
        assert_eq!(ct.sub_type, "markdown");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert_eq!(ct.parameters.get("variant").map(String::as_str), Some("GFM"));
    }

    #[test]
    fn test_parse_quoted_param() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"==_b;1==\"").unwrap();
        assert_eq!(ct.boundary(), Some("==_b;1=="));
    }

    #[test]
    fn test_parse_errors() {
        for s in ["text", "text/", "/plain", "text/plain, charset=utf-8"] {
            assert!(ContentType::parse(s).is_err(), "accepted {s:?}");
        }
    }

    #[test]
    fn test_display_round_trip() {
        let ct = ContentType::text_plain();
        let rendered = ct.to_string();
        assert_eq!(rendered, "text/plain; charset=utf-8");
        assert_eq!(ContentType::parse(&rendered).unwrap(), ct);
    }

    #[test]
    fn test_display_quotes_when_needed() {
        let ct = ContentType::new("text", "plain").with_parameter("name", "two words.txt");
        assert_eq!(ct.to_string(), "text/plain; name=\"two words.txt\"");
    }

    #[test]
    fn test_display_escapes_quotes() {
        let ct = ContentType::new("text", "plain").with_parameter("name", "foo\"bar");
        assert_eq!(ct.to_string(), "text/plain; name=\"foo\\\"bar\"");
    }

    #[test]
    fn test_from_filename() {
        for (name, essence) in [
            ("foo.txt", "text/plain"),
            ("foo", "application/octet-stream"),
            ("foo.tar.gz", "application/gzip"),
            ("foo.tgz", "application/gzip"),
            ("foo.svgz", "application/gzip"),
            ("foo.Z", "application/x-compress"),
            ("foo.tar.bz2", "application/x-bzip2"),
            ("foo.txz", "application/x-xz"),
            ("cat.png", "image/png"),
            ("mail.eml", "message/rfc822"),
        ] {
            assert_eq!(ContentType::from_filename(name).essence(), essence, "{name}");
        }
    }

    #[test]
    fn test_is_token() {
        assert!(is_token("plain"));
        assert!(is_token("octet-stream"));
        assert!(!is_token(""));
        assert!(!is_token("text/plain"));
        assert!(!is_token("two words"));
    }
}
