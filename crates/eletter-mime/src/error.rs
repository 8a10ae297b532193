//! Error types for MIME operations.

use std::string::FromUtf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid content type.
    #[error("invalid content type: {0}")]
    InvalidContentType(String),

    /// Invalid MIME header.
    #[error("invalid MIME header: {0}")]
    InvalidHeader(String),

    /// Invalid encoding.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),

    /// Missing boundary parameter on a multipart message.
    #[error("missing boundary in multipart message")]
    MissingBoundary,

    /// Invalid multipart structure.
    #[error("invalid multipart structure: {0}")]
    InvalidMultipart(String),

    /// Message parse error.
    #[error("parse error: {0}")]
    Parse(String),
}
