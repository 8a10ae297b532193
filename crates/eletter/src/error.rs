//! Error types for the composition, decomposition, and simplification
//! engines.
//!
//! Each engine has its own error enum so callers can match on the kind of
//! failure directly; [`Error`] unifies them for the combined
//! decompose-then-simplify pipeline.

/// Errors raised while composing a [`MailItem`](crate::MailItem) tree
/// into a message.
///
/// These are contract violations detected at the call that commits them;
/// no partial message is ever produced.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// Neither a text body nor an HTML body was supplied.
    #[error("at least one of text and html must be given")]
    NoBodyContent,

    /// A multipart node with no parts cannot be rendered.
    #[error("cannot compose an empty {0}")]
    EmptyMultipart(&'static str),

    /// A text attachment's content type must have a maintype of "text".
    #[error("content type must be text/*: {0}")]
    NotText(String),

    /// A content type string failed to parse.
    #[error("invalid content type: {0}")]
    InvalidContentType(String),

    /// File-based construction failed to read its input.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// File-based construction failed to parse an embedded message.
    #[error(transparent)]
    Mime(#[from] eletter_mime::Error),
}

/// Errors raised while decomposing a message into a
/// [`MailItem`](crate::MailItem) tree.
#[derive(Debug, thiserror::Error)]
pub enum DecomposeError {
    /// A part's content type has no `MailItem` representation.
    #[error("unsupported content type {content_type} at {path}")]
    UnsupportedContentType {
        /// The offending content type.
        content_type: String,
        /// Dotted index path of the part within the message tree
        /// ("root", "1", "1.2", ...).
        path: String,
    },

    /// A part's body does not match its declared content type.
    #[error("malformed part at {path}: {reason}")]
    MalformedPart {
        /// Dotted index path of the part within the message tree.
        path: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The `Sender` header held a group rather than a single address.
    #[error("Sender header must be a single address, not a group")]
    GroupSender,
}

/// Errors raised while simplifying a decomposed message down to
/// text + HTML + attachments.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SimplifyError {
    /// Attachments are interleaved with body parts. Recoverable by
    /// simplifying with `unmix` enabled.
    #[error("message intersperses attachments with text")]
    MixedContent,

    /// The message has no text or HTML body at all.
    #[error("no text or HTML bodies in message")]
    NoBodies,

    /// More than one plain-text alternative.
    #[error("multiple text/plain parts in multipart/alternative")]
    DuplicateText,

    /// More than one HTML alternative.
    #[error("multiple text/html parts in multipart/alternative")]
    DuplicateHtml,

    /// An alternative part contributed neither text nor HTML.
    #[error("alternative part contains neither text/plain nor text/html")]
    BodylessAlternative,

    /// An alternative part contributed both text and HTML at once.
    #[error("alternative part contains both text/plain and text/html")]
    AmbiguousAlternative,

    /// A plain-text part appeared after HTML-only content.
    #[error("no matching HTML alternative for text part")]
    TextAfterHtml,

    /// An HTML part appeared after plain-text-only content.
    #[error("no matching text alternative for HTML part")]
    HtmlAfterText,

    /// A text-plus-HTML alternative followed a single-flavor body prefix.
    #[error("text plus HTML alternative follows a single-flavor body")]
    AlternativeAfterBody,

    /// A nested alternative was not exactly one text and one HTML body.
    #[error("multipart/alternative inside multipart/mixed is not a text part plus an HTML part")]
    MalformedAlternative,

    /// A related container that does not reduce to a body plus one
    /// referenced part.
    #[error("cannot simplify multipart/related")]
    Related,

    /// A mixed container nested where it cannot be flattened away.
    #[error("cannot simplify nested multipart/mixed")]
    NestedMixed,

    /// The entire message body is an attachment.
    #[error("message body is an attachment")]
    AttachmentOnly,
}

/// Any failure from the combined decompose/simplify pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Composition failed.
    #[error(transparent)]
    Compose(#[from] ComposeError),

    /// Decomposition failed.
    #[error(transparent)]
    Decompose(#[from] DecomposeError),

    /// Simplification failed.
    #[error(transparent)]
    Simplify(#[from] SimplifyError),
}
