//! The typed message tree.
//!
//! A [`MailItem`] is a node in a structured email body: a plain or HTML
//! text body, one of three attachment flavors, or one of three multipart
//! containers. Trees are built with the [`mix`](MailItem::mix),
//! [`alternate`](MailItem::alternate), and [`relate`](MailItem::relate)
//! combinators and rendered into a wire-level message by the compose
//! engine.

use crate::error::ComposeError;
use eletter_mime::{ContentType, Message};
use std::path::Path;

/// A plain-text body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBody {
    /// The text content.
    pub content: String,
    /// Optional Content-ID for `cid:` references.
    pub content_id: Option<String>,
}

impl TextBody {
    /// Creates a plain-text body.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_id: None,
        }
    }

    /// Sets the Content-ID.
    #[must_use]
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }
}

/// An HTML body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlBody {
    /// The HTML content.
    pub content: String,
    /// Optional Content-ID for `cid:` references.
    pub content_id: Option<String>,
}

impl HtmlBody {
    /// Creates an HTML body.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_id: None,
        }
    }

    /// Sets the Content-ID.
    #[must_use]
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }
}

/// A binary attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytesAttachment {
    /// The attachment content.
    pub content: Vec<u8>,
    /// The attachment filename, if any.
    pub filename: Option<String>,
    /// The attachment's content type.
    pub content_type: ContentType,
    /// Whether clients should display the attachment inline.
    pub inline: bool,
    /// Optional Content-ID for `cid:` references.
    pub content_id: Option<String>,
}

impl BytesAttachment {
    /// Creates a binary attachment with the default
    /// `application/octet-stream` content type.
    #[must_use]
    pub fn new(content: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            content,
            filename: Some(filename.into()),
            content_type: ContentType::octet_stream(),
            inline: false,
            content_id: None,
        }
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Sets whether the attachment is displayed inline.
    #[must_use]
    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    /// Sets the Content-ID.
    #[must_use]
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// Builds an attachment from a file on disk.
    ///
    /// The filename is the path's basename and the content type is
    /// guessed from its extension. The file is read eagerly.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ComposeError> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let filename = basename(path);
        let content_type = ContentType::from_filename(&filename);
        Ok(Self::new(content, filename).with_content_type(content_type))
    }
}

/// A textual attachment; its content type must have a maintype of "text".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextAttachment {
    /// The attachment content.
    pub content: String,
    /// The attachment filename, if any.
    pub filename: Option<String>,
    /// The attachment's content type (maintype "text").
    pub content_type: ContentType,
    /// Whether clients should display the attachment inline.
    pub inline: bool,
    /// Optional Content-ID for `cid:` references.
    pub content_id: Option<String>,
}

impl TextAttachment {
    /// Creates a text attachment with the default `text/plain` content
    /// type.
    #[must_use]
    pub fn new(content: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            filename: Some(filename.into()),
            content_type: ContentType::new("text", "plain"),
            inline: false,
            content_id: None,
        }
    }

    /// Sets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if the maintype is not "text".
    pub fn with_content_type(mut self, content_type: ContentType) -> Result<Self, ComposeError> {
        if !content_type.is_text() {
            return Err(ComposeError::NotText(content_type.essence()));
        }
        self.content_type = content_type;
        Ok(self)
    }

    /// Sets whether the attachment is displayed inline.
    #[must_use]
    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    /// Sets the Content-ID.
    #[must_use]
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// Builds a text attachment from a file on disk.
    ///
    /// The filename is the path's basename and the content type is
    /// guessed from its extension; the guess must be a `text/*` type.
    /// The file is read eagerly.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the guessed
    /// content type is not textual.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ComposeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let filename = basename(path);
        let content_type = ContentType::from_filename(&filename);
        Self::new(content, filename).with_content_type(content_type)
    }
}

/// An embedded-message (`message/rfc822`) attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    /// The embedded message.
    pub content: Message,
    /// The attachment filename, if any.
    pub filename: Option<String>,
    /// Whether clients should display the attachment inline.
    pub inline: bool,
    /// Optional Content-ID for `cid:` references.
    pub content_id: Option<String>,
}

impl EmailAttachment {
    /// Creates an embedded-message attachment.
    #[must_use]
    pub fn new(content: Message, filename: impl Into<String>) -> Self {
        Self {
            content,
            filename: Some(filename.into()),
            inline: false,
            content_id: None,
        }
    }

    /// Sets whether the attachment is displayed inline.
    #[must_use]
    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    /// Sets the Content-ID.
    #[must_use]
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// Builds an embedded-message attachment from a message file on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed as a
    /// message.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ComposeError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let content = Message::parse(&raw)?;
        Ok(Self::new(content, basename(path)))
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Any attachment flavor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// A binary attachment.
    Bytes(BytesAttachment),
    /// A textual attachment.
    Text(TextAttachment),
    /// An embedded-message attachment.
    Email(EmailAttachment),
}

/// A `multipart/mixed` container: independent parts in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mixed {
    /// The parts, in serialization order.
    pub parts: Vec<MailItem>,
    /// Optional Content-ID for `cid:` references.
    pub content_id: Option<String>,
}

impl Mixed {
    /// Creates a mixed container from parts.
    #[must_use]
    pub fn new(parts: Vec<MailItem>) -> Self {
        Self {
            parts,
            content_id: None,
        }
    }

    /// Appends a part.
    pub fn push(&mut self, part: impl Into<MailItem>) {
        self.parts.push(part.into());
    }
}

/// A `multipart/alternative` container: the same content in
/// increasing-preference order (last part is the highest fidelity).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alternative {
    /// The alternatives, least preferred first.
    pub parts: Vec<MailItem>,
    /// Optional Content-ID for `cid:` references.
    pub content_id: Option<String>,
}

impl Alternative {
    /// Creates an alternative container from parts.
    #[must_use]
    pub fn new(parts: Vec<MailItem>) -> Self {
        Self {
            parts,
            content_id: None,
        }
    }

    /// Appends an alternative.
    pub fn push(&mut self, part: impl Into<MailItem>) {
        self.parts.push(part.into());
    }
}

/// A `multipart/related` container: a root part plus the parts it
/// references by `cid:` link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Related {
    /// The root part followed by the referenced parts.
    pub parts: Vec<MailItem>,
    /// Optional Content-ID for `cid:` references.
    pub content_id: Option<String>,
}

impl Related {
    /// Creates a related container from parts; the first is the root.
    #[must_use]
    pub fn new(parts: Vec<MailItem>) -> Self {
        Self {
            parts,
            content_id: None,
        }
    }

    /// Returns the root part (the first element).
    #[must_use]
    pub fn root(&self) -> Option<&MailItem> {
        self.parts.first()
    }

    /// Appends a referenced part.
    pub fn push(&mut self, part: impl Into<MailItem>) {
        self.parts.push(part.into());
    }
}

/// Any multipart container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Multipart {
    /// Independent parts.
    Mixed(Mixed),
    /// Content alternatives.
    Alternative(Alternative),
    /// A root part plus referenced parts.
    Related(Related),
}

impl Multipart {
    /// The container's MIME label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Mixed(_) => "multipart/mixed",
            Self::Alternative(_) => "multipart/alternative",
            Self::Related(_) => "multipart/related",
        }
    }

    /// The parts, in order.
    #[must_use]
    pub fn parts(&self) -> &[MailItem] {
        match self {
            Self::Mixed(m) => &m.parts,
            Self::Alternative(a) => &a.parts,
            Self::Related(r) => &r.parts,
        }
    }

    /// Checks whether the container has no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts().is_empty()
    }
}

/// A node in a structured email body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailItem {
    /// A plain-text body.
    Text(TextBody),
    /// An HTML body.
    Html(HtmlBody),
    /// An attachment.
    Attachment(Attachment),
    /// A multipart container.
    Multipart(Multipart),
}

impl MailItem {
    /// Creates a plain-text body item.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        TextBody::new(content).into()
    }

    /// Creates an HTML body item.
    #[must_use]
    pub fn html(content: impl Into<String>) -> Self {
        HtmlBody::new(content).into()
    }

    /// A short label for the node kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text body",
            Self::Html(_) => "HTML body",
            Self::Attachment(Attachment::Bytes(_)) => "bytes attachment",
            Self::Attachment(Attachment::Text(_)) => "text attachment",
            Self::Attachment(Attachment::Email(_)) => "email attachment",
            Self::Multipart(mp) => mp.label(),
        }
    }

    /// The node's Content-ID, if set.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        let id = match self {
            Self::Text(b) => &b.content_id,
            Self::Html(b) => &b.content_id,
            Self::Attachment(Attachment::Bytes(a)) => &a.content_id,
            Self::Attachment(Attachment::Text(a)) => &a.content_id,
            Self::Attachment(Attachment::Email(a)) => &a.content_id,
            Self::Multipart(Multipart::Mixed(m)) => &m.content_id,
            Self::Multipart(Multipart::Alternative(a)) => &a.content_id,
            Self::Multipart(Multipart::Related(r)) => &r.content_id,
        };
        id.as_deref()
    }

    /// Combines two items into a `multipart/mixed`.
    ///
    /// An operand that is already a `Mixed` contributes its parts rather
    /// than nesting, so chained `mix` calls build one flat container.
    /// Strings coerce to plain-text bodies.
    #[must_use]
    pub fn mix(self, other: impl Into<Self>) -> Self {
        let mut parts = match self {
            Self::Multipart(Multipart::Mixed(m)) => m.parts,
            item => vec![item],
        };
        match other.into() {
            Self::Multipart(Multipart::Mixed(m)) => parts.extend(m.parts),
            item => parts.push(item),
        }
        Mixed::new(parts).into()
    }

    /// Combines two items into a `multipart/alternative`, flattening
    /// `Alternative` operands the same way [`mix`](Self::mix) flattens
    /// `Mixed` ones. The right operand is the more preferred rendition.
    #[must_use]
    pub fn alternate(self, other: impl Into<Self>) -> Self {
        let mut parts = match self {
            Self::Multipart(Multipart::Alternative(a)) => a.parts,
            item => vec![item],
        };
        match other.into() {
            Self::Multipart(Multipart::Alternative(a)) => parts.extend(a.parts),
            item => parts.push(item),
        }
        Alternative::new(parts).into()
    }

    /// Combines two items into a `multipart/related`, flattening
    /// `Related` operands. The left operand (or its first part) becomes
    /// the root.
    #[must_use]
    pub fn relate(self, other: impl Into<Self>) -> Self {
        let mut parts = match self {
            Self::Multipart(Multipart::Related(r)) => r.parts,
            item => vec![item],
        };
        match other.into() {
            Self::Multipart(Multipart::Related(r)) => parts.extend(r.parts),
            item => parts.push(item),
        }
        Related::new(parts).into()
    }
}

impl From<TextBody> for MailItem {
    fn from(body: TextBody) -> Self {
        Self::Text(body)
    }
}

impl From<HtmlBody> for MailItem {
    fn from(body: HtmlBody) -> Self {
        Self::Html(body)
    }
}

impl From<Attachment> for MailItem {
    fn from(attachment: Attachment) -> Self {
        Self::Attachment(attachment)
    }
}

impl From<BytesAttachment> for MailItem {
    fn from(attachment: BytesAttachment) -> Self {
        Self::Attachment(Attachment::Bytes(attachment))
    }
}

impl From<TextAttachment> for MailItem {
    fn from(attachment: TextAttachment) -> Self {
        Self::Attachment(Attachment::Text(attachment))
    }
}

impl From<EmailAttachment> for MailItem {
    fn from(attachment: EmailAttachment) -> Self {
        Self::Attachment(Attachment::Email(attachment))
    }
}

impl From<Multipart> for MailItem {
    fn from(multipart: Multipart) -> Self {
        Self::Multipart(multipart)
    }
}

impl From<Mixed> for MailItem {
    fn from(mixed: Mixed) -> Self {
        Self::Multipart(Multipart::Mixed(mixed))
    }
}

impl From<Alternative> for MailItem {
    fn from(alternative: Alternative) -> Self {
        Self::Multipart(Multipart::Alternative(alternative))
    }
}

impl From<Related> for MailItem {
    fn from(related: Related) -> Self {
        Self::Multipart(Multipart::Related(related))
    }
}

impl From<&str> for MailItem {
    fn from(content: &str) -> Self {
        Self::text(content)
    }
}

impl From<String> for MailItem {
    fn from(content: String) -> Self {
        Self::text(content)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mix_two_leaves() {
        let combined = MailItem::text("a").mix(MailItem::html("<p>b</p>"));
        assert_eq!(
            combined,
            Mixed::new(vec![MailItem::text("a"), MailItem::html("<p>b</p>")]).into()
        );
    }

    #[test]
    fn test_mix_flattens_associatively() {
        let left = MailItem::text("a").mix(MailItem::text("b")).mix(MailItem::text("c"));
        let right = MailItem::text("a").mix(MailItem::text("b").mix(MailItem::text("c")));
        let expected: MailItem = Mixed::new(vec![
            MailItem::text("a"),
            MailItem::text("b"),
            MailItem::text("c"),
        ])
        .into();
        assert_eq!(left, expected);
        assert_eq!(right, expected);
    }

    #[test]
    fn test_alternate_flattens() {
        let alt = MailItem::text("a")
            .alternate(MailItem::text("b"))
            .alternate(MailItem::html("<p>c</p>"));
        assert_eq!(
            alt,
            Alternative::new(vec![
                MailItem::text("a"),
                MailItem::text("b"),
                MailItem::html("<p>c</p>"),
            ])
            .into()
        );
    }

    #[test]
    fn test_flattening_never_crosses_kinds() {
        let mixed = MailItem::text("a").mix(MailItem::text("b"));
        let alt = mixed.clone().alternate(MailItem::html("<p>c</p>"));
        // The Mixed stays intact as a single alternative part
        assert_eq!(
            alt,
            Alternative::new(vec![mixed, MailItem::html("<p>c</p>")]).into()
        );
    }

    #[test]
    fn test_string_coercion() {
        let coerced = MailItem::from("hello").alternate(MailItem::html("<p>hi</p>"));
        let explicit = MailItem::text("hello").alternate(MailItem::html("<p>hi</p>"));
        assert_eq!(coerced, explicit);

        let via_operand = MailItem::html("<p>hi</p>").mix("plain tail");
        assert_eq!(
            via_operand,
            Mixed::new(vec![MailItem::html("<p>hi</p>"), MailItem::text("plain tail")]).into()
        );
    }

    #[test]
    fn test_relate_root_is_first() {
        let related = MailItem::html("<img src=\"cid:i\">")
            .relate(BytesAttachment::new(vec![1], "i.png").with_content_id("<i>"));
        let MailItem::Multipart(Multipart::Related(related)) = related else {
            panic!("expected related");
        };
        assert_eq!(related.root(), Some(&MailItem::html("<img src=\"cid:i\">")));
        assert_eq!(related.parts.len(), 2);
    }

    #[test]
    fn test_text_attachment_rejects_non_text_type() {
        let result = TextAttachment::new("x,y\n", "data.csv")
            .with_content_type(ContentType::octet_stream());
        assert!(matches!(result, Err(ComposeError::NotText(_))));
    }

    #[test]
    fn test_text_attachment_accepts_text_type() {
        let attachment = TextAttachment::new("x,y\n", "data.csv")
            .with_content_type(ContentType::new("text", "csv"))
            .unwrap();
        assert_eq!(attachment.content_type.essence(), "text/csv");
    }

    #[test]
    fn test_multipart_push() {
        let mut mixed = Mixed::new(vec![MailItem::text("a")]);
        mixed.push("b");
        assert_eq!(mixed.parts.len(), 2);
        assert_eq!(mixed.parts[1], MailItem::text("b"));
    }

    #[test]
    fn test_content_id_accessor() {
        let item: MailItem = TextBody::new("x").with_content_id("<cid1>").into();
        assert_eq!(item.content_id(), Some("<cid1>"));
        assert_eq!(MailItem::text("x").content_id(), None);
    }

    fn leaf_strategy() -> impl Strategy<Value = MailItem> {
        prop_oneof![
            "[a-z]{1,8}".prop_map(|s: String| MailItem::text(s)),
            "[a-z]{1,8}".prop_map(|s: String| MailItem::html(format!("<p>{s}</p>"))),
        ]
    }

    proptest! {
        #[test]
        fn prop_mix_is_associative(items in proptest::collection::vec(leaf_strategy(), 3..6)) {
            let mut left = items[0].clone();
            for item in &items[1..] {
                left = left.mix(item.clone());
            }
            let mut tail = items[items.len() - 2].clone().mix(items[items.len() - 1].clone());
            for item in items[..items.len() - 2].iter().rev() {
                tail = item.clone().mix(tail);
            }
            prop_assert_eq!(left, tail);
        }
    }
}
