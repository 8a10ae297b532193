//! The compose engine: rendering a [`MailItem`] tree plus envelope
//! fields into a wire-level [`Message`].

use crate::error::ComposeError;
use crate::item::{Attachment, MailItem, Multipart};
use crate::util::format_addresses;
use chrono::{DateTime, FixedOffset};
use eletter_mime::{Address, AddressOrGroup, ContentType, Headers, Message, escape_quoted};
use std::fmt::Write as _;

/// Envelope fields for a composed message.
///
/// Address fields accept any number of addresses or groups; leaving one
/// empty omits the corresponding header entirely. Extra headers are
/// emitted one line per value, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    /// The Subject line, if any.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<AddressOrGroup>,
    /// To addresses.
    pub to: Vec<AddressOrGroup>,
    /// Cc addresses.
    pub cc: Vec<AddressOrGroup>,
    /// Bcc addresses.
    pub bcc: Vec<AddressOrGroup>,
    /// Reply-To addresses.
    pub reply_to: Vec<AddressOrGroup>,
    /// The Sender address. Always a single address, never a group.
    pub sender: Option<Address>,
    /// The Date header value.
    pub date: Option<DateTime<FixedOffset>>,
    /// Additional headers.
    pub headers: Headers,
}

impl Envelope {
    /// Creates an empty envelope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Adds a From address.
    #[must_use]
    pub fn from_addr(mut self, address: impl Into<AddressOrGroup>) -> Self {
        self.from.push(address.into());
        self
    }

    /// Adds a To address.
    #[must_use]
    pub fn to(mut self, address: impl Into<AddressOrGroup>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Adds a Cc address.
    #[must_use]
    pub fn cc(mut self, address: impl Into<AddressOrGroup>) -> Self {
        self.cc.push(address.into());
        self
    }

    /// Adds a Bcc address.
    #[must_use]
    pub fn bcc(mut self, address: impl Into<AddressOrGroup>) -> Self {
        self.bcc.push(address.into());
        self
    }

    /// Adds a Reply-To address.
    #[must_use]
    pub fn reply_to(mut self, address: impl Into<AddressOrGroup>) -> Self {
        self.reply_to.push(address.into());
        self
    }

    /// Sets the Sender address.
    #[must_use]
    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Sets the Date header.
    #[must_use]
    pub fn date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }

    /// Adds an extra header line.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }
}

impl MailItem {
    /// Renders this item as a message body part, without envelope
    /// headers.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree contains an empty multipart
    /// container or a text attachment whose content type is not
    /// `text/*`.
    pub fn render(&self) -> Result<Message, ComposeError> {
        match self {
            Self::Text(body) => {
                let mut message = Message::text(body.content.clone(), &ContentType::text_plain());
                apply_content_id(&mut message, body.content_id.as_deref());
                Ok(message)
            }
            Self::Html(body) => {
                let mut message = Message::text(body.content.clone(), &ContentType::text_html());
                apply_content_id(&mut message, body.content_id.as_deref());
                Ok(message)
            }
            Self::Attachment(Attachment::Text(attachment)) => {
                if !attachment.content_type.is_text() {
                    return Err(ComposeError::NotText(attachment.content_type.essence()));
                }
                let mut content_type = attachment.content_type.clone();
                if content_type.charset().is_none() {
                    content_type = content_type.with_parameter("charset", "utf-8");
                }
                let mut message = Message::text(attachment.content.clone(), &content_type);
                apply_disposition(&mut message, attachment.inline, attachment.filename.as_deref());
                apply_content_id(&mut message, attachment.content_id.as_deref());
                Ok(message)
            }
            Self::Attachment(Attachment::Bytes(attachment)) => {
                let mut message =
                    Message::binary(attachment.content.clone(), &attachment.content_type);
                apply_disposition(&mut message, attachment.inline, attachment.filename.as_deref());
                apply_content_id(&mut message, attachment.content_id.as_deref());
                Ok(message)
            }
            Self::Attachment(Attachment::Email(attachment)) => {
                let mut message = Message::rfc822(attachment.content.clone());
                apply_disposition(&mut message, attachment.inline, attachment.filename.as_deref());
                apply_content_id(&mut message, attachment.content_id.as_deref());
                Ok(message)
            }
            Self::Multipart(multipart) => {
                if multipart.is_empty() {
                    return Err(ComposeError::EmptyMultipart(multipart.label()));
                }
                let content_type = match multipart {
                    Multipart::Mixed(_) => ContentType::multipart_mixed(),
                    Multipart::Alternative(_) => ContentType::multipart_alternative(),
                    Multipart::Related(_) => ContentType::multipart_related(),
                };
                let children = multipart
                    .parts()
                    .iter()
                    .map(Self::render)
                    .collect::<Result<Vec<_>, _>>()?;
                let mut message = Message::multipart(&content_type, children);
                apply_content_id(&mut message, self.content_id());
                Ok(message)
            }
        }
    }

    /// Composes this item into a complete message with the given
    /// envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering the body fails; see
    /// [`render`](Self::render).
    pub fn compose(&self, envelope: &Envelope) -> Result<Message, ComposeError> {
        tracing::debug!(kind = self.kind(), "composing message");
        let mut message = self.render()?;
        if let Some(subject) = &envelope.subject {
            message.headers.set("subject", subject);
        }
        set_address_header(&mut message, "from", &envelope.from);
        set_address_header(&mut message, "to", &envelope.to);
        set_address_header(&mut message, "cc", &envelope.cc);
        set_address_header(&mut message, "bcc", &envelope.bcc);
        set_address_header(&mut message, "reply-to", &envelope.reply_to);
        if let Some(sender) = &envelope.sender {
            message.headers.set("sender", sender.to_string());
        }
        if let Some(date) = envelope.date {
            message.headers.set("date", date.to_rfc2822());
        }
        for (name, value) in envelope.headers.iter() {
            message.headers.add(name, value);
        }
        Ok(message)
    }
}

/// Composes a message from a text and/or HTML body plus attachments.
///
/// The bodies become a single part or a `multipart/alternative` pair,
/// and each attachment is mixed in after them.
///
/// # Errors
///
/// Returns [`ComposeError::NoBodyContent`] if both bodies are `None`.
pub fn compose(
    text: Option<&str>,
    html: Option<&str>,
    attachments: impl IntoIterator<Item = Attachment>,
    envelope: &Envelope,
) -> Result<Message, ComposeError> {
    let mut item = match (text, html) {
        (None, None) => return Err(ComposeError::NoBodyContent),
        (Some(text), None) => MailItem::text(text),
        (None, Some(html)) => MailItem::html(html),
        (Some(text), Some(html)) => MailItem::text(text).alternate(MailItem::html(html)),
    };
    for attachment in attachments {
        item = item.mix(attachment);
    }
    item.compose(envelope)
}

fn set_address_header(message: &mut Message, name: &str, addresses: &[AddressOrGroup]) {
    if !addresses.is_empty() {
        message.headers.set(name, format_addresses(addresses));
    }
}

fn apply_content_id(message: &mut Message, content_id: Option<&str>) {
    if let Some(id) = content_id {
        let value = if id.starts_with('<') {
            id.to_string()
        } else {
            format!("<{id}>")
        };
        message.headers.set("content-id", value);
    }
}

fn apply_disposition(message: &mut Message, inline: bool, filename: Option<&str>) {
    let mut value = String::from(if inline { "inline" } else { "attachment" });
    if let Some(name) = filename {
        let _ = write!(value, "; filename=\"{}\"", escape_quoted(name));
    }
    message.headers.set("content-disposition", value);
}
