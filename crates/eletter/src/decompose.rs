//! The decompose engine: recovering a typed [`MailItem`] tree and
//! envelope fields from an arbitrary received [`Message`].

use crate::compose::Envelope;
use crate::error::{ComposeError, DecomposeError, SimplifyError};
use crate::item::{
    Alternative, BytesAttachment, EmailAttachment, HtmlBody, MailItem, Mixed, Related,
    TextAttachment, TextBody,
};
use crate::simplify::{SimpleEletter, SimplifyOptions, simplify_eletter};
use chrono::{DateTime, FixedOffset};
use eletter_mime::{Address, AddressOrGroup, Body, Headers, Message, parse_address_list};

/// Headers with structural meaning; everything else is preserved in
/// [`Eletter::headers`]. Encoding-specific headers are discarded.
const STANDARD_HEADERS: &[&str] = &[
    "subject",
    "from",
    "to",
    "cc",
    "bcc",
    "reply-to",
    "sender",
    "date",
    "content-type",
    "content-id",
    "content-disposition",
    "content-transfer-encoding",
    "mime-version",
];

/// A decomposed email message: a typed body tree plus envelope fields.
///
/// Produced by [`decompose`]; freely mutable afterwards, and
/// re-renderable with [`Eletter::compose`].
#[derive(Debug, Clone, PartialEq)]
pub struct Eletter {
    /// The message body tree.
    pub content: MailItem,
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
    /// The Sender address, if any.
    pub sender: Option<Address>,
    /// The Date header, if present and parseable.
    pub date: Option<DateTime<FixedOffset>>,
    /// All other headers, verbatim, one entry per physical line.
    /// Names are lowercase.
    pub headers: Headers,
}

impl Eletter {
    /// Re-renders the decomposed message from its stored fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the content tree fails to render; see
    /// [`MailItem::render`].
    pub fn compose(&self) -> Result<Message, ComposeError> {
        self.content.compose(&self.envelope())
    }

    /// Reduces the message to a text body, HTML body, and attachment
    /// list.
    ///
    /// A `multipart/mixed` body simplifies only when every attachment
    /// comes after all body parts; pass `unmix = true` to pull
    /// interleaved attachments out of the body (lossy — their positions
    /// are not recorded).
    ///
    /// # Errors
    ///
    /// Returns an error if the tree shape does not reduce; interleaved
    /// attachments without `unmix` report
    /// [`SimplifyError::MixedContent`].
    pub fn simplify(self, unmix: bool) -> Result<SimpleEletter, SimplifyError> {
        self.simplify_with(&SimplifyOptions {
            unmix,
            ..SimplifyOptions::default()
        })
    }

    /// Like [`simplify`](Self::simplify), with full control of the
    /// unmix fragment-joining policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree shape does not reduce.
    pub fn simplify_with(self, options: &SimplifyOptions) -> Result<SimpleEletter, SimplifyError> {
        simplify_eletter(self, options)
    }

    pub(crate) fn envelope(&self) -> Envelope {
        Envelope {
            subject: self.subject.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            cc: self.cc.clone(),
            bcc: self.bcc.clone(),
            reply_to: self.reply_to.clone(),
            sender: self.sender.clone(),
            date: self.date,
            headers: self.headers.clone(),
        }
    }
}

/// Decomposes a message into an [`Eletter`].
///
/// Only content-type trees expressible as [`MailItem`]s are supported:
/// `multipart/mixed`, `multipart/alternative`, `multipart/related`,
/// `message/rfc822`, `text/*`, and arbitrary leaf types (which become
/// byte attachments). Leaves without a filename or an explicit
/// "attachment" disposition are treated as inline.
///
/// # Errors
///
/// Returns an error for any other `multipart/*` or `message/*` subtype,
/// naming the offending content type and its position in the tree.
pub fn decompose(message: &Message) -> Result<Eletter, DecomposeError> {
    tracing::debug!(
        content_type = %message.content_type().essence(),
        "decomposing message"
    );
    let content = decompose_content(message, &mut Vec::new())?;
    Ok(Eletter {
        content,
        subject: message.subject().map(String::from),
        from: address_list(message, "from"),
        to: address_list(message, "to"),
        cc: address_list(message, "cc"),
        bcc: address_list(message, "bcc"),
        reply_to: address_list(message, "reply-to"),
        sender: sender(message)?,
        date: date(message),
        headers: extra_headers(message),
    })
}

fn decompose_content(
    message: &Message,
    path: &mut Vec<usize>,
) -> Result<MailItem, DecomposeError> {
    let content_type = message.content_type();
    let filename = message.filename();
    let mut disposition = message.disposition();
    if filename.is_some() && disposition.is_none() {
        disposition = Some("attachment".to_string());
    }
    let is_attachment = disposition.as_deref() == Some("attachment");
    let content_id = message.headers.get("content-id").map(String::from);

    if content_type.is_multipart() {
        if !matches!(
            content_type.sub_type.as_str(),
            "mixed" | "alternative" | "related"
        ) {
            return Err(unsupported(&content_type, path));
        }
        let Body::Multipart(children) = &message.body else {
            return Err(malformed(path, "multipart content type without child parts"));
        };
        let mut parts = Vec::with_capacity(children.len());
        for (index, child) in children.iter().enumerate() {
            path.push(index);
            parts.push(decompose_content(child, path)?);
            path.pop();
        }
        let item = match content_type.sub_type.as_str() {
            "mixed" => Mixed { parts, content_id }.into(),
            "alternative" => Alternative { parts, content_id }.into(),
            _ => Related { parts, content_id }.into(),
        };
        return Ok(item);
    }

    if content_type.is_message() {
        if content_type.sub_type != "rfc822" {
            return Err(unsupported(&content_type, path));
        }
        let Body::Rfc822(inner) = &message.body else {
            return Err(malformed(path, "message/rfc822 without an embedded message"));
        };
        return Ok(EmailAttachment {
            content: (**inner).clone(),
            filename,
            inline: !is_attachment,
            content_id,
        }
        .into());
    }

    if content_type.is_text() {
        let content = match &message.body {
            Body::Text(text) => text.clone(),
            Body::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            _ => return Err(malformed(path, "text content type with a non-leaf body")),
        };
        let is_body_subtype = matches!(content_type.sub_type.as_str(), "plain" | "html");
        if filename.is_some() || is_attachment || !is_body_subtype {
            // Encoding detail, not content: drop the charset
            return Ok(TextAttachment {
                content,
                filename,
                content_type: content_type.without_parameter("charset"),
                inline: !is_attachment,
                content_id,
            }
            .into());
        }
        if content_type.sub_type == "plain" {
            return Ok(MailItem::Text(TextBody { content, content_id }));
        }
        return Ok(MailItem::Html(HtmlBody { content, content_id }));
    }

    let content = match &message.body {
        Body::Binary(bytes) => bytes.clone(),
        Body::Text(text) => text.clone().into_bytes(),
        _ => return Err(malformed(path, "leaf content type with a non-leaf body")),
    };
    Ok(BytesAttachment {
        content,
        filename,
        content_type,
        inline: !is_attachment,
        content_id,
    }
    .into())
}

/// Decomposes and simplifies a message in one step.
///
/// # Errors
///
/// Returns a [`DecomposeError`](crate::DecomposeError) or
/// [`SimplifyError`] wrapped in [`crate::Error`].
pub fn decompose_simple(message: &Message, unmix: bool) -> Result<SimpleEletter, crate::Error> {
    let eletter = decompose(message)?;
    Ok(eletter.simplify(unmix)?)
}

fn unsupported(content_type: &eletter_mime::ContentType, path: &[usize]) -> DecomposeError {
    DecomposeError::UnsupportedContentType {
        content_type: content_type.essence(),
        path: path_string(path),
    }
}

fn malformed(path: &[usize], reason: &str) -> DecomposeError {
    DecomposeError::MalformedPart {
        path: path_string(path),
        reason: reason.to_string(),
    }
}

fn path_string(path: &[usize]) -> String {
    if path.is_empty() {
        "root".to_string()
    } else {
        path.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn address_list(message: &Message, name: &str) -> Vec<AddressOrGroup> {
    message
        .headers
        .get_all(name)
        .into_iter()
        .flat_map(parse_address_list)
        .collect()
}

fn sender(message: &Message) -> Result<Option<Address>, DecomposeError> {
    let Some(value) = message.headers.get("sender") else {
        return Ok(None);
    };
    match parse_address_list(value).into_iter().next() {
        Some(AddressOrGroup::Address(address)) => Ok(Some(address)),
        Some(AddressOrGroup::Group(_)) => Err(DecomposeError::GroupSender),
        None => Ok(None),
    }
}

fn date(message: &Message) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(message.date()?.trim()).ok()
}

fn extra_headers(message: &Message) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in message.headers.iter() {
        if !STANDARD_HEADERS.contains(&name) {
            headers.add(name, value);
        }
    }
    headers
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::compose::compose;
    use crate::item::Attachment;
    use eletter_mime::{ContentType, Group};

    fn envelope() -> Envelope {
        Envelope::new()
            .subject("To: Everyone")
            .from_addr(Address::new("Mme E.", "me@here.com"))
            .to("you@there.net")
            .to(Address::new("Thaddeus Hem", "them@hither.yon"))
    }

    #[test]
    fn test_round_trip_text_message() {
        let message = compose(
            Some("Meeting tonight!  Bring pizza.\n"),
            None,
            [],
            &envelope(),
        )
        .unwrap();
        let eletter = decompose(&message).unwrap();
        assert_eq!(
            eletter.content,
            MailItem::text("Meeting tonight!  Bring pizza.\n")
        );
        assert_eq!(eletter.subject.as_deref(), Some("To: Everyone"));
        assert_eq!(
            eletter.from,
            vec![Address::new("Mme E.", "me@here.com").into()]
        );
        assert_eq!(
            eletter.to,
            vec![
                Address::bare("you@there.net").into(),
                Address::new("Thaddeus Hem", "them@hither.yon").into(),
            ]
        );
        assert!(eletter.cc.is_empty());
        assert!(eletter.sender.is_none());
        assert!(eletter.date.is_none());
        assert!(eletter.headers.is_empty());
    }

    #[test]
    fn test_round_trip_tree() {
        let tree = MailItem::text("Hi\n")
            .alternate(MailItem::html("<p>Hi</p>\n"))
            .mix(BytesAttachment::new(vec![1, 2, 3], "blob.bin"));
        let message = tree.compose(&envelope()).unwrap();
        let eletter = decompose(&message).unwrap();
        assert_eq!(eletter.content, tree);
    }

    #[test]
    fn test_round_trip_related_with_cid() {
        let tree = MailItem::html("<img src=\"cid:cat@example.nil\">\n").relate(
            BytesAttachment::new(vec![9, 9], "cat.png")
                .with_content_type(ContentType::new("image", "png"))
                .inline(true)
                .with_content_id("<cat@example.nil>"),
        );
        let message = tree.compose(&envelope()).unwrap();
        let eletter = decompose(&message).unwrap();
        assert_eq!(eletter.content, tree);
    }

    #[test]
    fn test_round_trip_email_attachment() {
        let inner = compose(Some("inner\n"), None, [], &envelope()).unwrap();
        let tree = MailItem::text("See attached mail.\n")
            .mix(EmailAttachment::new(inner, "fwd.eml"));
        let message = tree.compose(&envelope()).unwrap();
        let eletter = decompose(&message).unwrap();
        assert_eq!(eletter.content, tree);
    }

    #[test]
    fn test_round_trip_envelope_extras() {
        use chrono::TimeZone;
        let date = FixedOffset::east_opt(-5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2021, 3, 10, 12, 0, 0)
            .unwrap();
        let envelope = envelope()
            .cc(Group::new("friends", vec![Address::bare("a@b.c")]))
            .sender(Address::bare("steven.ender@big.senders"))
            .date(date)
            .header("Message-ID", "<testabcd.1234@silly.example>")
            .header("Received", "hop one")
            .header("Received", "hop two");
        let message = compose(Some("x\n"), None, [], &envelope).unwrap();
        let eletter = decompose(&message).unwrap();
        assert_eq!(
            eletter.cc,
            vec![AddressOrGroup::Group(Group::new(
                "friends",
                vec![Address::bare("a@b.c")]
            ))]
        );
        assert_eq!(
            eletter.sender,
            Some(Address::bare("steven.ender@big.senders"))
        );
        assert_eq!(eletter.date, Some(date));
        assert_eq!(
            eletter.headers.get_all("message-id"),
            vec!["<testabcd.1234@silly.example>"]
        );
        assert_eq!(eletter.headers.get_all("received"), vec!["hop one", "hop two"]);
    }

    #[test]
    fn test_unsupported_multipart_subtype() {
        let message = Message::multipart(
            &ContentType::new("multipart", "parallel"),
            vec![Message::text("x", &ContentType::text_plain())],
        );
        let error = decompose(&message).unwrap_err();
        assert!(matches!(
            error,
            DecomposeError::UnsupportedContentType { ref content_type, ref path }
                if content_type == "multipart/parallel" && path == "root"
        ));
    }

    #[test]
    fn test_unsupported_nested_reports_path() {
        let bad = Message::multipart(
            &ContentType::new("multipart", "digest"),
            vec![Message::text("x", &ContentType::text_plain())],
        );
        let message = Message::multipart(
            &ContentType::multipart_mixed(),
            vec![Message::text("ok", &ContentType::text_plain()), bad],
        );
        let error = decompose(&message).unwrap_err();
        assert!(matches!(
            error,
            DecomposeError::UnsupportedContentType { ref path, .. } if path == "1"
        ));
    }

    #[test]
    fn test_unsupported_message_subtype() {
        let inner = Message::text("x", &ContentType::text_plain());
        let mut message = Message::rfc822(inner);
        message
            .headers
            .set("content-type", "message/partial; id=1");
        assert!(decompose(&message).is_err());
    }

    #[test]
    fn test_text_with_filename_is_attachment() {
        let mut part = Message::text("a,b\n", &ContentType::new("text", "csv"));
        part.headers
            .set("content-disposition", "attachment; filename=\"t.csv\"");
        let eletter = decompose(&part).unwrap();
        assert_eq!(
            eletter.content,
            TextAttachment {
                content: "a,b\n".into(),
                filename: Some("t.csv".into()),
                content_type: ContentType::new("text", "csv"),
                inline: false,
                content_id: None,
            }
            .into()
        );
    }

    #[test]
    fn test_unknown_leaf_without_disposition_is_inline() {
        let part = Message::binary(vec![7], &ContentType::new("image", "png"));
        let eletter = decompose(&part).unwrap();
        let MailItem::Attachment(Attachment::Bytes(attachment)) = eletter.content else {
            panic!("expected bytes attachment");
        };
        assert!(attachment.inline);
        assert!(attachment.filename.is_none());
    }

    #[test]
    fn test_group_sender_rejected() {
        let mut message = Message::text("x", &ContentType::text_plain());
        message.headers.set("sender", "board: a@b.c, d@e.f;");
        assert!(matches!(
            decompose(&message),
            Err(DecomposeError::GroupSender)
        ));
    }

    #[test]
    fn test_recompose_round_trip() {
        let tree = MailItem::text("body\n").mix(BytesAttachment::new(vec![1], "a.bin"));
        let message = tree.compose(&envelope()).unwrap();
        let recomposed = decompose(&message).unwrap().compose().unwrap();
        assert_eq!(decompose(&recomposed).unwrap(), decompose(&message).unwrap());
    }
}
