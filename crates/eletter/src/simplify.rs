//! The simplify engine: reducing a decomposed message to a flat
//! text + HTML + attachments record.
//!
//! Only a constrained family of tree shapes reduces losslessly; anything
//! else fails with a [`SimplifyError`] naming the obstacle. Interleaved
//! attachments are the one recoverable case, behind the `unmix` flag.

use crate::compose::{Envelope, compose};
use crate::error::{ComposeError, SimplifyError};
use crate::item::{Alternative, Attachment, MailItem, Mixed, Multipart, Related};
use chrono::{DateTime, FixedOffset};
use eletter_mime::{Address, AddressOrGroup, Headers, Message};

/// How unmixing joins same-type body fragments that were separated by
/// attachments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FragmentJoin {
    /// Ensure a single newline between fragments.
    #[default]
    Newline,
    /// Insert a blank line between fragments.
    BlankLine,
}

/// Policy knobs for [`Eletter::simplify_with`](crate::Eletter::simplify_with).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimplifyOptions {
    /// Collect attachments interleaved with body parts instead of
    /// failing. Lossy: the attachments' positions within the body are
    /// not recorded.
    pub unmix: bool,
    /// Fragment-joining policy used when unmixing concatenates body
    /// fragments.
    pub join: FragmentJoin,
}

/// A decomposed and flattened email message.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleEletter {
    /// The plain-text body, if any.
    pub text: Option<String>,
    /// The HTML body, if any.
    pub html: Option<String>,
    /// Attachments, in order.
    pub attachments: Vec<Attachment>,
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
    /// All other headers, verbatim. Names are lowercase.
    pub headers: Headers,
}

impl SimpleEletter {
    /// Re-renders the simplified message from its stored fields.
    ///
    /// # Errors
    ///
    /// Returns an error if both bodies are `None` or an attachment
    /// fails to render.
    pub fn compose(&self) -> Result<Message, ComposeError> {
        compose(
            self.text.as_deref(),
            self.html.as_deref(),
            self.attachments.iter().cloned(),
            &Envelope {
                subject: self.subject.clone(),
                from: self.from.clone(),
                to: self.to.clone(),
                cc: self.cc.clone(),
                bcc: self.bcc.clone(),
                reply_to: self.reply_to.clone(),
                sender: self.sender.clone(),
                date: self.date,
                headers: self.headers.clone(),
            },
        )
    }
}

/// Normalizes a tree for shape checks: nested `Mixed`/`Alternative`
/// containers splice into a same-kind parent (`Related` never does),
/// empty containers vanish, and single-part containers unwrap — all
/// recursively, bottom-up.
#[must_use]
pub fn smooth(item: MailItem) -> MailItem {
    let MailItem::Multipart(multipart) = item else {
        return item;
    };
    let (kind, parts) = match multipart {
        Multipart::Mixed(m) => (Kind::Mixed, m.parts),
        Multipart::Alternative(a) => (Kind::Alternative, a.parts),
        Multipart::Related(r) => (Kind::Related, r.parts),
    };
    let mut out = Vec::new();
    for part in parts {
        match smooth(part) {
            MailItem::Multipart(Multipart::Mixed(m)) if kind == Kind::Mixed => {
                out.extend(m.parts);
            }
            MailItem::Multipart(Multipart::Alternative(a)) if kind == Kind::Alternative => {
                out.extend(a.parts);
            }
            MailItem::Multipart(mp) if mp.is_empty() => {}
            part => out.push(part),
        }
    }
    if out.len() == 1 {
        return out.remove(0);
    }
    match kind {
        Kind::Mixed => Mixed::new(out).into(),
        Kind::Alternative => Alternative::new(out).into(),
        Kind::Related => Related::new(out).into(),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Mixed,
    Alternative,
    Related,
}

type Reduction = (Option<String>, Option<String>, Vec<Attachment>);

pub(crate) fn simplify_eletter(
    eletter: crate::Eletter,
    options: &SimplifyOptions,
) -> Result<SimpleEletter, SimplifyError> {
    tracing::debug!(unmix = options.unmix, "simplifying decomposed message");
    let crate::Eletter {
        content,
        subject,
        from,
        to,
        cc,
        bcc,
        reply_to,
        sender,
        date,
        headers,
    } = eletter;
    let (text, html, attachments) = match smooth(content) {
        MailItem::Multipart(Multipart::Related(related)) => simplify_related(related)?,
        other => simplify_part(other, options)?,
    };
    if text.is_none() && html.is_none() {
        return Err(SimplifyError::NoBodies);
    }
    Ok(SimpleEletter {
        text,
        html,
        attachments,
        subject,
        from,
        to,
        cc,
        bcc,
        reply_to,
        sender,
        date,
        headers,
    })
}

fn simplify_part(item: MailItem, options: &SimplifyOptions) -> Result<Reduction, SimplifyError> {
    match item {
        MailItem::Text(body) => Ok((Some(body.content), None, Vec::new())),
        MailItem::Html(body) => Ok((None, Some(body.content), Vec::new())),
        MailItem::Attachment(_) => Err(SimplifyError::AttachmentOnly),
        MailItem::Multipart(Multipart::Alternative(alternative)) => {
            simplify_alternative(alternative, options)
        }
        MailItem::Multipart(Multipart::Related(_)) => Err(SimplifyError::Related),
        MailItem::Multipart(Multipart::Mixed(mixed)) => simplify_mixed(mixed, options),
    }
}

fn simplify_mixed(mixed: Mixed, options: &SimplifyOptions) -> Result<Reduction, SimplifyError> {
    let mut text: Option<String> = None;
    let mut html: Option<String> = None;
    let mut attachments: Vec<Attachment> = Vec::new();
    for part in mixed.parts {
        match part {
            MailItem::Text(body) => {
                if !attachments.is_empty() && !options.unmix {
                    return Err(SimplifyError::MixedContent);
                }
                if html.is_some() {
                    return Err(SimplifyError::TextAfterHtml);
                }
                append_fragment(&mut text, &body.content, options.join);
            }
            MailItem::Html(body) => {
                if !attachments.is_empty() && !options.unmix {
                    return Err(SimplifyError::MixedContent);
                }
                if text.is_some() {
                    return Err(SimplifyError::HtmlAfterText);
                }
                append_fragment(&mut html, &body.content, options.join);
            }
            MailItem::Multipart(Multipart::Alternative(alternative)) => {
                let (text_part, html_part) = alternative_bodies(alternative)?;
                if !attachments.is_empty() && !options.unmix {
                    return Err(SimplifyError::MixedContent);
                }
                // Only acceptable when the body prefix so far carries
                // both flavors or neither
                if text.is_some() != html.is_some() {
                    return Err(SimplifyError::AlternativeAfterBody);
                }
                append_fragment(&mut text, &text_part, options.join);
                append_fragment(&mut html, &html_part, options.join);
            }
            MailItem::Multipart(Multipart::Related(_)) => return Err(SimplifyError::Related),
            MailItem::Multipart(Multipart::Mixed(_)) => return Err(SimplifyError::NestedMixed),
            MailItem::Attachment(attachment) => attachments.push(attachment),
        }
    }
    Ok((text, html, attachments))
}

fn simplify_alternative(
    alternative: Alternative,
    options: &SimplifyOptions,
) -> Result<Reduction, SimplifyError> {
    let mut text: Option<String> = None;
    let mut html: Option<String> = None;
    let mut attachments: Vec<Attachment> = Vec::new();
    for part in alternative.parts {
        let (part_text, part_html, part_attachments) = simplify_part(part, options)?;
        match (part_text, part_html) {
            (Some(t), None) => {
                if text.is_some() {
                    return Err(SimplifyError::DuplicateText);
                }
                text = Some(t);
            }
            (None, Some(h)) => {
                if html.is_some() {
                    return Err(SimplifyError::DuplicateHtml);
                }
                html = Some(h);
            }
            (None, None) => return Err(SimplifyError::BodylessAlternative),
            (Some(_), Some(_)) => return Err(SimplifyError::AmbiguousAlternative),
        }
        for attachment in part_attachments {
            if !attachments.contains(&attachment) {
                attachments.push(attachment);
            }
        }
    }
    Ok((text, html, attachments))
}

/// Requires a two-part alternative of exactly one plain and one HTML
/// body, in either order; returns `(text, html)`.
fn alternative_bodies(alternative: Alternative) -> Result<(String, String), SimplifyError> {
    if alternative.parts.len() == 2 {
        let mut parts = alternative.parts.into_iter();
        match (parts.next(), parts.next()) {
            (Some(MailItem::Text(text)), Some(MailItem::Html(html))) => {
                return Ok((text.content, html.content));
            }
            (Some(MailItem::Html(html)), Some(MailItem::Text(text))) => {
                return Ok((text.content, html.content));
            }
            _ => {}
        }
    }
    Err(SimplifyError::MalformedAlternative)
}

/// A related container reduces only to a text-or-HTML root plus exactly
/// one referenced attachment.
fn simplify_related(related: Related) -> Result<Reduction, SimplifyError> {
    if related.parts.len() != 2 {
        return Err(SimplifyError::Related);
    }
    let mut parts = related.parts.into_iter();
    match (parts.next(), parts.next()) {
        (Some(MailItem::Text(body)), Some(MailItem::Attachment(attachment))) => {
            Ok((Some(body.content), None, vec![attachment]))
        }
        (Some(MailItem::Html(body)), Some(MailItem::Attachment(attachment))) => {
            Ok((None, Some(body.content), vec![attachment]))
        }
        _ => Err(SimplifyError::Related),
    }
}

fn append_fragment(slot: &mut Option<String>, fragment: &str, join: FragmentJoin) {
    match slot {
        None => *slot = Some(fragment.to_string()),
        Some(existing) => {
            if !existing.ends_with('\n') {
                existing.push('\n');
            }
            if join == FragmentJoin::BlankLine {
                existing.push('\n');
            }
            existing.push_str(fragment);
        }
    }
}
