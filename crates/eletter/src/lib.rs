//! # eletter
//!
//! Compose and decompose structured email messages as typed trees.
//!
//! A message body is a [`MailItem`]: a plain or HTML text body, a binary,
//! textual, or embedded-message attachment, or one of three multipart
//! containers (`Mixed`, `Alternative`, `Related`). Trees are built with
//! the [`mix`](MailItem::mix), [`alternate`](MailItem::alternate), and
//! [`relate`](MailItem::relate) combinators, composed into a wire-level
//! [`Message`] together with an [`Envelope`], and recovered from received
//! messages with [`decompose`] — or flattened all the way down to
//! `{text, html, attachments}` with [`decompose_simple`].
//!
//! ## Composing
//!
//! ```
//! use eletter::{Address, BytesAttachment, Envelope, MailItem};
//!
//! let body = MailItem::text("Hi!  See the attached cat.\n")
//!     .alternate(MailItem::html("<p>Hi!  See the attached cat.</p>\n"))
//!     .mix(BytesAttachment::new(vec![0x89, 0x50], "cat.png"));
//!
//! let message = body.compose(
//!     &Envelope::new()
//!         .subject("Cat")
//!         .from_addr(Address::new("Mme E.", "me@here.com"))
//!         .to("you@there.net"),
//! )?;
//! assert_eq!(message.content_type().essence(), "multipart/mixed");
//! # Ok::<(), eletter::ComposeError>(())
//! ```
//!
//! ## Decomposing and simplifying
//!
//! ```
//! # use eletter::{Envelope, MailItem, BytesAttachment};
//! # let message = MailItem::text("hi\n")
//! #     .mix(BytesAttachment::new(vec![1], "a.bin"))
//! #     .compose(&Envelope::new().subject("s").from_addr("me@here.com").to("you@there.net"))
//! #     .unwrap();
//! let eletter = eletter::decompose(&message)?;
//! let simple = eletter.simplify(false)?;
//! assert_eq!(simple.text.as_deref(), Some("hi\n"));
//! assert_eq!(simple.attachments.len(), 1);
//! # Ok::<(), eletter::Error>(())
//! ```
//!
//! The wire-side message objects, header collections, and address types
//! come from the [`eletter-mime`](eletter_mime) collaborator crate and
//! are re-exported here.

#![forbid(unsafe_code)]

mod compose;
mod decompose;
mod error;
mod item;
mod simplify;
mod util;

pub use compose::{Envelope, compose};
pub use decompose::{Eletter, decompose, decompose_simple};
pub use error::{ComposeError, DecomposeError, Error, SimplifyError};
pub use item::{
    Alternative, Attachment, BytesAttachment, EmailAttachment, HtmlBody, MailItem, Mixed,
    Multipart, Related, TextAttachment, TextBody,
};
pub use simplify::{FragmentJoin, SimpleEletter, SimplifyOptions, smooth};
pub use util::{assemble_content_type, format_addresses, reply_quote, reply_quote_with};

pub use eletter_mime::{
    Address, AddressOrGroup, Body, ContentType, Group, Headers, Message, parse_address_list,
};
