//! # eletter-mime
//!
//! In-memory MIME message objects for the `eletter` workspace.
//!
//! This crate owns everything at the wire boundary of an email message:
//!
//! - **Message objects**: a recursive [`Message`] tree — headers plus leaf
//!   content, multipart children, or an embedded message
//! - **Headers**: an order-preserving, case-insensitive header collection
//! - **Content types**: parsing, rendering, and filename-based guessing
//! - **Addresses**: the three address shapes of a recipient header and
//!   their textual syntax
//! - **Encodings**: Base64, Quoted-Printable, RFC 2047 encoded words
//! - **Serialization**: [`Message::parse`] and [`Message::to_wire`]
//!
//! Higher-level message semantics (what a body *means*, how attachments
//! and alternatives compose) live in the `eletter` crate, which treats
//! this one as its wire-format collaborator.
//!
//! ## Example
//!
//! ```
//! use eletter_mime::{ContentType, Message};
//!
//! let mut message = Message::text("Hello, World!\n", &ContentType::text_plain());
//! message.headers.add("subject", "Greetings");
//!
//! let wire = message.to_wire();
//! let parsed = Message::parse(&wire)?;
//! assert_eq!(parsed.subject(), Some("Greetings"));
//! # Ok::<(), eletter_mime::Error>(())
//! ```

#![forbid(unsafe_code)]

mod address;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use address::{Address, AddressOrGroup, Group, parse_address_list, parse_single_address};
pub use content_type::{ContentType, escape_quoted, is_token, unquote};
pub use error::{Error, Result};
pub use header::{Headers, canonical_name};
pub use message::{Body, Message, TransferEncoding};
