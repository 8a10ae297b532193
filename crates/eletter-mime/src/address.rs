//! Email address value types and header-value syntax.
//!
//! The three shapes a recipient header can hold: a bare address, a named
//! address, and a named group of addresses. Parsing is deliberately
//! lenient — a fragment that does not match any known shape is kept as a
//! bare address rather than rejected.

use crate::encoding::decode_rfc2047;
use std::fmt;

/// RFC 5322 specials; a display name containing any of these is rendered
/// as a quoted string.
const SPECIALS: &str = "()<>[]:;@\\,.\"";

/// A display name paired with an email address.
///
/// An empty display name renders as the bare address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    /// Display name ("" for a bare address).
    pub display_name: String,
    /// Email address (addr-spec).
    pub address: String,
}

impl Address {
    /// Creates an address with a display name.
    #[must_use]
    pub fn new(display_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            address: address.into(),
        }
    }

    /// Creates a bare address with no display name.
    #[must_use]
    pub fn bare(address: impl Into<String>) -> Self {
        Self::new("", address)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::bare(address)
    }
}

impl From<String> for Address {
    fn from(address: String) -> Self {
        Self::bare(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "{}", self.address)
        } else if needs_quoting(&self.display_name) {
            write!(
                f,
                "\"{}\" <{}>",
                self.display_name.replace('\\', "\\\\").replace('"', "\\\""),
                self.address
            )
        } else {
            write!(f, "{} <{}>", self.display_name, self.address)
        }
    }
}

/// A named group of addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Group {
    /// Group display name.
    pub name: String,
    /// Group members, in order.
    pub members: Vec<Address>,
}

impl Group {
    /// Creates a group from a name and members.
    #[must_use]
    pub fn new(name: impl Into<String>, members: Vec<Address>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.members.is_empty() {
            return write!(f, "{}:;", self.name);
        }
        let members: Vec<String> = self.members.iter().map(ToString::to_string).collect();
        write!(f, "{}: {};", self.name, members.join(", "))
    }
}

/// Either a single address or a group — the value space of an address
/// header entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressOrGroup {
    /// A single (possibly named) address.
    Address(Address),
    /// A named group of addresses.
    Group(Group),
}

impl fmt::Display for AddressOrGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(a) => a.fmt(f),
            Self::Group(g) => g.fmt(f),
        }
    }
}

impl From<Address> for AddressOrGroup {
    fn from(address: Address) -> Self {
        Self::Address(address)
    }
}

impl From<Group> for AddressOrGroup {
    fn from(group: Group) -> Self {
        Self::Group(group)
    }
}

impl From<&str> for AddressOrGroup {
    fn from(address: &str) -> Self {
        Self::Address(Address::bare(address))
    }
}

impl From<String> for AddressOrGroup {
    fn from(address: String) -> Self {
        Self::Address(Address::bare(address))
    }
}

fn needs_quoting(name: &str) -> bool {
    name.chars()
        .any(|c| SPECIALS.contains(c) || c.is_control())
}

/// Parses an address header value into addresses and groups.
///
/// Handles `addr`, `Name <addr>`, `"Name" <addr>`, and
/// `name: member, member;` group syntax, splitting on top-level commas
/// and decoding RFC 2047 display names. Unrecognizable fragments become
/// bare addresses; empty fragments are dropped.
#[must_use]
pub fn parse_address_list(value: &str) -> Vec<AddressOrGroup> {
    let mut out = Vec::new();
    let mut rest = value;
    while !rest.trim().is_empty() {
        // A top-level colon before any comma starts a group
        if let Some(colon) = find_unquoted(rest, b':')
            && find_unquoted(rest, b',').is_none_or(|comma| colon < comma)
        {
            let name = decode_display_name(rest[..colon].trim());
            let body = &rest[colon + 1..];
            let end = find_unquoted(body, b';').unwrap_or(body.len());
            let members = split_unquoted(&body[..end], b',')
                .filter(|frag| !frag.trim().is_empty())
                .map(|frag| parse_single_address(frag.trim()))
                .collect();
            out.push(AddressOrGroup::Group(Group::new(name, members)));
            rest = body[end..].strip_prefix(';').unwrap_or(&body[end..]);
            rest = rest.trim_start().strip_prefix(',').unwrap_or(rest);
            continue;
        }
        let end = find_unquoted(rest, b',').unwrap_or(rest.len());
        let fragment = rest[..end].trim();
        if !fragment.is_empty() {
            out.push(AddressOrGroup::Address(parse_single_address(fragment)));
        }
        rest = rest[end..].strip_prefix(',').unwrap_or("");
    }
    out
}

/// Parses one `addr` / `Name <addr>` / `"Name" <addr>` fragment.
#[must_use]
pub fn parse_single_address(fragment: &str) -> Address {
    if let Some(open) = fragment.rfind('<')
        && let Some(close) = fragment.rfind('>')
        && close > open
    {
        let address = fragment[open + 1..close].trim();
        let name = decode_display_name(fragment[..open].trim());
        return Address::new(name, address);
    }
    Address::bare(fragment.trim())
}

fn decode_display_name(raw: &str) -> String {
    let unquoted = crate::content_type::unquote(raw);
    decode_rfc2047(&unquoted).unwrap_or_else(|_| unquoted.into_owned())
}

/// Finds the first occurrence of `needle` outside quoted strings and
/// angle-bracketed addresses.
fn find_unquoted(s: &str, needle: u8) -> Option<usize> {
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut escaped = false;
    for (i, b) in s.bytes().enumerate() {
        if escaped {
            escaped = false;
        } else if in_quotes {
            match b {
                b'\\' => escaped = true,
                b'"' => in_quotes = false,
                _ => {}
            }
        } else {
            match b {
                b'"' => in_quotes = true,
                b'<' => in_angle = true,
                b'>' => in_angle = false,
                b if b == needle && !in_angle => return Some(i),
                _ => {}
            }
        }
    }
    None
}

fn split_unquoted(s: &str, sep: u8) -> impl Iterator<Item = &str> {
    let mut pieces = Vec::new();
    let mut rest = s;
    while let Some(i) = find_unquoted(rest, sep) {
        pieces.push(&rest[..i]);
        rest = &rest[i + 1..];
    }
    pieces.push(rest);
    pieces.into_iter()
}
