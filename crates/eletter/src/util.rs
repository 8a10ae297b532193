//! Small utilities: content-type assembly, address-list formatting, and
//! reply quoting.

use crate::error::ComposeError;
use eletter_mime::{AddressOrGroup, escape_quoted, is_token};
use std::fmt::Write as _;

/// Assembles a Content-Type string from a maintype, subtype, and
/// parameters, in the order given. Parameter values are always quoted;
/// type case is preserved.
///
/// # Errors
///
/// Returns an error naming the offending `maintype/subtype` pair when
/// either side is not a valid token.
pub fn assemble_content_type(
    maintype: &str,
    subtype: &str,
    params: &[(&str, &str)],
) -> Result<String, ComposeError> {
    if !is_token(maintype) || !is_token(subtype) {
        return Err(ComposeError::InvalidContentType(format!(
            "{maintype}/{subtype}"
        )));
    }
    let mut out = format!("{maintype}/{subtype}");
    for (key, value) in params {
        let _ = write!(out, "; {key}=\"{}\"", escape_quoted(value));
    }
    Ok(out)
}

/// Formats addresses and groups for use in a custom address header.
#[must_use]
pub fn format_addresses(addresses: &[AddressOrGroup]) -> String {
    addresses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Quotes text the way replies conventionally do: every line gains the
/// `"> "` prefix, and lines already starting with it gain a bare `">"`
/// instead, so quoting nests as `">> "`.
///
/// The empty string is treated as a single empty line, and a trailing
/// newline is ensured.
#[must_use]
pub fn reply_quote(text: &str) -> String {
    reply_quote_with(text, "> ")
}

/// [`reply_quote`] with a custom prefix. Lines already starting with the
/// prefix gain the prefix with trailing whitespace removed.
#[must_use]
pub fn reply_quote_with(text: &str, prefix: &str) -> String {
    let source = if text.is_empty() { "\n" } else { text };
    let mut out = String::with_capacity(source.len());
    for line in lines_with_terminators(source) {
        if line.starts_with(prefix) {
            out.push_str(prefix.trim_end());
        } else {
            out.push_str(prefix);
        }
        out.push_str(line);
    }
    if !out.ends_with('\n') && !out.ends_with('\r') {
        out.push('\n');
    }
    out
}

/// Splits on `\n`, `\r\n`, or lone `\r`, keeping each line's terminator.
fn lines_with_terminators(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&s[start..=i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                let end = if bytes.get(i + 1) == Some(&b'\n') { i + 1 } else { i };
                lines.push(&s[start..=end]);
                i = end + 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        lines.push(&s[start..]);
    }
    lines
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use eletter_mime::{Address, Group};

    #[test]
    fn test_assemble_content_type() {
        assert_eq!(
            assemble_content_type("text", "plain", &[]).unwrap(),
            "text/plain"
        );
        assert_eq!(
            assemble_content_type("TEXT", "PLAIN", &[]).unwrap(),
            "TEXT/PLAIN"
        );
        assert_eq!(
            assemble_content_type("text", "plain", &[("charset", "utf-8")]).unwrap(),
            "text/plain; charset=\"utf-8\""
        );
        assert_eq!(
            assemble_content_type("text", "plain", &[("name", "foo\"bar")]).unwrap(),
            "text/plain; name=\"foo\\\"bar\""
        );
        assert_eq!(
            assemble_content_type(
                "text",
                "markdown",
                &[("charset", "utf-8"), ("variant", "GFM")]
            )
            .unwrap(),
            "text/markdown; charset=\"utf-8\"; variant=\"GFM\""
        );
    }

    #[test]
    fn test_assemble_content_type_errors() {
        for (maintype, subtype) in [("text/plain", "plain"), ("text", ""), ("text/", "plain")] {
            let error = assemble_content_type(maintype, subtype, &[]).unwrap_err();
            assert_eq!(error.to_string(), format!("invalid content type: {maintype}/{subtype}"));
        }
    }

    #[test]
    fn test_format_addresses() {
        assert_eq!(format_addresses(&[]), "");
        assert_eq!(
            format_addresses(&[Address::bare("foo@example.com").into()]),
            "foo@example.com"
        );
        assert_eq!(
            format_addresses(&[
                AddressOrGroup::Group(Group::new("undisclosed recipients", vec![])),
                Address::bare("luser@example.nil").into(),
                AddressOrGroup::Group(Group::new(
                    "friends",
                    vec![
                        Address::bare("you@there.net"),
                        Address::new("Thaddeus Hem", "them@hither.yon"),
                    ],
                )),
            ]),
            "undisclosed recipients:;, luser@example.nil, \
             friends: you@there.net, Thaddeus Hem <them@hither.yon>;"
        );
    }

    #[test]
    fn test_reply_quote() {
        for (input, output) in [
            ("", "> \n"),
            ("\n", "> \n"),
            ("Insert output here.", "> Insert output here.\n"),
            ("Insert output here.\n", "> Insert output here.\n"),
            (
                "Insert output here.\nOutsert input there.",
                "> Insert output here.\n> Outsert input there.\n",
            ),
            (
                "Insert output here.\r\nOutsert input there.\r\n",
                "> Insert output here.\r\n> Outsert input there.\r\n",
            ),
            (
                "Insert output here.\rOutsert input there.\r",
                "> Insert output here.\r> Outsert input there.\r",
            ),
            (
                "Insert output here.\n\nOutsert input there.\n",
                "> Insert output here.\n> \n> Outsert input there.\n",
            ),
            (
                "> Insert output here.\n> \n> Outsert input there.\n",
                ">> Insert output here.\n>> \n>> Outsert input there.\n",
            ),
        ] {
            assert_eq!(reply_quote(input), output, "input: {input:?}");
        }
    }

    #[test]
    fn test_reply_quote_custom_prefix() {
        assert_eq!(
            reply_quote_with("Insert output here.\n\n: Outsert input there.\n", ": "),
            ": Insert output here.\n: \n:: Outsert input there.\n"
        );
    }
}
