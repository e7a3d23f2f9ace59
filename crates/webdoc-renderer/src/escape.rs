//! HTML escaping for serialized text and attribute values.

use std::fmt::Write;

use crate::entities::entity_name;

/// Escape text content for HTML output.
///
/// `&`, `<` and `>` become the usual markup escapes. Every other character
/// with an HTML 4 entity name (including `"` and non-ASCII characters such as
/// `\u{00e9}`) is written as that named entity.
///
/// ```
/// use webdoc_renderer::escape_text;
///
/// assert_eq!(escape_text("a < b & caf\u{00e9}"), "a &lt; b &amp; caf&eacute;");
/// ```
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => match entity_name(ch) {
                Some(name) => {
                    let _ = write!(out, "&{name};");
                }
                None => out.push(ch),
            },
        }
    }
    out
}

/// Quote an attribute value, escaping it for a double-quoted context.
///
/// The result includes the surrounding quotes. Since `"` has a named entity
/// it is always escaped, so the quoting never needs to switch to `'`.
#[must_use]
pub fn quote_attr(value: &str) -> String {
    format!("\"{}\"", escape_text(value))
}
