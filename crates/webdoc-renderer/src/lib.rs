//! HTML escaping and relative URL helpers for webdoc.
//!
//! Everything here is independent of the document tree:
//! - [`escape_text`] / [`quote_attr`]: markup escaping with HTML 4 named entities
//! - [`relative_url`]: relativize one absolute publish URL against another
//! - [`split_reference`]: recognize hrefs that may name a document node

mod entities;
mod escape;
mod links;

pub use entities::{entity_char, entity_name, entity_replacement};
pub use escape::{escape_text, quote_attr};
pub use links::{LocalReference, relative_url, split_reference};
