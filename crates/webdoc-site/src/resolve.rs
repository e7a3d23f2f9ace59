//! Cross-reference resolution.
//!
//! A bare id used as an `href` (or in `%pathto:id;`) is replaced by the
//! target's publish URL made relative to the referring node's page. During a
//! page render, ids of cloned template nodes are aliased to their copies so
//! references land on the content published with that page.

use std::collections::HashMap;

use webdoc_renderer::{relative_url, split_reference};

use crate::document::{Document, NodeHandle};

/// Resolves references against a document.
#[derive(Debug)]
pub struct Resolver<'a> {
    doc: &'a Document,
    aliases: &'a HashMap<String, NodeHandle>,
}

impl<'a> Resolver<'a> {
    /// Resolver consulting `aliases` before the document's registry.
    #[must_use]
    pub fn new(doc: &'a Document, aliases: &'a HashMap<String, NodeHandle>) -> Self {
        Self { doc, aliases }
    }

    /// Node a bare id refers to.
    #[must_use]
    pub fn target(&self, id: &str) -> Option<NodeHandle> {
        self.aliases.get(id).copied().or_else(|| self.doc.lookup(id))
    }

    /// Resolve `href` as seen from `owner`.
    ///
    /// An href without scheme or authority whose path is a registered id is
    /// replaced by the target's publish URL relative to the page (or site)
    /// enclosing `owner`; its own query and fragment are kept. Anything else
    /// is returned unchanged.
    #[must_use]
    pub fn resolve_reference(&self, href: &str, owner: NodeHandle) -> String {
        let Some(reference) = split_reference(href) else {
            return href.to_owned();
        };
        let Some(target) = self.target(reference.path) else {
            return href.to_owned();
        };
        let Some(target_url) = self.doc.publish_url(target) else {
            tracing::warn!(
                id = reference.path,
                location = %self.doc.location(owner),
                "reference target has no publish URL"
            );
            return href.to_owned();
        };
        let from_url = self
            .doc
            .publishing_scope(owner)
            .and_then(|scope| self.doc.publish_url(scope));
        let resolved = match from_url {
            Some(from) => relative_url(&target_url, &from),
            None => target_url,
        };
        reference.reattach(&resolved)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::builder::BuildOptions;
    use crate::loader::load_str;
    use std::path::Path;

    const SITE: &str = r#"<site url="http://a/">
  <page name="index" id="home"><p id="top">x</p></page>
  <dir name="docs">
    <page name="intro" id="intro"/>
    <dir name="api">
      <page name="ref" id="ref"/>
    </dir>
  </dir>
  <template id="t"><div id="box"/></template>
</site>"#;

    fn doc() -> Document {
        load_str(Path::new("site.xml"), SITE, &BuildOptions::default()).unwrap()
    }

    #[test]
    fn test_resolves_page_ids() {
        let doc = doc();
        let aliases = HashMap::new();
        let resolver = Resolver::new(&doc, &aliases);
        let home = doc.lookup("home").unwrap();
        let reference = doc.lookup("ref").unwrap();

        assert_eq!(resolver.resolve_reference("intro", home), "docs/intro.html");
        assert_eq!(resolver.resolve_reference("intro", reference), "../intro.html");
        assert_eq!(resolver.resolve_reference("home", reference), "../../index.html");
    }

    #[test]
    fn test_resolves_element_anchor_within_page() {
        let doc = doc();
        let aliases = HashMap::new();
        let resolver = Resolver::new(&doc, &aliases);
        let top = doc.lookup("top").unwrap();
        let intro = doc.lookup("intro").unwrap();

        assert_eq!(resolver.resolve_reference("top", top), "#top");
        assert_eq!(resolver.resolve_reference("top", intro), "../index.html#top");
    }

    #[test]
    fn test_keeps_own_query_and_fragment() {
        let doc = doc();
        let aliases = HashMap::new();
        let resolver = Resolver::new(&doc, &aliases);
        let home = doc.lookup("home").unwrap();
        assert_eq!(
            resolver.resolve_reference("intro?v=2#usage", home),
            "docs/intro.html?v=2#usage"
        );
    }

    #[test]
    fn test_non_references_pass_through() {
        let doc = doc();
        let aliases = HashMap::new();
        let resolver = Resolver::new(&doc, &aliases);
        let home = doc.lookup("home").unwrap();
        for href in ["http://intro", "mailto:intro", "unknown", "//intro", "docs/intro.html"] {
            assert_eq!(resolver.resolve_reference(href, home), href);
        }
    }

    #[test]
    fn test_unpublished_target_passes_through() {
        let doc = doc();
        let aliases = HashMap::new();
        let resolver = Resolver::new(&doc, &aliases);
        let home = doc.lookup("home").unwrap();
        assert_eq!(resolver.resolve_reference("box", home), "box");
        assert_eq!(resolver.resolve_reference("t", home), "t");
    }

    #[test]
    fn test_aliases_take_precedence() {
        let doc = doc();
        let mut aliases = HashMap::new();
        aliases.insert("intro".to_owned(), doc.lookup("ref").unwrap());
        let resolver = Resolver::new(&doc, &aliases);
        let home = doc.lookup("home").unwrap();
        assert_eq!(resolver.resolve_reference("intro", home), "docs/api/ref.html");
    }
}
