//! Directive expansion.
//!
//! Two grammars are recognized:
//!
//! - **text**: `%content;`, `%pagestyle;`, `%pagescript;` and
//!   `%navigation;` inside character data are replaced by nodes. Unknown
//!   names are dropped with a warning.
//! - **attribute**: `%pathto:<id>;` inside an attribute value is replaced by
//!   the relative URL of the node with that id. Any other directive is an
//!   error.
//!
//! Expansion rewrites a freshly cloned subtree in place. Canonical template,
//! style and script content is only ever cloned, never modified.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::document::{Attributes, Document, NodeHandle, NodeKind, NodeType, Origin};
use crate::error::{DocErrorKind, Result};
use crate::navigation::drill_index;
use crate::resolve::Resolver;

/// Default nesting limit for `%content;` and inline style/script expansion.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// `%name;` in character data.
static TEXT_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%(\w+);").expect("valid regex"));

/// `%directive;` in attribute values.
static ATTRIBUTE_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([\w:.\-]+);").expect("valid regex"));

/// Expands directives in content rendered for one page.
#[derive(Debug)]
pub struct Expander<'d> {
    doc: &'d mut Document,
    page: NodeHandle,
    aliases: HashMap<String, NodeHandle>,
    max_depth: usize,
    depth: usize,
}

impl<'d> Expander<'d> {
    /// Expander for `page`.
    ///
    /// `aliases` maps ids of canonical nodes to the copies rendered with this
    /// page. Copies made during expansion are added to it.
    pub fn new(
        doc: &'d mut Document,
        page: NodeHandle,
        aliases: HashMap<String, NodeHandle>,
    ) -> Self {
        Self {
            doc,
            page,
            aliases,
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
        }
    }

    /// Set the nesting limit.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Expand every child of `container` in place.
    ///
    /// # Errors
    ///
    /// Returns [`DocErrorKind::UnknownDirective`] for an unrecognized
    /// attribute directive.
    pub fn expand(&mut self, container: NodeHandle) -> Result<()> {
        self.expand_children(container)
    }

    /// Give back the alias map, including copies made while expanding.
    #[must_use]
    pub fn into_aliases(self) -> HashMap<String, NodeHandle> {
        self.aliases
    }

    fn expand_children(&mut self, parent: NodeHandle) -> Result<()> {
        let mut expanded = Vec::new();
        for child in self.doc.children(parent).to_vec() {
            expanded.extend(self.expand_node(child, parent)?);
        }
        self.doc.replace_children(parent, expanded);
        Ok(())
    }

    /// Expand one node attached under `parent`, returning its replacement.
    fn expand_node(&mut self, node: NodeHandle, parent: NodeHandle) -> Result<Vec<NodeHandle>> {
        match self.doc.kind(node) {
            NodeKind::Text { text, cdata } => {
                if !TEXT_DIRECTIVE.is_match(text) {
                    return Ok(vec![node]);
                }
                let (text, cdata) = (text.clone(), *cdata);
                self.expand_text(node, &text, cdata, parent)
            }
            NodeKind::Element { .. } => {
                self.expand_attributes(node)?;
                self.expand_children(node)?;
                Ok(vec![node])
            }
            _ => Ok(vec![node]),
        }
    }

    fn expand_text(
        &mut self,
        node: NodeHandle,
        text: &str,
        cdata: bool,
        parent: NodeHandle,
    ) -> Result<Vec<NodeHandle>> {
        let origin = self.doc.node(node).origin().clone();
        let mut nodes = Vec::new();
        let mut last = 0;

        for caps in TEXT_DIRECTIVE.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if last < whole.start() {
                nodes.push(self.text(&text[last..whole.start()], cdata, origin.clone(), parent));
            }
            last = whole.end();
            nodes.extend(self.text_directive(name.as_str(), node, parent)?);
        }
        if last < text.len() {
            nodes.push(self.text(&text[last..], cdata, origin, parent));
        }
        Ok(nodes)
    }

    fn text_directive(
        &mut self,
        name: &str,
        node: NodeHandle,
        parent: NodeHandle,
    ) -> Result<Vec<NodeHandle>> {
        match name {
            "content" => {
                let content = self.doc.html_content(self.page);
                self.nested(node, |this| this.copy_expanded(&content, parent))
            }
            "pagestyle" => self.page_resources(NodeType::PageStyle, node, parent),
            "pagescript" => self.page_resources(NodeType::PageScript, node, parent),
            "navigation" => Ok(drill_index(self.doc, self.page)
                .map(|ul| {
                    self.doc.set_parent(ul, parent);
                    ul
                })
                .into_iter()
                .collect()),
            other => {
                tracing::warn!(
                    location = %self.doc.location(node),
                    "ignoring unknown directive '%{other};'"
                );
                Ok(Vec::new())
            }
        }
    }

    /// `<link>`/`<style>` or `<script>` elements for every style or script
    /// declared on the page.
    fn page_resources(
        &mut self,
        kind: NodeType,
        node: NodeHandle,
        parent: NodeHandle,
    ) -> Result<Vec<NodeHandle>> {
        let (external_tag, external_attr, default_type) = match kind {
            NodeType::PageStyle => ("link", "href", "text/css"),
            _ => ("script", "src", "text/javascript"),
        };
        let inline_tag = match kind {
            NodeType::PageStyle => "style",
            _ => "script",
        };

        let mut nodes = Vec::new();
        for declaration in self.doc.find_children(self.page, kind) {
            let attrs = self.doc.node(declaration).attrs();
            let media_type = attrs
                .get("type")
                .cloned()
                .unwrap_or_else(|| default_type.to_owned());

            if let Some(reference) = attrs.get(external_attr).cloned() {
                let mut link = Attributes::new();
                link.insert(external_attr.to_owned(), reference);
                link.insert("type".to_owned(), media_type.clone());
                if kind == NodeType::PageStyle {
                    link.insert("rel".to_owned(), "stylesheet".to_owned());
                }
                nodes.push(self.element(external_tag, link, parent));
            }

            let content = self.doc.html_content(declaration);
            if self.is_blank(&content) {
                continue;
            }
            let inline = self.element(
                inline_tag,
                Attributes::from([("type".to_owned(), media_type)]),
                parent,
            );
            let copies = self.nested(node, |this| this.copy_expanded(&content, inline))?;
            self.doc.replace_children(inline, copies);
            nodes.push(inline);
        }
        Ok(nodes)
    }

    /// Clone `sources` under `parent` and expand the copies.
    fn copy_expanded(
        &mut self,
        sources: &[NodeHandle],
        parent: NodeHandle,
    ) -> Result<Vec<NodeHandle>> {
        let mut nodes = Vec::new();
        for &source in sources {
            let copy = self.doc.clone_subtree(source, &mut self.aliases);
            self.doc.set_parent(copy, parent);
            nodes.extend(self.expand_node(copy, parent)?);
        }
        Ok(nodes)
    }

    /// Run `f` one nesting level deeper, producing nothing past the limit.
    fn nested<F>(&mut self, node: NodeHandle, f: F) -> Result<Vec<NodeHandle>>
    where
        F: FnOnce(&mut Self) -> Result<Vec<NodeHandle>>,
    {
        if self.depth >= self.max_depth {
            tracing::warn!(
                location = %self.doc.location(node),
                max_depth = self.max_depth,
                "expansion depth exceeded"
            );
            return Ok(Vec::new());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn expand_attributes(&mut self, node: NodeHandle) -> Result<()> {
        let attrs = self.doc.node(node).attrs();
        if !attrs.values().any(|v| ATTRIBUTE_DIRECTIVE.is_match(v)) {
            return Ok(());
        }

        let resolver = Resolver::new(self.doc, &self.aliases);
        let mut expanded = Attributes::with_capacity(attrs.len());
        for (key, value) in attrs {
            let mut out = String::with_capacity(value.len());
            let mut last = 0;
            for caps in ATTRIBUTE_DIRECTIVE.captures_iter(value) {
                let (Some(whole), Some(directive)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                out.push_str(&value[last..whole.start()]);
                last = whole.end();
                let Some(id) = directive.as_str().strip_prefix("pathto:") else {
                    let kind = DocErrorKind::UnknownDirective(directive.as_str().to_owned());
                    return Err(self.doc.doc_error(node, kind));
                };
                out.push_str(&resolver.resolve_reference(id, node));
            }
            out.push_str(&value[last..]);
            expanded.insert(key.clone(), out);
        }
        self.doc.set_attrs(node, expanded);
        Ok(())
    }

    /// True if `content` is empty or only whitespace text.
    fn is_blank(&self, content: &[NodeHandle]) -> bool {
        content.iter().all(|&c| match self.doc.kind(c) {
            NodeKind::Text { text, .. } => text.trim().is_empty(),
            _ => false,
        })
    }

    fn text(&mut self, text: &str, cdata: bool, origin: Origin, parent: NodeHandle) -> NodeHandle {
        let node = self.doc.create_generated(
            NodeKind::Text {
                text: text.to_owned(),
                cdata,
            },
            Attributes::new(),
            origin,
        );
        self.doc.set_parent(node, parent);
        node
    }

    fn element(&mut self, tag: &str, attrs: Attributes, parent: NodeHandle) -> NodeHandle {
        let node = self
            .doc
            .create_generated(NodeKind::Element { tag: tag.to_owned() }, attrs, Origin::default());
        self.doc.set_parent(node, parent);
        node
    }
}
