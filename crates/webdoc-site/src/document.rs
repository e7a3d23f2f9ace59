//! Document tree stored as an arena of nodes.
//!
//! Nodes live in a flat `Vec<Node>` and refer to each other by
//! [`NodeHandle`]. A parent owns the ordered list of its children's handles;
//! the back-reference to the parent is a plain handle, so there are no
//! reference cycles. Every node is registered in the document's
//! [`IdRegistry`] when it is created.
//!
//! Publish URLs and source locations are computed on demand by walking the
//! ancestor chain. Nothing is cached, so a cloned subtree reports correct
//! values as soon as it is attached.

use std::collections::HashMap;
use std::fmt::Write;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::error::{DocErrorKind, Error, Result, SourceLocation};
use crate::registry::IdRegistry;

/// Raw attributes of a node in source order.
pub type Attributes = IndexMap<String, String>;

/// Stable handle of a node inside its [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(usize);

impl NodeHandle {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    fn index(self) -> usize {
        self.0
    }
}

/// Publishing data of a `<page>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageInfo {
    /// Publish file stem (`<name>.html`).
    pub name: String,
    /// Title shown in navigation.
    pub title: String,
    /// Id of the template the page is rendered with.
    pub template: String,
}

/// Variant data of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Root of a publishable tree.
    Site {
        /// Base absolute URL, always ending in `/`.
        url: String,
    },
    /// Adds one path segment to everything below it.
    Dir {
        /// Directory name.
        name: String,
    },
    /// A publishable page.
    Page(PageInfo),
    /// Reusable page layout.
    Template,
    /// Per-page stylesheet declaration.
    PageStyle,
    /// Per-page script declaration.
    PageScript,
    /// Generic HTML element.
    Element {
        /// Tag name.
        tag: String,
    },
    /// Character data.
    Text {
        /// The text.
        text: String,
        /// Written verbatim when true, entity-escaped otherwise.
        cdata: bool,
    },
    /// Transient holder of a page's expanded template content.
    Expansion,
}

/// Variant discriminant, used for ancestor and child queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    Site,
    Dir,
    Page,
    Template,
    PageStyle,
    PageScript,
    Element,
    Text,
    Expansion,
}

impl NodeKind {
    /// Discriminant of this kind.
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Site { .. } => NodeType::Site,
            Self::Dir { .. } => NodeType::Dir,
            Self::Page(_) => NodeType::Page,
            Self::Template => NodeType::Template,
            Self::PageStyle => NodeType::PageStyle,
            Self::PageScript => NodeType::PageScript,
            Self::Element { .. } => NodeType::Element,
            Self::Text { .. } => NodeType::Text,
            Self::Expansion => NodeType::Expansion,
        }
    }

    /// True for elements and text, the nodes that end up in HTML output.
    #[must_use]
    pub fn is_html_content(&self) -> bool {
        matches!(self, Self::Element { .. } | Self::Text { .. })
    }
}

/// Source position recorded on a node. Unset fields fall back to ancestors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Origin {
    pub file: Option<PathBuf>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Origin {
    /// Origin at a position in a file.
    #[must_use]
    pub fn at(file: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        Self {
            file: Some(file.into()),
            line: Some(line),
            column: Some(column),
        }
    }
}

/// A node of the document tree.
#[derive(Clone, Debug)]
pub struct Node {
    id: String,
    kind: NodeKind,
    attrs: Attributes,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
    origin: Origin,
}

impl Node {
    /// Globally unique id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Variant data.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Raw attributes.
    #[must_use]
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Owning parent, `None` for roots and detached nodes.
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Owned children in order.
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Position recorded on this node itself.
    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// Marks the arena length so render-time nodes can be rolled back.
#[derive(Clone, Copy, Debug)]
pub struct Checkpoint(usize);

/// Arena-backed document forest with its identity registry.
#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<Node>,
    roots: Vec<NodeHandle>,
    registry: IdRegistry,
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node, registering its explicit `id` attribute if present.
    ///
    /// # Errors
    ///
    /// Returns [`DocErrorKind::DuplicateId`] if the explicit id is taken.
    pub fn create(
        &mut self,
        kind: NodeKind,
        attrs: Attributes,
        origin: Origin,
    ) -> Result<NodeHandle> {
        let handle = NodeHandle(self.nodes.len());
        let id = match self.registry.register(handle, attrs.get("id").map(String::as_str)) {
            Ok(id) => id,
            Err(duplicate) => {
                let location = resolve_origin(&origin);
                return Err(Error::Doc {
                    location,
                    kind: DocErrorKind::DuplicateId {
                        id: attrs.get("id").cloned().unwrap_or_default(),
                        previous: self.location(duplicate.existing),
                    },
                });
            }
        };
        self.nodes.push(Node {
            id,
            kind,
            attrs,
            parent: None,
            children: Vec::new(),
            origin,
        });
        Ok(handle)
    }

    /// Create a node under a synthesized id, ignoring any `id` attribute.
    pub(crate) fn create_generated(
        &mut self,
        kind: NodeKind,
        attrs: Attributes,
        origin: Origin,
    ) -> NodeHandle {
        let handle = NodeHandle(self.nodes.len());
        let id = self.registry.register(handle, None).unwrap_or_default();
        self.nodes.push(Node {
            id,
            kind,
            attrs,
            parent: None,
            children: Vec::new(),
            origin,
        });
        handle
    }

    /// Record a top-level node.
    pub fn add_root(&mut self, root: NodeHandle) {
        self.roots.push(root);
    }

    /// Top-level nodes in load order.
    #[must_use]
    pub fn roots(&self) -> &[NodeHandle] {
        &self.roots
    }

    /// Append `child` to `parent`'s children and point it back at `parent`.
    ///
    /// A child that already has a parent is detached from it first, so
    /// ownership stays a tree.
    pub fn adopt(&mut self, parent: NodeHandle, child: NodeHandle) {
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Remove `child` from its parent's children.
    pub fn detach(&mut self, child: NodeHandle) {
        if let Some(parent) = self.nodes[child.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != child);
        }
    }

    /// Set only the back-reference of `child`.
    ///
    /// Used while a parent's children list is being rebuilt; the list itself
    /// is installed afterwards with [`replace_children`](Self::replace_children).
    pub(crate) fn set_parent(&mut self, child: NodeHandle, parent: NodeHandle) {
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Replace the children of `parent`.
    ///
    /// Former children not in `children` lose their back-reference.
    pub(crate) fn replace_children(&mut self, parent: NodeHandle, children: Vec<NodeHandle>) {
        let old = std::mem::take(&mut self.nodes[parent.index()].children);
        for child in old {
            if self.nodes[child.index()].parent == Some(parent) {
                self.nodes[child.index()].parent = None;
            }
        }
        for &child in &children {
            self.nodes[child.index()].parent = Some(parent);
        }
        self.nodes[parent.index()].children = children;
    }

    /// Replace the attributes of a node.
    pub(crate) fn set_attrs(&mut self, node: NodeHandle, attrs: Attributes) {
        self.nodes[node.index()].attrs = attrs;
    }

    /// Borrow a node.
    ///
    /// # Panics
    ///
    /// Panics if `handle` does not belong to this document.
    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> &Node {
        &self.nodes[handle.index()]
    }

    /// Variant data of a node.
    #[must_use]
    pub fn kind(&self, handle: NodeHandle) -> &NodeKind {
        &self.nodes[handle.index()].kind
    }

    /// Id of a node.
    #[must_use]
    pub fn id(&self, handle: NodeHandle) -> &str {
        &self.nodes[handle.index()].id
    }

    /// Children of a node.
    #[must_use]
    pub fn children(&self, handle: NodeHandle) -> &[NodeHandle] {
        &self.nodes[handle.index()].children
    }

    /// Parent of a node.
    #[must_use]
    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.nodes[handle.index()].parent
    }

    /// Node registered under `id`.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<NodeHandle> {
        self.registry.lookup(id)
    }

    /// Number of nodes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if no node was ever created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over the ancestors of `handle`, nearest first.
    pub fn ancestors(&self, handle: NodeHandle) -> impl Iterator<Item = NodeHandle> + '_ {
        std::iter::successors(self.parent(handle), move |&h| self.parent(h))
    }

    /// Ancestors of the given type, nearest first.
    #[must_use]
    pub fn find_ancestors(&self, handle: NodeHandle, node_type: NodeType) -> Vec<NodeHandle> {
        self.ancestors(handle)
            .filter(|&h| self.kind(h).node_type() == node_type)
            .collect()
    }

    /// Nearest ancestor of the given type.
    #[must_use]
    pub fn find_ancestor(&self, handle: NodeHandle, node_type: NodeType) -> Option<NodeHandle> {
        self.ancestors(handle)
            .find(|&h| self.kind(h).node_type() == node_type)
    }

    /// Children of the given type, in order.
    #[must_use]
    pub fn find_children(&self, handle: NodeHandle, node_type: NodeType) -> Vec<NodeHandle> {
        self.children(handle)
            .iter()
            .copied()
            .filter(|&h| self.kind(h).node_type() == node_type)
            .collect()
    }

    /// Children that are HTML content (elements and text).
    #[must_use]
    pub fn html_content(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        self.children(handle)
            .iter()
            .copied()
            .filter(|&h| self.kind(h).is_html_content())
            .collect()
    }

    /// Distance from the root of the node's tree.
    #[must_use]
    pub fn depth(&self, handle: NodeHandle) -> usize {
        self.ancestors(handle).count()
    }

    /// Source location of a node, each field inherited from the nearest
    /// ancestor that has it.
    #[must_use]
    pub fn location(&self, handle: NodeHandle) -> SourceLocation {
        let chain = || std::iter::once(handle).chain(self.ancestors(handle));
        let origin = |h: NodeHandle| &self.nodes[h.index()].origin;

        SourceLocation {
            file: chain()
                .find_map(|h| origin(h).file.as_ref())
                .map(|f| f.display().to_string())
                .unwrap_or_default(),
            line: chain().find_map(|h| origin(h).line).unwrap_or(0),
            column: chain().find_map(|h| origin(h).column).unwrap_or(0),
        }
    }

    /// Build a [`Error::Doc`] located at `handle`.
    #[must_use]
    pub fn doc_error(&self, handle: NodeHandle, kind: DocErrorKind) -> Error {
        Error::Doc {
            location: self.location(handle),
            kind,
        }
    }

    /// Publish directory of a node: the `name/` of every `Dir` between the
    /// node and its `Site`, outermost first. Empty at the site root.
    #[must_use]
    pub fn publish_dir(&self, handle: NodeHandle) -> String {
        let mut segments: Vec<&str> = Vec::new();
        for ancestor in std::iter::once(handle).chain(self.ancestors(handle)) {
            match self.kind(ancestor) {
                NodeKind::Site { .. } => break,
                NodeKind::Dir { name } => segments.push(name),
                _ => {}
            }
        }
        segments.iter().rev().fold(String::new(), |mut dir, segment| {
            dir.push_str(segment);
            dir.push('/');
            dir
        })
    }

    /// Absolute URL a node is published at, if it has one.
    ///
    /// - `Site`: its base URL
    /// - `Page`: site URL + publish directory + `name.html`
    /// - `Element`: owning page URL + `#` + anchor (the `id` attribute, or
    ///   the node id when the element has none)
    #[must_use]
    pub fn publish_url(&self, handle: NodeHandle) -> Option<String> {
        match self.kind(handle) {
            NodeKind::Site { url } => Some(url.clone()),
            NodeKind::Page(page) => {
                let site = self.find_ancestor(handle, NodeType::Site)?;
                let NodeKind::Site { url } = self.kind(site) else {
                    return None;
                };
                Some(format!("{url}{}{}.html", self.publish_dir(handle), page.name))
            }
            NodeKind::Element { .. } => {
                let page = self.find_ancestor(handle, NodeType::Page)?;
                let node = self.node(handle);
                let anchor = node.attrs.get("id").map_or(node.id.as_str(), String::as_str);
                Some(format!("{}#{anchor}", self.publish_url(page)?))
            }
            _ => None,
        }
    }

    /// Nearest node at or above `handle` that is a page or site.
    #[must_use]
    pub fn publishing_scope(&self, handle: NodeHandle) -> Option<NodeHandle> {
        std::iter::once(handle)
            .chain(self.ancestors(handle))
            .find(|&h| matches!(self.kind(h), NodeKind::Page(_) | NodeKind::Site { .. }))
    }

    /// Deep-copy the subtree at `source`.
    ///
    /// The copy is detached and every copied node gets a fresh synthesized
    /// id. Attributes and origins are copied verbatim, except that an `id`
    /// attribute is kept only on the first copy of each original recorded in
    /// `aliases`, so one render never emits the same HTML id twice.
    /// `aliases` receives `original id -> first copy` so references to the
    /// original can be redirected to it.
    pub fn clone_subtree(
        &mut self,
        source: NodeHandle,
        aliases: &mut HashMap<String, NodeHandle>,
    ) -> NodeHandle {
        let original = &self.nodes[source.index()];
        let kind = original.kind.clone();
        let mut attrs = original.attrs.clone();
        let origin = original.origin.clone();
        let children = original.children.clone();
        let original_id = original.id.clone();

        let repeated = aliases.contains_key(&original_id);
        if repeated {
            attrs.shift_remove("id");
        }
        let copy = self.create_generated(kind, attrs, origin);
        if !repeated {
            aliases.insert(original_id, copy);
        }
        for child in children {
            let child_copy = self.clone_subtree(child, aliases);
            self.adopt(copy, child_copy);
        }
        copy
    }

    /// Mark the current arena length.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.nodes.len())
    }

    /// Drop every node created after `checkpoint`.
    ///
    /// Their ids are unregistered and they are removed from any older
    /// parent, leaving the document exactly as it was at the checkpoint.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        let Checkpoint(mark) = checkpoint;
        if mark >= self.nodes.len() {
            return;
        }
        for index in mark..self.nodes.len() {
            if let Some(parent) = self.nodes[index].parent
                && parent.index() < mark
            {
                self.nodes[parent.index()]
                    .children
                    .retain(|c| c.index() < mark);
            }
            let id = self.nodes[index].id.clone();
            self.registry.unregister(&id);
        }
        self.nodes.truncate(mark);
        self.roots.retain(|r| r.index() < mark);
        tracing::debug!(kept = mark, "rolled back transient nodes");
    }

    /// Render the tree for diagnostics.
    ///
    /// One line per node, indented by depth:
    /// `<file>:<line>:<column>:<id>:<description>`.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for &root in &self.roots {
            self.dump_node(root, &mut out);
        }
        out
    }

    fn dump_node(&self, handle: NodeHandle, out: &mut String) {
        let depth = self.depth(handle);
        let _ = writeln!(
            out,
            "{} {}:{}:{}",
            " ".repeat(depth),
            self.location(handle),
            self.id(handle),
            self.describe(handle)
        );
        for &child in self.children(handle) {
            self.dump_node(child, out);
        }
    }

    /// Type-specific one-line description of a node.
    #[must_use]
    pub fn describe(&self, handle: NodeHandle) -> String {
        let node = self.node(handle);
        match &node.kind {
            NodeKind::Site { url } => format!("<web:site url='{url}'>"),
            NodeKind::Dir { name } => format!("<web:dir name='{name}'>"),
            NodeKind::Page(page) => {
                format!("<web:page name='{}' title='{}'>", page.name, page.title)
            }
            NodeKind::Template => "<web:template>".to_owned(),
            NodeKind::PageStyle => "<web:pagestyle>".to_owned(),
            NodeKind::PageScript => "<web:pagescript>".to_owned(),
            NodeKind::Expansion => "<web:content>".to_owned(),
            NodeKind::Element { tag } => {
                let mut out = format!("<html:{tag}");
                for (key, value) in &node.attrs {
                    let _ = write!(out, " {key}='{value}'");
                }
                out.push('>');
                out
            }
            NodeKind::Text { text, .. } => format!("text:'{}'", text.escape_debug()),
        }
    }
}

/// Location of a node that is not yet in the arena.
fn resolve_origin(origin: &Origin) -> SourceLocation {
    SourceLocation {
        file: origin
            .file
            .as_ref()
            .map(|f| f.display().to_string())
            .unwrap_or_default(),
        line: origin.line.unwrap_or(0),
        column: origin.column.unwrap_or(0),
    }
}
