//! Page rendering and output.
//!
//! For every page, in tree order, the publisher clones the page's template
//! content under a transient [`NodeKind::Expansion`] node, expands the
//! directives, serializes the result and writes it to
//! `<output_dir>/<dirs>/<name>.html`. All nodes created while rendering are
//! rolled back afterwards, so rendering a page never changes what the next
//! page sees.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::document::{Attributes, Document, NodeHandle, NodeKind, Origin};
use crate::error::{DocErrorKind, Error, Result};
use crate::expand::{DEFAULT_MAX_DEPTH, Expander};
use crate::html::serialize_children;
use crate::resolve::Resolver;

/// Default publish root.
pub const DEFAULT_OUTPUT_DIR: &str = "html";

/// Options for publishing.
#[derive(Clone, Debug)]
pub struct PublishOptions {
    /// Directory pages are written under.
    pub output_dir: PathBuf,
    /// Nesting limit for directive expansion.
    pub max_expansion_depth: usize,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_expansion_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl PublishOptions {
    /// Set the publish root.
    #[must_use]
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Set the expansion nesting limit.
    #[must_use]
    pub fn with_max_expansion_depth(mut self, depth: usize) -> Self {
        self.max_expansion_depth = depth;
        self
    }
}

/// A page written by [`Publisher::publish`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedPage {
    /// Page id.
    pub id: String,
    /// File the page was written to.
    pub path: PathBuf,
}

/// Result of a publish run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Written pages in tree order.
    pub pages: Vec<PublishedPage>,
}

/// Renders and writes pages.
#[derive(Debug, Default)]
pub struct Publisher {
    options: PublishOptions,
}

impl Publisher {
    /// Create a publisher.
    #[must_use]
    pub fn new(options: PublishOptions) -> Self {
        Self { options }
    }

    /// Publish every page of every root in `doc`.
    ///
    /// # Errors
    ///
    /// Stops at the first page that fails to render or write.
    pub fn publish(&self, doc: &mut Document) -> Result<PublishReport> {
        let mut report = PublishReport::default();
        for root in doc.roots().to_vec() {
            self.publish_node(doc, root, &mut report)?;
        }
        Ok(report)
    }

    fn publish_node(
        &self,
        doc: &mut Document,
        node: NodeHandle,
        report: &mut PublishReport,
    ) -> Result<()> {
        match doc.kind(node) {
            NodeKind::Page(_) => {
                let path = self.write_page(doc, node)?;
                report.pages.push(PublishedPage {
                    id: doc.id(node).to_owned(),
                    path,
                });
            }
            NodeKind::Template
            | NodeKind::PageStyle
            | NodeKind::PageScript
            | NodeKind::Expansion
            | NodeKind::Text { .. } => return Ok(()),
            NodeKind::Site { .. } | NodeKind::Dir { .. } | NodeKind::Element { .. } => {}
        }
        for child in doc.children(node).to_vec() {
            self.publish_node(doc, child, report)?;
        }
        Ok(())
    }

    /// Render `page` to an HTML string.
    ///
    /// The document is left exactly as it was before the call.
    ///
    /// # Errors
    ///
    /// Returns [`DocErrorKind::MissingTemplate`] if the page's template id
    /// does not name a template, or any expansion error.
    pub fn render_page(&self, doc: &mut Document, page: NodeHandle) -> Result<String> {
        let checkpoint = doc.checkpoint();
        let result = self.render_transient(doc, page);
        doc.rollback(checkpoint);
        result
    }

    fn render_transient(&self, doc: &mut Document, page: NodeHandle) -> Result<String> {
        let NodeKind::Page(info) = doc.kind(page) else {
            return Ok(String::new());
        };
        let template = doc
            .lookup(&info.template)
            .filter(|&t| matches!(doc.kind(t), NodeKind::Template))
            .ok_or_else(|| {
                doc.doc_error(page, DocErrorKind::MissingTemplate(info.template.clone()))
            })?;

        let container =
            doc.create_generated(NodeKind::Expansion, Attributes::new(), Origin::default());
        doc.adopt(page, container);

        let mut aliases = HashMap::new();
        for source in doc.html_content(template) {
            let copy = doc.clone_subtree(source, &mut aliases);
            doc.adopt(container, copy);
        }
        tracing::debug!(page = doc.id(page), copies = aliases.len(), "cloned template content");

        let mut expander = Expander::new(doc, page, aliases)
            .with_max_depth(self.options.max_expansion_depth);
        expander.expand(container)?;
        let aliases = expander.into_aliases();

        Ok(serialize_children(doc, container, &Resolver::new(doc, &aliases)))
    }

    fn write_page(&self, doc: &mut Document, page: NodeHandle) -> Result<PathBuf> {
        let html = self.render_page(doc, page)?;

        let mut dir = self.options.output_dir.clone();
        dir.extend(doc.publish_dir(page).split('/').filter(|s| !s.is_empty()));
        let NodeKind::Page(info) = doc.kind(page) else {
            return Ok(dir);
        };
        let path = dir.join(format!("{}.html", info.name));

        ensure_dir(&dir).map_err(|source| Error::Io {
            location: doc.location(page),
            message: format!("cannot create directory '{}': {source}", dir.display()),
            source,
        })?;
        tracing::info!("writing page '{}' to '{}'", info.name, path.display());
        fs::write(&path, html).map_err(|source| Error::Io {
            location: doc.location(page),
            message: format!("cannot write '{}': {source}", path.display()),
            source,
        })?;
        Ok(path)
    }
}

/// Create `dir` and its parents unless it already exists.
///
/// Fails if `dir` or one of its ancestors exists as something other than a
/// directory.
fn ensure_dir(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if let Some(file) = dir.ancestors().find(|p| p.exists() && !p.is_dir()) {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("'{}' exists and is not a directory", file.display()),
        ));
    }
    fs::create_dir_all(dir)
}
