//! Event-driven construction of the document tree.
//!
//! [`DocumentBuilder`] receives `element-start` / `element-end` /
//! `characters` events (from [`loader`](crate::loader) or any other event
//! source) and materializes the corresponding nodes. Vocabulary elements
//! become their dedicated [`NodeKind`] variants, everything else becomes a
//! generic HTML element. `<include>` is handled by the event source and never
//! reaches the builder.

use crate::document::{Attributes, Document, NodeHandle, NodeKind, Origin, PageInfo};
use crate::error::{DocErrorKind, Error, Result};

/// Site URL used when `<site>` has no `url` attribute.
pub const DEFAULT_SITE_URL: &str = "http://www.foo.org/";

/// Template id used by pages.
pub const DEFAULT_TEMPLATE: &str = "template.default";

/// Title of a page with neither `title` nor `src`.
pub const DEFAULT_PAGE_TITLE: &str = "untitled";

/// Attributes a `<page>` may carry.
const PAGE_ATTRIBUTES: &[&str] = &["src", "name", "id", "title"];

/// Options for tree construction.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Base URL of a `<site>` without `url` attribute.
    pub base_url: String,
    /// Template id every page is rendered with.
    pub default_template: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SITE_URL.to_owned(),
            default_template: DEFAULT_TEMPLATE.to_owned(),
        }
    }
}

/// Builds a [`Document`] from parser events.
#[derive(Debug)]
pub struct DocumentBuilder {
    doc: Document,
    stack: Vec<NodeHandle>,
    options: BuildOptions,
    page_counter: usize,
}

impl DocumentBuilder {
    /// Create a builder for an empty document.
    #[must_use]
    pub fn new(options: BuildOptions) -> Self {
        Self {
            doc: Document::new(),
            stack: Vec::new(),
            options,
            page_counter: 0,
        }
    }

    /// Handle an element start.
    ///
    /// # Errors
    ///
    /// Returns a [`Error::Doc`] for vocabulary violations (missing `dir/name`,
    /// disallowed page attribute, duplicate id).
    pub fn start_element(
        &mut self,
        name: &str,
        attrs: Attributes,
        origin: Origin,
    ) -> Result<NodeHandle> {
        let kind = match name {
            "site" => NodeKind::Site {
                url: site_url(
                    attrs
                        .get("url")
                        .map_or(self.options.base_url.as_str(), String::as_str),
                ),
            },
            "dir" => {
                let Some(dir_name) = attrs.get("name") else {
                    return Err(self.error_at(&origin, DocErrorKind::MissingAttribute {
                        element: name.to_owned(),
                        attribute: "name",
                    }));
                };
                NodeKind::Dir {
                    name: dir_name.clone(),
                }
            }
            "page" => NodeKind::Page(self.page_info(&attrs, &origin)?),
            "template" => NodeKind::Template,
            "pagestyle" => NodeKind::PageStyle,
            "pagescript" => NodeKind::PageScript,
            tag => NodeKind::Element { tag: tag.to_owned() },
        };

        let node = self.doc.create(kind, attrs, origin)?;
        match self.stack.last() {
            Some(&parent) => self.doc.adopt(parent, node),
            None => self.doc.add_root(node),
        }
        self.stack.push(node);
        Ok(node)
    }

    /// Handle an element end.
    pub fn end_element(&mut self) -> Option<NodeHandle> {
        self.stack.pop()
    }

    /// Handle character data. Text outside any element is dropped.
    pub fn characters(&mut self, text: &str, cdata: bool, origin: Origin) {
        let Some(&parent) = self.stack.last() else {
            return;
        };
        if text.is_empty() {
            return;
        }
        let node = self.doc.create_generated(
            NodeKind::Text {
                text: text.to_owned(),
                cdata,
            },
            Attributes::new(),
            origin,
        );
        self.doc.adopt(parent, node);
    }

    /// Finish construction and return the document.
    #[must_use]
    pub fn finish(self) -> Document {
        self.doc
    }

    fn page_info(&mut self, attrs: &Attributes, origin: &Origin) -> Result<PageInfo> {
        if let Some(attribute) = attrs.keys().find(|k| !PAGE_ATTRIBUTES.contains(&k.as_str())) {
            return Err(self.error_at(origin, DocErrorKind::DisallowedAttribute {
                element: "page".to_owned(),
                attribute: attribute.clone(),
            }));
        }

        self.page_counter += 1;
        let name = attrs
            .get("name")
            .cloned()
            .unwrap_or_else(|| format!("page{}", self.page_counter));
        let title = attrs
            .get("title")
            .or_else(|| attrs.get("src"))
            .cloned()
            .unwrap_or_else(|| DEFAULT_PAGE_TITLE.to_owned());

        Ok(PageInfo {
            name,
            title,
            template: self.options.default_template.clone(),
        })
    }

    /// Error located at `origin`, falling back to the open element for
    /// fields the origin does not set.
    fn error_at(&self, origin: &Origin, kind: DocErrorKind) -> Error {
        let mut location = self
            .stack
            .last()
            .map(|&parent| self.doc.location(parent))
            .unwrap_or_default();
        if let Some(file) = &origin.file {
            location.file = file.display().to_string();
        }
        if let Some(line) = origin.line {
            location.line = line;
        }
        if let Some(column) = origin.column {
            location.column = column;
        }
        Error::Doc { location, kind }
    }
}

/// Normalize a site URL so publish paths can be appended directly.
fn site_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_owned()
    } else {
        format!("{url}/")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn at(line: u32) -> Origin {
        Origin::at("site.xml", line, 1)
    }

    #[test]
    fn test_builds_vocabulary_nodes() {
        let mut builder = DocumentBuilder::new(BuildOptions::default());
        let site = builder.start_element("site", Attributes::new(), at(1)).unwrap();
        let dir = builder
            .start_element("dir", attrs(&[("name", "docs")]), at(2))
            .unwrap();
        let page = builder
            .start_element("page", attrs(&[("name", "intro"), ("title", "Intro")]), at(3))
            .unwrap();
        builder.characters("hello", false, at(3));
        builder.end_element();
        builder.end_element();
        builder.end_element();
        let doc = builder.finish();

        assert_eq!(doc.roots(), &[site]);
        assert_eq!(
            doc.kind(site),
            &NodeKind::Site {
                url: DEFAULT_SITE_URL.to_owned()
            }
        );
        assert_eq!(doc.parent(dir), Some(site));
        assert_eq!(
            doc.kind(page),
            &NodeKind::Page(PageInfo {
                name: "intro".to_owned(),
                title: "Intro".to_owned(),
                template: DEFAULT_TEMPLATE.to_owned(),
            })
        );
        assert_eq!(doc.children(page).len(), 1);
    }

    #[test]
    fn test_page_defaults() {
        let mut builder = DocumentBuilder::new(BuildOptions::default());
        builder.start_element("site", Attributes::new(), at(1)).unwrap();
        let first = builder.start_element("page", Attributes::new(), at(2)).unwrap();
        builder.end_element();
        let second = builder
            .start_element("page", attrs(&[("src", "notes.txt")]), at(3))
            .unwrap();
        let doc = builder.finish();

        let NodeKind::Page(first) = doc.kind(first) else {
            panic!("expected page");
        };
        assert_eq!(first.name, "page1");
        assert_eq!(first.title, DEFAULT_PAGE_TITLE);
        let NodeKind::Page(second) = doc.kind(second) else {
            panic!("expected page");
        };
        assert_eq!(second.name, "page2");
        assert_eq!(second.title, "notes.txt");
    }

    #[test]
    fn test_page_rejects_unknown_attribute() {
        let mut builder = DocumentBuilder::new(BuildOptions::default());
        builder.start_element("site", Attributes::new(), at(1)).unwrap();
        let err = builder
            .start_element("page", attrs(&[("class", "x")]), Origin::at("site.xml", 4, 7))
            .unwrap_err();
        assert_eq!(err.to_string(), "site.xml:4:7:page cannot have 'class' attribute");
    }

    #[test]
    fn test_dir_requires_name() {
        let mut builder = DocumentBuilder::new(BuildOptions::default());
        builder.start_element("site", Attributes::new(), at(1)).unwrap();
        let err = builder.start_element("dir", Attributes::new(), at(5)).unwrap_err();
        assert_eq!(err.to_string(), "site.xml:5:1:dir missing 'name' attribute");
    }

    #[test]
    fn test_site_url_gets_trailing_slash() {
        let mut builder = DocumentBuilder::new(BuildOptions::default());
        let site = builder
            .start_element("site", attrs(&[("url", "https://example.com/docs")]), at(1))
            .unwrap();
        let doc = builder.finish();
        assert_eq!(doc.publish_url(site).as_deref(), Some("https://example.com/docs/"));
    }

    #[test]
    fn test_options_override_defaults() {
        let options = BuildOptions {
            base_url: "https://docs.example.com".to_owned(),
            default_template: "layout".to_owned(),
        };
        let mut builder = DocumentBuilder::new(options);
        let site = builder.start_element("site", Attributes::new(), at(1)).unwrap();
        let page = builder.start_element("page", Attributes::new(), at(2)).unwrap();
        let doc = builder.finish();
        assert_eq!(doc.publish_url(site).as_deref(), Some("https://docs.example.com/"));
        let NodeKind::Page(info) = doc.kind(page) else {
            panic!("expected page");
        };
        assert_eq!(info.template, "layout");
    }

    #[test]
    fn test_unknown_names_become_elements() {
        let mut builder = DocumentBuilder::new(BuildOptions::default());
        let div = builder
            .start_element("div", attrs(&[("class", "note")]), at(1))
            .unwrap();
        let doc = builder.finish();
        assert_eq!(doc.kind(div), &NodeKind::Element { tag: "div".to_owned() });
        assert_eq!(doc.node(div).attrs().get("class").map(String::as_str), Some("note"));
    }

    #[test]
    fn test_text_outside_root_is_dropped() {
        let mut builder = DocumentBuilder::new(BuildOptions::default());
        builder.characters("stray", false, at(1));
        let doc = builder.finish();
        assert!(doc.is_empty());
    }
}
