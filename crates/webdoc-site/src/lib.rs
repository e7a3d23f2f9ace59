//! Site document model, directive expansion and publishing for webdoc.
//!
//! A site is described in a small XML vocabulary (`<site>`, `<dir>`,
//! `<page>`, `<template>`, `<pagestyle>`, `<pagescript>`, `<include>`, plus
//! arbitrary HTML). [`load`] parses it into a [`Document`], an arena of
//! nodes with a per-document id registry. [`Publisher`] then renders each
//! page through its template and writes one HTML file per page.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use webdoc_site::{BuildOptions, PublishOptions, Publisher, load};
//!
//! let mut doc = load(Path::new("site.xml"), &BuildOptions::default())?;
//! let report = Publisher::new(PublishOptions::default()).publish(&mut doc)?;
//! for page in &report.pages {
//!     println!("{}", page.path.display());
//! }
//! # Ok::<(), webdoc_site::Error>(())
//! ```

mod builder;
mod document;
mod error;
mod expand;
mod html;
mod loader;
mod navigation;
mod publisher;
mod registry;
mod resolve;

pub use builder::{
    BuildOptions, DEFAULT_PAGE_TITLE, DEFAULT_SITE_URL, DEFAULT_TEMPLATE, DocumentBuilder,
};
pub use document::{
    Attributes, Checkpoint, Document, Node, NodeHandle, NodeKind, NodeType, Origin, PageInfo,
};
pub use error::{DocErrorKind, Error, Result, SourceLocation};
pub use expand::{DEFAULT_MAX_DEPTH, Expander};
pub use html::{serialize_children, write_node};
pub use loader::{load, load_str};
pub use navigation::drill_index;
pub use publisher::{DEFAULT_OUTPUT_DIR, PublishOptions, PublishReport, PublishedPage, Publisher};
pub use registry::{DEFAULT_ID_PREFIX, DuplicateId, IdRegistry};
pub use resolve::Resolver;
