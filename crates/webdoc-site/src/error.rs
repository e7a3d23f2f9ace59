//! Error types for document loading, expansion and publishing.
//!
//! Every error carries the [`SourceLocation`] of the node (or XML position)
//! that caused it and displays as `<file>:<line>:<column>:<message>`, which
//! is the single diagnostic line the CLI prints.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Resolved source position of a node, used only for diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceLocation {
    /// Source file as written on the command line or in `<include src>`.
    pub file: String,
    /// 1-based line, `0` when unknown.
    pub line: u32,
    /// 1-based column, `0` when unknown.
    pub column: u32,
}

impl SourceLocation {
    /// Location pointing at a whole file.
    #[must_use]
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Error returned by loading, expansion or publishing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed XML.
    #[error("{location}:{message}")]
    Parse {
        /// Position reported by the XML reader.
        location: SourceLocation,
        /// Reader message.
        message: String,
    },
    /// Vocabulary or reference error on a specific node.
    #[error("{location}:{kind}")]
    Doc {
        /// Location of the offending node, inherited from ancestors if unset.
        location: SourceLocation,
        /// What went wrong.
        kind: DocErrorKind,
    },
    /// Output could not be written.
    #[error("{location}:{message}")]
    Io {
        /// Location of the page being published.
        location: SourceLocation,
        /// Human-readable description including the path.
        message: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Location the error is reported at.
    #[must_use]
    pub fn location(&self) -> &SourceLocation {
        match self {
            Self::Parse { location, .. }
            | Self::Doc { location, .. }
            | Self::Io { location, .. } => location,
        }
    }
}

/// Kinds of [`Error::Doc`].
#[derive(Debug, thiserror::Error)]
pub enum DocErrorKind {
    /// A required attribute is absent (`include/src`, `dir/name`).
    #[error("{element} missing '{attribute}' attribute")]
    MissingAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: &'static str,
    },
    /// An attribute the vocabulary does not allow on this element.
    #[error("{element} cannot have '{attribute}' attribute")]
    DisallowedAttribute {
        /// Element name.
        element: String,
        /// Offending attribute.
        attribute: String,
    },
    /// Attribute-context directive other than `pathto:<id>`.
    #[error("unknown directive '{0}'")]
    UnknownDirective(String),
    /// An explicit id that is already registered.
    #[error("duplicate id '{id}' (first defined at {previous})")]
    DuplicateId {
        /// The conflicting id.
        id: String,
        /// Location of the node that registered it first.
        previous: SourceLocation,
    },
    /// A page names a template id that is not a registered template.
    #[error("cannot find template '{0}'")]
    MissingTemplate(String),
    /// An included file could not be read.
    #[error("cannot read included file '{}'", .path.display())]
    IncludeNotFound {
        /// Path the include resolved to.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A file includes itself, directly or through other files.
    #[error("include cycle through '{}'", .0.display())]
    IncludeCycle(PathBuf),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let location = SourceLocation {
            file: "site.xml".to_owned(),
            line: 3,
            column: 7,
        };
        assert_eq!(location.to_string(), "site.xml:3:7");
    }

    #[test]
    fn test_doc_error_display_is_single_diagnostic_line() {
        let err = Error::Doc {
            location: SourceLocation {
                file: "site.xml".to_owned(),
                line: 4,
                column: 2,
            },
            kind: DocErrorKind::MissingAttribute {
                element: "include".to_owned(),
                attribute: "src",
            },
        };
        assert_eq!(
            err.to_string(),
            "site.xml:4:2:include missing 'src' attribute"
        );
    }

    #[test]
    fn test_duplicate_id_names_both_locations() {
        let err = Error::Doc {
            location: SourceLocation {
                file: "b.xml".to_owned(),
                line: 9,
                column: 1,
            },
            kind: DocErrorKind::DuplicateId {
                id: "intro".to_owned(),
                previous: SourceLocation {
                    file: "a.xml".to_owned(),
                    line: 2,
                    column: 5,
                },
            },
        };
        let message = err.to_string();
        assert!(message.starts_with("b.xml:9:1:"));
        assert!(message.contains("a.xml:2:5"));
    }

    #[test]
    fn test_unknown_location_renders_zeroes() {
        assert_eq!(SourceLocation::file("x.xml").to_string(), "x.xml:0:0");
        assert_eq!(SourceLocation::default().to_string(), ":0:0");
    }
}
