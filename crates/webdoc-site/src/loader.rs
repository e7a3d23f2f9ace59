//! XML loader feeding `quick-xml` events into the [`DocumentBuilder`].
//!
//! Handles what the builder deliberately does not: source positions,
//! entity references and `<include src>` splicing. Included files are
//! resolved relative to the including file and parsed into the same builder,
//! so their top-level element lands at the include's position and their ids
//! share the document's registry.

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use webdoc_renderer::{entity_char, entity_replacement};

use crate::builder::{BuildOptions, DocumentBuilder};
use crate::document::{Attributes, Document, Origin};
use crate::error::{DocErrorKind, Error, Result, SourceLocation};

/// Element that splices another file in place.
const INCLUDE: &str = "include";

/// Load the document rooted at `path`, following includes.
///
/// # Errors
///
/// Returns [`Error::Io`] if `path` cannot be read, [`Error::Parse`] for
/// malformed XML and [`Error::Doc`] for vocabulary errors.
pub fn load(path: &Path, options: &BuildOptions) -> Result<Document> {
    let source = fs::read_to_string(path).map_err(|source| Error::Io {
        location: SourceLocation::file(path.display().to_string()),
        message: format!("cannot read '{}': {source}", path.display()),
        source,
    })?;
    load_str(path, &source, options)
}

/// Load a document from an in-memory source.
///
/// `path` names the source in diagnostics and anchors relative includes.
///
/// # Errors
///
/// Same as [`load`], minus the initial read.
pub fn load_str(path: &Path, source: &str, options: &BuildOptions) -> Result<Document> {
    let mut loader = Loader {
        builder: DocumentBuilder::new(options.clone()),
        files: Vec::new(),
    };
    loader.parse_file(path, source)?;
    Ok(loader.builder.finish())
}

/// What an open start tag turned into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Open {
    /// A node on the builder's stack.
    Node,
    /// An include element or something nested in one; produces nothing.
    Skipped,
}

/// Text accumulated between two markup events.
#[derive(Default)]
struct PendingText {
    text: String,
    origin: Option<Origin>,
}

impl PendingText {
    fn push(&mut self, text: &str, origin: impl FnOnce() -> Origin) {
        if self.origin.is_none() {
            self.origin = Some(origin());
        }
        self.text.push_str(text);
    }
}

struct Loader {
    builder: DocumentBuilder,
    /// Files being parsed, outermost first.
    files: Vec<PathBuf>,
}

impl Loader {
    fn parse_file(&mut self, path: &Path, source: &str) -> Result<()> {
        self.files.push(canonical(path));
        let result = self.parse_events(path, source);
        self.files.pop();
        result
    }

    fn parse_events(&mut self, path: &Path, source: &str) -> Result<()> {
        let lines = LineIndex::new(source);
        let origin_at = |offset: u64| {
            let (line, column) = lines.locate(offset);
            Origin::at(path, line, column)
        };
        let parse_error = |offset: u64, message: String| {
            let (line, column) = lines.locate(offset);
            Error::Parse {
                location: SourceLocation {
                    file: path.display().to_string(),
                    line,
                    column,
                },
                message,
            }
        };

        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(false);

        let mut open: Vec<Open> = Vec::new();
        let mut pending = PendingText::default();

        loop {
            let offset = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| parse_error(reader.error_position(), e.to_string()))?;

            match event {
                Event::Start(e) => {
                    self.flush(&mut pending);
                    if open.last() == Some(&Open::Skipped) {
                        open.push(Open::Skipped);
                        continue;
                    }
                    let (name, attrs) =
                        decode_start(&reader, &e).map_err(|message| parse_error(offset, message))?;
                    if name == INCLUDE {
                        self.include(path, &attrs, origin_at(offset))?;
                        open.push(Open::Skipped);
                    } else {
                        self.builder.start_element(&name, attrs, origin_at(offset))?;
                        open.push(Open::Node);
                    }
                }
                Event::Empty(e) => {
                    self.flush(&mut pending);
                    if open.last() == Some(&Open::Skipped) {
                        continue;
                    }
                    let (name, attrs) =
                        decode_start(&reader, &e).map_err(|message| parse_error(offset, message))?;
                    if name == INCLUDE {
                        self.include(path, &attrs, origin_at(offset))?;
                    } else {
                        self.builder.start_element(&name, attrs, origin_at(offset))?;
                        self.builder.end_element();
                    }
                }
                Event::End(_) => {
                    self.flush(&mut pending);
                    if open.pop() == Some(Open::Node) {
                        self.builder.end_element();
                    }
                }
                Event::Text(e) => {
                    if open.last() == Some(&Open::Node) {
                        let text = reader
                            .decoder()
                            .decode(&e)
                            .map_err(|e| parse_error(offset, e.to_string()))?;
                        pending.push(&text, || origin_at(offset));
                    }
                }
                Event::GeneralRef(e) => {
                    if open.last() == Some(&Open::Node) {
                        let name = reader
                            .decoder()
                            .decode(&e)
                            .map_err(|e| parse_error(offset, e.to_string()))?;
                        let c = decode_entity(&name).ok_or_else(|| {
                            parse_error(offset, format!("unknown entity '&{name};'"))
                        })?;
                        pending.push(c.encode_utf8(&mut [0; 4]), || origin_at(offset));
                    }
                }
                Event::CData(e) => {
                    self.flush(&mut pending);
                    if open.last() == Some(&Open::Node) {
                        let text = String::from_utf8_lossy(&e);
                        self.builder.characters(&text, true, origin_at(offset));
                    }
                }
                Event::Eof => {
                    self.flush(&mut pending);
                    if !open.is_empty() {
                        return Err(parse_error(
                            offset,
                            "unclosed element at end of file".to_owned(),
                        ));
                    }
                    return Ok(());
                }
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
        }
    }

    fn flush(&mut self, pending: &mut PendingText) {
        if let Some(origin) = pending.origin.take() {
            self.builder.characters(&pending.text, false, origin);
        }
        pending.text.clear();
    }

    /// Parse the file named by an include element into the current position.
    fn include(&mut self, including: &Path, attrs: &Attributes, origin: Origin) -> Result<()> {
        let location = SourceLocation {
            file: including.display().to_string(),
            line: origin.line.unwrap_or(0),
            column: origin.column.unwrap_or(0),
        };
        let Some(src) = attrs.get("src") else {
            return Err(Error::Doc {
                location,
                kind: DocErrorKind::MissingAttribute {
                    element: INCLUDE.to_owned(),
                    attribute: "src",
                },
            });
        };

        let path = including
            .parent()
            .map_or_else(|| PathBuf::from(src), |dir| dir.join(src));
        if self.files.contains(&canonical(&path)) {
            return Err(Error::Doc {
                location,
                kind: DocErrorKind::IncludeCycle(path),
            });
        }

        tracing::info!("sourcing '{}'", path.display());
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(source) => {
                return Err(Error::Doc {
                    location,
                    kind: DocErrorKind::IncludeNotFound { path, source },
                });
            }
        };
        self.parse_file(&path, &source)
    }
}

/// Path used to recognize a file already being parsed.
fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Decode the name and attributes of a start tag.
fn decode_start(
    reader: &Reader<&[u8]>,
    e: &BytesStart,
) -> std::result::Result<(String, Attributes), String> {
    let decoder = reader.decoder();
    let name = decoder
        .decode(e.name().as_ref())
        .map_err(|e| e.to_string())?
        .into_owned();

    let mut attrs = Attributes::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = decoder
            .decode(attr.key.as_ref())
            .map_err(|e| e.to_string())?
            .into_owned();
        let value = attr
            .decode_and_unescape_value_with(decoder, |name| {
                resolve_predefined_entity(name).or_else(|| entity_replacement(name))
            })
            .map_err(|e| format!("attribute '{key}': {e}"))?;
        attrs.insert(key, value.into_owned());
    }
    Ok((name, attrs))
}

/// Resolve an entity name: the five XML entities, numeric references and
/// HTML 4 named entities.
fn decode_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        s if s.starts_with("#x") || s.starts_with("#X") => {
            u32::from_str_radix(&s[2..], 16).ok().and_then(char::from_u32)
        }
        s if s.starts_with('#') => s[1..].parse::<u32>().ok().and_then(char::from_u32),
        s => entity_char(s),
    }
}

/// Converts byte offsets to 1-based line and column (in characters).
struct LineIndex<'a> {
    source: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { source, starts }
    }

    fn locate(&self, offset: u64) -> (u32, u32) {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX).min(self.source.len());
        let line = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[line - 1];
        let column = self
            .source
            .get(start..offset)
            .map_or(offset - start, |s| s.chars().count());
        (
            u32::try_from(line).unwrap_or(u32::MAX),
            u32::try_from(column + 1).unwrap_or(u32::MAX),
        )
    }
}
