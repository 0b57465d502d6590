//! Extracts [`Metadata`] from `xyl-meta` processing instructions. A post
//! declares its metadata at document level, outside of its root element:
//!
//! ```xml
//! <?xyl-meta name="title" value="Hello, world!"?>
//! <?xyl-meta name="date" value="2024-01-01T00:00:00Z"?>
//! <?xyl-meta name="layout" value="Special"?>
//! <article>...</article>
//! ```
//!
//! [`extract`] harvests these instructions and returns the rest of the
//! document, minus the instructions and the XML declaration, as the post's
//! body.

use quick_xml::escape::{unescape, EscapeError};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::Utf8Error;

/// The processing-instruction target that marks a metadata directive.
pub const META_TARGET: &str = "xyl-meta";

const TITLE: &str = "title";
const DATE: &str = "date";
const LAYOUT: &str = "layout";

/// The directives of a single document, keyed by name. There are no public
/// mutators; a [`Metadata`] is fixed once [`extract`] returns it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.get(TITLE)
    }

    /// The raw `date` directive, unparsed.
    pub fn date(&self) -> Option<&str> {
        self.get(DATE)
    }

    /// The `layout` directive. An empty value counts as absent.
    pub fn layout(&self) -> Option<&str> {
        self.get(LAYOUT).filter(|layout| !layout.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parses `source`, collects every document-level `xyl-meta` instruction
/// into a [`Metadata`] (the last occurrence of a name wins), and returns it
/// along with the re-serialized remainder of the document. Instructions
/// nested inside elements are left untouched.
///
/// The body may hold several top-level elements, but each must be closed
/// by a matching end tag.
pub fn extract(source: &str) -> Result<(Metadata, String)> {
    let mut reader = Reader::from_str(source);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = true;
    config.check_comments = false;

    let mut writer = Writer::new(Vec::with_capacity(source.len()));
    let mut metadata = BTreeMap::new();
    let mut depth = 0usize;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Eof if depth > 0 => return Err(Error::Unclosed { depth }),
            Event::Eof => break,
            Event::Decl(_) => continue,
            Event::PI(pi) if depth == 0 && pi.target() == META_TARGET.as_bytes() => {
                let (name, value) = directive(std::str::from_utf8(pi.content())?)?;
                log::debug!("directive `{}` = {:?}", name, value);
                metadata.insert(name, value);
                continue;
            }
            Event::Start(_) => depth += 1,
            Event::End(end) if depth == 0 => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                return Err(Error::UnmatchedEnd(name));
            }
            Event::End(_) => depth -= 1,
            _ => {}
        }
        writer.write_event(event)?;
    }

    let body = String::from_utf8(writer.into_inner()).map_err(|e| e.utf8_error())?;
    Ok((Metadata(metadata), body))
}

// Reads the `name` and `value` attributes out of an instruction payload such
// as ` name="title" value="Hello"`.
fn directive(payload: &str) -> Result<(String, String)> {
    // The payload is an attribute list; borrow the element parser for it.
    let element = BytesStart::from_content(format!("meta {}", payload), 4);
    let mut name = None;
    let mut value = None;
    for attr in element.attributes() {
        let attr = attr?;
        let raw = std::str::from_utf8(&attr.value)?;
        match attr.key.as_ref() {
            b"name" => name = Some(unescape(raw)?.into_owned()),
            b"value" => value = Some(unescape(raw)?.into_owned()),
            _ => {}
        }
    }

    match (name, value) {
        (Some(name), Some(value)) => Ok((name, value)),
        (None, _) => Err(Error::MissingAttribute {
            attribute: "name",
            payload: payload.trim().to_owned(),
        }),
        (Some(_), None) => Err(Error::MissingAttribute {
            attribute: "value",
            payload: payload.trim().to_owned(),
        }),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem extracting metadata from a document.
#[derive(Debug)]
pub enum Error {
    /// Returned when the document isn't well-formed enough to be read,
    /// including when an end tag doesn't match the element it closes.
    Xml(quick_xml::Error),

    /// Returned when an end tag appears outside of any element.
    UnmatchedEnd(String),

    /// Returned when the document ends with elements still open.
    Unclosed { depth: usize },

    /// Returned when a directive's payload isn't a valid attribute list.
    Attribute(AttrError),

    /// Returned when a directive's attribute holds an unknown entity.
    Escape(EscapeError),

    /// Returned when a directive lacks its `name` or `value` attribute.
    MissingAttribute {
        attribute: &'static str,
        payload: String,
    },

    /// Returned when the document or a directive isn't valid UTF-8.
    Utf8(Utf8Error),

    /// Returned when re-serializing the body fails.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Xml(err) => err.fmt(f),
            Error::UnmatchedEnd(name) => write!(f, "end tag `</{}>` closes no element", name),
            Error::Unclosed { depth } => {
                write!(f, "document ends with {} unclosed element(s)", depth)
            }
            Error::Attribute(err) => write!(f, "malformed `{}` directive: {}", META_TARGET, err),
            Error::Escape(err) => write!(f, "malformed `{}` directive: {}", META_TARGET, err),
            Error::MissingAttribute { attribute, payload } => write!(
                f,
                "`{}` directive `{}` has no `{}` attribute",
                META_TARGET, payload, attribute
            ),
            Error::Utf8(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Xml(err) => Some(err),
            Error::UnmatchedEnd(_) => None,
            Error::Unclosed { .. } => None,
            Error::Attribute(err) => Some(err),
            Error::Escape(err) => Some(err),
            Error::MissingAttribute { .. } => None,
            Error::Utf8(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Error {
        Error::Xml(err)
    }
}

impl From<AttrError> for Error {
    fn from(err: AttrError) -> Error {
        Error::Attribute(err)
    }
}

impl From<EscapeError> for Error {
    fn from(err: EscapeError) -> Error {
        Error::Escape(err)
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Error {
        Error::Utf8(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
