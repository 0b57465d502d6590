//! The template interpreter. A document is interpreted from a layout, zero or
//! more overlays, and a data context. Overlays are layered, in the order they
//! were added, into the `content` slot, which the layout pulls in with
//! `{{template "content" .}}`:
//!
//! ```text
//! <html><body>{{template "content" .}}</body></html>
//! ```
//!
//! Interpretation happens entirely in memory; the resulting [`Interpreted`]
//! document is written to disk separately.

use crate::router::Router;
use crate::util::{self, PathError};
use gtmpl::{Context, Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The name of the template slot that receives the overlays.
pub const CONTENT_SLOT: &str = "content";

/// The data-context key under which the router is exposed.
pub const ROUTES_KEY: &str = "routes";

/// A layout waiting to be interpreted, along with its overlays and data.
pub struct Xyl<'r> {
    layout: PathBuf,
    source: String,
    overlays: Vec<String>,
    data: HashMap<String, Value>,
    router: &'r Router,
}

impl<'r> Xyl<'r> {
    /// Reads the layout at `layout`. Fails if the layout doesn't exist.
    pub fn open(layout: &Path, router: &'r Router) -> Result<Xyl<'r>> {
        Ok(Xyl {
            layout: layout.to_owned(),
            source: util::read_to_string(layout)?,
            overlays: Vec::new(),
            data: HashMap::new(),
            router,
        })
    }

    pub fn add_overlay<S: Into<String>>(&mut self, overlay: S) {
        self.overlays.push(overlay.into());
    }

    pub fn add_overlay_file(&mut self, path: &Path) -> Result<()> {
        self.add_overlay(util::read_to_string(path)?);
        Ok(())
    }

    /// The data context handed to the template.
    pub fn data_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.data
    }

    /// Resolves the layout, overlays, and data into an in-memory document.
    pub fn interpret(self) -> Result<Interpreted> {
        let Xyl {
            layout,
            mut source,
            overlays,
            mut data,
            router,
        } = self;

        source.push_str(&format!("{{{{define \"{}\"}}}}", CONTENT_SLOT));
        for overlay in &overlays {
            source.push_str(overlay);
        }
        source.push_str("{{end}}");

        let mut template = Template::default();
        template.parse(&source).map_err(|err| Error::Parse {
            layout: layout.clone(),
            err,
        })?;

        data.insert(ROUTES_KEY.to_owned(), Value::from(router));
        let context = Context::from(Value::Object(data)).map_err(Error::Context)?;

        let mut bytes = Vec::new();
        template
            .execute(&mut bytes, &context)
            .map_err(|err| Error::Execute { layout, err })?;
        Ok(Interpreted(bytes))
    }
}

/// An interpreted document, ready to be serialized.
#[derive(Clone, Debug, PartialEq)]
pub struct Interpreted(Vec<u8>);

impl Interpreted {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Writes the document to `path`, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> std::result::Result<(), PathError> {
        std::fs::write(path, &self.0).map_err(|e| PathError::new(path, e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem interpreting a document.
#[derive(Debug)]
pub enum Error {
    /// Returned when the layout or one of its overlays doesn't parse.
    Parse { layout: PathBuf, err: String },

    /// Returned when executing the parsed template fails.
    Execute { layout: PathBuf, err: String },

    /// Returned when the data context is rejected.
    Context(String),

    /// Returned when the layout or an overlay file can't be read.
    Io(PathError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse { layout, err } => {
                write!(f, "parsing layout `{}`: {}", layout.display(), err)
            }
            Error::Execute { layout, err } => {
                write!(f, "executing layout `{}`: {}", layout.display(), err)
            }
            Error::Context(err) => write!(f, "building data context: {}", err),
            Error::Io(err) => write!(f, "reading template {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse { .. } => None,
            Error::Execute { .. } => None,
            Error::Context(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<PathError> for Error {
    fn from(err: PathError) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn render(xyl: Xyl) -> Result<String> {
        Ok(String::from_utf8_lossy(xyl.interpret()?.as_bytes()).into_owned())
    }

    #[test]
    fn test_overlays_fill_content_slot() -> Result<()> {
        let router = Router::new(None).route("home", "/");
        let mut xyl = Xyl::open(Path::new("./testdata/site/In/Layouts/Main.xyl"), &router)?;
        xyl.add_overlay("<p>one</p>");
        xyl.add_overlay("<p>{{.title}}</p>");
        xyl.data_mut()
            .insert("title".to_owned(), Value::String("two".to_owned()));

        let output = render(xyl)?;
        assert!(output.contains("<p>one</p><p>two</p>"));
        assert!(output.contains(r#"<a href="/">"#));
        Ok(())
    }

    #[test]
    fn test_missing_layout() {
        let router = Router::default();
        match Xyl::open(Path::new("./testdata/site/In/Layouts/Nope.xyl"), &router) {
            Err(Error::Io(err)) => assert!(err.path.ends_with("Nope.xyl")),
            Err(err) => panic!("unexpected error: {}", err),
            Ok(_) => panic!("expected an error"),
        }
    }
}
