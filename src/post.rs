//! Defines the [`Post`] type. A post is built in two phases: [`Post::new`]
//! extracts the post's metadata, resolves its identity and timestamp, and
//! interprets it against its layout, all in memory; [`Post::render`] then
//! writes the interpreted document to the output tree.

use crate::config::{Config, OUTPUT_EXTENSION};
use crate::metadata::{self, Metadata};
use crate::router::Router;
use crate::util::{self, PathError};
use crate::value;
use crate::xyl::{self, Interpreted, Xyl};
use chrono::{DateTime, Utc};
use gtmpl::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// A single content document.
#[derive(Debug)]
pub struct Post {
    /// The path of the source file.
    source: PathBuf,

    /// The source path relative to the content root, without its extension
    /// (e.g., `notes/hello` for `{content_directory}/notes/hello.xyl`).
    relative_path: PathBuf,

    title: String,
    metadata: Metadata,

    /// The document with its directives stripped. This is the overlay laid
    /// into the post's layout.
    body: String,

    /// Seconds since the Unix epoch.
    timestamp: i64,

    layout: String,
    state: State,
}

/// Whether a post's interpreted document has been written out yet.
#[derive(Debug)]
pub enum State {
    Pending {
        document: Interpreted,
        destination: PathBuf,
    },
    Rendered {
        destination: PathBuf,
    },
}

impl Post {
    /// Constructs a post from its source file. This creates the post's output
    /// directory, extracts its metadata, and interprets it against its layout
    /// (the `layout` directive, or [`Config::default_layout`]). Nothing is
    /// written until [`Post::render`].
    pub fn new(source: &Path, config: &Config, router: &Router) -> Result<Post> {
        Post::construct(source, config, router).map_err(|e| {
            Error::Annotated(format!("building post `{}`", source.display()), Box::new(e))
        })
    }

    fn construct(source: &Path, config: &Config, router: &Router) -> Result<Post> {
        let relative_path = source
            .strip_prefix(&config.content_directory)
            .map_err(|_| Error::OutsideContentRoot(source.to_owned()))?
            .with_extension("");

        if let Some(parent) = relative_path.parent() {
            let dir = config.output_directory.join(parent);
            log::debug!("creating directory `{}`", dir.display());
            std::fs::create_dir_all(&dir).map_err(|e| PathError::new(&dir, e))?;
        }

        let contents = util::read_to_string(source)?;
        let (metadata, body) = metadata::extract(&contents)?;
        let title = metadata.title().ok_or(Error::MissingTitle)?.to_owned();
        let timestamp = resolve_timestamp(&metadata, source)?;
        let layout = metadata
            .layout()
            .unwrap_or(&config.default_layout)
            .to_owned();

        let mut xyl = Xyl::open(&config.layout_path(&layout), router)?;
        xyl.add_overlay(body.as_str());
        let data = xyl.data_mut();
        data.insert("title".to_owned(), value::text(&title));
        data.insert("date".to_owned(), value::optional(metadata.date()));
        data.insert("timestamp".to_owned(), Value::from(timestamp));
        data.insert("meta".to_owned(), Value::from(&metadata));
        let document = xyl.interpret()?;

        let destination = config
            .output_directory
            .join(output_filename(&relative_path));
        Ok(Post {
            source: source.to_owned(),
            relative_path,
            title,
            metadata,
            body,
            timestamp,
            layout,
            state: State::Pending {
                document,
                destination,
            },
        })
    }

    /// Writes the interpreted document to the output tree. Rendering an
    /// already-rendered post does nothing.
    pub fn render(&mut self) -> Result<()> {
        let destination = match &self.state {
            State::Rendered { destination } => {
                log::debug!("`{}` is already rendered", destination.display());
                return Ok(());
            }
            State::Pending {
                document,
                destination,
            } => {
                document.write_to(destination)?;
                destination.clone()
            }
        };
        log::info!("rendered `{}`", destination.display());
        self.state = State::Rendered { destination };
        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// The output path relative to the output root: the relative source path
    /// with the output extension.
    pub fn output_filename(&self) -> PathBuf {
        output_filename(&self.relative_path)
    }

    /// The `date` directive in seconds since the Unix epoch, or the source
    /// file's modification time if the post has no `date`.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// The name of the layout the post was interpreted against.
    pub fn layout_name(&self) -> &str {
        &self.layout
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self.state, State::Rendered { .. })
    }
}

fn output_filename(relative_path: &Path) -> PathBuf {
    let mut name = relative_path.as_os_str().to_owned();
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    PathBuf::from(name)
}

// A `date` directive that fails to parse is an error; the modification time is
// only consulted when there is no directive at all.
fn resolve_timestamp(metadata: &Metadata, source: &Path) -> Result<i64> {
    match metadata.date() {
        Some(date) => parse_date(date).map_err(|err| Error::Date {
            date: date.to_owned(),
            err,
        }),
        None => {
            let modified = std::fs::metadata(source)
                .and_then(|m| m.modified())
                .map_err(|e| PathError::new(source, e))?;
            Ok(DateTime::<Utc>::from(modified).timestamp())
        }
    }
}

/// Parses an ISO-8601 date-time, either in RFC 3339 form
/// (`2024-01-01T00:00:00Z`, `2024-01-01T00:00:00+01:00`) or with a basic
/// offset (`2024-01-01T00:00:00+0100`), into seconds since the Unix epoch.
pub fn parse_date(date: &str) -> std::result::Result<i64, chrono::ParseError> {
    DateTime::parse_from_rfc3339(date)
        .or_else(|_| DateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|dt| dt.timestamp())
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem building a [`Post`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the source file isn't under the content root.
    OutsideContentRoot(PathBuf),

    /// Returned when the post has no `title` directive.
    MissingTitle,

    /// Returned when the `date` directive isn't an ISO-8601 date-time.
    Date {
        date: String,
        err: chrono::ParseError,
    },

    /// Returned when the post's directives can't be extracted.
    Metadata(metadata::Error),

    /// Returned when the post can't be interpreted against its layout.
    Template(xyl::Error),

    /// Returned for I/O errors.
    Io(PathError),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OutsideContentRoot(path) => {
                write!(f, "`{}` is outside the content directory", path.display())
            }
            Error::MissingTitle => write!(f, "missing `title` directive"),
            Error::Date { date, err } => write!(f, "invalid date `{}`: {}", date, err),
            Error::Metadata(err) => err.fmt(f),
            Error::Template(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::Annotated(annotation, err) => write!(f, "{}: {}", annotation, err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OutsideContentRoot(_) => None,
            Error::MissingTitle => None,
            Error::Date { err, .. } => Some(err),
            Error::Metadata(err) => Some(err),
            Error::Template(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<metadata::Error> for Error {
    fn from(err: metadata::Error) -> Error {
        Error::Metadata(err)
    }
}

impl From<xyl::Error> for Error {
    fn from(err: xyl::Error) -> Error {
        Error::Template(err)
    }
}

impl From<PathError> for Error {
    fn from(err: PathError) -> Error {
        Error::Io(err)
    }
}
