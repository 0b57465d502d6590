//! Exports the [`Builder`], which stitches together the high-level steps of a
//! build: resetting the output directory, building every post
//! ([`crate::post`]), and rendering the index page from the built posts.

use crate::config::{Config, CONTENT_EXTENSION};
use crate::post::{Error as PostError, Post};
use crate::router::Router;
use crate::util::PathError;
use crate::value;
use crate::xyl::{Error as TemplateError, Xyl};
use chrono::{SecondsFormat, TimeZone, Utc};
use gtmpl::Value;
use gtmpl_derive::Gtmpl;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Drives a single build. A [`Builder`] holds the posts it has built, in the
/// order it built them, so it is good for one build only.
pub struct Builder<'a> {
    config: &'a Config,
    router: &'a Router,
    posts: Vec<Post>,
}

/// The summary of a post that the index template sees. Each entry in the
/// index's `posts` list has the fields `title`, `url`, `timestamp`, and
/// `date`. The strings are escaped for markup, since templates splice them
/// in verbatim.
#[derive(Clone, Debug, PartialEq, Gtmpl)]
pub struct IndexEntry {
    pub title: String,

    /// The post's output path, relative to the output root.
    pub url: String,

    /// Seconds since the Unix epoch.
    pub timestamp: i64,

    /// The timestamp as an ISO-8601 date-time in UTC.
    pub date: String,
}

impl<'a> Builder<'a> {
    pub fn new(config: &'a Config, router: &'a Router) -> Builder<'a> {
        Builder {
            config,
            router,
            posts: Vec::new(),
        }
    }

    /// Runs the full build: [`Builder::reset`], [`Builder::build_posts`],
    /// then [`Builder::build_index`]. The first failure aborts the build and
    /// may leave the output directory partially written.
    pub fn build(&mut self) -> Result<()> {
        self.reset()?;
        log::info!("output directory prepared");

        self.build_posts()?;
        log::info!("{} post(s) built", self.posts.len());

        self.build_index()?;
        log::info!("index built");
        Ok(())
    }

    /// Deletes the output directory, if there is one, and recreates it empty.
    pub fn reset(&self) -> Result<()> {
        let dir = &self.config.output_directory;
        rmdir(dir)?;
        std::fs::create_dir_all(dir).map_err(|e| Error::Io(PathError::new(dir, e)))
    }

    /// Finds every content file under the content directory, at any depth,
    /// and builds and renders them one at a time. Files are visited in
    /// descending order of their full path. Each post joins [`Builder::posts`]
    /// once it is constructed, before it is rendered.
    pub fn build_posts(&mut self) -> Result<()> {
        for source in discover(&self.config.content_directory)? {
            self.posts.push(Post::new(&source, self.config, self.router)?);
            if let Some(post) = self.posts.last_mut() {
                post.render()?;
            }
        }
        Ok(())
    }

    /// Renders the default layout with the index overlay to
    /// `{output_directory}/index.html`. The overlay sees the built posts, in
    /// build order, as `posts` (see [`IndexEntry`]).
    pub fn build_index(&self) -> Result<()> {
        let mut xyl = Xyl::open(
            &self.config.layout_path(&self.config.default_layout),
            self.router,
        )?;
        let posts: Vec<Value> = self
            .index_entries()?
            .into_iter()
            .map(Into::into)
            .collect();
        xyl.data_mut()
            .insert("posts".to_owned(), Value::Array(posts));
        xyl.add_overlay_file(&self.config.index_overlay)?;

        let path = self.config.index_path();
        xyl.interpret()?.write_to(&path)?;
        log::info!("rendered `{}`", path.display());
        Ok(())
    }

    /// Summarizes the built posts, in build order.
    pub fn index_entries(&self) -> Result<Vec<IndexEntry>> {
        self.posts.iter().map(IndexEntry::from_post).collect()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }
}

impl IndexEntry {
    fn from_post(post: &Post) -> Result<IndexEntry> {
        let date = Utc
            .timestamp_opt(post.timestamp(), 0)
            .single()
            .ok_or_else(|| Error::TimestampOutOfRange(post.timestamp()))?
            .to_rfc3339_opts(SecondsFormat::Secs, false);
        Ok(IndexEntry {
            title: value::markup(post.title()),
            url: value::markup(&post.output_filename().to_string_lossy()),
            timestamp: post.timestamp(),
            date,
        })
    }
}

/// Lists the content files under `dir`, recursively, sorted by descending
/// full path. Paths are compared as raw strings, so `a/b.xyl` sorts after
/// `a-b.xyl`.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for result in WalkDir::new(dir) {
        let entry = result?;
        if entry.file_type().is_file()
            && entry.path().extension() == Some(OsStr::new(CONTENT_EXTENSION))
        {
            sources.push(entry.into_path());
        }
    }
    sources.sort_by(|a, b| b.as_os_str().cmp(a.as_os_str()));
    Ok(sources)
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean(PathError::new(dir, e))),
        },
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for a build. Errors can come from building posts,
/// rendering the index, cleaning or creating the output directory, and
/// walking the content directory.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors building a post.
    Post(PostError),

    /// Returned for errors interpreting the index.
    Template(TemplateError),

    /// Returned for I/O problems while cleaning the output directory.
    Clean(PathError),

    /// Returned for errors walking the content directory.
    WalkDir(walkdir::Error),

    /// Returned when a post's timestamp can't be represented as a date.
    TimestampOutOfRange(i64),

    /// Returned for other I/O errors.
    Io(PathError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Post(err) => err.fmt(f),
            Error::Template(err) => write!(f, "building index: {}", err),
            Error::Clean(err) => write!(f, "Cleaning directory {}", err),
            Error::WalkDir(err) => err.fmt(f),
            Error::TimestampOutOfRange(ts) => write!(f, "timestamp {} is out of range", ts),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Post(err) => Some(err),
            Error::Template(err) => Some(err),
            Error::Clean(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::TimestampOutOfRange(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<PostError> for Error {
    /// Converts [`PostError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: PostError) -> Error {
        Error::Post(err)
    }
}

impl From<TemplateError> for Error {
    /// Converts [`TemplateError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: TemplateError) -> Error {
        Error::Template(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
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

    #[test]
    fn test_discover_order() -> Result<()> {
        let sources = discover(Path::new("./testdata/site/In/Posts"))?;
        assert_eq!(
            sources,
            vec![
                PathBuf::from("./testdata/site/In/Posts/notes/undated.xyl"),
                PathBuf::from("./testdata/site/In/Posts/hello.xyl"),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_index_entries() -> Result<()> {
        let out = tempfile::tempdir().unwrap();
        let mut config = Config::with_root(Path::new("./testdata/site"));
        config.output_directory = out.path().join("Out");
        let router = Router::new(None).route("home", "/");

        let mut builder = Builder::new(&config, &router);
        builder.reset()?;
        builder.build_posts()?;

        let entries = builder.index_entries()?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Undated");
        assert_eq!(entries[0].url, "notes/undated.html");
        assert_eq!(
            entries[1],
            IndexEntry {
                title: "Hello".to_owned(),
                url: "hello.html".to_owned(),
                timestamp: 1704067200,
                date: "2024-01-01T00:00:00+00:00".to_owned(),
            }
        );
        Ok(())
    }

    #[test]
    fn test_reset_is_idempotent() -> Result<()> {
        let out = tempfile::tempdir().unwrap();
        let mut config = Config::with_root(Path::new("./testdata/site"));
        config.output_directory = out.path().join("Out");
        let router = Router::default();
        let builder = Builder::new(&config, &router);

        builder.reset()?;
        std::fs::write(config.output_directory.join("stale.html"), "stale").unwrap();
        builder.reset()?;
        builder.reset()?;

        assert!(config.output_directory.is_dir());
        assert_eq!(
            std::fs::read_dir(&config.output_directory).unwrap().count(),
            0
        );
        Ok(())
    }
}
