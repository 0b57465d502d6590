//! Defines the [`Config`] type which locates every input and output of a
//! build. A project is a directory holding a `xylem.yaml` project file; every
//! key in that file is optional and defaults to the conventional layout:
//!
//! ```text
//! xylem.yaml
//! In/
//!   Posts/        content root, `*.xyl` at any depth
//!   Layouts/      `Main.xyl` and any other named layout
//!   Index.xyl     overlay applied on top of the index layout
//!   Router.yaml   route definitions
//! Out/            output root, recreated on every build
//! ```

use crate::util::{self, PathError};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// The name of the project file.
pub const PROJECT_FILE: &str = "xylem.yaml";

/// The extension of content documents, layouts, and overlays.
pub const CONTENT_EXTENSION: &str = "xyl";

/// The extension of rendered documents.
pub const OUTPUT_EXTENSION: &str = "html";

/// The file name of the index page, relative to the output root.
pub const INDEX_FILE: &str = "index.html";

#[derive(Deserialize)]
struct Project {
    #[serde(default = "Project::content_directory")]
    content_directory: PathBuf,

    #[serde(default = "Project::layouts_directory")]
    layouts_directory: PathBuf,

    #[serde(default = "Project::index_overlay")]
    index_overlay: PathBuf,

    #[serde(default = "Project::router")]
    router: PathBuf,

    #[serde(default = "Project::output_directory")]
    output_directory: PathBuf,

    #[serde(default = "Project::default_layout")]
    default_layout: String,
}

impl Project {
    fn content_directory() -> PathBuf {
        PathBuf::from("In/Posts")
    }

    fn layouts_directory() -> PathBuf {
        PathBuf::from("In/Layouts")
    }

    fn index_overlay() -> PathBuf {
        PathBuf::from("In/Index.xyl")
    }

    fn router() -> PathBuf {
        PathBuf::from("In/Router.yaml")
    }

    fn output_directory() -> PathBuf {
        PathBuf::from("Out")
    }

    fn default_layout() -> String {
        String::from("Main")
    }
}

/// Resolved build configuration. All paths are absolute or relative to the
/// working directory, never to the project file.
#[derive(Clone, Debug)]
pub struct Config {
    /// The directory searched recursively for `*.xyl` posts.
    pub content_directory: PathBuf,

    /// The directory holding `<Layout>.xyl` files.
    pub layouts_directory: PathBuf,

    /// The overlay applied to the default layout when rendering the index.
    pub index_overlay: PathBuf,

    /// The route definition file.
    pub router: PathBuf,

    /// The output root. Deleted and recreated on each build.
    pub output_directory: PathBuf,

    /// The layout used by posts without a `layout` directive, and by the
    /// index.
    pub default_layout: String,
}

impl Config {
    /// Builds a [`Config`] from the conventional layout rooted at `root`,
    /// without reading a project file.
    pub fn with_root(root: &Path) -> Config {
        Config {
            content_directory: root.join(Project::content_directory()),
            layouts_directory: root.join(Project::layouts_directory()),
            index_overlay: root.join(Project::index_overlay()),
            router: root.join(Project::router()),
            output_directory: root.join(Project::output_directory()),
            default_layout: Project::default_layout(),
        }
    }

    /// Searches `dir` and then each of its ancestors for a `xylem.yaml`
    /// project file and loads the first one found. `output_directory`
    /// overrides the project's output root when given.
    pub fn from_directory(dir: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, output_directory)
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory),
                None => Err(Error::MissingProjectFile),
            }
        }
    }

    /// Loads a project file. Relative paths inside it are resolved against
    /// the directory containing the file.
    pub fn from_project_file(path: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(util::open(path)?)
            .map_err(|e| Error::DeserializeYaml(path.to_owned(), e))?;
        let root = path.parent().ok_or_else(|| Error::NoParent(path.to_owned()))?;

        Ok(Config {
            content_directory: root.join(project.content_directory),
            layouts_directory: root.join(project.layouts_directory),
            index_overlay: root.join(project.index_overlay),
            router: root.join(project.router),
            output_directory: match output_directory {
                Some(dir) => dir.to_owned(),
                None => root.join(project.output_directory),
            },
            default_layout: project.default_layout,
        })
    }

    /// Returns the path of the layout named `name`.
    pub fn layout_path(&self, name: &str) -> PathBuf {
        self.layouts_directory
            .join(format!("{}.{}", name, CONTENT_EXTENSION))
    }

    /// Returns the path of the rendered index page.
    pub fn index_path(&self) -> PathBuf {
        self.output_directory.join(INDEX_FILE)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem locating or loading a project file.
#[derive(Debug)]
pub enum Error {
    /// Returned when no ancestor of the starting directory holds a project
    /// file.
    MissingProjectFile,

    /// Returned when the project file path has no parent directory.
    NoParent(PathBuf),

    /// Returned when the project file is not valid YAML for a project.
    DeserializeYaml(PathBuf, serde_yaml::Error),

    /// Returned when the project file can't be opened.
    Io(PathError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingProjectFile => write!(
                f,
                "Could not find `{}` in any parent directory",
                PROJECT_FILE
            ),
            Error::NoParent(path) => write!(
                f,
                "Can't get parent directory for project file `{}`",
                path.display()
            ),
            Error::DeserializeYaml(path, err) => {
                write!(f, "Loading project file `{}`: {}", path.display(), err)
            }
            Error::Io(err) => write!(f, "Opening project file {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingProjectFile => None,
            Error::NoParent(_) => None,
            Error::DeserializeYaml(_, err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<PathError> for Error {
    fn from(err: PathError) -> Error {
        Error::Io(err)
    }
}
