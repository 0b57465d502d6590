//! Defines the [`Router`], which maps route ids to path patterns. The router
//! is loaded once per build from a YAML definition and handed to every
//! template as `routes`:
//!
//! ```yaml
//! base: https://example.com/
//! routes:
//!   home: /
//!   post: /P/(?<url>[\w\d\-_]+)
//!   _resource: /(?<resource>)
//! ```
//!
//! Routes whose id begins with `_` are private: they can be unrouted from
//! Rust but are not exposed to templates.

use crate::util::{self, PathError};
use gtmpl::Value;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use url::Url;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Router {
    /// Prefixed to unrouted paths when present.
    #[serde(default)]
    base: Option<Url>,

    /// Route id to path pattern.
    #[serde(default)]
    routes: BTreeMap<String, String>,
}

impl Router {
    /// Loads a router definition from a YAML file.
    pub fn load(path: &Path) -> Result<Router> {
        let router: Router = serde_yaml::from_reader(util::open(path)?)?;
        log::debug!(
            "loaded {} route(s) from `{}`",
            router.routes.len(),
            path.display()
        );
        Ok(router)
    }

    pub fn new(base: Option<Url>) -> Router {
        Router {
            base,
            routes: BTreeMap::new(),
        }
    }

    /// Registers a route, replacing any route with the same id.
    pub fn route(mut self, id: &str, pattern: &str) -> Router {
        self.routes.insert(id.to_owned(), pattern.to_owned());
        self
    }

    /// Builds the location for route `id`, substituting each named group
    /// `(?<name>...)` in its pattern with the matching entry of `params`.
    pub fn unroute(&self, id: &str, params: &[(&str, &str)]) -> Result<String> {
        let pattern = self
            .routes
            .get(id)
            .ok_or_else(|| Error::UnknownRoute(id.to_owned()))?;

        let mut path = String::with_capacity(pattern.len());
        for segment in segments(pattern) {
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Group(name) => match params.iter().find(|(k, _)| *k == name) {
                    Some((_, value)) => path.push_str(value),
                    None => {
                        return Err(Error::MissingParameter {
                            route: id.to_owned(),
                            param: name.to_owned(),
                        })
                    }
                },
            }
        }

        match &self.base {
            Some(base) => Ok(base.join(&path)?.to_string()),
            None => Ok(path),
        }
    }

    fn is_parameterized(pattern: &str) -> bool {
        segments(pattern).any(|s| matches!(s, Segment::Group(_)))
    }
}

impl From<&Router> for Value {
    /// Converts the public routes into an object of route id to location.
    /// Routes that need parameters keep their raw pattern.
    fn from(router: &Router) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        for (id, pattern) in router.routes.iter().filter(|(id, _)| !id.starts_with('_')) {
            let location = if Router::is_parameterized(pattern) {
                pattern.clone()
            } else {
                router.unroute(id, &[]).unwrap_or_else(|_| pattern.clone())
            };
            m.insert(id.clone(), Value::String(location));
        }
        Value::Object(m)
    }
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Literal(&'a str),
    Group(&'a str),
}

// Splits a pattern into literal text and named groups. A group runs from
// `(?<` to its balanced closing parenthesis. Escaped characters and
// parentheses inside character classes don't count.
fn segments(pattern: &str) -> impl Iterator<Item = Segment<'_>> {
    let mut rest = pattern;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let start = match rest.find("(?<") {
            Some(0) => 0,
            Some(start) => {
                let literal = &rest[..start];
                rest = &rest[start..];
                return Some(Segment::Literal(literal));
            }
            None => {
                let literal = rest;
                rest = "";
                return Some(Segment::Literal(literal));
            }
        };

        let name_start = start + 3;
        let name_end = match rest[name_start..].find('>') {
            Some(offset) => name_start + offset,
            None => {
                let literal = rest;
                rest = "";
                return Some(Segment::Literal(literal));
            }
        };
        let name = &rest[name_start..name_end];

        let mut depth = 1usize;
        let mut escaped = false;
        let mut in_class = false;
        let mut end = rest.len();
        for (i, c) in rest[name_end + 1..].char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '[' => in_class = true,
                ']' => in_class = false,
                '(' if !in_class => depth += 1,
                ')' if !in_class => {
                    depth -= 1;
                    if depth == 0 {
                        end = name_end + 1 + i + 1;
                        break;
                    }
                }
                _ => {}
            }
        }
        rest = &rest[end..];
        Some(Segment::Group(name))
    })
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading a router or unrouting a route.
#[derive(Debug)]
pub enum Error {
    /// Returned when unrouting an id that has no route.
    UnknownRoute(String),

    /// Returned when a route's named group has no matching parameter.
    MissingParameter { route: String, param: String },

    /// Returned when the unrouted path can't be joined onto the base URL.
    UrlParse(url::ParseError),

    /// Returned when the router definition is not valid YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when the router definition can't be opened.
    Io(PathError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnknownRoute(id) => write!(f, "unknown route `{}`", id),
            Error::MissingParameter { route, param } => {
                write!(f, "route `{}` needs parameter `{}`", route, param)
            }
            Error::UrlParse(err) => err.fmt(f),
            Error::DeserializeYaml(err) => write!(f, "loading router: {}", err),
            Error::Io(err) => write!(f, "opening router {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::UnknownRoute(_) => None,
            Error::MissingParameter { .. } => None,
            Error::UrlParse(err) => Some(err),
            Error::DeserializeYaml(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<PathError> for Error {
    fn from(err: PathError) -> Error {
        Error::Io(err)
    }
}
