use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// An I/O error annotated with the path that caused it.
#[derive(Debug)]
pub struct PathError {
    pub path: PathBuf,
    pub err: std::io::Error,
}

impl PathError {
    pub fn new(path: &Path, err: std::io::Error) -> PathError {
        PathError {
            path: path.to_owned(),
            err,
        }
    }
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "`{}`: {}", self.path.display(), self.err)
    }
}

impl std::error::Error for PathError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.err)
    }
}

pub fn open(path: &Path) -> Result<File, PathError> {
    File::open(path).map_err(|e| PathError::new(path, e))
}

pub fn read_to_string(path: &Path) -> Result<String, PathError> {
    let mut contents = String::new();
    open(path)?
        .read_to_string(&mut contents)
        .map_err(|e| PathError::new(path, e))?;
    Ok(contents)
}
