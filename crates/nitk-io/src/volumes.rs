//! One image path or an ordered series of them.

use std::path::{Path, PathBuf};

/// Inputs accepted by operations that work on one file or a sequence of files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Volumes {
    Single(PathBuf),
    Series(Vec<PathBuf>),
}

impl Volumes {
    /// First path of the collection, `None` for an empty series.
    pub fn first(&self) -> Option<&Path> {
        match self {
            Volumes::Single(path) => Some(path.as_path()),
            Volumes::Series(paths) => paths.first().map(PathBuf::as_path),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Volumes::Single(_) => 1,
            Volumes::Series(paths) => paths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All paths in order.
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            Volumes::Single(path) => vec![path.as_path()],
            Volumes::Series(paths) => paths.iter().map(PathBuf::as_path).collect(),
        }
    }

    /// Build a collection from owned paths, collapsing a single path to
    /// [`Volumes::Single`].
    pub fn from_paths(mut paths: Vec<PathBuf>) -> Self {
        if paths.len() == 1 {
            Volumes::Single(paths.remove(0))
        } else {
            Volumes::Series(paths)
        }
    }
}

impl From<PathBuf> for Volumes {
    fn from(path: PathBuf) -> Self {
        Volumes::Single(path)
    }
}

impl From<&Path> for Volumes {
    fn from(path: &Path) -> Self {
        Volumes::Single(path.to_path_buf())
    }
}

impl From<Vec<PathBuf>> for Volumes {
    fn from(paths: Vec<PathBuf>) -> Self {
        Volumes::Series(paths)
    }
}
