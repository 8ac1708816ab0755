use std::fmt;
use std::path::{Path, PathBuf};

use crate::shared::constants::STDIO_SENTINEL;

/// Where a stream comes from or goes to.
///
/// The single-character sentinel `"-"` selects the process's standard input
/// (for reading) or standard output (for writing).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamPath {
    Stdio,
    File(PathBuf),
}

impl StreamPath {
    pub fn parse(value: &str) -> Self {
        if value == STDIO_SENTINEL {
            StreamPath::Stdio
        } else {
            StreamPath::File(PathBuf::from(value))
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            StreamPath::Stdio => None,
            StreamPath::File(path) => Some(path),
        }
    }
}

impl fmt::Display for StreamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamPath::Stdio => f.write_str(STDIO_SENTINEL),
            StreamPath::File(path) => write!(f, "{}", path.display()),
        }
    }
}
