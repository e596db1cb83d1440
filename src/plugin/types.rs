//! Core plugin types.

use std::path::PathBuf;

use serde::Serialize;

/// A plugin script that ran successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedPlugin {
    /// File stem of the script
    pub name: String,
    /// Full path of the script
    pub path: PathBuf,
    /// Captured standard output
    pub output: String,
}

impl LoadedPlugin {
    /// First non-empty line of the plugin's output, used as its summary.
    pub fn summary(&self) -> Option<&str> {
        self.output.lines().map(str::trim).find(|line| !line.is_empty())
    }
}

/// Script files starting with this prefix are never loaded.
pub const PRIVATE_PREFIX: char = '_';
