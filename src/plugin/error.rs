//! Plugin loader error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::ToolError;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors that can occur while discovering or running plugins.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Plugin loading is not enabled in the configuration.
    #[error("plugin loading is disabled (set plugins.enabled = true)")]
    Disabled,

    /// No plugins directory could be determined.
    #[error("could not determine plugins directory")]
    NoDirectory,

    /// Reading the plugins directory failed.
    #[error("failed to read plugins directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The plugin process could not be run to completion.
    #[error("plugin '{name}' failed to run: {source}")]
    Run {
        name: String,
        #[source]
        source: ToolError,
    },

    /// The plugin process exited unsuccessfully.
    #[error("plugin '{name}' exited with {code:?}: {stderr}")]
    Failed { name: String, code: Option<i32>, stderr: String },
}
