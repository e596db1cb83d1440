//! Plugin loading.
//!
//! Plugins are script files in a per-user directory. Loading is opt-in, and
//! each plugin runs as its own child process (interpreter, timeout, cleared
//! environment); nothing is executed inside the viewer process. A plugin that
//! fails is logged and skipped without affecting the others.
//!
//! # Example Configuration
//!
//! ```toml
//! [plugins]
//! enabled = true
//! interpreter = "python3"
//! extension = "py"
//! timeout_secs = 10
//! ```

mod error;
mod loader;
mod types;

pub use error::{PluginError, PluginResult};
pub use loader::PluginLoader;
pub use types::{LoadedPlugin, PRIVATE_PREFIX};
