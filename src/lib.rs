//! # apt-changelog-viewer
//!
//! Terminal browser for the changelogs of installed Debian packages.
//!
//! The viewer lists installed packages through `dpkg-query`, resolves each
//! package's changelog URI with `apt-get changelog --print-uris`, downloads
//! it, and falls back to `/usr/share/doc/<package>/changelog.Debian.gz` when
//! the mirror is unreachable.
//!
//! ## Quick Start
//!
//! ```bash
//! # Open the viewer
//! apt-changelog-viewer
//!
//! # Print one changelog
//! apt-changelog-viewer changelog bash
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app;
pub mod core;
pub mod plugin;
pub mod tui;

// Re-export commonly used types
pub use app::App;
pub use core::{ChangelogFetcher, Config, PackageLister, PackageRecord};
pub use plugin::{LoadedPlugin, PluginLoader};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "apt-changelog-viewer";
