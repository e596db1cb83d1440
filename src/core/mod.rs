//! Core types and functionality for the changelog viewer.
//!
//! This module contains the data handling that runs off the UI: package
//! discovery, changelog retrieval, persistence, configuration and the
//! background task dispatcher.

mod changelog;
mod config;
mod filter;
mod package;
mod store;
mod sync;
mod tool;
mod trust;

pub use changelog::{
    parse_uri, truncate_chars, Changelog, ChangelogFetcher, ChangelogSource, FetchError,
    LOCAL_CHANGELOG_FILE, NO_CHANGELOG,
};
pub use config::{
    ChangelogConfig, Config, PluginsConfig, ToolsConfig, UiConfig, WorkersConfig,
    PACKAGE_PLACEHOLDER,
};
pub use filter::filter_packages;
pub use package::{parse_query_output, ListError, PackageLister, PackageRecord};
pub use store::{
    JsonStore, SessionDoc, SessionStore, SettingsDoc, SettingsStore, StoreError,
};
pub use sync::{
    CancellationToken, Completion, DispatchError, RequestId, TaskDispatcher, TaskResult, TaskSlot,
};
pub use tool::{ToolCommand, ToolError, ToolOutput};
pub use trust::{TrustDoc, TrustStore};
