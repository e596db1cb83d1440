//! Configuration management for the changelog viewer.
//!
//! Handles loading configuration from TOML files. The loaded [`Config`] is
//! built once at startup and passed by reference to whichever component
//! needs it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::trust::{TrustDoc, TrustStore};
use crate::APP_NAME;

/// Placeholder substituted with the package name in tool arguments.
pub const PACKAGE_PLACEHOLDER: &str = "{package}";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External tool settings
    pub tools: ToolsConfig,

    /// Changelog fetch settings
    pub changelog: ChangelogConfig,

    /// Plugin loading settings
    pub plugins: PluginsConfig,

    /// Background worker settings
    pub workers: WorkersConfig,

    /// UI/TUI settings
    pub ui: UiConfig,
}

/// External tool commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Package database query program
    pub query_program: String,

    /// Arguments for the query program (one `name\tversion\tdescription` line per package)
    pub query_args: Vec<String>,

    /// Program that prints the changelog URI for a package
    pub changelog_uri_program: String,

    /// Arguments for the URI program; `{package}` is replaced with the package name
    pub changelog_uri_args: Vec<String>,

    /// Timeout for each tool invocation, in seconds
    pub timeout_secs: u64,
}

/// Changelog fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangelogConfig {
    /// Root of per-package documentation (`<doc_root>/<pkg>/changelog.Debian.gz`)
    pub doc_root: PathBuf,

    /// HTTP timeout, in seconds
    pub fetch_timeout_secs: u64,

    /// Maximum number of characters shown in the changelog pane
    pub max_display_chars: usize,
}

/// Plugin settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Plugins run only when explicitly enabled
    pub enabled: bool,

    /// Interpreter used to run each plugin script
    pub interpreter: String,

    /// Script file extension (without the dot)
    pub extension: String,

    /// Per-plugin timeout, in seconds
    pub timeout_secs: u64,

    /// Override for the plugins directory (`~` is expanded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

/// Background worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Number of worker threads (0 = min(cpus, 4))
    pub threads: usize,

    /// Maximum number of queued jobs
    pub queue_capacity: usize,
}

/// UI/TUI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Maximum number of package rows shown
    pub max_rows: usize,

    /// Built-in color theme name
    pub theme: String,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.apt-changelog-viewer.toml` in the current directory, if that
    ///    directory is trusted
    /// 2. `~/.config/apt-changelog-viewer/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let trust = Self::trust_path().map(|path| TrustStore::new(path).load()).unwrap_or_default();
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::load_from(&cwd, Self::config_dir().as_deref(), &trust)
    }

    /// Resolve configuration for `cwd` against an explicit config directory
    /// and trust set.
    pub fn load_from(
        cwd: &Path,
        config_dir: Option<&Path>,
        trust: &TrustDoc,
    ) -> anyhow::Result<Self> {
        let local_config = cwd.join(Self::local_file_name());
        if local_config.is_file() {
            if trust.is_trusted(cwd) {
                return Self::load_from_file(&local_config);
            }
            tracing::warn!(
                path = %local_config.display(),
                "Ignoring config in untrusted directory; run `apt-changelog-viewer trust` to use it"
            );
        }

        if let Some(config_dir) = config_dir {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// File name of the project-local config.
    pub fn local_file_name() -> String {
        format!(".{APP_NAME}.toml")
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_NAME))
    }

    /// Get the data directory path (for logs).
    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join(APP_NAME))
    }

    /// Path of the settings document.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("settings.json"))
    }

    /// Path of the trusted-directories document.
    pub fn trust_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("trust.json"))
    }

    /// Path of the session document.
    pub fn session_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("session.json"))
    }
}

impl ToolsConfig {
    /// Tool timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URI tool arguments with the package name substituted.
    pub fn changelog_uri_args_for(&self, package: &str) -> Vec<String> {
        self.changelog_uri_args.iter().map(|arg| arg.replace(PACKAGE_PLACEHOLDER, package)).collect()
    }
}

impl ChangelogConfig {
    /// HTTP timeout as a duration.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl PluginsConfig {
    /// Per-plugin timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the plugins directory for an application identifier.
    pub fn resolve_dir(&self, app_identifier: &str) -> Option<PathBuf> {
        if let Some(ref dir) = self.directory {
            return Some(PathBuf::from(shellexpand::tilde(dir).into_owned()));
        }
        dirs::config_dir().map(|d| d.join(app_identifier).join("plugins"))
    }
}

impl WorkersConfig {
    /// Effective number of worker threads.
    pub fn effective_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get().clamp(1, 4)
        } else {
            self.threads
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            query_program: "dpkg-query".to_string(),
            query_args: vec![
                "-W".to_string(),
                "-f".to_string(),
                "${Package}\t${Version}\t${Description}\n".to_string(),
            ],
            changelog_uri_program: "apt-get".to_string(),
            changelog_uri_args: vec![
                "changelog".to_string(),
                PACKAGE_PLACEHOLDER.to_string(),
                "--print-uris".to_string(),
            ],
            timeout_secs: 10,
        }
    }
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            doc_root: PathBuf::from("/usr/share/doc"),
            fetch_timeout_secs: 10,
            max_display_chars: 50_000,
        }
    }
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interpreter: "python3".to_string(),
            extension: "py".to_string(),
            timeout_secs: 10,
            directory: None,
        }
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self { threads: 0, queue_capacity: 16 }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { max_rows: 500, theme: "default".to_string() }
    }
}
