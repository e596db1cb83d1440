//! Plugin discovery and out-of-process execution.

use std::path::{Path, PathBuf};

use super::{LoadedPlugin, PluginError, PluginResult, PRIVATE_PREFIX};
use crate::core::{PluginsConfig, ToolCommand};

/// Discovers plugin scripts and runs each one in its own process.
#[derive(Debug, Clone)]
pub struct PluginLoader {
    config: PluginsConfig,
}

impl PluginLoader {
    /// Create a loader from configuration.
    pub fn new(config: &PluginsConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Check whether plugin loading is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Resolve the plugins directory for an application identifier.
    pub fn plugins_dir(&self, app_identifier: &str) -> Option<PathBuf> {
        self.config.resolve_dir(app_identifier)
    }

    /// Load every plugin of the application. Never fails.
    ///
    /// Returns an empty list when loading is disabled or the directory does
    /// not exist. Individual plugin failures are logged and skipped.
    pub fn load_plugins(&self, app_identifier: &str) -> Vec<LoadedPlugin> {
        if !self.config.enabled {
            tracing::info!(reason = %PluginError::Disabled, "Skipping plugins");
            return Vec::new();
        }

        match self.plugins_dir(app_identifier) {
            Some(dir) => self.load_from_dir(&dir),
            None => {
                tracing::warn!(error = %PluginError::NoDirectory, "Skipping plugins");
                Vec::new()
            }
        }
    }

    /// Load every plugin found in `dir`. Never fails.
    pub fn load_from_dir(&self, dir: &Path) -> Vec<LoadedPlugin> {
        if !self.config.enabled {
            tracing::info!(reason = %PluginError::Disabled, "Skipping plugins");
            return Vec::new();
        }

        if !dir.is_dir() {
            tracing::debug!(path = %dir.display(), "No plugins directory");
            return Vec::new();
        }

        let candidates = match self.discover(dir) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping plugins");
                return Vec::new();
            }
        };

        let mut loaded = Vec::new();
        for path in candidates {
            match self.run_plugin(dir, &path) {
                Ok(plugin) => {
                    tracing::info!(plugin = %plugin.name, "Loaded plugin");
                    loaded.push(plugin);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Plugin failed to load");
                }
            }
        }

        loaded
    }

    /// List plugin scripts in `dir`, sorted by file name.
    ///
    /// A file qualifies when it has the configured extension and its name
    /// does not start with `_`. Does not run anything.
    pub fn discover(&self, dir: &Path) -> PluginResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir)
            .map_err(|source| PluginError::ReadDir { path: dir.to_path_buf(), source })?;

        let mut scripts: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.is_plugin_file(path))
            .collect();

        scripts.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(scripts)
    }

    fn is_plugin_file(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        !file_name.starts_with(PRIVATE_PREFIX)
            && path.extension().and_then(|e| e.to_str()) == Some(self.config.extension.as_str())
    }

    /// Run one plugin script through the interpreter.
    pub fn run_plugin(&self, dir: &Path, path: &Path) -> PluginResult<LoadedPlugin> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let output = ToolCommand::new(&self.config.interpreter)
            .args([path.to_string_lossy().into_owned()])
            .timeout(self.config.timeout())
            .current_dir(dir)
            .isolated_env()
            .run()
            .map_err(|source| PluginError::Run { name: name.clone(), source })?;

        if !output.success() {
            return Err(PluginError::Failed {
                name,
                code: output.code(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(LoadedPlugin { name, path: path.to_path_buf(), output: output.stdout })
    }
}
