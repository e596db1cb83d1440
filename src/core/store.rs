//! Settings and session persistence.
//!
//! Both documents are small JSON objects stored under the config directory.
//! A missing or unreadable file yields the document's default; saving always
//! rewrites the whole file.

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from reading or writing a JSON document.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// First-run state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDoc {
    /// Whether the welcome overlay has been dismissed
    pub welcome_shown: bool,
}

/// Last known window geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDoc {
    /// Width in cells
    pub width: u32,
    /// Height in cells
    pub height: u32,
    /// Whether the window was maximized
    pub maximized: bool,
}

impl Default for SessionDoc {
    fn default() -> Self {
        Self { width: 800, height: 600, maximized: false }
    }
}

/// A JSON document bound to one file.
#[derive(Debug, Clone)]
pub struct JsonStore<T> {
    path: PathBuf,
    _doc: PhantomData<T>,
}

/// Store for [`SettingsDoc`].
pub type SettingsStore = JsonStore<SettingsDoc>;

/// Store for [`SessionDoc`].
pub type SessionStore = JsonStore<SessionDoc>;

impl<T> JsonStore<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    /// Bind a store to a file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), _doc: PhantomData }
    }

    /// Get the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, falling back to the default when the file is
    /// absent or unparsable.
    pub fn load(&self) -> T {
        match self.try_load() {
            Ok(Some(doc)) => doc,
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Using default document");
                T::default()
            }
        }
    }

    /// Load the document; `Ok(None)` when the file does not exist.
    pub fn try_load(&self) -> Result<Option<T>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|source| StoreError::Io { path: self.path.clone(), source })?;
        let doc = serde_json::from_str(&content)
            .map_err(|source| StoreError::Json { path: self.path.clone(), source })?;
        Ok(Some(doc))
    }

    /// Write the whole document, creating the parent directory if needed.
    ///
    /// This is a plain truncate-and-write, not an atomic replace.
    pub fn save(&self, doc: &T) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
        }

        let content = serde_json::to_string_pretty(doc)
            .map_err(|source| StoreError::Json { path: self.path.clone(), source })?;
        fs::write(&self.path, content)
            .map_err(|source| StoreError::Io { path: self.path.clone(), source })?;

        tracing::debug!(path = %self.path.display(), "Saved document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_missing_file_defaults() {
        let temp = TempDir::new().unwrap();
        let store = SettingsStore::new(temp.path().join("settings.json"));
        assert_eq!(store.load(), SettingsDoc { welcome_shown: false });
    }

    #[test]
    fn test_settings_save_and_load() {
        let temp = TempDir::new().unwrap();
        let store = SettingsStore::new(temp.path().join("nested").join("settings.json"));

        store.save(&SettingsDoc { welcome_shown: true }).unwrap();
        assert!(store.path().exists());
        assert_eq!(store.load(), SettingsDoc { welcome_shown: true });
    }

    #[test]
    fn test_session_defaults() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("session.json"));
        let session = store.load();
        assert_eq!(session.width, 800);
        assert_eq!(session.height, 600);
        assert!(!session.maximized);
    }

    #[test]
    fn test_corrupt_file_yields_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("session.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SessionStore::new(&path);
        assert!(matches!(store.try_load(), Err(StoreError::Json { .. })));
        assert_eq!(store.load(), SessionDoc::default());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("session.json");
        fs::write(&path, r#"{"width": 120}"#).unwrap();

        let session = SessionStore::new(&path).load();
        assert_eq!(session.width, 120);
        assert_eq!(session.height, 600);
    }

    #[test]
    fn test_save_overwrites_whole_file() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("session.json"));

        store.save(&SessionDoc { width: 1, height: 2, maximized: true }).unwrap();
        store.save(&SessionDoc { width: 3, height: 4, maximized: false }).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["width"], 3);
        assert_eq!(value["maximized"], false);
    }
}
