//! Directory trust for project-local configuration.
//!
//! A `.apt-changelog-viewer.toml` in the working directory can name the
//! programs the viewer runs and switch plugins on. It is only honoured once
//! the user has trusted that directory with `apt-changelog-viewer trust`.
//! Trusted directories are kept in `trust.json` under the config directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::store::JsonStore;

/// Set of directories whose local config may be loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustDoc {
    /// Canonical paths of trusted directories
    pub trusted_directories: BTreeSet<PathBuf>,
}

/// Store for [`TrustDoc`].
pub type TrustStore = JsonStore<TrustDoc>;

impl TrustDoc {
    /// Check if a directory is trusted.
    ///
    /// A directory is trusted when it, or one of its ancestors, was trusted
    /// explicitly.
    pub fn is_trusted(&self, path: &Path) -> bool {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.trusted_directories.iter().any(|trusted| canonical.starts_with(trusted))
    }

    /// Add a directory to the trusted set. Returns `false` if it was already
    /// present.
    pub fn trust(&mut self, path: &Path) -> std::io::Result<bool> {
        let canonical = path.canonicalize()?;
        Ok(self.trusted_directories.insert(canonical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_untrusted_by_default() {
        let temp = TempDir::new().unwrap();
        assert!(!TrustDoc::default().is_trusted(temp.path()));
    }

    #[test]
    fn test_trust_covers_subdirectories() {
        let temp = TempDir::new().unwrap();
        let child = temp.path().join("sub");
        std::fs::create_dir(&child).unwrap();

        let mut doc = TrustDoc::default();
        assert!(doc.trust(temp.path()).unwrap());
        assert!(!doc.trust(temp.path()).unwrap());

        assert!(doc.is_trusted(temp.path()));
        assert!(doc.is_trusted(&child));
    }

    #[test]
    fn test_trusting_child_does_not_trust_parent() {
        let temp = TempDir::new().unwrap();
        let child = temp.path().join("sub");
        std::fs::create_dir(&child).unwrap();

        let mut doc = TrustDoc::default();
        doc.trust(&child).unwrap();
        assert!(!doc.is_trusted(temp.path()));
    }

    #[test]
    fn test_trust_persists() {
        let temp = TempDir::new().unwrap();
        let store = TrustStore::new(temp.path().join("trust.json"));

        let mut doc = store.load();
        doc.trust(temp.path()).unwrap();
        store.save(&doc).unwrap();

        assert!(store.load().is_trusted(temp.path()));
    }
}
