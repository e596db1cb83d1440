//! Changelog retrieval.
//!
//! Three tiers, first success wins:
//! 1. resolve a URI with the metadata tool and fetch it over HTTP(S)
//! 2. read `<doc_root>/<pkg>/changelog.Debian.gz`
//! 3. a fixed placeholder
//!
//! Every failure is logged and swallowed; callers always get text.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use thiserror::Error;

use super::config::{Config, ToolsConfig};
use super::sync::CancellationToken;
use super::tool::{ToolCommand, ToolError};

/// Text shown when no tier produced a changelog.
pub const NO_CHANGELOG: &str = "No changelog available";

/// File name of the packaged Debian changelog.
pub const LOCAL_CHANGELOG_FILE: &str = "changelog.Debian.gz";

/// Where a changelog came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangelogSource {
    /// Fetched from the mirror
    Remote,
    /// Read from the local documentation directory
    Local,
    /// Neither source was available
    Unavailable,
}

impl ChangelogSource {
    /// Short label for status lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
            Self::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for ChangelogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Changelog text together with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changelog {
    /// Raw changelog text
    pub text: String,
    /// Tier the text came from
    pub source: ChangelogSource,
}

impl Changelog {
    /// The placeholder changelog.
    pub fn unavailable() -> Self {
        Self { text: NO_CHANGELOG.to_string(), source: ChangelogSource::Unavailable }
    }

    /// Text truncated to at most `max_chars` characters.
    pub fn display_text(&self, max_chars: usize) -> &str {
        truncate_chars(&self.text, max_chars)
    }
}

/// Errors from a single fetch tier.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("metadata tool printed no URI")]
    NoUri,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {0}")]
    Status(reqwest::StatusCode),

    #[error("no local changelog at {0}")]
    NotFound(PathBuf),

    #[error("refusing local lookup for package name '{0}'")]
    InvalidName(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fetches changelogs with graceful fallback.
#[derive(Debug, Clone)]
pub struct ChangelogFetcher {
    tools: ToolsConfig,
    fetch_timeout: Duration,
    doc_root: PathBuf,
}

impl ChangelogFetcher {
    /// Create a fetcher from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            tools: config.tools.clone(),
            fetch_timeout: config.changelog.fetch_timeout(),
            doc_root: config.changelog.doc_root.clone(),
        }
    }

    /// Fetch the changelog text for a package. Never fails.
    pub fn fetch_changelog(&self, package: &str) -> String {
        self.fetch_changelog_with_source(package).text
    }

    /// Fetch the changelog and report which tier produced it.
    pub fn fetch_changelog_with_source(&self, package: &str) -> Changelog {
        self.fetch_changelog_cancellable(package, &CancellationToken::new())
    }

    /// Like [`fetch_changelog_with_source`](Self::fetch_changelog_with_source),
    /// but kills the metadata tool and skips the local tier once `token` is
    /// cancelled. A cancelled fetch yields the placeholder.
    pub fn fetch_changelog_cancellable(
        &self,
        package: &str,
        token: &CancellationToken,
    ) -> Changelog {
        match self.remote(package, token) {
            Ok(text) => {
                tracing::debug!(package = %package, bytes = text.len(), "Fetched remote changelog");
                return Changelog { text, source: ChangelogSource::Remote };
            }
            Err(e) => {
                tracing::debug!(package = %package, error = %e, "Remote changelog unavailable");
            }
        }

        if token.is_cancelled() {
            tracing::debug!(package = %package, "Changelog fetch cancelled");
            return Changelog::unavailable();
        }

        match self.read_local(package) {
            Ok(text) => {
                tracing::debug!(package = %package, "Read local changelog");
                return Changelog { text, source: ChangelogSource::Local };
            }
            Err(FetchError::NotFound(path)) => {
                tracing::debug!(package = %package, path = %path.display(), "No local changelog");
            }
            Err(e) => {
                tracing::warn!(package = %package, error = %e, "Local changelog unreadable");
            }
        }

        Changelog::unavailable()
    }

    /// Resolve the changelog URI with the metadata tool.
    pub fn resolve_uri(&self, package: &str) -> Result<String, FetchError> {
        self.resolve_uri_cancellable(package, &CancellationToken::new())
    }

    fn resolve_uri_cancellable(
        &self,
        package: &str,
        token: &CancellationToken,
    ) -> Result<String, FetchError> {
        let output = ToolCommand::new(&self.tools.changelog_uri_program)
            .args(self.tools.changelog_uri_args_for(package))
            .timeout(self.tools.timeout())
            .cancel_on(token)
            .run()?;

        // Exit status is ignored; only a printed URI counts.
        parse_uri(&output.stdout).ok_or(FetchError::NoUri)
    }

    /// Tier 1: metadata tool + HTTP fetch.
    pub fn fetch_remote(&self, package: &str) -> Result<String, FetchError> {
        self.remote(package, &CancellationToken::new())
    }

    fn remote(&self, package: &str, token: &CancellationToken) -> Result<String, FetchError> {
        let uri = self.resolve_uri_cancellable(package, token)?;
        tracing::debug!(package = %package, uri = %uri, "Resolved changelog URI");

        let client = reqwest::blocking::Client::builder()
            .timeout(self.fetch_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let response = client.get(&uri).send()?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let bytes = response.bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Path of the packaged changelog for a package.
    pub fn local_path(&self, package: &str) -> PathBuf {
        self.doc_root.join(package).join(LOCAL_CHANGELOG_FILE)
    }

    /// Tier 2: gzip-compressed changelog from the documentation directory.
    pub fn read_local(&self, package: &str) -> Result<String, FetchError> {
        if !is_safe_package_name(package) {
            return Err(FetchError::InvalidName(package.to_string()));
        }

        let path = self.local_path(package);
        if !path.is_file() {
            return Err(FetchError::NotFound(path));
        }

        read_gzip_lossy(&path).map_err(|source| FetchError::Io { path, source })
    }
}

/// Extract the URI from metadata tool output.
///
/// `apt-get changelog --print-uris` prints `'https://…' changelog`. When the
/// output contains a quote, the text after the first quote up to the next
/// one (or the end) is used; otherwise the whole trimmed output.
pub fn parse_uri(stdout: &str) -> Option<String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed.contains('\'') {
        return Some(trimmed.to_string());
    }

    trimmed.split('\'').nth(1).filter(|uri| !uri.is_empty()).map(str::to_string)
}

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn is_safe_package_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.starts_with('.')
}

fn read_gzip_lossy(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    let mut decoder = GzDecoder::new(file);
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
