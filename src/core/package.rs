//! Installed package discovery.
//!
//! Queries the package database (`dpkg-query` by default) and turns its
//! tab-separated output into [`PackageRecord`]s.

use serde::{Deserialize, Serialize};

use super::config::ToolsConfig;
use super::sync::CancellationToken;
use super::tool::{ToolCommand, ToolError};

/// One installed package as reported by the query tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Package name
    pub name: String,
    /// Installed version string
    pub version: String,
    /// Short description (may be empty)
    pub description: String,
}

impl PackageRecord {
    /// Create a new package record.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self { name: name.into(), version: version.into(), description: description.into() }
    }
}

/// Errors from the package query.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("query tool exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

/// Runs the package-database query tool.
#[derive(Debug, Clone)]
pub struct PackageLister {
    program: String,
    args: Vec<String>,
    timeout: std::time::Duration,
}

impl PackageLister {
    /// Create a lister from tool configuration.
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            program: tools.query_program.clone(),
            args: tools.query_args.clone(),
            timeout: tools.timeout(),
        }
    }

    /// List installed packages.
    ///
    /// Never fails: a missing tool, a timeout or a non-zero exit all yield an
    /// empty list.
    pub fn list_installed(&self) -> Vec<PackageRecord> {
        self.list_installed_cancellable(&CancellationToken::new())
    }

    /// Like [`list_installed`](Self::list_installed), but kills the query
    /// tool once `token` is cancelled.
    pub fn list_installed_cancellable(&self, token: &CancellationToken) -> Vec<PackageRecord> {
        match self.query(token) {
            Ok(packages) => {
                tracing::debug!(count = packages.len(), "Listed installed packages");
                packages
            }
            Err(ListError::Tool(ToolError::Cancelled { .. })) => {
                tracing::debug!("Package query cancelled");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(program = %self.program, error = %e, "Package query failed");
                Vec::new()
            }
        }
    }

    /// List installed packages, reporting why the query failed.
    pub fn try_list_installed(&self) -> Result<Vec<PackageRecord>, ListError> {
        self.query(&CancellationToken::new())
    }

    fn query(&self, token: &CancellationToken) -> Result<Vec<PackageRecord>, ListError> {
        let output = ToolCommand::new(&self.program)
            .args(self.args.iter().cloned())
            .timeout(self.timeout)
            .cancel_on(token)
            .run()?;

        if !output.success() {
            return Err(ListError::Failed {
                code: output.code(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(parse_query_output(&output.stdout))
    }
}

/// Parse `name<TAB>version[<TAB>description]` lines.
///
/// Lines with fewer than two fields are skipped. Tabs after the second one
/// belong to the description. Duplicates are kept.
pub fn parse_query_output(output: &str) -> Vec<PackageRecord> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<PackageRecord> {
    let mut parts = line.splitn(3, '\t');
    let name = parts.next()?;
    let version = parts.next()?;
    let description = parts.next().unwrap_or("");
    Some(PackageRecord::new(name, version, description))
}
