//! Package list search filter.

use super::package::PackageRecord;

/// Indices of packages whose name contains `query`, case-insensitively.
///
/// An empty (or whitespace-only) query matches everything. At most `limit`
/// indices are returned, in scan order.
pub fn filter_packages(packages: &[PackageRecord], query: &str, limit: usize) -> Vec<usize> {
    let needle = query.trim().to_lowercase();

    packages
        .iter()
        .enumerate()
        .filter(|(_, pkg)| needle.is_empty() || pkg.name.to_lowercase().contains(&needle))
        .map(|(idx, _)| idx)
        .take(limit)
        .collect()
}
