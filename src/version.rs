//! Version extraction from a working tree.

use std::path::Path;

use crate::error::VersionError;

/// Well-known file holding the version the built binaries will carry.
pub const VERSION_FILE: &str = "VERSION";

/// Reads the version for the binaries built from `root`.
///
/// Pure and idempotent: reads `VERSION` at the tree root and strips
/// surrounding whitespace.
pub fn binary_version(root: &Path) -> Result<String, VersionError> {
    let path = root.join(VERSION_FILE);
    let content = std::fs::read_to_string(&path).map_err(|source| VersionError::Unreadable {
        path: path.clone(),
        source,
    })?;
    Ok(content.trim().to_string())
}
