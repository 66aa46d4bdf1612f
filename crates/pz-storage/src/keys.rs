//! Storage key layout.
//!
//! # Layout
//!
//! ```text
//! <data dir>/
//! ├── zones.json              manifest: every zone name, parents first
//! └── zones/
//!     ├── everywhere.json     one record per zone, keyed by lowercased name
//!     └── spawn.json
//! ```
//!
//! Record keys are validated zone names, so they never contain path
//! separators.

use std::path::{Path, PathBuf};

use pz_zone::{validate_name, zone_key};

use crate::error::{StorageError, StorageResult};

/// Manifest file name within the data directory.
pub const MANIFEST_FILE: &str = "zones.json";

/// Record directory within the data directory.
pub const RECORD_DIR: &str = "zones";

/// Record file extension.
pub const RECORD_EXT: &str = "json";

/// Normalize a zone name into a record key, rejecting names that are not
/// safe to use as a file name.
pub fn record_key(name: &str) -> StorageResult<String> {
    validate_name(name).map_err(|e| StorageError::malformed(name, e))?;
    Ok(zone_key(name))
}

/// Path of the record file for `key` under `root`.
#[must_use]
pub fn record_path(root: &Path, key: &str) -> PathBuf {
    root.join(RECORD_DIR).join(format!("{key}.{RECORD_EXT}"))
}

/// Path of the manifest under `root`.
#[must_use]
pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE)
}
