//! File-backed mapping tables.
//!
//! The mapping file is a JSON object with a `role_mapping` and/or a
//! `group_mapping` object, each mapping a provider identifier to a platform
//! role name:
//!
//! ```json
//! {
//!   "role_mapping": { "Airflow.Admin": "Admin" },
//!   "group_mapping": { "5f1c0c4e-3a4b-4f4e-9f8a-0d6f2b3c1a7e": "Viewer" }
//! }
//! ```
//!
//! A broken file never fails a login. The loader logs the problem and hands
//! back empty tables, so every user lands on the default role until the file
//! is fixed.

use crate::error::MappingError;
use crate::mapping::{MappingTables, RoleMapping};
use rootcause::Report;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, error, info};

/// Reads and validates a mapping file.
///
/// # Errors
///
/// Returns a `MappingError` describing why the file could not be used.
pub fn read_mapping_file(path: &Path) -> Result<MappingTables, Report<MappingError>> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_error(path, &e))?;

    let document: Value =
        serde_json::from_str(&contents).map_err(|e| MappingError::Malformed {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

    let Value::Object(mut root) = document else {
        return Err(invalid_shape(path, "top level must be a JSON object").into());
    };

    let role_mapping = root.remove("role_mapping");
    let group_mapping = root.remove("group_mapping");
    if role_mapping.is_none() && group_mapping.is_none() {
        return Err(invalid_shape(
            path,
            "expected a 'role_mapping' and/or 'group_mapping' object",
        )
        .into());
    }

    Ok(MappingTables {
        role_mapping: parse_table(path, "role_mapping", role_mapping)?,
        group_mapping: parse_table(path, "group_mapping", group_mapping)?,
    })
}

/// Loads a mapping file, falling back to empty tables on any error.
#[must_use]
pub fn load_mapping_file(path: &Path) -> MappingTables {
    read_or_log(path).unwrap_or_else(MappingTables::empty)
}

/// Reads the file, logging the outcome. `None` means the caller should use
/// empty tables.
fn read_or_log(path: &Path) -> Option<MappingTables> {
    match read_mapping_file(path) {
        Ok(tables) => {
            info!(
                path = %path.display(),
                role_entries = tables.role_mapping.len(),
                group_entries = tables.group_mapping.len(),
                "loaded role mapping file"
            );
            Some(tables)
        }
        Err(report) => {
            error!(
                path = %path.display(),
                error = %report,
                "failed to load role mapping file, using empty mappings"
            );
            None
        }
    }
}

fn parse_table(
    path: &Path,
    key: &str,
    value: Option<Value>,
) -> Result<RoleMapping, Report<MappingError>> {
    match value {
        None => Ok(RoleMapping::new()),
        Some(value @ Value::Object(_)) => serde_json::from_value(value).map_err(|e| {
            invalid_shape(path, &format!("'{key}' values must be strings: {e}")).into()
        }),
        Some(_) => Err(invalid_shape(path, &format!("'{key}' must be a JSON object")).into()),
    }
}

fn invalid_shape(path: &Path, details: &str) -> MappingError {
    MappingError::InvalidShape {
        path: path.to_path_buf(),
        details: details.to_string(),
    }
}

fn io_error(path: &Path, err: &std::io::Error) -> MappingError {
    let path = path.to_path_buf();
    match err.kind() {
        ErrorKind::NotFound => MappingError::NotFound { path },
        ErrorKind::PermissionDenied => MappingError::PermissionDenied { path },
        _ => MappingError::Io {
            path,
            details: err.to_string(),
        },
    }
}

#[derive(Debug)]
struct CacheEntry {
    path: PathBuf,
    tables: Arc<MappingTables>,
    loaded_at: Instant,
    modified: SystemTime,
}

/// Cached copy of a mapping file.
///
/// An entry is reused while it is younger than the TTL and the file's
/// modification time has not changed. Otherwise the file is read again and
/// the entry replaced. The lock only guards reading or swapping the entry;
/// concurrent loads may both read the file, and the last one to finish wins.
#[derive(Debug)]
pub struct MappingCache {
    ttl: Duration,
    entry: RwLock<Option<CacheEntry>>,
}

impl MappingCache {
    /// Creates an empty cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// Returns the TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the tables for `path`, reading the file only when needed.
    ///
    /// Never fails: unusable files yield empty tables, which are not cached.
    pub fn load(&self, path: &Path) -> Arc<MappingTables> {
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();

        if let Some(tables) = modified.and_then(|m| self.fresh_entry(path, m)) {
            debug!(path = %path.display(), "using cached role mapping");
            return tables;
        }

        let Some(tables) = read_or_log(path).map(Arc::new) else {
            return Arc::new(MappingTables::empty());
        };

        if let Some(modified) = modified {
            let mut entry = self.entry.write().unwrap_or_else(PoisonError::into_inner);
            *entry = Some(CacheEntry {
                path: path.to_path_buf(),
                tables: Arc::clone(&tables),
                loaded_at: Instant::now(),
                modified,
            });
        }

        tables
    }

    /// Drops the cached entry so the next load reads the file.
    pub fn invalidate(&self) {
        let mut entry = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        *entry = None;
    }

    fn fresh_entry(&self, path: &Path, modified: SystemTime) -> Option<Arc<MappingTables>> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry
            .as_ref()
            .filter(|e| {
                e.path == path && e.modified == modified && e.loaded_at.elapsed() < self.ttl
            })
            .map(|e| Arc::clone(&e.tables))
    }
}
