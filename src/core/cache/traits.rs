//! Cache backend trait definition.

use super::{CacheEntry, CacheStats};
use crate::core::scanner::MediaRecord;
use crate::error::CacheError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Trait for cache backends
pub trait CacheBackend: Send + Sync {
    /// Get a cached entry if it exists and is still valid
    ///
    /// The entry is only returned if the stored size and modification
    /// time match the arguments exactly.
    fn get(
        &self,
        path: &Path,
        current_size: u64,
        current_modified: SystemTime,
    ) -> Result<Option<CacheEntry>, CacheError>;

    /// Store a record. Never blocks; a saturated queue drops the write
    /// and reports `CacheError::QueueFull`.
    fn put(&self, record: &MediaRecord, modified: SystemTime) -> Result<(), CacheError>;

    /// Follow a move: forget `old_path` and store the record at its new path
    fn update_path(
        &self,
        old_path: &Path,
        record: &MediaRecord,
        modified: SystemTime,
    ) -> Result<(), CacheError>;

    /// Remove every entry whose path is not in `valid_paths`
    ///
    /// Returns the number of entries removed. Only call this with the
    /// result of a complete scan.
    fn prune_deleted(&self, valid_paths: &HashSet<PathBuf>) -> Result<usize, CacheError>;

    /// Cached album name for a folder, if the sample set is unchanged
    fn get_suggestion(
        &self,
        folder: &Path,
        samples: &[PathBuf],
    ) -> Result<Option<String>, CacheError>;

    /// Remember an album name for a folder and sample set
    fn put_suggestion(
        &self,
        folder: &Path,
        samples: &[PathBuf],
        suggestion: &str,
    ) -> Result<(), CacheError>;

    /// Get cache statistics
    fn stats(&self) -> Result<CacheStats, CacheError>;

    /// Wait until every write enqueued so far is durable
    fn flush(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
