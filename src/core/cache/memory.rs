//! In-memory cache backend for testing.

use super::{sample_key, CacheBackend, CacheEntry, CacheStats};
use crate::core::scanner::MediaRecord;
use crate::error::CacheError;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

/// In-memory cache backend
///
/// Useful for testing and scenarios where persistence isn't needed.
/// Writes are applied immediately.
pub struct InMemoryCache {
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
    suggestions: RwLock<HashMap<PathBuf, (String, String)>>,
}

impl InMemoryCache {
    /// Create a new in-memory cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            suggestions: RwLock::new(HashMap::new()),
        }
    }

    fn poisoned() -> CacheError {
        CacheError::Corrupted {
            path: PathBuf::from("memory"),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryCache {
    fn get(
        &self,
        path: &Path,
        current_size: u64,
        current_modified: SystemTime,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;

        Ok(entries
            .get(path)
            .filter(|entry| entry.is_valid_for(current_size, current_modified))
            .cloned())
    }

    fn put(&self, record: &MediaRecord, modified: SystemTime) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.insert(
            record.path.clone(),
            CacheEntry::from_record(record, modified),
        );
        Ok(())
    }

    fn update_path(
        &self,
        old_path: &Path,
        record: &MediaRecord,
        modified: SystemTime,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.remove(old_path);
        entries.insert(
            record.path.clone(),
            CacheEntry::from_record(record, modified),
        );
        Ok(())
    }

    fn prune_deleted(&self, valid_paths: &HashSet<PathBuf>) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        let before = entries.len();
        entries.retain(|path, _| valid_paths.contains(path));
        Ok(before - entries.len())
    }

    fn get_suggestion(
        &self,
        folder: &Path,
        samples: &[PathBuf],
    ) -> Result<Option<String>, CacheError> {
        let expected = sample_key(samples)?;
        let suggestions = self.suggestions.read().map_err(|_| Self::poisoned())?;

        Ok(suggestions
            .get(folder)
            .filter(|(stored, _)| *stored == expected)
            .map(|(_, suggestion)| suggestion.clone()))
    }

    fn put_suggestion(
        &self,
        folder: &Path,
        samples: &[PathBuf],
        suggestion: &str,
    ) -> Result<(), CacheError> {
        let key = sample_key(samples)?;
        let mut suggestions = self.suggestions.write().map_err(|_| Self::poisoned())?;
        suggestions.insert(folder.to_path_buf(), (key, suggestion.to_string()));
        Ok(())
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        let suggestions = self.suggestions.read().map_err(|_| Self::poisoned())?;

        Ok(CacheStats {
            total_entries: entries.len(),
            with_digest: entries.values().filter(|e| e.has_digest()).count(),
            with_metadata: entries
                .values()
                .filter(|e| e.camera_make.is_some() || e.camera_model.is_some())
                .count(),
            suggestions: suggestions.len(),
        })
    }
}
