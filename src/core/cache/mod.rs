//! # Cache Module
//!
//! Persists extracted metadata and content digests so repeated runs over
//! unchanged files are near-instant.
//!
//! ## Validity
//! An entry is keyed by path and only counts as a hit when the stored
//! size and modification time (whole seconds) match the file on disk.
//! Stale rows stay in the table until a prune pass removes them.
//!
//! ## Best effort
//! Nothing here may stop a run. Read errors are treated as misses and
//! write errors are logged and dropped; a lost write only means the file
//! is recomputed next time.
//!
//! ## Backends
//! - `SqliteCache` - Persistent storage with a single serialized writer
//! - `InMemoryCache` - For testing

mod memory;
mod sqlite;
mod traits;
mod writer;

pub use memory::InMemoryCache;
pub use sqlite::SqliteCache;
pub use traits::CacheBackend;
pub use writer::WRITE_QUEUE_CAPACITY;

use crate::core::scanner::MediaRecord;
use crate::error::CacheError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Persisted projection of a [`MediaRecord`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Path to the file
    pub path: PathBuf,
    /// File size at time of extraction
    pub size: u64,
    /// File modification time at time of extraction (epoch seconds)
    pub modified: i64,
    /// Hex content digest, if hashing has run
    pub digest: Option<String>,
    pub capture_date: Option<DateTime<Utc>>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// When the row was written (epoch seconds)
    pub written_at: i64,
}

impl CacheEntry {
    /// Project a record into a cache entry
    pub fn from_record(record: &MediaRecord, modified: SystemTime) -> Self {
        Self {
            path: record.path.clone(),
            size: record.size,
            modified: to_timestamp(modified),
            digest: record.digest.clone().filter(|d| !d.is_empty()),
            capture_date: record.capture_date,
            camera_make: record.camera_make.clone(),
            camera_model: record.camera_model.clone(),
            artist: record.artist.clone(),
            album: record.album.clone(),
            title: record.title.clone(),
            width: record.width,
            height: record.height,
            written_at: to_timestamp(SystemTime::now()),
        }
    }

    /// Check if this entry is still valid for a file
    pub fn is_valid_for(&self, size: u64, modified: SystemTime) -> bool {
        self.size == size && self.modified == to_timestamp(modified)
    }

    /// Whether hashing results are present
    pub fn has_digest(&self) -> bool {
        self.digest.as_deref().is_some_and(|d| !d.is_empty())
    }

    /// Copy the metadata fields onto a record
    pub fn apply_metadata(&self, record: &mut MediaRecord) {
        record.capture_date = self.capture_date;
        record.camera_make = self.camera_make.clone();
        record.camera_model = self.camera_model.clone();
        record.artist = self.artist.clone();
        record.album = self.album.clone();
        record.title = self.title.clone();
        record.width = self.width;
        record.height = self.height;
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total number of file rows
    pub total_entries: usize,
    /// Rows carrying a content digest
    pub with_digest: usize,
    /// Rows carrying camera metadata
    pub with_metadata: usize,
    /// Cached album name suggestions
    pub suggestions: usize,
}

/// Convert SystemTime to Unix seconds, negative before the epoch
pub fn to_timestamp(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// Serialized form of a naming sample, used to detect a changed sample set
fn sample_key(samples: &[PathBuf]) -> Result<String, CacheError> {
    let names: Vec<String> = samples
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    serde_json::to_string(&names).map_err(|e| CacheError::QueryFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::MediaType;
    use std::time::Duration;

    fn record() -> MediaRecord {
        let mut record = MediaRecord::new("/media/a.jpg", 1000, MediaType::Photo);
        record.camera_make = Some("Canon".to_string());
        record.digest = Some("abc".to_string());
        record
    }

    #[test]
    fn cache_entry_valid_when_unchanged() {
        let now = SystemTime::now();
        let entry = CacheEntry::from_record(&record(), now);
        assert!(entry.is_valid_for(1000, now));
    }

    #[test]
    fn cache_entry_invalid_when_size_changed() {
        let now = SystemTime::now();
        let entry = CacheEntry::from_record(&record(), now);
        assert!(!entry.is_valid_for(2000, now));
    }

    #[test]
    fn cache_entry_invalid_when_modified() {
        let now = SystemTime::now();
        let entry = CacheEntry::from_record(&record(), now);
        assert!(!entry.is_valid_for(1000, now + Duration::from_secs(60)));
    }

    #[test]
    fn empty_digest_is_not_stored() {
        let mut record = record();
        record.digest = Some(String::new());
        let entry = CacheEntry::from_record(&record, SystemTime::now());
        assert!(!entry.has_digest());
    }

    #[test]
    fn apply_metadata_copies_fields() {
        let entry = CacheEntry::from_record(&record(), SystemTime::now());
        let mut target = MediaRecord::new("/media/a.jpg", 1000, MediaType::Photo);
        entry.apply_metadata(&mut target);
        assert_eq!(target.camera_make.as_deref(), Some("Canon"));
        assert!(target.digest.is_none());
    }

    #[test]
    fn timestamps_before_epoch_are_negative() {
        let before = UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(to_timestamp(before), -10);
    }
}
