//! # Metadata Module
//!
//! Populates capture date, camera, dimension and audio tag fields.
//!
//! ## Strategies
//! One strategy per [`MediaType`]:
//! - **Photo** - EXIF (DateTimeOriginal, Make, Model, pixel dimensions)
//! - **Audio** - embedded tags for artist/album/title
//! - **Video**, **Unknown** - nothing beyond the shared fallback
//!
//! Every strategy finishes with the shared fallback: when no capture date
//! was found, the file modification time is used (or the current time if
//! the file could not be stat'ed). Dates are kept at whole-second
//! precision so they survive a trip through the cache unchanged.

mod audio;
mod photo;

use crate::core::cache::{to_timestamp, CacheBackend};
use crate::core::pool::{Outcome, StageStats, WorkerPool};
use crate::core::scanner::{MediaRecord, MediaType};
use crate::events::{EventSender, PipelinePhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

/// Fields produced by one extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub capture_date: Option<DateTime<Utc>>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ExtractedMetadata {
    /// Check if any camera or tag data was extracted
    pub fn has_data(&self) -> bool {
        self.camera_make.is_some()
            || self.camera_model.is_some()
            || self.artist.is_some()
            || self.album.is_some()
            || self.width.is_some()
    }

    /// Copy every field onto a record
    pub fn apply_to(self, record: &mut MediaRecord) {
        record.capture_date = self.capture_date;
        record.camera_make = self.camera_make;
        record.camera_model = self.camera_model;
        record.artist = self.artist;
        record.album = self.album;
        record.title = self.title;
        record.width = self.width;
        record.height = self.height;
    }
}

/// Extract metadata for a file of the given type.
///
/// `modified` is the file's modification time, `None` when it could not
/// be read.
pub fn extract(media_type: MediaType, path: &Path, modified: Option<SystemTime>) -> ExtractedMetadata {
    let mut metadata = match media_type {
        MediaType::Photo => photo::read_exif(path).unwrap_or_default(),
        MediaType::Audio => audio::read_tags(path),
        MediaType::Video | MediaType::Unknown => ExtractedMetadata::default(),
    };

    metadata.capture_date = metadata
        .capture_date
        .or_else(|| Some(fallback_date(modified)));
    metadata
}

/// Capture date used when the file carries none of its own
pub fn fallback_date(modified: Option<SystemTime>) -> DateTime<Utc> {
    let secs = to_timestamp(modified.unwrap_or_else(SystemTime::now));
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

/// Run metadata extraction over every record.
///
/// Cache hits copy the cached fields and leave the record not fresh;
/// misses extract, mark the record fresh and enqueue a cache write.
pub fn extract_all(
    pool: &WorkerPool,
    records: &mut [MediaRecord],
    cache: Option<&dyn CacheBackend>,
    events: &EventSender,
) -> StageStats {
    pool.run(PipelinePhase::Metadata, records, events, |record| {
        process_record(record, cache)
    })
}

fn process_record(record: &mut MediaRecord, cache: Option<&dyn CacheBackend>) -> Outcome {
    let stat = match std::fs::metadata(&record.path) {
        Ok(stat) => stat,
        Err(e) => {
            extract(record.media_type, &record.path, None).apply_to(record);
            record.is_fresh = true;
            return Outcome::Failed(format!("cannot stat file: {e}"));
        }
    };
    let modified = stat.modified().ok();
    record.size = stat.len();

    if let (Some(cache), Some(modified)) = (cache, modified) {
        match cache.get(&record.path, record.size, modified) {
            Ok(Some(entry)) => {
                entry.apply_metadata(record);
                record.is_fresh = false;
                return Outcome::CacheHit;
            }
            Ok(None) => {}
            Err(e) => debug!("cache read failed for {}: {}", record.path.display(), e),
        }
    }

    extract(record.media_type, &record.path, modified).apply_to(record);
    record.is_fresh = true;

    if let (Some(cache), Some(modified)) = (cache, modified) {
        if let Err(e) = cache.put(record, modified) {
            debug!("cache write skipped for {}: {}", record.path.display(), e);
        }
    }

    Outcome::Computed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::InMemoryCache;
    use crate::events::null_sender;
    use std::fs;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn media_file(dir: &TempDir, name: &str) -> MediaRecord {
        let path = dir.path().join(name);
        fs::write(&path, b"media bytes").unwrap();
        MediaRecord::new(path, 0, MediaType::from_path(Path::new(name)))
    }

    #[test]
    fn video_falls_back_to_modification_time() {
        let modified = UNIX_EPOCH + Duration::from_secs(1_500_000_000);
        let metadata = extract(MediaType::Video, Path::new("/x/clip.mp4"), Some(modified));
        assert_eq!(metadata.capture_date.unwrap().timestamp(), 1_500_000_000);
        assert!(!metadata.has_data());
    }

    #[test]
    fn photo_without_exif_falls_back_silently() {
        let dir = TempDir::new().unwrap();
        let record = media_file(&dir, "a.jpg");
        let modified = UNIX_EPOCH + Duration::from_secs(1_600_000_000);

        let metadata = extract(MediaType::Photo, &record.path, Some(modified));
        assert_eq!(metadata.capture_date.unwrap().timestamp(), 1_600_000_000);
        assert!(metadata.camera_make.is_none());
    }

    #[test]
    fn fallback_date_drops_subsecond_precision() {
        let modified = UNIX_EPOCH + Duration::from_millis(1_600_000_000_750);
        assert_eq!(fallback_date(Some(modified)).timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn second_run_is_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let mut records = vec![media_file(&dir, "a.jpg"), media_file(&dir, "b.mp4")];
        let cache = InMemoryCache::new();
        let pool = WorkerPool::new(2).unwrap();

        let first = extract_all(&pool, &mut records, Some(&cache), &null_sender());
        assert_eq!(first.computed, 2);
        assert!(records.iter().all(|r| r.is_fresh && r.size == 11));
        let first_pass = records.clone();

        let second = extract_all(&pool, &mut records, Some(&cache), &null_sender());
        assert_eq!(second.cache_hits, 2);
        assert!(records.iter().all(|r| !r.is_fresh));
        for (before, after) in first_pass.iter().zip(&records) {
            assert_eq!(before.capture_date, after.capture_date);
        }
    }

    #[test]
    fn missing_file_is_reported_but_dated() {
        let mut records = vec![MediaRecord::new("/nonexistent/a.jpg", 0, MediaType::Photo)];
        let pool = WorkerPool::new(1).unwrap();

        let stats = extract_all(&pool, &mut records, None, &null_sender());
        assert_eq!(stats.failed, 1);
        assert!(records[0].capture_date.is_some());
    }
}
