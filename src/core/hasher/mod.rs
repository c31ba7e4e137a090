//! # Hasher Module
//!
//! Content digests for exact duplicate detection.
//!
//! Files are streamed through BLAKE3 in fixed-size chunks, so memory use
//! does not depend on file size. The digest is stored as lowercase hex.
//!
//! ## Example
//! ```rust,ignore
//! use media_organizer::core::hasher::digest_file;
//!
//! let digest = digest_file(Path::new("/photos/IMG_0001.jpg"))?;
//! assert_eq!(digest.len(), 64);
//! ```

use crate::core::cache::CacheBackend;
use crate::core::pool::{Outcome, StageStats, WorkerPool};
use crate::core::scanner::MediaRecord;
use crate::error::HashError;
use crate::events::{EventSender, PipelinePhase};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use tracing::debug;

/// Read buffer size for streaming files through the hasher
const READ_BUFFER: usize = 256 * 1024;

/// Compute the hex BLAKE3 digest of a file's full content
pub fn digest_file(path: &Path) -> Result<String, HashError> {
    let io_error = |source: io::Error| HashError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_error)?;
    let mut reader = BufReader::with_capacity(READ_BUFFER, file);
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut reader, &mut hasher).map_err(io_error)?;

    Ok(hasher.finalize().to_hex().to_string())
}

/// Compute a digest for every record.
///
/// A cache entry only counts as a hit here when it carries a digest.
pub fn hash_all(
    pool: &WorkerPool,
    records: &mut [MediaRecord],
    cache: Option<&dyn CacheBackend>,
    events: &EventSender,
) -> StageStats {
    pool.run(PipelinePhase::Hashing, records, events, |record| {
        process_record(record, cache)
    })
}

fn process_record(record: &mut MediaRecord, cache: Option<&dyn CacheBackend>) -> Outcome {
    let stat = match std::fs::metadata(&record.path) {
        Ok(stat) => stat,
        Err(e) => return Outcome::Failed(format!("cannot stat file: {e}")),
    };
    let modified = stat.modified().ok();
    record.size = stat.len();

    if let (Some(cache), Some(modified)) = (cache, modified) {
        match cache.get(&record.path, record.size, modified) {
            Ok(Some(entry)) if entry.has_digest() => {
                record.digest = entry.digest;
                return Outcome::CacheHit;
            }
            Ok(_) => {}
            Err(e) => debug!("cache read failed for {}: {}", record.path.display(), e),
        }
    }

    match digest_file(&record.path) {
        Ok(digest) => {
            record.digest = Some(digest);
            record.is_fresh = true;
        }
        Err(e) => return Outcome::Failed(e.to_string()),
    }

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
    use crate::core::scanner::MediaType;
    use crate::events::null_sender;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn identical_content_gives_identical_digest() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("nested_b.jpg");
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();

        assert_eq!(digest_file(&a).unwrap(), digest_file(&b).unwrap());
    }

    #[test]
    fn different_content_gives_different_digest() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        fs::write(&a, b"one").unwrap();
        fs::write(&b, b"two").unwrap();

        let digest = digest_file(&a).unwrap();
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, digest_file(&b).unwrap());
    }

    #[test]
    fn digest_matches_blake3_reference() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, b"abc").unwrap();

        assert_eq!(
            digest_file(&path).unwrap(),
            blake3::hash(b"abc").to_hex().to_string()
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(matches!(
            digest_file(Path::new("/nonexistent/a.jpg")),
            Err(HashError::Io { .. })
        ));
    }

    #[test]
    fn metadata_only_entry_is_not_a_hash_hit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, b"content").unwrap();
        let stat = fs::metadata(&path).unwrap();

        let cache = InMemoryCache::new();
        let record = MediaRecord::new(&path, stat.len(), MediaType::Photo);
        cache.put(&record, stat.modified().unwrap()).unwrap();

        let mut records = vec![record];
        let pool = WorkerPool::new(1).unwrap();
        let first = hash_all(&pool, &mut records, Some(&cache), &null_sender());
        assert_eq!(first.computed, 1);
        assert!(records[0].digest.is_some());

        records[0].digest = None;
        let second = hash_all(&pool, &mut records, Some(&cache), &null_sender());
        assert_eq!(second.cache_hits, 1);
        assert!(records[0].digest.is_some());
    }
}
