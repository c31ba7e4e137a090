//! SQLite cache backend for persistent storage.

use super::writer::{CacheWriter, WriteCommand, WRITE_QUEUE_CAPACITY};
use super::{sample_key, CacheBackend, CacheEntry, CacheStats};
use crate::core::scanner::MediaRecord;
use crate::error::CacheError;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// How long a connection waits on a locked database
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Idle read connections kept around for reuse
const MAX_IDLE_READERS: usize = 16;

const SELECT_ENTRY: &str = "SELECT path, size, mod_time, hash, date_taken, camera_make,
        camera_model, artist, album, title, width, height, processed_at
     FROM files WHERE path = ?";

/// SQLite-backed persistent cache
///
/// Uses WAL (Write-Ahead Logging) mode so readers proceed while the
/// writer commits. Reads go through a small pool of connections; every
/// write goes through one dedicated writer thread.
pub struct SqliteCache {
    db_path: PathBuf,
    readers: ReaderPool,
    writer: CacheWriter,
}

impl SqliteCache {
    /// Open or create a cache database at the given path
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        Self::open_with_capacity(path, WRITE_QUEUE_CAPACITY)
    }

    /// Open with a custom write queue capacity
    pub fn open_with_capacity(path: &Path, capacity: usize) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = open_connection(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| CacheError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        create_schema(&conn).map_err(|e| CacheError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let writer = CacheWriter::spawn(conn, capacity, path)?;
        debug!("opened cache at {}", path.display());

        Ok(Self {
            db_path: path.to_path_buf(),
            readers: ReaderPool::new(path),
            writer,
        })
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Drain pending writes and stop the writer thread
    pub fn close(mut self) {
        self.writer.shutdown();
    }
}

fn open_connection(path: &Path) -> Result<Connection, CacheError> {
    let conn = Connection::open(path).map_err(|e| CacheError::OpenFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| CacheError::QueryFailed(e.to_string()))?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS files (
            path TEXT PRIMARY KEY,
            size INTEGER NOT NULL,
            mod_time INTEGER NOT NULL,
            hash TEXT,
            date_taken INTEGER,
            camera_make TEXT,
            camera_model TEXT,
            artist TEXT,
            album TEXT,
            title TEXT,
            width INTEGER,
            height INTEGER,
            processed_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_files_hash ON files(hash);
        CREATE INDEX IF NOT EXISTS idx_files_mod_time ON files(mod_time);
        CREATE TABLE IF NOT EXISTS album_suggestions (
            folder_path TEXT PRIMARY KEY,
            sample_files TEXT NOT NULL,
            suggestion TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );",
    )
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
    let date_taken: Option<i64> = row.get(4)?;
    Ok(CacheEntry {
        path: PathBuf::from(row.get::<_, String>(0)?),
        size: row.get::<_, i64>(1)? as u64,
        modified: row.get(2)?,
        digest: row.get(3)?,
        capture_date: date_taken.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        camera_make: row.get(5)?,
        camera_model: row.get(6)?,
        artist: row.get(7)?,
        album: row.get(8)?,
        title: row.get(9)?,
        width: row.get(10)?,
        height: row.get(11)?,
        written_at: row.get(12)?,
    })
}

/// Read connections shared between worker threads
struct ReaderPool {
    db_path: PathBuf,
    idle: Mutex<Vec<Connection>>,
}

impl ReaderPool {
    fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Run a query on a pooled connection
    fn with<T>(
        &self,
        query: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, CacheError> {
        let conn = self.checkout()?;
        let result = query(&conn);
        self.checkin(conn);
        result.map_err(|e| CacheError::QueryFailed(e.to_string()))
    }

    fn checkout(&self) -> Result<Connection, CacheError> {
        let pooled = self
            .idle
            .lock()
            .map_err(|_| CacheError::Corrupted {
                path: self.db_path.clone(),
            })?
            .pop();

        match pooled {
            Some(conn) => Ok(conn),
            None => open_connection(&self.db_path),
        }
    }

    fn checkin(&self, conn: Connection) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < MAX_IDLE_READERS {
                idle.push(conn);
            }
        }
    }
}

impl CacheBackend for SqliteCache {
    fn get(
        &self,
        path: &Path,
        current_size: u64,
        current_modified: SystemTime,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let path_str = path.to_string_lossy();

        let entry = self.readers.with(|conn| {
            conn.query_row(SELECT_ENTRY, [&path_str], row_to_entry)
                .optional()
        })?;

        Ok(entry.filter(|e| e.is_valid_for(current_size, current_modified)))
    }

    fn put(&self, record: &MediaRecord, modified: SystemTime) -> Result<(), CacheError> {
        self.writer
            .enqueue(WriteCommand::Upsert(CacheEntry::from_record(record, modified)))
    }

    fn update_path(
        &self,
        old_path: &Path,
        record: &MediaRecord,
        modified: SystemTime,
    ) -> Result<(), CacheError> {
        self.writer.enqueue(WriteCommand::Relocate {
            old_path: old_path.to_string_lossy().into_owned(),
            entry: CacheEntry::from_record(record, modified),
        })
    }

    fn prune_deleted(&self, valid_paths: &HashSet<PathBuf>) -> Result<usize, CacheError> {
        let valid_paths: HashSet<String> = valid_paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        self.writer
            .request(|reply| WriteCommand::Prune { valid_paths, reply })?
    }

    fn get_suggestion(
        &self,
        folder: &Path,
        samples: &[PathBuf],
    ) -> Result<Option<String>, CacheError> {
        let folder_str = folder.to_string_lossy();
        let expected = sample_key(samples)?;

        let row: Option<(String, String)> = self.readers.with(|conn| {
            conn.query_row(
                "SELECT sample_files, suggestion FROM album_suggestions WHERE folder_path = ?",
                [&folder_str],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
        })?;

        Ok(row.and_then(|(stored, suggestion)| (stored == expected).then_some(suggestion)))
    }

    fn put_suggestion(
        &self,
        folder: &Path,
        samples: &[PathBuf],
        suggestion: &str,
    ) -> Result<(), CacheError> {
        self.writer.enqueue(WriteCommand::Suggestion {
            folder: folder.to_string_lossy().into_owned(),
            samples: sample_key(samples)?,
            suggestion: suggestion.to_string(),
        })
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        self.readers.with(|conn| {
            let count = |sql: &str| -> rusqlite::Result<usize> {
                conn.query_row(sql, [], |row| row.get::<_, i64>(0).map(|v| v as usize))
            };

            Ok(CacheStats {
                total_entries: count("SELECT COUNT(*) FROM files")?,
                with_digest: count("SELECT COUNT(*) FROM files WHERE hash IS NOT NULL AND hash != ''")?,
                with_metadata: count(
                    "SELECT COUNT(*) FROM files WHERE camera_make IS NOT NULL OR camera_model IS NOT NULL",
                )?,
                suggestions: count("SELECT COUNT(*) FROM album_suggestions")?,
            })
        })
    }

    fn flush(&self) -> Result<(), CacheError> {
        self.writer.request(WriteCommand::Flush)
    }
}
