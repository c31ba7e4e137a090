//! Serialized write path for the SQLite cache.
//!
//! One thread owns the only writing connection. Producers hand it
//! commands over a bounded channel; data writes never block the caller
//! and are committed in batches.

use super::CacheEntry;
use crate::error::CacheError;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Number of writes that may wait for the writer before new ones are dropped
pub const WRITE_QUEUE_CAPACITY: usize = 1000;

/// Upper bound on commands folded into a single transaction
const MAX_BATCH: usize = 256;

pub(super) enum WriteCommand {
    Upsert(CacheEntry),
    Relocate {
        old_path: String,
        entry: CacheEntry,
    },
    Suggestion {
        folder: String,
        samples: String,
        suggestion: String,
    },
    Prune {
        valid_paths: HashSet<String>,
        reply: Sender<Result<usize, CacheError>>,
    },
    Flush(Sender<()>),
}

/// Handle to the writer thread
pub(super) struct CacheWriter {
    sender: Option<Sender<WriteCommand>>,
    handle: Option<JoinHandle<()>>,
}

impl CacheWriter {
    /// Move `conn` onto a new writer thread
    pub(super) fn spawn(
        conn: Connection,
        capacity: usize,
        db_path: &Path,
    ) -> Result<Self, CacheError> {
        let (sender, receiver) = bounded(capacity.max(1));

        let handle = thread::Builder::new()
            .name("cache-writer".to_string())
            .spawn(move || run(conn, receiver))
            .map_err(|e| CacheError::OpenFailed {
                path: db_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Queue a data write without waiting
    pub(super) fn enqueue(&self, command: WriteCommand) -> Result<(), CacheError> {
        let sender = self.sender.as_ref().ok_or(CacheError::WriterClosed)?;
        sender.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => CacheError::QueueFull,
            TrySendError::Disconnected(_) => CacheError::WriterClosed,
        })
    }

    /// Queue a control command and wait for the writer to answer it
    pub(super) fn request<T>(
        &self,
        build: impl FnOnce(Sender<T>) -> WriteCommand,
    ) -> Result<T, CacheError> {
        let sender = self.sender.as_ref().ok_or(CacheError::WriterClosed)?;
        let (reply_tx, reply_rx) = bounded(1);
        sender
            .send(build(reply_tx))
            .map_err(|_| CacheError::WriterClosed)?;
        reply_rx.recv().map_err(|_| CacheError::WriterClosed)
    }

    /// Stop accepting writes, drain the queue and join the thread
    pub(super) fn shutdown(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("cache writer thread panicked");
            }
        }
    }
}

impl Drop for CacheWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(mut conn: Connection, receiver: Receiver<WriteCommand>) {
    while let Ok(first) = receiver.recv() {
        let mut batch = Vec::with_capacity(MAX_BATCH);
        batch.push(first);
        while batch.len() < MAX_BATCH {
            match receiver.try_recv() {
                Ok(command) => batch.push(command),
                Err(_) => break,
            }
        }
        apply_batch(&mut conn, batch);
    }
    debug!("cache writer drained");
}

fn apply_batch(conn: &mut Connection, batch: Vec<WriteCommand>) {
    let mut pending = Vec::with_capacity(batch.len());

    for command in batch {
        match command {
            WriteCommand::Prune { valid_paths, reply } => {
                commit(conn, &mut pending);
                let _ = reply.send(prune(conn, &valid_paths));
            }
            WriteCommand::Flush(reply) => {
                commit(conn, &mut pending);
                let _ = reply.send(());
            }
            write => pending.push(write),
        }
    }

    commit(conn, &mut pending);
}

/// Commit queued data writes in one transaction. Failures are logged and
/// the affected writes are lost.
fn commit(conn: &mut Connection, pending: &mut Vec<WriteCommand>) {
    if pending.is_empty() {
        return;
    }

    let tx = match conn.transaction() {
        Ok(tx) => tx,
        Err(e) => {
            warn!("cache transaction failed, dropping {} writes: {}", pending.len(), e);
            pending.clear();
            return;
        }
    };

    for command in pending.drain(..) {
        if let Err(e) = apply(&tx, &command) {
            warn!("cache write failed: {}", e);
        }
    }

    if let Err(e) = tx.commit() {
        warn!("cache commit failed: {}", e);
    }
}

fn apply(conn: &Connection, command: &WriteCommand) -> rusqlite::Result<()> {
    match command {
        WriteCommand::Upsert(entry) => upsert(conn, entry),
        WriteCommand::Relocate { old_path, entry } => {
            conn.execute("DELETE FROM files WHERE path = ?", [old_path])?;
            upsert(conn, entry)
        }
        WriteCommand::Suggestion {
            folder,
            samples,
            suggestion,
        } => {
            conn.execute(
                "INSERT OR REPLACE INTO album_suggestions
                 (folder_path, sample_files, suggestion, created_at)
                 VALUES (?, ?, ?, ?)",
                params![folder, samples, suggestion, chrono::Utc::now().timestamp()],
            )?;
            Ok(())
        }
        WriteCommand::Prune { .. } | WriteCommand::Flush(_) => Ok(()),
    }
}

fn upsert(conn: &Connection, entry: &CacheEntry) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO files
         (path, size, mod_time, hash, date_taken, camera_make, camera_model,
          artist, album, title, width, height, processed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            entry.path.to_string_lossy(),
            entry.size as i64,
            entry.modified,
            entry.digest,
            entry.capture_date.map(|d| d.timestamp()),
            entry.camera_make,
            entry.camera_model,
            entry.artist,
            entry.album,
            entry.title,
            entry.width,
            entry.height,
            entry.written_at,
        ],
    )?;
    Ok(())
}

/// Delete every row whose path is not in `valid_paths`, atomically
fn prune(conn: &mut Connection, valid_paths: &HashSet<String>) -> Result<usize, CacheError> {
    let query_failed = |e: rusqlite::Error| CacheError::QueryFailed(e.to_string());

    let tx = conn.transaction().map_err(query_failed)?;

    let stale: Vec<String> = {
        let mut stmt = tx.prepare("SELECT path FROM files").map_err(query_failed)?;
        let paths = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(query_failed)?
            .filter_map(|r| r.ok())
            .filter(|path| !valid_paths.contains(path))
            .collect();
        paths
    };

    {
        let mut delete = tx
            .prepare("DELETE FROM files WHERE path = ?")
            .map_err(query_failed)?;
        for path in &stale {
            delete.execute([path]).map_err(query_failed)?;
        }
    }

    tx.commit().map_err(query_failed)?;
    Ok(stale.len())
}
