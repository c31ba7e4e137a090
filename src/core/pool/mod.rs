//! # Worker Pool
//!
//! Fixed-size rayon pool shared by the metadata and hashing stages.
//!
//! Records are handed out with `par_iter_mut`, so each record is touched
//! by exactly one worker. A stage is fully drained before `run` returns.

use crate::core::scanner::{MediaRecord, MediaType};
use crate::error::ConfigError;
use crate::events::{Event, EventSender, PipelinePhase, ProgressSnapshot};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

/// Result of processing one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Fields were copied from a valid cache entry
    CacheHit,
    /// Fields were computed from the file itself
    Computed,
    /// The record could not be processed and keeps its previous fields
    Failed(String),
}

/// Counters for one completed stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStats {
    pub processed: usize,
    pub cache_hits: usize,
    pub computed: usize,
    pub failed: usize,
}

/// Default worker count: half the available parallelism, at least one
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() / 2)
        .unwrap_or(1)
        .max(1)
}

/// A bounded set of worker threads
pub struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Build a pool with exactly `workers` threads
    pub fn new(workers: usize) -> Result<Self, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::InvalidWorkers(workers));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("media-worker-{i}"))
            .build()
            .map_err(|e| ConfigError::WorkerPool(e.to_string()))?;

        Ok(Self { pool, workers })
    }

    /// Number of worker threads
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `task` to every record in parallel and wait for all of them.
    ///
    /// A progress snapshot is offered after every record; the channel may
    /// drop it.
    pub fn run<F>(
        &self,
        phase: PipelinePhase,
        records: &mut [MediaRecord],
        events: &EventSender,
        task: F,
    ) -> StageStats
    where
        F: Fn(&mut MediaRecord) -> Outcome + Sync,
    {
        let total = records.len();
        let processed = AtomicUsize::new(0);
        let cache_hits = AtomicUsize::new(0);
        let computed = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let photos = AtomicUsize::new(0);
        let videos = AtomicUsize::new(0);
        let music = AtomicUsize::new(0);

        self.pool.install(|| {
            records.par_iter_mut().for_each(|record| {
                match task(record) {
                    Outcome::CacheHit => {
                        cache_hits.fetch_add(1, Ordering::Relaxed);
                    }
                    Outcome::Computed => {
                        computed.fetch_add(1, Ordering::Relaxed);
                    }
                    Outcome::Failed(reason) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        warn!("{}: {}", record.path.display(), reason);
                    }
                }

                match record.media_type {
                    MediaType::Photo => photos.fetch_add(1, Ordering::Relaxed),
                    MediaType::Video => videos.fetch_add(1, Ordering::Relaxed),
                    MediaType::Audio => music.fetch_add(1, Ordering::Relaxed),
                    MediaType::Unknown => 0,
                };

                let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
                events.send(Event::Progress(ProgressSnapshot {
                    phase,
                    processed: done,
                    total,
                    photos: photos.load(Ordering::Relaxed),
                    videos: videos.load(Ordering::Relaxed),
                    music: music.load(Ordering::Relaxed),
                    current: record.path.display().to_string(),
                }));
            });
        });

        StageStats {
            processed: processed.into_inner(),
            cache_hits: cache_hits.into_inner(),
            computed: computed.into_inner(),
            failed: failed.into_inner(),
        }
    }
}
