//! Pipeline execution implementation.

use super::types::{AnalysisReport, OrganizationPlan};
use crate::config::OrganizerConfig;
use crate::core::cache::CacheBackend;
use crate::core::dedup::{redundant_paths, DuplicateResolver};
use crate::core::hasher::hash_all;
use crate::core::metadata::extract_all;
use crate::core::organize::{
    AlbumPlanner, ExecutionSummary, NameSuggester, OllamaSuggester, OrganizeExecutor, TrashLayout,
};
use crate::core::pool::WorkerPool;
use crate::core::scanner::{
    MediaRecord, MediaScanner, MediaType, ScanConfig, ScanResult, WalkDirScanner,
};
use crate::error::{ConfigError, Result};
use crate::events::{null_sender, Event, EventSender, PipelineEvent, PipelinePhase};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: OrganizerConfig,
    cache: Option<Arc<dyn CacheBackend>>,
    suggester: Option<Box<dyn NameSuggester>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self::from_config(OrganizerConfig::default())
    }

    /// Start from a complete configuration
    pub fn from_config(config: OrganizerConfig) -> Self {
        Self {
            config,
            cache: None,
            suggester: None,
        }
    }

    /// Set the folder to scan
    pub fn scan_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.scan_root = path.into();
        self
    }

    /// Set the library the albums are created in
    pub fn library_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.library_root = path.into();
        self
    }

    /// Set the trash folder for duplicates
    pub fn trash_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.trash_root = Some(path.into());
        self
    }

    /// Set the worker count of both processing stages
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Stop scanning after `limit` files
    pub fn file_limit(mut self, limit: Option<usize>) -> Self {
        self.config.file_limit = limit;
        self
    }

    /// Enable or disable cache pruning on full scans
    pub fn prune(mut self, prune: bool) -> Self {
        self.config.prune = prune;
        self
    }

    /// Set the cache backend
    pub fn cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the album name source
    pub fn suggester(mut self, suggester: Box<dyn NameSuggester>) -> Self {
        self.suggester = Some(suggester);
        self
    }

    /// Build the pipeline.
    ///
    /// Without a suggester the configured naming endpoint is used. Without
    /// a cache every run recomputes everything.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigError> {
        let pool = WorkerPool::new(self.config.workers)?;
        let suggester = self.suggester.unwrap_or_else(|| {
            let ollama = OllamaSuggester::new(self.config.endpoint.clone(), self.config.model.clone());
            debug!("album names from {} at {}", ollama.model(), self.config.endpoint);
            Box::new(ollama)
        });

        Ok(Pipeline {
            config: self.config,
            cache: self.cache,
            suggester,
            pool,
            resolver: DuplicateResolver::new(),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The organizer pipeline.
///
/// [`analyze`](Pipeline::analyze) never touches media files; it returns a
/// plan for review. [`execute`](Pipeline::execute) carries that plan out.
pub struct Pipeline {
    config: OrganizerConfig,
    cache: Option<Arc<dyn CacheBackend>>,
    suggester: Box<dyn NameSuggester>,
    pool: WorkerPool,
    resolver: DuplicateResolver,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    /// The cache backend, if one is configured
    pub fn cache(&self) -> Option<&dyn CacheBackend> {
        self.cache.as_deref()
    }

    /// Analyze without events
    pub fn analyze_silent(&self) -> Result<OrganizationPlan> {
        self.analyze(&null_sender())
    }

    /// Scan, extract, hash, deduplicate and plan albums.
    ///
    /// Only a missing or unreadable scan root is an error; every per-file
    /// problem is logged and counted.
    pub fn analyze(&self, events: &EventSender) -> Result<OrganizationPlan> {
        let start = Instant::now();
        events.send(Event::Pipeline(PipelineEvent::Started));

        // Phase 1: Scanning
        events.phase(PipelinePhase::Scanning);
        let ScanResult {
            mut records,
            skipped,
            capped,
        } = self.scan(events)?;
        info!(
            "scan found {} media files ({} skipped{})",
            records.len(),
            skipped,
            if capped { ", capped" } else { "" }
        );

        let mut report = AnalysisReport {
            skipped,
            capped,
            ..Default::default()
        };
        for record in &records {
            match record.media_type {
                MediaType::Photo => report.photos += 1,
                MediaType::Video => report.videos += 1,
                MediaType::Audio => report.music += 1,
                MediaType::Unknown => {}
            }
        }

        // Phase 2: Pruning (full scans only)
        if self.config.prune {
            report.pruned = self.prune_records(&records, capped, events);
        }

        // Phase 3: Metadata
        events.phase(PipelinePhase::Metadata);
        report.metadata = extract_all(&self.pool, &mut records, self.cache(), events);
        info!(
            "metadata: {} cached, {} extracted, {} failed ({} workers)",
            report.metadata.cache_hits,
            report.metadata.computed,
            report.metadata.failed,
            self.pool.workers()
        );

        // Phase 4: Hashing
        events.phase(PipelinePhase::Hashing);
        report.hashing = hash_all(&self.pool, &mut records, self.cache(), events);
        info!(
            "hashing: {} cached, {} computed, {} failed",
            report.hashing.cache_hits, report.hashing.computed, report.hashing.failed
        );
        report.new_files = records.iter().filter(|r| r.is_fresh).count();

        // Phase 5: Duplicates
        events.phase(PipelinePhase::Deduplicating);
        let duplicates = self.resolver.resolve(&records);
        report.duplicate_groups = duplicates.len();
        report.redundant_files = duplicates.iter().map(|g| g.redundant_count()).sum();
        report.reclaimable_bytes = duplicates.iter().map(|g| g.redundant_bytes).sum();
        info!(
            "{} duplicate groups, {} redundant files",
            report.duplicate_groups, report.redundant_files
        );

        // Phase 6: Albums
        events.phase(PipelinePhase::Organizing);
        let excluded = redundant_paths(&duplicates);
        let albums = AlbumPlanner::new(&self.config.library_root, self.suggester.as_ref())
            .with_cache(self.cache())
            .plan(&records, &excluded, events);
        report.albums = albums.len();
        report.files_to_move = albums.iter().map(|a| a.files.len()).sum();

        self.checkpoint();
        report.duration_ms = start.elapsed().as_millis() as u64;
        events.send(Event::Pipeline(PipelineEvent::Completed {
            phase: PipelinePhase::Organizing,
        }));

        Ok(OrganizationPlan::new(albums, duplicates, report))
    }

    /// Carry out a reviewed plan: move album files, then trash duplicates
    pub fn execute(&self, plan: &mut OrganizationPlan, events: &EventSender) -> ExecutionSummary {
        events.phase(PipelinePhase::Executing);
        let trash = TrashLayout::new(&self.config.scan_root, self.config.trash_root());

        let summary = OrganizeExecutor::new(self.cache()).execute(
            &mut plan.albums,
            &plan.duplicates,
            &trash,
            events,
        );
        info!(
            "moved {}, trashed {}, failed {} in {} ms",
            summary.moved, summary.trashed, summary.failed, summary.duration_ms
        );

        self.checkpoint();
        events.send(Event::Pipeline(PipelineEvent::Completed {
            phase: PipelinePhase::Executing,
        }));
        summary
    }

    /// Scan the whole tree and drop cache rows for files that are gone.
    ///
    /// Returns `None` when there is no cache or the scan was capped.
    pub fn prune(&self, events: &EventSender) -> Result<Option<usize>> {
        events.phase(PipelinePhase::Scanning);
        let scan = self.scan(events)?;
        let pruned = self.prune_records(&scan.records, scan.capped, events);
        self.checkpoint();
        Ok(pruned)
    }

    fn scan(&self, events: &EventSender) -> Result<ScanResult> {
        let scanner = WalkDirScanner::new(ScanConfig {
            follow_symlinks: false,
            file_limit: self.config.file_limit,
            exclude_patterns: self.config.exclude_patterns.clone(),
        });
        Ok(scanner.scan(&self.config.scan_root, events)?)
    }

    fn prune_records(
        &self,
        records: &[MediaRecord],
        capped: bool,
        events: &EventSender,
    ) -> Option<usize> {
        let cache = self.cache()?;

        if capped || self.config.is_capped() {
            warn!("file limit is set, refusing to prune the cache from a partial scan");
            return None;
        }

        events.phase(PipelinePhase::Pruning);
        let valid = records.iter().map(|r| r.path.clone()).collect();
        match cache.prune_deleted(&valid) {
            Ok(removed) => {
                info!("pruned {} stale cache entries", removed);
                Some(removed)
            }
            Err(e) => {
                warn!("cache prune failed: {}", e);
                None
            }
        }
    }

    /// Wait for queued cache writes so the next reader sees them
    fn checkpoint(&self) {
        if let Some(cache) = self.cache() {
            if let Err(e) = cache.flush() {
                debug!("cache flush failed: {}", e);
            }
        }
    }
}
