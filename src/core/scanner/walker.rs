//! Directory walking implementation using walkdir.

use super::{filter::MediaFilter, MediaRecord, MediaScanner, MediaType, ScanResult};
use crate::error::ScanError;
use crate::events::{Event, EventSender, PipelinePhase, ProgressSnapshot};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Configuration for the directory scanner
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Stop after this many accepted files (None = unlimited)
    pub file_limit: Option<usize>,
    /// Custom exclusion patterns (None = use defaults)
    pub exclude_patterns: Option<Vec<String>>,
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: MediaFilter,
}

impl WalkDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = MediaFilter::new();

        if let Some(ref patterns) = config.exclude_patterns {
            filter = filter.with_exclude_patterns(patterns.clone());
        }

        Self { config, filter }
    }
}

#[derive(Default)]
struct TypeCounts {
    photos: usize,
    videos: usize,
    music: usize,
}

impl TypeCounts {
    fn add(&mut self, media_type: MediaType) {
        match media_type {
            MediaType::Photo => self.photos += 1,
            MediaType::Video => self.videos += 1,
            MediaType::Audio => self.music += 1,
            MediaType::Unknown => {}
        }
    }
}

impl MediaScanner for WalkDirScanner {
    fn scan(&self, root: &Path, events: &EventSender) -> Result<ScanResult, ScanError> {
        if !root.exists() {
            return Err(ScanError::RootNotFound {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let mut result = ScanResult::default();
        let mut counts = TypeCounts::default();

        let mut walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .into_iter();

        while let Some(entry_result) = walker.next() {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("skipping unreadable entry: {}", e);
                    result.skipped += 1;
                    continue;
                }
            };

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);

            if entry.file_type().is_dir() {
                if entry.depth() > 0 && self.filter.is_excluded(relative, true) {
                    walker.skip_current_dir();
                }
                continue;
            }

            let Some(media_type) = self.filter.classify(path) else {
                continue;
            };
            if self.filter.is_excluded(relative, false) {
                continue;
            }

            if let Some(limit) = self.config.file_limit {
                if result.records.len() >= limit {
                    result.capped = true;
                    break;
                }
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("skipping {}: {}", path.display(), e);
                    result.skipped += 1;
                    continue;
                }
            };

            result
                .records
                .push(MediaRecord::new(path, metadata.len(), media_type));
            counts.add(media_type);

            let found = result.records.len();
            events.send(Event::Progress(ProgressSnapshot {
                phase: PipelinePhase::Scanning,
                processed: found,
                total: found,
                photos: counts.photos,
                videos: counts.videos,
                music: counts.music,
                current: path.display().to_string(),
            }));
        }

        Ok(result)
    }
}
