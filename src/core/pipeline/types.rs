//! Results handed across the review checkpoint.

use crate::core::dedup::DuplicateGroup;
use crate::core::organize::AlbumPlan;
use crate::core::pool::StageStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Counters collected during analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub photos: usize,
    pub videos: usize,
    pub music: usize,
    /// Entries the scanner could not read
    pub skipped: usize,
    /// Whether the file limit stopped the scan
    pub capped: bool,
    /// Records whose data was computed this run
    pub new_files: usize,
    pub metadata: StageStats,
    pub hashing: StageStats,
    /// Cache rows removed, `None` when pruning did not run
    pub pruned: Option<usize>,
    pub duplicate_groups: usize,
    /// Duplicate non-survivors headed for the trash
    pub redundant_files: usize,
    /// Bytes freed by trashing every non-survivor
    pub reclaimable_bytes: u64,
    pub albums: usize,
    /// Files the plan would move into albums
    pub files_to_move: usize,
    pub duration_ms: u64,
}

impl AnalysisReport {
    /// All media files the scan accepted
    pub fn total_files(&self) -> usize {
        self.photos + self.videos + self.music
    }
}

/// Everything a caller needs to review before executing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationPlan {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub albums: Vec<AlbumPlan>,
    pub duplicates: Vec<DuplicateGroup>,
    pub report: AnalysisReport,
}

impl OrganizationPlan {
    pub fn new(
        albums: Vec<AlbumPlan>,
        duplicates: Vec<DuplicateGroup>,
        report: AnalysisReport,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            albums,
            duplicates,
            report,
        }
    }

    /// True when executing would not touch any file
    pub fn is_empty(&self) -> bool {
        self.albums.iter().all(|a| a.files.is_empty()) && self.duplicates.is_empty()
    }
}
