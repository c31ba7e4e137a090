//! # Duplicate Resolver
//!
//! Groups records by exact content digest and picks one survivor per
//! group.
//!
//! ## Ranking
//! Candidates are ranked by a [`DuplicateScore`] compared field by field,
//! in declaration order:
//! 1. size in whole kilobytes (larger wins)
//! 2. not under a `/Recovered/` directory
//! 3. already under an organized media directory (`/Photos/`, `/Music/`, ...)
//! 4. not under an `/UNNAMED_` directory
//! 5. number of metadata fields present (camera, album)
//!
//! Remaining ties go to the lexicographically smallest path, so the same
//! input always yields the same survivor.

use crate::core::scanner::MediaRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Marker for files restored by recovery tools
pub const RECOVERED_MARKER: &str = "/Recovered/";

/// Marker for directories with placeholder names
pub const UNNAMED_MARKER: &str = "/UNNAMED_";

/// Directories that indicate a file has already been organized
pub const DEFAULT_ORGANIZED_MARKERS: &[&str] = &[
    "/Photo/",
    "/Photos/",
    "/Pictures/",
    "/Video/",
    "/Videos/",
    "/Music/",
];

/// Structured ranking key. The derived `Ord` compares fields top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DuplicateScore {
    pub size_kb: u64,
    pub not_recovered: bool,
    pub organized: bool,
    pub not_unnamed: bool,
    pub metadata_fields: u8,
}

/// Files sharing one content digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// The shared content digest
    pub digest: String,
    /// Every member, best first
    pub files: Vec<PathBuf>,
    /// The survivor
    pub best: PathBuf,
    /// Bytes freed by removing every member except the survivor
    pub redundant_bytes: u64,
}

impl DuplicateGroup {
    /// Members other than the survivor
    pub fn redundant(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter().filter(move |f| **f != self.best)
    }

    /// Number of redundant members
    pub fn redundant_count(&self) -> usize {
        self.files.len() - 1
    }
}

/// Every non-survivor across all groups
pub fn redundant_paths(groups: &[DuplicateGroup]) -> HashSet<PathBuf> {
    groups
        .iter()
        .flat_map(|g| g.redundant().cloned())
        .collect()
}

/// Groups records by digest and ranks each group
#[derive(Debug, Clone)]
pub struct DuplicateResolver {
    organized_markers: Vec<String>,
}

impl DuplicateResolver {
    /// Create a resolver with the default organized-directory markers
    pub fn new() -> Self {
        Self {
            organized_markers: DEFAULT_ORGANIZED_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }

    /// Override the organized-directory markers
    pub fn with_organized_markers(mut self, markers: Vec<String>) -> Self {
        self.organized_markers = markers;
        self
    }

    /// Score one candidate
    pub fn score(&self, record: &MediaRecord) -> DuplicateScore {
        let path = normalized(&record.path);
        let metadata_fields = [record.camera_make.is_some(), record.album.is_some()]
            .into_iter()
            .filter(|present| *present)
            .count() as u8;

        DuplicateScore {
            size_kb: record.size / 1024,
            not_recovered: !path.contains(RECOVERED_MARKER),
            organized: self
                .organized_markers
                .iter()
                .any(|marker| path.contains(marker.as_str())),
            not_unnamed: !path.contains(UNNAMED_MARKER),
            metadata_fields,
        }
    }

    /// Partition hashed records into duplicate groups.
    ///
    /// Records without a digest are ignored and singleton groups are
    /// dropped. Groups come back ordered by digest.
    pub fn resolve(&self, records: &[MediaRecord]) -> Vec<DuplicateGroup> {
        let mut by_digest: BTreeMap<&str, Vec<&MediaRecord>> = BTreeMap::new();
        for record in records {
            if let Some(digest) = record.digest.as_deref().filter(|d| !d.is_empty()) {
                by_digest.entry(digest).or_default().push(record);
            }
        }

        by_digest
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(digest, members)| self.rank(digest, members))
            .collect()
    }

    fn rank(&self, digest: &str, mut members: Vec<&MediaRecord>) -> DuplicateGroup {
        members.sort_by_cached_key(|r| (Reverse(self.score(r)), r.path.clone()));

        let best = members[0].path.clone();
        let redundant_bytes = members[1..].iter().map(|r| r.size).sum();

        DuplicateGroup {
            digest: digest.to_string(),
            files: members.iter().map(|r| r.path.clone()).collect(),
            best,
            redundant_bytes,
        }
    }
}

impl Default for DuplicateResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn normalized(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
