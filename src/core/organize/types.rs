//! Types for the organize module.

use crate::core::scanner::{MediaRecord, MediaType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Top-level library folder for photo albums
pub const PHOTOS_DIR: &str = "Photos";
/// Top-level library folder for video albums
pub const VIDEOS_DIR: &str = "Videos";
/// Top-level library folder for music
pub const MUSIC_DIR: &str = "Music";

/// A set of records that share one destination folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumPlan {
    /// Display name, also the last path segment of `destination`
    pub name: String,
    /// Folder every member is moved into
    pub destination: PathBuf,
    /// Member records; paths are rewritten as files are moved
    pub files: Vec<MediaRecord>,
    /// Directories the members came from
    pub source_dirs: Vec<PathBuf>,
    /// Representative (median) capture date
    pub date: Option<DateTime<Utc>>,
    /// Content bucket of the album
    pub media_type: MediaType,
}

impl AlbumPlan {
    /// Sum of member sizes
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Where a member would land before conflict resolution
    pub fn target_for(&self, record: &MediaRecord) -> PathBuf {
        self.destination.join(record.file_name())
    }
}

/// Where demoted duplicates go
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashLayout {
    /// Root the scan started from; trash paths are relative to it
    pub scan_root: PathBuf,
    /// Folder mirroring the original structure of trashed files
    pub trash_root: PathBuf,
}

impl TrashLayout {
    pub fn new(scan_root: impl Into<PathBuf>, trash_root: impl Into<PathBuf>) -> Self {
        Self {
            scan_root: scan_root.into(),
            trash_root: trash_root.into(),
        }
    }

    /// Mirror `path` under the trash root.
    ///
    /// Paths outside the scan root keep their full structure minus the
    /// root component.
    pub fn destination_for(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(&self.scan_root) {
            Ok(relative) => self.trash_root.join(relative),
            Err(_) => {
                let relative: PathBuf = path
                    .components()
                    .filter(|c| matches!(c, Component::Normal(_)))
                    .collect();
                self.trash_root.join(relative)
            }
        }
    }
}

/// Result of executing a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Files moved into albums
    pub moved: usize,
    /// Duplicates moved into the trash
    pub trashed: usize,
    /// Files that could not be moved
    pub failed: usize,
    /// Album folders created
    pub folders_created: usize,
    /// Bytes moved into albums
    pub bytes_moved: u64,
    pub duration_ms: u64,
    /// One message per failed file
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trash_mirrors_relative_path() {
        let layout = TrashLayout::new("/src", "/src/.duplicates-trash");
        assert_eq!(
            layout.destination_for(Path::new("/src/Trip2019/a.jpg")),
            PathBuf::from("/src/.duplicates-trash/Trip2019/a.jpg")
        );
    }

    #[test]
    fn trash_keeps_structure_of_outside_paths() {
        let layout = TrashLayout::new("/src", "/trash");
        assert_eq!(
            layout.destination_for(Path::new("/other/x/a.jpg")),
            PathBuf::from("/trash/other/x/a.jpg")
        );
    }

    #[test]
    fn album_target_uses_file_name() {
        let plan = AlbumPlan {
            name: "2019-07 Trip".to_string(),
            destination: PathBuf::from("/lib/Photos/2019/2019-07 Trip"),
            files: vec![MediaRecord::new("/src/Trip/a.jpg", 5, MediaType::Photo)],
            source_dirs: vec![PathBuf::from("/src/Trip")],
            date: None,
            media_type: MediaType::Photo,
        };
        assert_eq!(
            plan.target_for(&plan.files[0]),
            PathBuf::from("/lib/Photos/2019/2019-07 Trip/a.jpg")
        );
        assert_eq!(plan.total_bytes(), 5);
    }
}
