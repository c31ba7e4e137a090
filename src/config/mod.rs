//! # Configuration
//!
//! Runtime settings for one organizer run and the startup checks that
//! guard them. A failed check is the only fatal error category.

use crate::core::organize::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::core::pool::default_workers;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the trash folder created under the scan root by default
pub const TRASH_DIR_NAME: &str = ".duplicates-trash";

/// Cache location relative to the library root
pub const CACHE_DIR_NAME: &str = ".media-organizer-cache";
pub const CACHE_FILE_NAME: &str = "cache.db";

/// Settings for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerConfig {
    /// Folder to scan for media
    pub scan_root: PathBuf,
    /// Library the albums are created in
    pub library_root: PathBuf,
    /// Trash for duplicates (default: `<scan root>/.duplicates-trash`)
    pub trash_root: Option<PathBuf>,
    /// Cache database (default: `<library>/.media-organizer-cache/cache.db`)
    pub cache_path: Option<PathBuf>,
    /// Model used by the naming service
    pub model: String,
    /// Base URL of the naming service
    pub endpoint: String,
    /// Worker threads per processing stage
    pub workers: usize,
    /// Stop scanning after this many files (`None` = full scan)
    pub file_limit: Option<usize>,
    /// Plan only, never move files
    pub dry_run: bool,
    /// Prune stale cache entries after a full scan
    pub prune: bool,
    /// Custom exclusion patterns (`None` = defaults)
    pub exclude_patterns: Option<Vec<String>>,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            scan_root: PathBuf::from("."),
            library_root: dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
            trash_root: None,
            cache_path: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            workers: default_workers(),
            file_limit: None,
            dry_run: true,
            prune: true,
            exclude_patterns: None,
        }
    }
}

impl OrganizerConfig {
    /// Config for scanning `scan_root` with every other value defaulted
    pub fn new(scan_root: impl Into<PathBuf>) -> Self {
        Self {
            scan_root: scan_root.into(),
            ..Default::default()
        }
    }

    /// Effective trash location
    pub fn trash_root(&self) -> PathBuf {
        self.trash_root
            .clone()
            .unwrap_or_else(|| self.scan_root.join(TRASH_DIR_NAME))
    }

    /// Effective cache database location
    pub fn cache_path(&self) -> PathBuf {
        self.cache_path.clone().unwrap_or_else(|| {
            self.library_root
                .join(CACHE_DIR_NAME)
                .join(CACHE_FILE_NAME)
        })
    }

    /// Whether the scan stops early; capped runs never prune the cache
    pub fn is_capped(&self) -> bool {
        self.file_limit.is_some()
    }

    /// Startup checks: readable scan root, writable library and trash,
    /// at least one worker
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.scan_root.exists() {
            return Err(ConfigError::ScanRootMissing {
                path: self.scan_root.clone(),
            });
        }
        if !self.scan_root.is_dir() {
            return Err(ConfigError::ScanRootUnreadable {
                path: self.scan_root.clone(),
                reason: "not a directory".to_string(),
            });
        }
        fs::read_dir(&self.scan_root).map_err(|e| ConfigError::ScanRootUnreadable {
            path: self.scan_root.clone(),
            reason: e.to_string(),
        })?;

        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers(self.workers));
        }

        ensure_writable(&self.library_root)?;
        ensure_writable(&self.trash_root())?;
        Ok(())
    }
}

/// Check that `dir`, or the nearest existing ancestor it would be created
/// in, accepts new files
fn ensure_writable(dir: &Path) -> Result<(), ConfigError> {
    let existing = dir
        .ancestors()
        .find(|p| p.is_dir())
        .unwrap_or_else(|| Path::new("."));

    let probe = existing.join(format!(".write-test-{}", uuid::Uuid::new_v4()));
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe)
        .map_err(|source| ConfigError::NotWritable {
            path: dir.to_path_buf(),
            source,
        })?;

    if let Err(e) = fs::remove_file(&probe) {
        debug!("could not remove probe {}: {}", probe.display(), e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(temp: &TempDir) -> OrganizerConfig {
        OrganizerConfig {
            library_root: temp.path().join("library"),
            ..OrganizerConfig::new(temp.path())
        }
    }

    #[test]
    fn defaults_follow_roots() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);

        assert_eq!(config.trash_root(), temp.path().join(".duplicates-trash"));
        assert_eq!(
            config.cache_path(),
            temp.path().join("library/.media-organizer-cache/cache.db")
        );
        assert_eq!(config.model, "gemma2:2b");
        assert!(config.dry_run);
        assert!(!config.is_capped());
    }

    #[test]
    fn valid_config_passes_without_creating_folders() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);

        config.validate().unwrap();
        assert!(!temp.path().join("library").exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_scan_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let config = OrganizerConfig::new(temp.path().join("nope"));

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ScanRootMissing { .. }));
        assert!(err.to_string().contains("--path"));
    }

    #[test]
    fn file_as_scan_root_is_rejected() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.jpg");
        fs::write(&file, b"x").unwrap();

        let err = OrganizerConfig::new(&file).validate().unwrap_err();
        assert!(matches!(err, ConfigError::ScanRootUnreadable { .. }));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let temp = TempDir::new().unwrap();
        let config = OrganizerConfig {
            workers: 0,
            ..config(&temp)
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWorkers(0))
        ));
    }

    #[test]
    fn deserializes_partial_settings() {
        let config: OrganizerConfig =
            serde_json::from_str(r#"{"scan_root": "/media", "file_limit": 100}"#).unwrap();
        assert_eq!(config.scan_root, PathBuf::from("/media"));
        assert!(config.is_capped());
        assert!(config.prune);
    }
}
