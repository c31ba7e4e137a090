//! # Scanner Module
//!
//! Discovers media files under a root directory.
//!
//! ## Supported Formats
//! - Photos: JPEG, PNG, TIFF, HEIC/HEIF and common camera RAW formats
//! - Videos: MP4, MOV, AVI, MKV and friends
//! - Audio: MP3, M4A, FLAC, WAV, AAC, OGG, WMA, ALAC
//!
//! ## Example
//! ```rust,ignore
//! use media_organizer::core::scanner::{MediaScanner, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! let result = scanner.scan(Path::new("/Volumes/Backup"), &null_sender())?;
//! ```

mod filter;
mod walker;

pub use filter::{MediaFilter, DEFAULT_EXCLUDE_PATTERNS};
pub use walker::{ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use crate::events::EventSender;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Content-type classification of a media file
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum MediaType {
    Photo,
    Video,
    Audio,
    #[default]
    Unknown,
}

impl MediaType {
    /// Classify a file by its extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" | "png" | "tiff" | "tif" | "heic" | "heif" | "raw" | "cr2"
            | "nef" | "arw" => MediaType::Photo,
            "mp4" | "mov" | "avi" | "wmv" | "mkv" | "m4v" | "mpg" | "mpeg" | "flv" | "3gp"
            | "mts" | "m2ts" => MediaType::Video,
            "mp3" | "m4a" | "flac" | "wav" | "aac" | "ogg" | "wma" | "alac" => MediaType::Audio,
            _ => MediaType::Unknown,
        }
    }

    /// Classify a path by its extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(MediaType::Unknown)
    }

    /// Check if this type is one the organizer handles
    pub fn is_supported(&self) -> bool {
        !matches!(self, MediaType::Unknown)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Photo => write!(f, "Photo"),
            MediaType::Video => write!(f, "Video"),
            MediaType::Audio => write!(f, "Music"),
            MediaType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One media file and everything derived about it.
///
/// The path is the identity and is rewritten when the file is moved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Content-type classification
    pub media_type: MediaType,
    /// Hex content digest, empty until hashed
    pub digest: Option<String>,
    /// Capture date (EXIF or file modification time)
    pub capture_date: Option<DateTime<Utc>>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    /// Pixel width
    pub width: Option<u32>,
    /// Pixel height
    pub height: Option<u32>,
    /// True when this run computed the data itself rather than reading it
    /// from the cache
    pub is_fresh: bool,
}

impl MediaRecord {
    /// Create a record for a freshly discovered file
    pub fn new(path: impl Into<PathBuf>, size: u64, media_type: MediaType) -> Self {
        Self {
            path: path.into(),
            size,
            media_type,
            ..Default::default()
        }
    }

    /// Directory that directly contains this file
    pub fn source_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Final path component as a lossy string
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Result of a scan operation
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Discovered media files
    pub records: Vec<MediaRecord>,
    /// Entries skipped because they could not be read
    pub skipped: usize,
    /// Whether the file cap stopped the walk early
    pub capped: bool,
}

impl ScanResult {
    /// Count records of one type
    pub fn count_of(&self, media_type: MediaType) -> usize {
        self.records
            .iter()
            .filter(|r| r.media_type == media_type)
            .count()
    }
}

/// Trait for media scanners
pub trait MediaScanner: Send + Sync {
    /// Walk `root` and return every accepted media file
    fn scan(&self, root: &Path, events: &EventSender) -> Result<ScanResult, ScanError>;
}
