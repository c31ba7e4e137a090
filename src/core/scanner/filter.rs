//! File filtering logic for the scanner.

use super::MediaType;
use std::path::{Path, MAIN_SEPARATOR};

/// Path fragments that are never scanned
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "/.Trash/",
    "/.Thumbnails/",
    "/Thumbnails/",
    "/.deleted_media/",
    "/.duplicates-trash/",
    "/System/",
    "/Library/",
    "/Applications/",
    "/.config/",
    "/retropie/",
    "/OFFICE/",
    "/Template/",
    "/Software/",
    "/Windows/",
    "/Program Files/",
];

/// Decides which files and directories the scanner accepts
pub struct MediaFilter {
    exclude_patterns: Vec<String>,
}

impl MediaFilter {
    /// Create a filter with the default exclusion list
    pub fn new() -> Self {
        Self {
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }

    /// Override the list of excluded path fragments
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Classify a file, `None` when it is not a media file
    pub fn classify(&self, path: &Path) -> Option<MediaType> {
        let media_type = MediaType::from_path(path);
        media_type.is_supported().then_some(media_type)
    }

    /// Check a path relative to the scan root against the exclusion list.
    ///
    /// Directories get a trailing separator so `/x/.Trash` matches
    /// `/.Trash/` and its whole subtree can be pruned.
    pub fn is_excluded(&self, relative: &Path, is_dir: bool) -> bool {
        let mut haystack = String::from(MAIN_SEPARATOR);
        haystack.push_str(&relative.to_string_lossy());
        if is_dir {
            haystack.push(MAIN_SEPARATOR);
        }
        let haystack = haystack.replace('\\', "/");

        self.exclude_patterns
            .iter()
            .any(|pattern| haystack.contains(pattern.as_str()))
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_classifies_media() {
        let filter = MediaFilter::new();
        assert_eq!(filter.classify(Path::new("a/IMG_1.JPG")), Some(MediaType::Photo));
        assert_eq!(filter.classify(Path::new("a/clip.mts")), Some(MediaType::Video));
        assert_eq!(filter.classify(Path::new("a/song.m4a")), Some(MediaType::Audio));
        assert_eq!(filter.classify(Path::new("a/notes.txt")), None);
    }

    #[test]
    fn excluded_directory_matches_with_trailing_separator() {
        let filter = MediaFilter::new();
        assert!(filter.is_excluded(Path::new("home/.Trash"), true));
        assert!(!filter.is_excluded(Path::new("home/Trash"), true));
    }

    #[test]
    fn excluded_file_matches_on_ancestor() {
        let filter = MediaFilter::new();
        assert!(filter.is_excluded(Path::new("a/Thumbnails/t.jpg"), false));
        assert!(!filter.is_excluded(Path::new("a/Holiday/t.jpg"), false));
    }

    #[test]
    fn custom_patterns_replace_defaults() {
        let filter = MediaFilter::new().with_exclude_patterns(vec!["/skip/".to_string()]);
        assert!(filter.is_excluded(Path::new("skip"), true));
        assert!(!filter.is_excluded(Path::new("System"), true));
    }
}
