//! Audio tags (ID3, Vorbis comments, MP4 atoms) via lofty.

use super::ExtractedMetadata;
use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::Path;
use tracing::debug;

/// Read artist, album and title. Missing or unreadable tags leave the
/// fields empty.
pub(super) fn read_tags(path: &Path) -> ExtractedMetadata {
    let tagged_file = match Probe::open(path).and_then(|probe| probe.read()) {
        Ok(tagged_file) => tagged_file,
        Err(e) => {
            debug!("no tags read from {}: {}", path.display(), e);
            return ExtractedMetadata::default();
        }
    };

    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
        return ExtractedMetadata::default();
    };

    let clean = |value: Option<std::borrow::Cow<'_, str>>| {
        value
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    ExtractedMetadata {
        artist: clean(tag.artist()),
        album: clean(tag.album()),
        title: clean(tag.title()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_file_yields_empty_fields() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, b"no frames here").unwrap();

        let metadata = read_tags(&path);
        assert!(metadata.artist.is_none());
        assert!(metadata.album.is_none());
    }
}
