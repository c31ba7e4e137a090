//! Album plan generation.

use super::naming::{fallback_album_name, sanitize_album_name, NameSuggester, MAX_SAMPLES};
use super::types::*;
use crate::core::cache::CacheBackend;
use crate::core::scanner::{MediaRecord, MediaType};
use crate::events::{EventSender, PipelinePhase};
use chrono::{DateTime, Datelike, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directories contributing fewer files than this never form an album
pub const MIN_ALBUM_SIZE: usize = 3;

/// Label used in album names when no member has a capture date
pub const NO_DATE_LABEL: &str = "Unknown Date";

/// Year folder used when no member has a capture date
pub const NO_YEAR_LABEL: &str = "Unknown";

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Groups records into albums under a library root
pub struct AlbumPlanner<'a> {
    library_root: PathBuf,
    suggester: &'a dyn NameSuggester,
    cache: Option<&'a dyn CacheBackend>,
}

impl<'a> AlbumPlanner<'a> {
    pub fn new(library_root: impl Into<PathBuf>, suggester: &'a dyn NameSuggester) -> Self {
        Self {
            library_root: library_root.into(),
            suggester,
            cache: None,
        }
    }

    /// Remember album name suggestions in `cache`
    pub fn with_cache(mut self, cache: Option<&'a dyn CacheBackend>) -> Self {
        self.cache = cache;
        self
    }

    /// Build album plans for `records`.
    ///
    /// Paths in `excluded` (duplicate non-survivors) are left out. The
    /// result only contains records that are new this run or not yet at
    /// their destination; albums left empty are dropped.
    pub fn plan(
        &self,
        records: &[MediaRecord],
        excluded: &HashSet<PathBuf>,
        events: &EventSender,
    ) -> Vec<AlbumPlan> {
        let candidates: Vec<&MediaRecord> = records
            .iter()
            .filter(|r| r.media_type.is_supported() && !excluded.contains(&r.path))
            .collect();

        let mut albums = self.plan_directories(&candidates, events);
        albums.extend(self.plan_music(&candidates));

        let before = albums.len();
        let albums = retain_pending(albums);
        debug!("{} of {} albums have pending files", albums.len(), before);
        albums
    }

    fn plan_directories(&self, candidates: &[&MediaRecord], events: &EventSender) -> Vec<AlbumPlan> {
        let mut by_directory: BTreeMap<&Path, Vec<&MediaRecord>> = BTreeMap::new();
        for record in candidates.iter().copied().filter(|r| r.media_type != MediaType::Audio) {
            if self.is_library_album(record.source_dir()) {
                continue;
            }
            by_directory.entry(record.source_dir()).or_default().push(record);
        }

        let naming_available = self.suggester.is_available();
        if !naming_available {
            info!("naming service not available, using folder names");
            events.status(
                PipelinePhase::Organizing,
                "Naming service not available, using folder names",
            );
        }

        let mut albums: Vec<AlbumPlan> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for (dir, mut members) in by_directory {
            if members.len() < MIN_ALBUM_SIZE {
                continue;
            }
            members.sort_by(|a, b| a.path.cmp(&b.path));

            events.status(
                PipelinePhase::Organizing,
                format!("Processing: {} ({} files)", dir.display(), members.len()),
            );

            let date = median_date(&members);
            let year_month = date
                .map(|d| d.format("%Y-%m").to_string())
                .unwrap_or_else(|| NO_DATE_LABEL.to_string());
            let name = self.album_name(dir, &members, &year_month, naming_available);
            events.status(PipelinePhase::Organizing, format!("  → Album: {name}"));

            if let Some(&index) = by_name.get(&name) {
                let album = &mut albums[index];
                album.files.extend(members.into_iter().cloned());
                album.source_dirs.push(dir.to_path_buf());
                continue;
            }

            let year = date
                .map(|d| d.year().to_string())
                .unwrap_or_else(|| NO_YEAR_LABEL.to_string());
            let media_type = bucket_type(&members);
            let bucket = if media_type == MediaType::Video {
                VIDEOS_DIR
            } else {
                PHOTOS_DIR
            };

            by_name.insert(name.clone(), albums.len());
            albums.push(AlbumPlan {
                destination: self.library_root.join(bucket).join(year).join(&name),
                name,
                files: members.into_iter().cloned().collect(),
                source_dirs: vec![dir.to_path_buf()],
                date,
                media_type,
            });
        }

        albums
    }

    /// `dir` is an album folder this library already holds
    /// (`<library>/Photos|Videos/<year>/<album>`)
    fn is_library_album(&self, dir: &Path) -> bool {
        dir.parent().and_then(Path::parent).is_some_and(|bucket| {
            bucket == self.library_root.join(PHOTOS_DIR)
                || bucket == self.library_root.join(VIDEOS_DIR)
        })
    }

    fn album_name(
        &self,
        dir: &Path,
        members: &[&MediaRecord],
        year_month: &str,
        naming_available: bool,
    ) -> String {
        if !naming_available {
            return fallback_album_name(dir, year_month);
        }

        let samples: Vec<PathBuf> = members
            .iter()
            .take(MAX_SAMPLES)
            .map(|r| r.path.clone())
            .collect();

        if let Some(cache) = self.cache {
            match cache.get_suggestion(dir, &samples) {
                Ok(Some(cached)) => {
                    let cached = sanitize_album_name(&cached);
                    if !cached.is_empty() {
                        return cached;
                    }
                }
                Ok(None) => {}
                Err(e) => debug!("suggestion cache read failed for {}: {}", dir.display(), e),
            }
        }

        match self.suggester.suggest(dir, &samples) {
            Ok(suggestion) => {
                let suggestion = sanitize_album_name(&suggestion);
                if suggestion.is_empty() {
                    return fallback_album_name(dir, year_month);
                }
                if let Some(cache) = self.cache {
                    if let Err(e) = cache.put_suggestion(dir, &samples, &suggestion) {
                        debug!("suggestion cache write skipped for {}: {}", dir.display(), e);
                    }
                }
                suggestion
            }
            Err(e) => {
                warn!("naming failed for {}: {}", dir.display(), e);
                fallback_album_name(dir, year_month)
            }
        }
    }

    fn plan_music(&self, candidates: &[&MediaRecord]) -> Vec<AlbumPlan> {
        let mut by_album: BTreeMap<(String, String), Vec<&MediaRecord>> = BTreeMap::new();
        for record in candidates.iter().copied().filter(|r| r.media_type == MediaType::Audio) {
            let artist = tag_or(&record.artist, UNKNOWN_ARTIST);
            let album = tag_or(&record.album, UNKNOWN_ALBUM);
            by_album.entry((artist, album)).or_default().push(record);
        }

        by_album
            .into_iter()
            .map(|((artist, album), mut members)| {
                members.sort_by(|a, b| a.path.cmp(&b.path));
                let source_dirs: BTreeSet<PathBuf> =
                    members.iter().map(|r| r.source_dir().to_path_buf()).collect();

                AlbumPlan {
                    name: format!("{artist} - {album}"),
                    destination: self
                        .library_root
                        .join(MUSIC_DIR)
                        .join(segment_or(&artist, UNKNOWN_ARTIST))
                        .join(segment_or(&album, UNKNOWN_ALBUM)),
                    files: members.into_iter().cloned().collect(),
                    source_dirs: source_dirs.into_iter().collect(),
                    date: None,
                    media_type: MediaType::Audio,
                }
            })
            .collect()
    }
}

/// Median capture date; even-length lists take the upper-middle element
pub fn median_date(records: &[&MediaRecord]) -> Option<DateTime<Utc>> {
    let mut dates: Vec<DateTime<Utc>> = records.iter().filter_map(|r| r.capture_date).collect();
    if dates.is_empty() {
        return None;
    }
    dates.sort();
    Some(dates[dates.len() / 2])
}

/// Videos only when they strictly outnumber photos
fn bucket_type(records: &[&MediaRecord]) -> MediaType {
    let videos = records
        .iter()
        .filter(|r| r.media_type == MediaType::Video)
        .count();
    if videos * 2 > records.len() {
        MediaType::Video
    } else {
        MediaType::Photo
    }
}

fn tag_or(value: &Option<String>, fallback: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Sanitized path segment, or `fallback` when nothing usable remains
fn segment_or(value: &str, fallback: &str) -> String {
    let segment = sanitize_album_name(value);
    if segment.is_empty() {
        fallback.to_string()
    } else {
        segment
    }
}

/// Keep records that are new this run or not yet at their destination
fn retain_pending(albums: Vec<AlbumPlan>) -> Vec<AlbumPlan> {
    albums
        .into_iter()
        .filter_map(|mut album| {
            let files = std::mem::take(&mut album.files);
            let pending: Vec<MediaRecord> = files
                .into_iter()
                .filter(|r| r.is_fresh || r.path != album.target_for(r))
                .collect();
            album.files = pending;
            (!album.files.is_empty()).then_some(album)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::InMemoryCache;
    use crate::core::organize::naming::DisabledSuggester;
    use crate::error::NamingError;
    use crate::events::null_sender;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSuggester {
        name: &'static str,
        calls: AtomicUsize,
    }

    impl FixedSuggester {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl NameSuggester for FixedSuggester {
        fn is_available(&self) -> bool {
            true
        }

        fn suggest(&self, _folder: &Path, _samples: &[PathBuf]) -> Result<String, NamingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.name.is_empty() {
                Err(NamingError::EmptySuggestion)
            } else {
                Ok(self.name.to_string())
            }
        }
    }

    fn photo(path: &str, year: i32, month: u32) -> MediaRecord {
        let mut record = MediaRecord::new(path, 10, MediaType::Photo);
        record.capture_date = Some(Utc.with_ymd_and_hms(year, month, 1, 12, 0, 0).unwrap());
        record.is_fresh = true;
        record
    }

    fn plan(records: &[MediaRecord]) -> Vec<AlbumPlan> {
        AlbumPlanner::new("/lib", &DisabledSuggester).plan(records, &HashSet::new(), &null_sender())
    }

    #[test]
    fn two_files_never_form_an_album() {
        let records = vec![photo("/src/A/1.jpg", 2019, 7), photo("/src/A/2.jpg", 2019, 7)];
        assert!(plan(&records).is_empty());
    }

    #[test]
    fn three_files_form_an_album() {
        let records = vec![
            photo("/src/Trip2019/1.jpg", 2019, 6),
            photo("/src/Trip2019/2.jpg", 2019, 7),
            photo("/src/Trip2019/3.jpg", 2019, 8),
        ];
        let albums = plan(&records);

        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].name, "2019-07 Trip2019");
        assert_eq!(
            albums[0].destination,
            PathBuf::from("/lib/Photos/2019/2019-07 Trip2019")
        );
        assert_eq!(albums[0].files.len(), 3);
    }

    #[test]
    fn median_takes_upper_middle_for_even_counts() {
        let records = [
            photo("/a/1.jpg", 2019, 1),
            photo("/a/2.jpg", 2019, 2),
            photo("/a/3.jpg", 2019, 3),
            photo("/a/4.jpg", 2019, 4),
        ];
        let refs: Vec<&MediaRecord> = records.iter().collect();
        assert_eq!(median_date(&refs).unwrap().month(), 3);
    }

    #[test]
    fn undated_directory_uses_unknown_labels() {
        let records: Vec<MediaRecord> = (0..3)
            .map(|i| MediaRecord::new(format!("/src/Misc/{i}.jpg"), 1, MediaType::Photo))
            .collect();
        let albums = plan(&records);

        assert_eq!(albums[0].name, "Unknown Date Misc");
        assert_eq!(
            albums[0].destination,
            PathBuf::from("/lib/Photos/Unknown/Unknown Date Misc")
        );
    }

    #[test]
    fn colliding_names_merge_into_one_album() {
        let suggester = FixedSuggester::new("2019-07 Summer");
        let records = vec![
            photo("/src/A/1.jpg", 2019, 7),
            photo("/src/A/2.jpg", 2019, 7),
            photo("/src/A/3.jpg", 2019, 7),
            photo("/src/B/1.jpg", 2019, 7),
            photo("/src/B/2.jpg", 2019, 7),
            photo("/src/B/3.jpg", 2019, 7),
        ];

        let albums =
            AlbumPlanner::new("/lib", &suggester).plan(&records, &HashSet::new(), &null_sender());

        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].files.len(), 6);
        assert_eq!(
            albums[0].source_dirs,
            vec![PathBuf::from("/src/A"), PathBuf::from("/src/B")]
        );
    }

    #[test]
    fn failed_suggestion_falls_back_to_folder_name() {
        let suggester = FixedSuggester::new("");
        let records = vec![
            photo("/src/Beach/1.jpg", 2020, 1),
            photo("/src/Beach/2.jpg", 2020, 1),
            photo("/src/Beach/3.jpg", 2020, 1),
        ];
        let albums =
            AlbumPlanner::new("/lib", &suggester).plan(&records, &HashSet::new(), &null_sender());
        assert_eq!(albums[0].name, "2020-01 Beach");
    }

    #[test]
    fn cached_suggestion_skips_the_service() {
        let suggester = FixedSuggester::new("Cyprus Vacation");
        let cache = InMemoryCache::new();
        let records = vec![
            photo("/src/C/1.jpg", 2005, 6),
            photo("/src/C/2.jpg", 2005, 6),
            photo("/src/C/3.jpg", 2005, 6),
        ];
        let planner = AlbumPlanner::new("/lib", &suggester).with_cache(Some(&cache));

        planner.plan(&records, &HashSet::new(), &null_sender());
        let albums = planner.plan(&records, &HashSet::new(), &null_sender());

        assert_eq!(suggester.calls.load(Ordering::SeqCst), 1);
        assert_eq!(albums[0].name, "Cyprus Vacation");
    }

    #[test]
    fn videos_bucket_only_when_they_outnumber_photos() {
        let mut records = vec![
            MediaRecord::new("/src/V/1.mp4", 1, MediaType::Video),
            MediaRecord::new("/src/V/2.mp4", 1, MediaType::Video),
            MediaRecord::new("/src/V/3.jpg", 1, MediaType::Photo),
        ];
        for r in &mut records {
            r.is_fresh = true;
        }
        let albums = plan(&records);
        assert_eq!(albums[0].media_type, MediaType::Video);
        assert!(albums[0].destination.starts_with("/lib/Videos"));
    }

    #[test]
    fn music_groups_by_artist_and_album() {
        let mut tagged = MediaRecord::new("/src/x/1.mp3", 1, MediaType::Audio);
        tagged.artist = Some("Queen".to_string());
        tagged.album = Some("Jazz".to_string());
        let untagged = MediaRecord::new("/src/y/2.mp3", 1, MediaType::Audio);

        let albums = plan(&[tagged, untagged]);

        assert_eq!(albums.len(), 2);
        assert!(albums
            .iter()
            .any(|a| a.destination == Path::new("/lib/Music/Queen/Jazz")));
        assert!(albums
            .iter()
            .any(|a| a.name == "Unknown Artist - Unknown Album"));
    }

    #[test]
    fn settled_files_are_dropped() {
        let dest = "/lib/Photos/2019/2019-07 Trip";
        let mut records: Vec<MediaRecord> = (1..=3)
            .map(|i| photo(&format!("{dest}/{i}.jpg"), 2019, 7))
            .collect();
        for r in &mut records {
            r.is_fresh = false;
        }

        let suggester = FixedSuggester::new("2019-07 Trip");
        let albums =
            AlbumPlanner::new("/lib", &suggester).plan(&records, &HashSet::new(), &null_sender());
        assert!(albums.is_empty());
    }

    #[test]
    fn library_albums_inside_the_scan_root_are_left_alone() {
        let mut records: Vec<MediaRecord> = (1..=3)
            .map(|i| photo(&format!("/lib/Photos/2019/2019-07 Trip/{i}.jpg"), 2019, 7))
            .collect();
        records.extend((1..=3).map(|i| photo(&format!("/lib/Inbox/{i}.jpg"), 2020, 2)));

        let albums = plan(&records);

        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].source_dirs, vec![PathBuf::from("/lib/Inbox")]);
        assert_eq!(
            albums[0].destination,
            PathBuf::from("/lib/Photos/2020/2020-02 Inbox")
        );
    }

    #[test]
    fn dot_segment_suggestion_falls_back_to_folder_name() {
        let suggester = FixedSuggester::new("..");
        let records = vec![
            photo("/src/Beach/1.jpg", 2020, 1),
            photo("/src/Beach/2.jpg", 2020, 1),
            photo("/src/Beach/3.jpg", 2020, 1),
        ];
        let albums =
            AlbumPlanner::new("/lib", &suggester).plan(&records, &HashSet::new(), &null_sender());

        assert_eq!(albums[0].name, "2020-01 Beach");
        assert_eq!(
            albums[0].destination,
            PathBuf::from("/lib/Photos/2020/2020-01 Beach")
        );
    }

    #[test]
    fn dot_segment_tags_stay_inside_the_music_folder() {
        let mut record = MediaRecord::new("/src/x/1.mp3", 1, MediaType::Audio);
        record.artist = Some("..".to_string());
        record.album = Some(" . ".to_string());

        let albums = plan(&[record]);

        assert_eq!(albums.len(), 1);
        assert_eq!(
            albums[0].destination,
            PathBuf::from("/lib/Music/Unknown Artist/Unknown Album")
        );
        assert!(albums[0].destination.starts_with("/lib/Music"));
    }

    #[test]
    fn excluded_duplicates_do_not_join_albums() {
        let records = vec![
            photo("/src/A/1.jpg", 2019, 7),
            photo("/src/A/2.jpg", 2019, 7),
            photo("/src/A/3.jpg", 2019, 7),
        ];
        let excluded: HashSet<PathBuf> = [PathBuf::from("/src/A/3.jpg")].into_iter().collect();

        let albums = AlbumPlanner::new("/lib", &DisabledSuggester)
            .plan(&records, &excluded, &null_sender());
        assert!(albums.is_empty());
    }
}
