//! Executor for album plans and duplicate removal.

use super::types::*;
use crate::core::cache::CacheBackend;
use crate::core::dedup::DuplicateGroup;
use crate::core::scanner::{MediaRecord, MediaType};
use crate::error::MoveError;
use crate::events::{Event, EventSender, PipelinePhase, ProgressSnapshot};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Moves planned files into the library and duplicates into the trash
pub struct OrganizeExecutor<'a> {
    cache: Option<&'a dyn CacheBackend>,
}

struct Progress {
    processed: usize,
    total: usize,
    photos: usize,
    videos: usize,
    music: usize,
}

impl Progress {
    fn advance(&mut self, media_type: MediaType, current: &Path, events: &EventSender) {
        self.processed += 1;
        match media_type {
            MediaType::Photo => self.photos += 1,
            MediaType::Video => self.videos += 1,
            MediaType::Audio => self.music += 1,
            MediaType::Unknown => {}
        }
        events.send(Event::Progress(ProgressSnapshot {
            phase: PipelinePhase::Executing,
            processed: self.processed,
            total: self.total,
            photos: self.photos,
            videos: self.videos,
            music: self.music,
            current: current.display().to_string(),
        }));
    }
}

impl<'a> OrganizeExecutor<'a> {
    /// Create an executor; `cache` follows every successful album move
    pub fn new(cache: Option<&'a dyn CacheBackend>) -> Self {
        Self { cache }
    }

    /// Move every planned file, then trash every duplicate non-survivor.
    ///
    /// Per-file failures are logged and counted; the batch always runs to
    /// the end. Record paths in `albums` are rewritten for moved files.
    pub fn execute(
        &self,
        albums: &mut [AlbumPlan],
        duplicates: &[DuplicateGroup],
        trash: &TrashLayout,
        events: &EventSender,
    ) -> ExecutionSummary {
        let start = Instant::now();
        let mut summary = ExecutionSummary::default();
        let mut progress = Progress {
            processed: 0,
            total: albums.iter().map(|a| a.files.len()).sum::<usize>()
                + duplicates.iter().map(|g| g.redundant_count()).sum::<usize>(),
            photos: 0,
            videos: 0,
            music: 0,
        };

        for album in albums.iter_mut() {
            self.execute_album(album, &mut summary, &mut progress, events);
        }

        for group in duplicates {
            for path in group.redundant() {
                match trash_file(path, trash) {
                    Ok(dest) => {
                        debug!("trashed {} -> {}", path.display(), dest.display());
                        summary.trashed += 1;
                    }
                    Err(e) => {
                        warn!("failed to trash {}: {}", path.display(), e);
                        summary.failed += 1;
                        summary.errors.push(format!("{}: {}", path.display(), e));
                    }
                }
                progress.advance(MediaType::from_path(path), path, events);
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "execution complete: {} moved, {} trashed, {} failed",
            summary.moved, summary.trashed, summary.failed
        );
        summary
    }

    fn execute_album(
        &self,
        album: &mut AlbumPlan,
        summary: &mut ExecutionSummary,
        progress: &mut Progress,
        events: &EventSender,
    ) {
        let existed = album.destination.is_dir();
        if let Err(source) = fs::create_dir_all(&album.destination) {
            let e = MoveError::CreateDirectory {
                path: album.destination.clone(),
                source,
            };
            warn!("skipping album {}: {}", album.name, e);
            summary.failed += album.files.len();
            for record in &album.files {
                summary.errors.push(format!("{}: {}", record.path.display(), e));
                progress.advance(record.media_type, &record.path, events);
            }
            return;
        }
        if !existed {
            summary.folders_created += 1;
        }

        let destination = album.destination.clone();
        for record in album.files.iter_mut() {
            let target = destination.join(record.file_name());
            if record.path == target {
                progress.advance(record.media_type, &record.path, events);
                continue;
            }

            let target = unique_destination(&target);
            match move_file(&record.path, &target) {
                Ok(()) => {
                    let old_path = std::mem::replace(&mut record.path, target);
                    summary.moved += 1;
                    summary.bytes_moved += record.size;
                    self.follow_move(&old_path, record);
                }
                Err(e) => {
                    warn!("failed to move {}: {}", record.path.display(), e);
                    summary.failed += 1;
                    summary.errors.push(format!("{}: {}", record.path.display(), e));
                }
            }
            progress.advance(record.media_type, &record.path, events);
        }
    }

    fn follow_move(&self, old_path: &Path, record: &MediaRecord) {
        let Some(cache) = self.cache else {
            return;
        };
        let modified = match fs::metadata(&record.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                debug!("cannot stat moved file {}: {}", record.path.display(), e);
                return;
            }
        };
        if let Err(e) = cache.update_path(old_path, record, modified) {
            debug!("cache relocation skipped for {}: {}", record.path.display(), e);
        }
    }
}

fn trash_file(path: &Path, trash: &TrashLayout) -> Result<PathBuf, MoveError> {
    let dest = trash.destination_for(path);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| MoveError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let dest = unique_destination(&dest);
    move_file(path, &dest)?;
    Ok(dest)
}

/// First free path of `path`, `path_1`, `path_2`, ... (suffix before the extension)
pub fn unique_destination(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    let mut counter = 1;
    loop {
        let name = match &ext {
            Some(ext) => format!("{stem}_{counter}.{ext}"),
            None => format!("{stem}_{counter}"),
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Move a file: atomic rename, or a verified copy then delete
pub fn move_file(src: &Path, dst: &Path) -> Result<(), MoveError> {
    move_file_with(src, dst, |from, to| fs::rename(from, to))
}

/// `move_file` with an injectable rename step
pub fn move_file_with<R>(src: &Path, dst: &Path, rename: R) -> Result<(), MoveError>
where
    R: FnOnce(&Path, &Path) -> io::Result<()>,
{
    if !src.exists() {
        return Err(MoveError::SourceMissing {
            path: src.to_path_buf(),
        });
    }

    match rename(src, dst) {
        Ok(()) => return Ok(()),
        Err(e) => debug!("rename {} failed ({}), copying", src.display(), e),
    }

    let expected = copy_durable(src, dst).map_err(|source| {
        // a partial copy must not survive as a second, truncated file
        let _ = fs::remove_file(dst);
        MoveError::Copy {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
            source,
        }
    })?;

    let actual = fs::metadata(dst).map(|m| m.len()).unwrap_or(0);
    if actual != expected {
        let _ = fs::remove_file(dst);
        return Err(MoveError::SizeMismatch {
            path: dst.to_path_buf(),
            expected,
            actual,
        });
    }

    fs::remove_file(src).map_err(|source| MoveError::RemoveSource {
        path: src.to_path_buf(),
        source,
    })
}

/// Copy content and permissions, flushed to disk. Returns the source size.
fn copy_durable(src: &Path, dst: &Path) -> io::Result<u64> {
    let mut reader = File::open(src)?;
    let src_meta = reader.metadata()?;

    let mut writer = File::create(dst)?;
    io::copy(&mut reader, &mut writer)?;
    writer.sync_all()?;
    fs::set_permissions(dst, src_meta.permissions())?;

    Ok(src_meta.len())
}
