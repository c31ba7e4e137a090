//! Integration tests for the pipeline module.
//!
//! These tests verify end-to-end pipeline behavior including:
//! - Empty and nonexistent scan roots
//! - Album filtering and merging
//! - Duplicates excluded from albums and moved to the trash
//! - Organize + execute against a real directory tree

use assert_fs::prelude::*;
use assert_fs::TempDir;
use media_organizer::core::cache::{CacheBackend, InMemoryCache, SqliteCache};
use media_organizer::core::organize::DisabledSuggester;
use media_organizer::core::pipeline::Pipeline;
use media_organizer::events::null_sender;
use predicates::prelude::*;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

/// 2019-07-15 12:00:00 UTC
const JULY_2019: u64 = 1_563_192_000;

fn write_media(temp: &TempDir, relative: &str, content: &[u8]) {
    let child = temp.child(relative);
    child.write_binary(content).unwrap();
    set_mtime(child.path(), JULY_2019);
}

fn set_mtime(path: &Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

fn pipeline(temp: &TempDir, cache: Arc<dyn CacheBackend>) -> Pipeline {
    Pipeline::builder()
        .scan_root(temp.path().join("src"))
        .library_root(temp.path().join("library"))
        .workers(2)
        .cache(cache)
        .suggester(Box::new(DisabledSuggester))
        .build()
        .unwrap()
}

#[test]
fn pipeline_handles_empty_directory() {
    let temp = TempDir::new().unwrap();
    temp.child("src").create_dir_all().unwrap();

    let plan = pipeline(&temp, Arc::new(InMemoryCache::new()))
        .analyze_silent()
        .unwrap();

    assert_eq!(plan.report.total_files(), 0);
    assert!(plan.albums.is_empty());
    assert!(plan.duplicates.is_empty());
    assert!(plan.is_empty());
}

#[test]
fn pipeline_rejects_nonexistent_path() {
    let temp = TempDir::new().unwrap();
    let result = pipeline(&temp, Arc::new(InMemoryCache::new())).analyze_silent();
    assert!(result.is_err());
}

#[test]
fn two_files_never_form_an_album_but_three_do() {
    let temp = TempDir::new().unwrap();
    write_media(&temp, "src/Pair/a.jpg", b"pair a");
    write_media(&temp, "src/Pair/b.jpg", b"pair b");
    write_media(&temp, "src/Trio/a.jpg", b"trio a");
    write_media(&temp, "src/Trio/b.jpg", b"trio b");
    write_media(&temp, "src/Trio/c.jpg", b"trio c");

    let plan = pipeline(&temp, Arc::new(InMemoryCache::new()))
        .analyze_silent()
        .unwrap();

    assert_eq!(plan.albums.len(), 1);
    let album = &plan.albums[0];
    assert_eq!(album.name, "2019-07 Trio");
    assert_eq!(
        album.destination,
        temp.path().join("library/Photos/2019/2019-07 Trio")
    );
    assert_eq!(album.files.len(), 3);
}

#[test]
fn colliding_album_names_merge() {
    let temp = TempDir::new().unwrap();
    for parent in ["CardA", "CardB"] {
        for i in 0..3 {
            write_media(
                &temp,
                &format!("src/{parent}/Trip/{i}.jpg"),
                format!("{parent} {i}").as_bytes(),
            );
        }
    }

    let plan = pipeline(&temp, Arc::new(InMemoryCache::new()))
        .analyze_silent()
        .unwrap();

    assert_eq!(plan.albums.len(), 1);
    let album = &plan.albums[0];
    assert_eq!(album.name, "2019-07 Trip");
    assert_eq!(album.files.len(), 6);
    assert_eq!(
        album.source_dirs,
        vec![
            temp.path().join("src/CardA/Trip"),
            temp.path().join("src/CardB/Trip"),
        ]
    );
}

#[test]
fn organize_and_execute_end_to_end() {
    let temp = TempDir::new().unwrap();
    write_media(&temp, "src/Trip2019/a.jpg", b"photo a");
    write_media(&temp, "src/Trip2019/b.jpg", b"photo b");
    write_media(&temp, "src/Trip2019/c.jpg", b"photo c");
    write_media(&temp, "src/Recovered/a copy.jpg", b"photo a");

    let cache = Arc::new(InMemoryCache::new());
    let pipeline = pipeline(&temp, cache.clone());
    let mut plan = pipeline.analyze_silent().unwrap();

    assert_eq!(plan.duplicates.len(), 1);
    assert_eq!(plan.duplicates[0].best, temp.path().join("src/Trip2019/a.jpg"));
    assert_eq!(plan.report.files_to_move, 3);

    // analysis alone moves nothing
    temp.child("src/Trip2019/a.jpg").assert(predicate::path::exists());
    temp.child("library").assert(predicate::path::missing());

    let summary = pipeline.execute(&mut plan, &null_sender());
    assert_eq!(summary.moved, 3);
    assert_eq!(summary.trashed, 1);
    assert_eq!(summary.failed, 0);
    assert!(summary.errors.is_empty());

    let album = temp.child("library/Photos/2019/2019-07 Trip2019");
    album.child("a.jpg").assert("photo a");
    album.child("b.jpg").assert("photo b");
    album.child("c.jpg").assert("photo c");
    temp.child("src/Trip2019/a.jpg").assert(predicate::path::missing());

    temp.child("src/.duplicates-trash/Recovered/a copy.jpg")
        .assert("photo a");
    temp.child("src/Recovered/a copy.jpg")
        .assert(predicate::path::missing());

    // the cache follows moved files
    let moved = album.child("a.jpg");
    let stat = std::fs::metadata(moved.path()).unwrap();
    let entry = cache
        .get(moved.path(), stat.len(), stat.modified().unwrap())
        .unwrap()
        .expect("moved file is cached under its new path");
    assert!(entry.has_digest());

    // only the trash is left under the scan root, and it is never scanned
    let rerun = pipeline.analyze_silent().unwrap();
    assert_eq!(rerun.report.total_files(), 0);
    assert!(rerun.is_empty());
}

#[test]
fn rerun_with_persistent_cache_is_served_from_cache() {
    let temp = TempDir::new().unwrap();
    for i in 0..5 {
        write_media(&temp, &format!("src/Trip/{i}.jpg"), format!("photo {i}").as_bytes());
    }
    let db_path = temp.path().join("library/.media-organizer-cache/cache.db");

    let first = {
        let cache = Arc::new(SqliteCache::open(&db_path).unwrap());
        pipeline(&temp, cache).analyze_silent().unwrap()
    };
    assert_eq!(first.report.new_files, 5);

    let cache = Arc::new(SqliteCache::open(&db_path).unwrap());
    let second = pipeline(&temp, cache.clone()).analyze_silent().unwrap();

    assert_eq!(second.report.metadata.cache_hits, 5);
    assert_eq!(second.report.hashing.cache_hits, 5);
    assert_eq!(second.report.new_files, 0);
    assert_eq!(cache.stats().unwrap().with_digest, 5);
    // files are still outside the library, so the plan is unchanged
    assert_eq!(second.report.files_to_move, 5);
}

#[test]
fn newer_file_is_picked_up_after_modification() {
    let temp = TempDir::new().unwrap();
    for i in 0..3 {
        write_media(&temp, &format!("src/Trip/{i}.jpg"), format!("photo {i}").as_bytes());
    }
    let cache = Arc::new(InMemoryCache::new());
    let pipeline = pipeline(&temp, cache);
    pipeline.analyze_silent().unwrap();

    let changed = temp.child("src/Trip/0.jpg");
    changed.write_binary(b"edited photo 0").unwrap();
    set_mtime(changed.path(), JULY_2019 + 60);

    let plan = pipeline.analyze_silent().unwrap();
    assert_eq!(plan.report.new_files, 1);
    assert_eq!(plan.report.hashing.cache_hits, 2);
}
