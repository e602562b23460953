//! Integration tests: reconciling cached resource links against disk.

mod common;

use std::path::Path;

use common::RecordingDownloader;
use coursedl_core::cache::{CacheStore, CourseCache, LessonEntry, SectionEntry};
use coursedl_core::filter::Selection;
use coursedl_core::reconciler::Reconciler;
use tempfile::tempdir;

fn seeded_cache() -> CourseCache {
    let mut cache = CourseCache::default();

    let mut intro = LessonEntry::with_link("https://x/term1/l1");
    intro.add_resource("https://cdn/a.zip");
    let mut term1 = SectionEntry::new("https://x/term1");
    term1.lessons.insert("01.01 - Intro".to_string(), intro);

    let mut capstone = LessonEntry::with_link("https://x/term2/l1");
    capstone.add_resource("https://cdn/c.zip");
    let mut term2 = SectionEntry::new("https://x/term2");
    term2
        .lessons
        .insert("02.01 - Capstone".to_string(), capstone);

    cache.sections.insert("01 Term One".to_string(), term1);
    cache.sections.insert("02 Term Two".to_string(), term2);
    cache
}

#[test]
fn pending_resources_land_under_course_and_section_dirs() {
    let state = tempdir().unwrap();
    let store = CacheStore::new(state.path());
    let downloader = RecordingDownloader::new();
    let mut cache = seeded_cache();

    let report = Reconciler::new(&downloader, &store)
        .download(
            "cs101",
            "CourseX",
            &mut cache,
            Path::new("/out"),
            &Selection::all(),
            false,
        )
        .unwrap();

    assert_eq!(report.downloaded, 2);
    assert_eq!(report.failed, 0);

    let calls = downloader.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].url, "https://cdn/a.zip");
    assert_eq!(calls[0].dest_dir, Path::new("/out/CourseX/01 Term One"));
    assert_eq!(calls[0].filename, "01-a.zip");
    assert!(!calls[0].force);
    assert_eq!(calls[1].dest_dir, Path::new("/out/CourseX/02 Term Two"));
    assert_eq!(calls[1].filename, "02-c.zip");

    // Flags flip in memory and in the checkpointed file.
    assert_eq!(cache.pending_resources(), 0);
    let loaded = store.load("cs101").unwrap();
    assert_eq!(loaded.pending_resources(), 0);
}

#[test]
fn flagged_resources_are_not_refetched() {
    let state = tempdir().unwrap();
    let store = CacheStore::new(state.path());
    let downloader = RecordingDownloader::new();
    let mut cache = seeded_cache();
    for section in cache.sections.values_mut() {
        for lesson in section.lessons.values_mut() {
            let urls: Vec<String> = lesson.resources.keys().cloned().collect();
            for url in urls {
                lesson.mark_downloaded(&url);
            }
        }
    }

    let report = Reconciler::new(&downloader, &store)
        .download(
            "cs101",
            "CourseX",
            &mut cache,
            Path::new("/out"),
            &Selection::all(),
            false,
        )
        .unwrap();

    assert_eq!(downloader.call_count(), 0);
    assert_eq!(report.downloaded, 0);
    assert_eq!(report.skipped, 2);
}

#[test]
fn force_refetches_flagged_resources() {
    let state = tempdir().unwrap();
    let store = CacheStore::new(state.path());
    let downloader = RecordingDownloader::new();
    let mut cache = seeded_cache();
    for section in cache.sections.values_mut() {
        for lesson in section.lessons.values_mut() {
            let urls: Vec<String> = lesson.resources.keys().cloned().collect();
            for url in urls {
                lesson.mark_downloaded(&url);
            }
        }
    }

    let report = Reconciler::new(&downloader, &store)
        .download(
            "cs101",
            "CourseX",
            &mut cache,
            Path::new("/out"),
            &Selection::all(),
            true,
        )
        .unwrap();

    assert_eq!(report.downloaded, 2);
    let calls = downloader.calls.borrow();
    assert!(calls.iter().all(|c| c.force));
}

#[test]
fn failed_download_keeps_flag_false_and_continues() {
    let state = tempdir().unwrap();
    let store = CacheStore::new(state.path());
    let mut downloader = RecordingDownloader::new();
    downloader.fail_urls.insert("https://cdn/a.zip".to_string());
    let mut cache = seeded_cache();

    let report = Reconciler::new(&downloader, &store)
        .download(
            "cs101",
            "CourseX",
            &mut cache,
            Path::new("/out"),
            &Selection::all(),
            false,
        )
        .unwrap();

    assert_eq!(report.downloaded, 1);
    assert_eq!(report.failed, 1);

    let term1 = &cache.sections["01 Term One"];
    assert_eq!(
        term1.lessons["01.01 - Intro"].resources["https://cdn/a.zip"],
        false
    );
    let term2 = &cache.sections["02 Term Two"];
    assert_eq!(
        term2.lessons["02.01 - Capstone"].resources["https://cdn/c.zip"],
        true
    );
    // The failed URL stays pending for the next run.
    assert_eq!(store.load("cs101").unwrap().pending_resources(), 1);
}

#[test]
fn selection_limits_downloads() {
    let state = tempdir().unwrap();
    let store = CacheStore::new(state.path());
    let downloader = RecordingDownloader::new();
    let mut cache = seeded_cache();

    let selection = Selection::parse(["2"]).unwrap();
    let report = Reconciler::new(&downloader, &store)
        .download(
            "cs101",
            "CourseX",
            &mut cache,
            Path::new("/out"),
            &selection,
            false,
        )
        .unwrap();

    assert_eq!(report.downloaded, 1);
    let calls = downloader.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, "https://cdn/c.zip");
    assert_eq!(cache.pending_resources(), 1);
}
