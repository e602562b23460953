//! Download reconciler.
//!
//! Brings the filesystem in line with the cache: every resource URL whose
//! flag is still false gets fetched into
//! `<dest>/<course name>/<section key>/`, and the flag is flipped and
//! checkpointed as soon as the file lands. Failures are per-resource; a bad
//! URL never stops the rest of the course.

use std::path::Path;

use anyhow::Result;

use crate::cache::{CacheStore, CourseCache};
use crate::download::{FetchOutcome, ResourceDownloader};
use crate::filter::Selection;
use crate::naming;

/// Tally of one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadReport {
    /// Resources fetched in this pass.
    pub downloaded: usize,
    /// Resources skipped because their cache flag was already set, or the
    /// destination file was already complete.
    pub skipped: usize,
    /// Resources whose fetch failed; their flags stay false for the next run.
    pub failed: usize,
}

/// Walks the cache and downloads whatever is still pending.
pub struct Reconciler<'a, D: ResourceDownloader> {
    downloader: &'a D,
    store: &'a CacheStore,
}

impl<'a, D: ResourceDownloader> Reconciler<'a, D> {
    pub fn new(downloader: &'a D, store: &'a CacheStore) -> Self {
        Reconciler { downloader, store }
    }

    /// Downloads pending resources for `course_code` under `dest_root`,
    /// restricted by `selection`. With `force` set, cached flags are ignored
    /// and every selected resource is fetched again.
    pub fn download(
        &self,
        course_code: &str,
        display_name: &str,
        cache: &mut CourseCache,
        dest_root: &Path,
        selection: &Selection,
        force: bool,
    ) -> Result<DownloadReport> {
        let mut report = DownloadReport::default();
        let course_dir = dest_root.join(naming::sanitize_component(display_name));

        let section_keys: Vec<String> = cache.sections.keys().cloned().collect();
        for section_key in section_keys {
            let Some(ordinal) = naming::section_ordinal(&section_key) else {
                continue;
            };
            if !selection.allows_section(ordinal) {
                continue;
            }
            let section_dir = course_dir.join(naming::sanitize_component(&section_key));

            let lesson_keys: Vec<String> = match cache.sections.get(&section_key) {
                Some(section) => section.lessons.keys().cloned().collect(),
                None => continue,
            };

            for lesson_key in lesson_keys {
                let Some((sec, les)) = naming::lesson_ordinals(&lesson_key) else {
                    continue;
                };
                if !selection.allows_lesson(sec, les) {
                    continue;
                }

                let resources: Vec<(String, bool)> = match cache
                    .sections
                    .get(&section_key)
                    .and_then(|s| s.lessons.get(&lesson_key))
                {
                    Some(lesson) => lesson
                        .resources
                        .iter()
                        .map(|(url, done)| (url.clone(), *done))
                        .collect(),
                    None => continue,
                };

                for (url, done) in resources {
                    if done && !force {
                        report.skipped += 1;
                        continue;
                    }

                    let filename = naming::download_filename(&lesson_key, &url);
                    tracing::info!(lesson = %lesson_key, url = %url, "downloading");
                    match self.downloader.fetch(&url, &section_dir, &filename, force) {
                        Ok(outcome) => {
                            match outcome {
                                FetchOutcome::Downloaded(bytes) => {
                                    tracing::debug!(filename = %filename, bytes, "saved");
                                    report.downloaded += 1;
                                }
                                FetchOutcome::AlreadyComplete => report.skipped += 1,
                            }
                            self.mark_downloaded(cache, &section_key, &lesson_key, &url);
                            self.store.save(course_code, cache)?;
                        }
                        Err(e) => {
                            tracing::warn!(url = %url, "download failed: {}", e);
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    fn mark_downloaded(
        &self,
        cache: &mut CourseCache,
        section_key: &str,
        lesson_key: &str,
        url: &str,
    ) {
        if let Some(lesson) = cache
            .sections
            .get_mut(section_key)
            .and_then(|s| s.lessons.get_mut(lesson_key))
        {
            lesson.mark_downloaded(url);
        }
    }
}
