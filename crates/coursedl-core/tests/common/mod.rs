//! Test doubles for integration tests: a scripted page provider and a
//! recording downloader.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use coursedl_core::download::{DownloadError, FetchOutcome, ResourceDownloader};
use coursedl_core::provider::{LessonItem, PageContentProvider, ProviderError, SectionHeading};

/// One scripted lesson: real page link plus the resource links its page
/// exposes. Collapsed lessons present a `#` placeholder until expanded.
#[derive(Debug, Clone)]
pub struct ScriptedLesson {
    pub title: String,
    pub href: String,
    pub collapsed: bool,
    pub resources: Vec<String>,
}

impl ScriptedLesson {
    pub fn new(title: &str, href: &str, resources: &[&str]) -> Self {
        ScriptedLesson {
            title: title.to_string(),
            href: href.to_string(),
            collapsed: false,
            resources: resources.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn collapsed(mut self) -> Self {
        self.collapsed = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedSection {
    pub title: String,
    pub href: String,
    pub lessons: Vec<ScriptedLesson>,
}

impl ScriptedSection {
    pub fn new(title: &str, href: &str, lessons: Vec<ScriptedLesson>) -> Self {
        ScriptedSection {
            title: title.to_string(),
            href: href.to_string(),
            lessons,
        }
    }
}

/// In-memory [`PageContentProvider`] driven by a scripted course layout.
///
/// `loads` counts navigations per URL so tests can assert which pages a walk
/// actually visited. URLs in `fail_pages` never become ready.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    pub sections: Vec<ScriptedSection>,
    pub fail_pages: BTreeSet<String>,
    /// Next N `lesson_items` calls report a stale element before succeeding.
    pub stale_reads_remaining: usize,
    pub loads: BTreeMap<String, usize>,
    current: Option<String>,
}

impl ScriptedProvider {
    pub fn new(sections: Vec<ScriptedSection>) -> Self {
        ScriptedProvider {
            sections,
            ..ScriptedProvider::default()
        }
    }

    pub fn load_count(&self, url: &str) -> usize {
        self.loads.get(url).copied().unwrap_or(0)
    }

    fn current_section(&self) -> Option<&ScriptedSection> {
        let current = self.current.as_deref()?;
        self.sections.iter().find(|s| s.href == current)
    }
}

impl PageContentProvider for ScriptedProvider {
    fn load_page(&mut self, url: &str) -> Result<(), ProviderError> {
        *self.loads.entry(url.to_string()).or_insert(0) += 1;
        if self.fail_pages.contains(url) {
            return Err(ProviderError::PageLoadTimeout {
                url: url.to_string(),
                timeout_secs: 1,
            });
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    fn course_title(&mut self) -> Result<Option<String>, ProviderError> {
        Ok(None)
    }

    fn section_headings(&mut self) -> Result<Vec<SectionHeading>, ProviderError> {
        Ok(self
            .sections
            .iter()
            .map(|s| SectionHeading {
                title: s.title.clone(),
                href: s.href.clone(),
            })
            .collect())
    }

    fn lesson_items(&mut self) -> Result<Vec<LessonItem>, ProviderError> {
        if self.stale_reads_remaining > 0 {
            self.stale_reads_remaining -= 1;
            return Err(ProviderError::StaleElement);
        }
        let section = self
            .current_section()
            .ok_or_else(|| ProviderError::ElementNotFound("lesson list".to_string()))?;
        Ok(section
            .lessons
            .iter()
            .map(|l| LessonItem {
                title: l.title.clone(),
                href: if l.collapsed {
                    format!("{}#", l.href)
                } else {
                    l.href.clone()
                },
            })
            .collect())
    }

    fn expand_lesson(&mut self, index: usize) -> Result<LessonItem, ProviderError> {
        let section = self
            .current_section()
            .ok_or_else(|| ProviderError::ElementNotFound("lesson list".to_string()))?;
        let lesson = section
            .lessons
            .get(index)
            .ok_or_else(|| ProviderError::ElementNotFound(format!("lesson {}", index)))?;
        Ok(LessonItem {
            title: lesson.title.clone(),
            href: lesson.href.clone(),
        })
    }

    fn resource_links(&mut self) -> Result<Vec<String>, ProviderError> {
        let current = self
            .current
            .as_deref()
            .ok_or_else(|| ProviderError::ElementNotFound("no page loaded".to_string()))?;
        let lesson = self
            .sections
            .iter()
            .flat_map(|s| s.lessons.iter())
            .find(|l| l.href == current)
            .ok_or_else(|| ProviderError::ElementNotFound("resource panel".to_string()))?;
        Ok(lesson.resources.clone())
    }
}

/// One recorded `fetch` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub url: String,
    pub dest_dir: PathBuf,
    pub filename: String,
    pub force: bool,
}

/// [`ResourceDownloader`] that records calls instead of hitting the network.
///
/// With `write_files` set it also drops a small file at the destination so
/// path assertions work end to end.
#[derive(Debug, Default)]
pub struct RecordingDownloader {
    pub calls: RefCell<Vec<FetchCall>>,
    pub fail_urls: BTreeSet<String>,
    pub write_files: bool,
}

impl RecordingDownloader {
    pub fn new() -> Self {
        RecordingDownloader::default()
    }

    pub fn writing_files() -> Self {
        RecordingDownloader {
            write_files: true,
            ..RecordingDownloader::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ResourceDownloader for RecordingDownloader {
    fn fetch(
        &self,
        url: &str,
        dest_dir: &Path,
        filename: &str,
        force: bool,
    ) -> Result<FetchOutcome, DownloadError> {
        self.calls.borrow_mut().push(FetchCall {
            url: url.to_string(),
            dest_dir: dest_dir.to_path_buf(),
            filename: filename.to_string(),
            force,
        });
        if self.fail_urls.contains(url) {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: 503,
            });
        }
        if self.write_files {
            std::fs::create_dir_all(dest_dir)?;
            std::fs::write(dest_dir.join(filename), b"data")?;
        }
        Ok(FetchOutcome::Downloaded(4))
    }
}
