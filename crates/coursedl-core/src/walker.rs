//! Course/term/lesson walker.
//!
//! Refreshes the course cache by visiting the syllabus, section, and lesson
//! pages through a [`PageContentProvider`] and merging what it finds into the
//! cache without discarding prior state. The cache is checkpointed after each
//! section so an interrupted run resumes from the last completed section.
//!
//! Failure policy: a section or lesson page that never becomes ready is
//! skipped with a warning and the walk continues; only configuration-level
//! provider errors (missing or rejected credentials) abort the course.

use anyhow::Result;

use crate::cache::{CacheStore, CourseCache, LessonEntry, SectionEntry};
use crate::catalog;
use crate::filter::Selection;
use crate::naming;
use crate::provider::{PageContentProvider, ProviderError, SectionHeading};
use crate::retry::{run_with_retry, RetryPolicy};

/// Result of a discovery pass.
#[derive(Debug)]
pub struct DiscoveryOutcome {
    /// Resolved course display name (catalog, scraped title, or the code).
    pub display_name: String,
    /// The refreshed cache, already persisted through the store.
    pub cache: CourseCache,
}

/// Walks a course's navigation structure and keeps the cache current.
pub struct Walker<'a, P: PageContentProvider> {
    provider: &'a mut P,
    store: &'a CacheStore,
    stale_retry: RetryPolicy,
}

impl<'a, P: PageContentProvider> Walker<'a, P> {
    pub fn new(provider: &'a mut P, store: &'a CacheStore) -> Self {
        Walker {
            provider,
            store,
            stale_retry: RetryPolicy::default(),
        }
    }

    pub fn with_stale_retry(mut self, policy: RetryPolicy) -> Self {
        self.stale_retry = policy;
        self
    }

    /// Produces/refreshes the cache for `course_code`, restricted by
    /// `selection`. Sections excluded by the selection are not visited at
    /// all; cached state for them is left untouched.
    pub fn discover(
        &mut self,
        course_code: &str,
        selection: &Selection,
    ) -> Result<DiscoveryOutcome> {
        let home_url = catalog::course_home_url(course_code);
        self.provider.load_page(&home_url)?;

        let display_name = self.resolve_display_name(course_code)?;
        tracing::info!(course_code, display_name = %display_name, "collecting downloadable content");

        let mut headings = self.provider.section_headings()?;
        if let Some(extra_url) = catalog::extracurricular_url(course_code) {
            match self.extracurricular_headings(&extra_url) {
                Ok(mut extra) => headings.append(&mut extra),
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => tracing::warn!("skipping extracurricular sections: {}", e),
            }
        }

        let mut cache = self.store.load(course_code)?;

        for (index, heading) in headings.iter().enumerate() {
            let ordinal = index + 1;
            if !selection.allows_section(ordinal as u32) {
                continue;
            }

            let key = section_cache_key(&cache, ordinal, heading);
            let already_discovered = cache
                .sections
                .get(&key)
                .map(|entry| entry.link == heading.href && entry.has_lessons())
                .unwrap_or(false);
            if already_discovered {
                tracing::debug!(section = %key, "section already discovered, skipping");
                continue;
            }

            cache
                .sections
                .entry(key.clone())
                .or_insert_with(|| SectionEntry::new(heading.href.clone()));

            tracing::info!(section = %key, "gathering lesson links");
            match self.walk_section_lessons(ordinal, &key, &heading.href, &mut cache) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => tracing::warn!(section = %key, "section skipped: {}", e),
            }
            self.store.save(course_code, &cache)?;
        }

        self.collect_resources(course_code, selection, &mut cache)?;
        self.store.save(course_code, &cache)?;

        Ok(DiscoveryOutcome {
            display_name,
            cache,
        })
    }

    fn resolve_display_name(&mut self, course_code: &str) -> Result<String> {
        if let Some(name) = catalog::display_name(course_code) {
            return Ok(name.to_string());
        }
        match self.provider.course_title() {
            Ok(Some(title)) => Ok(title),
            Ok(None) => Ok(course_code.to_string()),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                tracing::warn!("could not scrape course title: {}", e);
                Ok(course_code.to_string())
            }
        }
    }

    fn extracurricular_headings(
        &mut self,
        url: &str,
    ) -> Result<Vec<SectionHeading>, ProviderError> {
        self.provider.load_page(url)?;
        self.provider.section_headings()
    }

    /// Visits one section page and merges its lesson list into the cache.
    fn walk_section_lessons(
        &mut self,
        ordinal: usize,
        section_key: &str,
        section_href: &str,
        cache: &mut CourseCache,
    ) -> Result<(), ProviderError> {
        self.provider.load_page(section_href)?;

        let policy = self.stale_retry;
        let provider = &mut *self.provider;
        let items = run_with_retry(&policy, ProviderError::is_stale, || provider.lesson_items())?;

        let Some(section) = cache.sections.get_mut(section_key) else {
            return Ok(()); // caller inserts the key before calling
        };

        for (index, mut item) in items.into_iter().enumerate() {
            if item.is_collapsed() {
                match provider.expand_lesson(index) {
                    Ok(expanded) => item = expanded,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        tracing::warn!(lesson = index + 1, "could not expand lesson card: {}", e)
                    }
                }
            }

            let key = naming::lesson_key(ordinal, index + 1, &item.title);
            let unchanged = section
                .lessons
                .get(&key)
                .map(|existing| existing.link.as_deref() == Some(item.href.as_str()))
                .unwrap_or(false);
            if !unchanged {
                // Absent or changed link: (re)start the lesson entry. A
                // changed link invalidates previously scraped resources.
                section
                    .lessons
                    .insert(key, LessonEntry::with_link(item.href));
            }
        }
        Ok(())
    }

    /// Visits undiscovered lessons and records their downloadable links.
    fn collect_resources(
        &mut self,
        course_code: &str,
        selection: &Selection,
        cache: &mut CourseCache,
    ) -> Result<()> {
        let section_keys: Vec<String> = cache.sections.keys().cloned().collect();
        for section_key in section_keys {
            let Some(ordinal) = naming::section_ordinal(&section_key) else {
                continue;
            };
            if !selection.allows_section(ordinal) {
                continue;
            }

            let lesson_keys: Vec<String> = match cache.sections.get(&section_key) {
                Some(section) => section.lessons.keys().cloned().collect(),
                None => continue,
            };

            let mut touched = false;
            for lesson_key in lesson_keys {
                let Some((sec, les)) = naming::lesson_ordinals(&lesson_key) else {
                    continue;
                };
                if !selection.allows_lesson(sec, les) {
                    continue;
                }

                let link = match cache
                    .sections
                    .get(&section_key)
                    .and_then(|s| s.lessons.get(&lesson_key))
                {
                    Some(lesson) if lesson.is_undiscovered() => match &lesson.link {
                        Some(link) => link.clone(),
                        None => continue,
                    },
                    _ => continue, // already discovered, or gone
                };

                tracing::info!(lesson = %lesson_key, "gathering download links");
                let links = match self.scrape_lesson_resources(&link) {
                    Ok(links) => links,
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => {
                        tracing::warn!(lesson = %lesson_key, "lesson skipped: {}", e);
                        continue;
                    }
                };

                if let Some(lesson) = cache
                    .sections
                    .get_mut(&section_key)
                    .and_then(|s| s.lessons.get_mut(&lesson_key))
                {
                    for url in links {
                        lesson.add_resource(url);
                    }
                    touched = true;
                }
            }

            if touched {
                self.store.save(course_code, cache)?;
            }
        }
        Ok(())
    }

    fn scrape_lesson_resources(&mut self, link: &str) -> Result<Vec<String>, ProviderError> {
        self.provider.load_page(link)?;
        let policy = self.stale_retry;
        let provider = &mut *self.provider;
        run_with_retry(&policy, ProviderError::is_stale, || provider.resource_links())
    }
}

/// Resolves the cache key for a freshly scraped section heading.
///
/// A cached key whose link differs from the scraped one is treated as stale:
/// the new heading gets a `.`-suffixed key instead of overwriting. Stale
/// entries linger in the cache; this is a known limitation.
fn section_cache_key(cache: &CourseCache, ordinal: usize, heading: &SectionHeading) -> String {
    let base = naming::section_key(ordinal, &heading.title);
    naming::disambiguate(&base, |candidate| {
        cache
            .sections
            .get(candidate)
            .map(|existing| existing.link != heading.href)
            .unwrap_or(false)
    })
}
