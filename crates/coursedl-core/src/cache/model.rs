//! In-memory cache entities: course → sections → lessons → resources.

use std::collections::BTreeMap;

/// A lesson inside a section: the lesson page link plus the resource links
/// found on that page, each with a downloaded flag.
///
/// A lesson holding only its page link (empty `resources`) has not had its
/// resource panel scraped yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonEntry {
    pub link: Option<String>,
    /// Resource URL → downloaded.
    pub resources: BTreeMap<String, bool>,
}

impl LessonEntry {
    pub fn with_link(link: impl Into<String>) -> Self {
        LessonEntry {
            link: Some(link.into()),
            resources: BTreeMap::new(),
        }
    }

    /// True when the lesson page has not been scraped for resources yet.
    pub fn is_undiscovered(&self) -> bool {
        self.resources.is_empty()
    }

    /// Records a resource link if absent. Never resets an existing flag.
    pub fn add_resource(&mut self, url: impl Into<String>) {
        self.resources.entry(url.into()).or_insert(false);
    }

    pub fn mark_downloaded(&mut self, url: &str) {
        if let Some(flag) = self.resources.get_mut(url) {
            *flag = true;
        }
    }
}

/// A top-level course division (term or extracurricular block).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionEntry {
    pub link: String,
    /// Lesson display name → lesson.
    pub lessons: BTreeMap<String, LessonEntry>,
}

impl SectionEntry {
    pub fn new(link: impl Into<String>) -> Self {
        SectionEntry {
            link: link.into(),
            lessons: BTreeMap::new(),
        }
    }

    /// True once at least one lesson has been recorded; together with an
    /// unchanged link this marks the section as already discovered.
    pub fn has_lessons(&self) -> bool {
        !self.lessons.is_empty()
    }
}

/// Root cache entity for one course code.
///
/// Keys lead with zero-padded ordinals (`"01 Term One"`), so the sorted
/// `BTreeMap` order is also discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseCache {
    pub sections: BTreeMap<String, SectionEntry>,
}

impl CourseCache {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Number of resources still waiting to be downloaded.
    pub fn pending_resources(&self) -> usize {
        self.sections
            .values()
            .flat_map(|s| s.lessons.values())
            .flat_map(|l| l.resources.values())
            .filter(|downloaded| !**downloaded)
            .count()
    }
}
