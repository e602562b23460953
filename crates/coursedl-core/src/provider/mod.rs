//! Page content provider: the seam between the walker and the browser.
//!
//! The walker only ever asks for typed page facts (headings with links,
//! lesson list items, resource panel links); everything about how a real
//! classroom page is driven lives in the [`webdriver`] adapter. Tests swap in
//! a scripted provider.

pub mod webdriver;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The page never reached a ready state within the configured timeout.
    /// The affected section/lesson is skipped; the walk continues.
    #[error("page {url} did not reach a ready state within {timeout_secs}s")]
    PageLoadTimeout { url: String, timeout_secs: u64 },

    /// An element reference became invalid mid-read (the page re-rendered).
    /// Re-read through `retry::run_with_retry`, bounded.
    #[error("element reference went stale mid-read")]
    StaleElement,

    /// An expected element is missing from the page.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// A sign-in page appeared but no credentials are configured. This is a
    /// configuration error and aborts the run.
    #[error("sign-in required but no credentials are configured")]
    MissingCredentials,

    /// The classroom rejected the configured credentials.
    #[error("sign-in rejected for {email}")]
    LoginFailed { email: String },

    /// HTTP transport failure talking to the driver.
    #[error("webdriver transport: {0}")]
    Transport(#[from] curl::Error),

    /// The driver answered with an unexpected payload or protocol error.
    #[error("webdriver protocol: {0}")]
    Protocol(String),
}

impl ProviderError {
    pub fn is_stale(&self) -> bool {
        matches!(self, ProviderError::StaleElement)
    }

    /// Configuration-level errors abort the run; everything else is isolated
    /// to the item being scraped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProviderError::MissingCredentials | ProviderError::LoginFailed { .. }
        )
    }
}

/// A top-level section heading with its syllabus link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeading {
    pub title: String,
    pub href: String,
}

/// A lesson list item: scraped title plus the lesson page link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonItem {
    pub title: String,
    pub href: String,
}

impl LessonItem {
    /// Collapsed lesson cards carry a `#` placeholder link until clicked open.
    pub fn is_collapsed(&self) -> bool {
        self.href.ends_with('#')
    }
}

/// Typed page access consumed by the walker.
///
/// `&mut self` throughout: the one browser session is owned by the provider
/// and every call mutates what page it is on.
pub trait PageContentProvider {
    /// Navigates and blocks until the page is ready or the timeout lapses.
    fn load_page(&mut self, url: &str) -> Result<(), ProviderError>;

    /// The course display name scraped from the current page's sidebar,
    /// when one is exposed.
    fn course_title(&mut self) -> Result<Option<String>, ProviderError>;

    /// Section headings (with links) on the current syllabus page.
    fn section_headings(&mut self) -> Result<Vec<SectionHeading>, ProviderError>;

    /// Lesson list items on the current section page, in positional order.
    fn lesson_items(&mut self) -> Result<Vec<LessonItem>, ProviderError>;

    /// Clicks the collapsed lesson card at `index` open and re-reads its link.
    fn expand_lesson(&mut self, index: usize) -> Result<LessonItem, ProviderError>;

    /// Downloadable links on the current lesson page: an embedded notebook
    /// iframe (if any) plus archive anchors in the resource panel.
    fn resource_links(&mut self) -> Result<Vec<String>, ProviderError>;
}
