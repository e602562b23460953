//! Persistent link cache.
//!
//! Stores every discovered section, lesson, and resource link for a course,
//! plus a downloaded flag per resource, so interrupted runs resume from the
//! last checkpoint. Persisted as one JSON file per course code with sorted
//! keys and 4-space indentation, kept human-diffable on purpose.

pub mod model;
pub mod store;
mod wire;

pub use model::{CourseCache, LessonEntry, SectionEntry};
pub use store::CacheStore;
