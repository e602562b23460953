//! Hand-written serde impls for the on-disk cache shape.
//!
//! The persisted JSON merges structure and flags into single objects: a
//! section object holds a `"link"` string next to its lesson objects, and a
//! lesson object holds a `"link"` string next to resource-URL → bool flags:
//!
//! ```json
//! {
//!     "01 Term One": {
//!         "01.01 - Intro": {
//!             "https://cdn/a.zip": false,
//!             "link": "https://x/1/a"
//!         },
//!         "link": "https://x/1"
//!     }
//! }
//! ```
//!
//! Derived impls cannot express that merge, so the impls live here. Keys are
//! emitted in fully sorted order, `"link"` included, so repeated saves of the
//! same cache are byte-identical.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::model::{CourseCache, LessonEntry, SectionEntry};

const LINK_KEY: &str = "link";

impl Serialize for LessonEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        enum Field<'a> {
            Link(&'a str),
            Flag(bool),
        }

        let mut fields: BTreeMap<&str, Field> = BTreeMap::new();
        if let Some(link) = &self.link {
            fields.insert(LINK_KEY, Field::Link(link));
        }
        for (url, downloaded) in &self.resources {
            fields.insert(url, Field::Flag(*downloaded));
        }

        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (key, field) in fields {
            match field {
                Field::Link(link) => map.serialize_entry(key, link)?,
                Field::Flag(flag) => map.serialize_entry(key, &flag)?,
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LessonEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LessonVisitor;

        impl<'de> Visitor<'de> for LessonVisitor {
            type Value = LessonEntry;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a lesson object with a \"link\" and resource flags")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut lesson = LessonEntry::default();
                while let Some(key) = map.next_key::<String>()? {
                    if key == LINK_KEY {
                        lesson.link = Some(map.next_value()?);
                    } else {
                        let downloaded: bool = map.next_value()?;
                        lesson.resources.insert(key, downloaded);
                    }
                }
                Ok(lesson)
            }
        }

        deserializer.deserialize_map(LessonVisitor)
    }
}

impl Serialize for SectionEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        enum Field<'a> {
            Link(&'a str),
            Lesson(&'a LessonEntry),
        }

        let mut fields: BTreeMap<&str, Field> = BTreeMap::new();
        fields.insert(LINK_KEY, Field::Link(&self.link));
        for (name, lesson) in &self.lessons {
            fields.insert(name, Field::Lesson(lesson));
        }

        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (key, field) in fields {
            match field {
                Field::Link(link) => map.serialize_entry(key, link)?,
                Field::Lesson(lesson) => map.serialize_entry(key, lesson)?,
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SectionEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SectionVisitor;

        impl<'de> Visitor<'de> for SectionVisitor {
            type Value = SectionEntry;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a section object with a \"link\" and lesson objects")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut section = SectionEntry::default();
                while let Some(key) = map.next_key::<String>()? {
                    if key == LINK_KEY {
                        section.link = map.next_value()?;
                    } else {
                        let lesson: LessonEntry = map.next_value()?;
                        section.lessons.insert(key, lesson);
                    }
                }
                Ok(section)
            }
        }

        deserializer.deserialize_map(SectionVisitor)
    }
}

impl Serialize for CourseCache {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for (key, section) in &self.sections {
            map.serialize_entry(key, section)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CourseCache {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CacheVisitor;

        impl<'de> Visitor<'de> for CacheVisitor {
            type Value = CourseCache;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of section keys to section objects")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut cache = CourseCache::default();
                while let Some((key, section)) = map.next_entry::<String, SectionEntry>()? {
                    if cache.sections.insert(key.clone(), section).is_some() {
                        return Err(de::Error::custom(format!(
                            "duplicate section key {:?}",
                            key
                        )));
                    }
                }
                Ok(cache)
            }
        }

        deserializer.deserialize_map(CacheVisitor)
    }
}
