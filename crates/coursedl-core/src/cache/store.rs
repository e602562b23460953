//! Whole-file cache persistence, one JSON file per course code.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::model::CourseCache;

/// Loads and saves course caches in a fixed directory.
///
/// `save` rewrites the whole file on every checkpoint; the files are small
/// (link maps, not content) and a full rewrite keeps the format trivially
/// crash-resumable. Write failures propagate to the caller, no retry.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CacheStore { dir: dir.into() }
    }

    /// Store rooted at the process working directory, where previous runs of
    /// the tool left their `<course_code>.json` files.
    pub fn open_current_dir() -> Result<Self> {
        Ok(CacheStore {
            dir: std::env::current_dir().context("cannot resolve working directory")?,
        })
    }

    pub fn path_for(&self, course_code: &str) -> PathBuf {
        self.dir.join(format!("{}.json", course_code))
    }

    /// Returns the saved cache for `course_code`, or an empty one when no
    /// file exists yet.
    pub fn load(&self, course_code: &str) -> Result<CourseCache> {
        let path = self.path_for(course_code);
        if !path.exists() {
            return Ok(CourseCache::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("reading cache file {}", path.display()))?;
        let cache = serde_json::from_str(&data)
            .with_context(|| format!("parsing cache file {}", path.display()))?;
        Ok(cache)
    }

    /// Rewrites the cache file for `course_code` deterministically:
    /// UTF-8, 4-space indentation, sorted keys.
    pub fn save(&self, course_code: &str, cache: &CourseCache) -> Result<()> {
        let path = self.path_for(course_code);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating cache directory {}", parent.display()))?;
        }
        let body = render(cache).context("serializing cache")?;
        fs::write(&path, body)
            .with_context(|| format!("writing cache file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "cache checkpoint written");
        Ok(())
    }
}

/// Serializes with a 4-space pretty formatter (serde_json defaults to 2).
fn render(cache: &CourseCache) -> Result<Vec<u8>> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    cache.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

#[cfg(test)]
pub(crate) fn render_for_tests(cache: &CourseCache) -> String {
    String::from_utf8(render(cache).unwrap()).unwrap()
}
