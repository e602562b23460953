//! Cache key construction, collision disambiguation, and filename derivation.
//!
//! Section keys look like `"01 Term One"`, lesson keys like
//! `"01.01 - Intro"`. The zero-padded ordinals make alphabetical key order
//! equal discovery order, which is what keeps the persisted cache stable
//! across runs.

/// Maximum length for a single path component (Linux NAME_MAX).
const NAME_MAX: usize = 255;

/// Builds a section cache key from a 1-based ordinal and a scraped title.
pub fn section_key(ordinal: usize, title: &str) -> String {
    format!("{:02} {}", ordinal, title)
}

/// Builds a lesson cache key from 1-based section/lesson ordinals and a title.
pub fn lesson_key(section_ordinal: usize, lesson_ordinal: usize, title: &str) -> String {
    format!("{:02}.{:02} - {}", section_ordinal, lesson_ordinal, title)
}

/// Appends `.` to `key` until `taken` no longer claims it.
///
/// Used when a scraped title repeats within one scope, or when a cached key
/// holds a different link than the freshly scraped one. Never overwrites.
pub fn disambiguate<F>(key: &str, taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    let mut candidate = key.to_string();
    while taken(&candidate) {
        candidate.push('.');
    }
    candidate
}

/// Parses the leading ordinal out of a section key (`"01 Term One"` → 1).
pub fn section_ordinal(section_key: &str) -> Option<u32> {
    let end = section_key
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(section_key.len());
    if end == 0 {
        return None;
    }
    section_key[..end].parse().ok()
}

/// Parses the leading `SS.LL` ordinal pair out of a lesson key.
///
/// Returns `None` when the key does not start with a dotted ordinal.
pub fn lesson_ordinals(lesson_key: &str) -> Option<(u32, u32)> {
    let head = lesson_key.split(' ').next()?;
    let (sec, les) = head.split_once('.')?;
    Some((sec.parse().ok()?, les.parse().ok()?))
}

/// The lesson key's leading ordinal component, used as the download filename
/// prefix: `"01.01 - Intro"` → `"01"`.
pub fn lesson_file_prefix(lesson_key: &str) -> &str {
    let end = lesson_key
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lesson_key.len());
    &lesson_key[..end]
}

/// Derives the local filename for a resource: lesson prefix + URL basename,
/// e.g. lesson `"01.01 - Intro"` + `https://cdn/a.zip` → `"01-a.zip"`.
pub fn download_filename(lesson_key: &str, resource_url: &str) -> String {
    let basename = filename_from_url(resource_url).unwrap_or_else(|| "resource.bin".to_string());
    sanitize_component(&format!(
        "{}-{}",
        lesson_file_prefix(lesson_key),
        basename
    ))
}

/// Extracts the last path segment of a URL for use as a filename hint.
pub fn filename_from_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}

/// Sanitizes a scraped name for safe use as a path component.
///
/// Keeps ASCII alphanumerics, spaces, and `-_.()`; drops everything else.
/// Spaces are preserved because section directories like `01 Term One` keep
/// their display form on disk. Capped at 255 bytes on a char boundary.
pub fn sanitize_component(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let keep = c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '(' | ')');
        if keep {
            out.push(c);
        }
    }
    let trimmed = out.trim();
    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn section_and_lesson_keys_are_zero_padded() {
        assert_eq!(section_key(1, "Term One"), "01 Term One");
        assert_eq!(lesson_key(1, 3, "Intro"), "01.03 - Intro");
        assert_eq!(lesson_key(12, 10, "Capstone"), "12.10 - Capstone");
    }

    #[test]
    fn disambiguate_appends_dots_until_free() {
        let mut taken = BTreeSet::new();
        taken.insert("Intro".to_string());
        taken.insert("Intro.".to_string());
        let key = disambiguate("Intro", |k| taken.contains(k));
        assert_eq!(key, "Intro..");
    }

    #[test]
    fn disambiguate_leaves_free_key_alone() {
        assert_eq!(disambiguate("Intro", |_| false), "Intro");
    }

    #[test]
    fn section_ordinal_reads_leading_digits() {
        assert_eq!(section_ordinal("01 Term One"), Some(1));
        assert_eq!(section_ordinal("12 Extracurricular"), Some(12));
        assert_eq!(section_ordinal("Term One"), None);
    }

    #[test]
    fn lesson_ordinals_parse() {
        assert_eq!(lesson_ordinals("01.03 - Intro"), Some((1, 3)));
        assert_eq!(lesson_ordinals("link"), None);
        assert_eq!(lesson_ordinals("no ordinal here"), None);
    }

    #[test]
    fn file_prefix_is_leading_ordinal_component() {
        assert_eq!(lesson_file_prefix("01.01 - Intro"), "01");
        assert_eq!(lesson_file_prefix("12.03 - Capstone"), "12");
    }

    #[test]
    fn download_filename_matches_lesson_and_basename() {
        assert_eq!(
            download_filename("01.01 - Intro", "https://cdn/a.zip"),
            "01-a.zip"
        );
        assert_eq!(
            download_filename("02.05 - Deep Dive", "https://cdn/path/notes_v2.zip?sig=x"),
            "02-notes_v2.zip"
        );
    }

    #[test]
    fn filename_from_url_ignores_query_and_root() {
        assert_eq!(
            filename_from_url("https://cdn/a/b/file.zip?token=abc").as_deref(),
            Some("file.zip")
        );
        assert_eq!(filename_from_url("https://cdn/"), None);
    }

    #[test]
    fn sanitize_keeps_spaces_and_drops_specials() {
        assert_eq!(sanitize_component("01 Term One"), "01 Term One");
        assert_eq!(
            sanitize_component("C++ & Friends: Part/2"),
            "C  Friends Part2"
        );
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "x".repeat(400);
        assert_eq!(sanitize_component(&long).len(), 255);
    }
}
