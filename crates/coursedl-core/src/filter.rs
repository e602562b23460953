//! Selective walk/download filter.
//!
//! Callers restrict a run to whole sections (`"2"`) or single lessons
//! (`"2.03"`). Matching is numeric, so `"2.3"` and `"2.03"` select the same
//! lesson. An empty selection allows everything.

use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    /// The token is not a section ordinal or a dotted section.lesson pair.
    /// This is a caller mistake, so it aborts the run instead of being
    /// skipped like per-item scrape failures.
    #[error("invalid selector {0:?}: expected a section ordinal like \"2\" or \"2.03\"")]
    InvalidSelector(String),
}

/// Parsed set of selector tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Whole-section ordinals (1-based).
    sections: BTreeSet<u32>,
    /// Exact (section, lesson) ordinals (1-based).
    lessons: BTreeSet<(u32, u32)>,
}

impl Selection {
    /// A selection with no restrictions.
    pub fn all() -> Self {
        Selection::default()
    }

    pub fn parse<I, S>(tokens: I) -> Result<Self, SelectorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Selection::default();
        for token in tokens {
            let token = token.as_ref();
            match token.split_once('.') {
                None => {
                    let ordinal = parse_ordinal(token)
                        .ok_or_else(|| SelectorError::InvalidSelector(token.to_string()))?;
                    selection.sections.insert(ordinal);
                }
                Some((section, lesson)) => {
                    let pair = parse_ordinal(section).zip(parse_ordinal(lesson));
                    let (section, lesson) = pair
                        .ok_or_else(|| SelectorError::InvalidSelector(token.to_string()))?;
                    selection.lessons.insert((section, lesson));
                }
            }
        }
        Ok(selection)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.sections.is_empty() && self.lessons.is_empty()
    }

    /// Whether the section is walked/downloaded at all. A dotted token also
    /// admits its section, so `"3.01"` keeps section 3 in the walk.
    pub fn allows_section(&self, ordinal: u32) -> bool {
        self.is_unrestricted()
            || self.sections.contains(&ordinal)
            || self.lessons.iter().any(|(s, _)| *s == ordinal)
    }

    /// Whether the lesson's resources are discovered/downloaded. Whole-section
    /// tokens admit every lesson of that section; dotted tokens only the
    /// exact lesson.
    pub fn allows_lesson(&self, section: u32, lesson: u32) -> bool {
        self.is_unrestricted()
            || self.sections.contains(&section)
            || self.lessons.contains(&(section, lesson))
    }
}

fn parse_ordinal(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
