//! Course-code lookups and classroom URL derivation.
//!
//! Nanodegree codes (`nd` prefix) live under the `nanodegrees/` classroom
//! route and additionally carry an extracurricular syllabus page; plain
//! course codes use the `courses/` route.

const CLASSROOM_BASE: &str = "https://classroom.udacity.com";

/// Known course codes and their display names. Codes missing here fall back
/// to the title scraped from the course sidebar, then to the code itself.
static COURSES: &[(&str, &str)] = &[
    ("cs101", "Intro to Computer Science"),
    ("cs212", "Design of Computer Programs"),
    ("cs253", "Web Development"),
    ("cs373", "Artificial Intelligence for Robotics"),
    ("nd013", "Self-Driving Car Engineer"),
    ("nd089", "AI Programming with Python"),
    ("nd101", "Deep Learning Foundations"),
    ("nd209", "Robotics Software Engineer"),
    ("nd892", "Natural Language Processing"),
    ("nd893", "Deep Reinforcement Learning"),
];

pub fn display_name(course_code: &str) -> Option<&'static str> {
    COURSES
        .iter()
        .find(|(code, _)| *code == course_code)
        .map(|(_, name)| *name)
}

pub fn is_nanodegree(course_code: &str) -> bool {
    course_code.starts_with("nd")
}

/// Syllabus home page for a course code.
pub fn course_home_url(course_code: &str) -> String {
    if is_nanodegree(course_code) {
        format!("{}/nanodegrees/{}", CLASSROOM_BASE, course_code)
    } else {
        format!("{}/courses/{}", CLASSROOM_BASE, course_code)
    }
}

/// Extracurricular syllabus page; nanodegrees only.
pub fn extracurricular_url(course_code: &str) -> Option<String> {
    is_nanodegree(course_code).then(|| {
        format!(
            "{}/nanodegrees/{}/syllabus/extracurricular",
            CLASSROOM_BASE, course_code
        )
    })
}
