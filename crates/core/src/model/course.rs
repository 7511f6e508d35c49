use serde::{Deserialize, Serialize};

/// A selectable course from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseOption {
    pub id: String,
    pub title: String,
}

impl CourseOption {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Load state of the course list shown on the student-details step.
///
/// `Unavailable` and an empty `Loaded` list both mean the user types course
/// names by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CourseOptions {
    #[default]
    NotLoaded,
    Loading,
    Loaded(Vec<CourseOption>),
    Unavailable,
}

impl CourseOptions {
    #[must_use]
    pub fn options(&self) -> &[CourseOption] {
        match self {
            CourseOptions::Loaded(options) => options,
            _ => &[],
        }
    }

    #[must_use]
    pub fn manual_entry(&self) -> bool {
        self.options().is_empty()
    }

    /// Whether `title` is acceptable as a course selection.
    ///
    /// Any non-blank title is accepted in manual-entry mode.
    #[must_use]
    pub fn accepts(&self, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        if self.manual_entry() {
            return true;
        }
        self.options()
            .iter()
            .any(|option| option.title.trim().eq_ignore_ascii_case(title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_catalog_accepts_free_text() {
        let options = CourseOptions::Unavailable;
        assert!(options.manual_entry());
        assert!(options.accepts("Anything I like"));
        assert!(!options.accepts("  "));
    }

    #[test]
    fn loaded_catalog_matches_titles_case_insensitively() {
        let options = CourseOptions::Loaded(vec![
            CourseOption::new("c1", "AI & Data Science"),
            CourseOption::new("c2", "Robotics"),
        ]);
        assert!(!options.manual_entry());
        assert!(options.accepts("robotics"));
        assert!(!options.accepts("Pottery"));
    }

    #[test]
    fn empty_loaded_list_falls_back_to_manual_entry() {
        assert!(CourseOptions::Loaded(Vec::new()).manual_entry());
    }
}
