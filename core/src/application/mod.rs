pub mod extract;
pub mod goal;

pub use extract::{EmailMatcher, Extraction, InfoExtractor, Matcher, NameMatcher, SkillsMatcher};
pub use goal::{GoalChecker, GoalStatus, COMPLETION_MARKER};

use std::fmt;

/// One of the three pieces of information collected from an applicant.
///
/// Variants are declared in record order, which is the order missing fields
/// get reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Email,
    Skills,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Name, Field::Email, Field::Skills];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Skills => "skills",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Applicant details gathered over a single session.
///
/// The extractor only ever overwrites a field with a fresh match, it never
/// clears one. Nothing here outlives the session that owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationRecord {
    pub name: Option<String>,
    pub email: Option<String>,
    pub skills: Option<String>,
}

impl ApplicationRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Name => self.name.as_deref(),
            Field::Email => self.email.as_deref(),
            Field::Skills => self.skills.as_deref(),
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Name => &mut self.name,
            Field::Email => &mut self.email,
            Field::Skills => &mut self.skills,
        };
        *slot = Some(value.into());
    }

    /// `None` and the empty string both count as "not provided".
    #[must_use]
    pub fn is_provided(&self, field: Field) -> bool {
        self.get(field).is_some_and(|v| !v.is_empty())
    }

    #[must_use]
    pub fn missing(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| !self.is_provided(*f))
            .collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_missing_everything() {
        let record = ApplicationRecord::new();
        assert_eq!(record.missing(), Field::ALL.to_vec());
        assert!(!record.is_complete());
    }

    #[test]
    fn empty_string_counts_as_missing() {
        let mut record = ApplicationRecord::new();
        record.set(Field::Name, "");
        record.set(Field::Email, "a@b.io");
        assert_eq!(record.missing(), vec![Field::Name, Field::Skills]);
    }

    #[test]
    fn set_overwrites_only_the_named_field() {
        let mut record = ApplicationRecord::new();
        record.set(Field::Email, "old@example.com");
        record.set(Field::Skills, "Go");
        record.set(Field::Email, "new@example.com");
        assert_eq!(record.get(Field::Email), Some("new@example.com"));
        assert_eq!(record.get(Field::Skills), Some("Go"));
        assert_eq!(record.get(Field::Name), None);
    }
}
