use super::{ApplicationRecord, Field};

/// Text every "all collected" summary contains, compared case-insensitively.
pub const COMPLETION_MARKER: &str = "you're ready";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalStatus {
    Ready {
        name: String,
        email: String,
        skills: String,
    },
    Missing(Vec<Field>),
}

impl GoalStatus {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, GoalStatus::Ready { .. })
    }

    #[must_use]
    pub fn message(&self) -> String {
        match self {
            GoalStatus::Ready {
                name,
                email,
                skills,
            } => format!("You're ready! Name: {name}, Email: {email}, Skills: {skills}."),
            GoalStatus::Missing(fields) => {
                let missing = fields
                    .iter()
                    .map(|f| f.label())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Still need: {missing}. Please ask the user to provide this.")
            }
        }
    }
}

/// Decides whether a record holds everything the application needs.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoalChecker;

impl GoalChecker {
    #[must_use]
    pub fn status(&self, record: &ApplicationRecord) -> GoalStatus {
        match (
            record.name.as_deref().filter(|v| !v.is_empty()),
            record.email.as_deref().filter(|v| !v.is_empty()),
            record.skills.as_deref().filter(|v| !v.is_empty()),
        ) {
            (Some(name), Some(email), Some(skills)) => GoalStatus::Ready {
                name: name.to_string(),
                email: email.to_string(),
                skills: skills.to_string(),
            },
            _ => GoalStatus::Missing(record.missing()),
        }
    }

    #[must_use]
    pub fn check(&self, record: &ApplicationRecord) -> String {
        self.status(record).message()
    }
}
