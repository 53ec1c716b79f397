use super::{Tool, ToolArg};
use crate::application::{ApplicationRecord, GoalChecker, InfoExtractor};

pub struct ExtractApplicationInfo {
    args: Vec<ToolArg>,
    extractor: InfoExtractor,
}

impl ExtractApplicationInfo {
    #[must_use]
    pub fn new() -> Self {
        Self::with_extractor(InfoExtractor::new())
    }

    #[must_use]
    pub fn with_extractor(extractor: InfoExtractor) -> Self {
        Self {
            args: vec![ToolArg::new::<String>(
                "text",
                "The user's message, verbatim",
            )],
            extractor,
        }
    }
}

impl Default for ExtractApplicationInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ExtractApplicationInfo {
    fn name(&self) -> &str {
        "extract_application_info"
    }
    fn description(&self) -> &str {
        "Extracts name, email, and skills."
    }
    fn args(&self) -> &[ToolArg] {
        &self.args
    }
    fn call(&self, input: &str, record: &mut ApplicationRecord) -> String {
        self.extractor.extract(input, record)
    }
}

/// Ignores its input; reports on the record. Its answer goes straight to the
/// user.
pub struct CheckApplicationGoal {
    args: Vec<ToolArg>,
}

impl CheckApplicationGoal {
    #[must_use]
    pub fn new() -> Self {
        Self {
            args: vec![ToolArg::new::<String>(
                "input",
                "Unused, pass an empty string",
            )],
        }
    }
}

impl Default for CheckApplicationGoal {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for CheckApplicationGoal {
    fn name(&self) -> &str {
        "check_application_goal"
    }
    fn description(&self) -> &str {
        "Checks if name, email, and skills are provided."
    }
    fn args(&self) -> &[ToolArg] {
        &self.args
    }
    fn return_direct(&self) -> bool {
        true
    }
    fn call(&self, _input: &str, record: &mut ApplicationRecord) -> String {
        GoalChecker.check(record)
    }
}
