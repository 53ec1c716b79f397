pub use crate::application::{ApplicationRecord, Field, GoalChecker, InfoExtractor, Matcher};
pub use crate::completion::{Client, CompletionModel, Message, DEFAULT_PREAMBLE};
pub use crate::config::Config;
pub use crate::error::Error;
pub use crate::session::{Session, SessionOutcome};
pub use crate::tools::{Tool, ToolSet};
