use crate::{completion::CompletionError, config::ConfigError, tools::ToolSetError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),
    #[error("ToolSet error: {0}")]
    ToolSet(#[from] ToolSetError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Console I/O error: {0}")]
    Io(#[from] std::io::Error),
}
