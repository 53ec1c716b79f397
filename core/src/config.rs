use std::time::Duration;

use thiserror::Error;

use crate::completion::DEFAULT_MAX_ITERATIONS;

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_MAX_TOKENS: usize = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_LOG_FILTER: &str = "warn";

/// Everything the binary needs, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub model: ModelConfig,
    pub max_iterations: usize,
    pub telemetry: TelemetryConfig,
}

/// Settings for the OpenAI-compatible completion endpoint.
#[derive(Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: usize,
    pub timeout: Duration,
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ModelConfig {
    /// `{api_base}/chat/completions`, tolerating a trailing slash on the base.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

/// Log filter used when `RUST_LOG` is unset.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_filter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Required environment variable `{0}` is not set")]
    Missing(&'static str),
    #[error("Environment variable `{var}` has an invalid value `{value}`")]
    Invalid { var: &'static str, value: String },
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = var("GROQ_API_KEY").ok_or(ConfigError::Missing("GROQ_API_KEY"))?;
        let api_base = var("GROQ_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = var("INTAKE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let temperature = parse_or(var("INTAKE_TEMPERATURE"), "INTAKE_TEMPERATURE", 0.0)?;
        let max_tokens = parse_or(var("INTAKE_MAX_TOKENS"), "INTAKE_MAX_TOKENS", DEFAULT_MAX_TOKENS)?;
        let timeout_secs = parse_or(
            var("INTAKE_TIMEOUT_SECS"),
            "INTAKE_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "INTAKE_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        let max_iterations = parse_or(
            var("INTAKE_MAX_ITERATIONS"),
            "INTAKE_MAX_ITERATIONS",
            DEFAULT_MAX_ITERATIONS,
        )?;
        if max_iterations == 0 {
            return Err(ConfigError::Invalid {
                var: "INTAKE_MAX_ITERATIONS",
                value: "0".to_string(),
            });
        }
        let log_filter = var("INTAKE_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            model: ModelConfig {
                api_key,
                api_base,
                model,
                temperature,
                max_tokens,
                timeout: Duration::from_secs(timeout_secs),
            },
            max_iterations,
            telemetry: TelemetryConfig { log_filter },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}
