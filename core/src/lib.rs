//! # intake - Core API Documentation
//!
//! intake is a conversational job-application assistant. An LLM drives the
//! conversation; two regex-backed tools do the actual bookkeeping.
//!
//! ## Pieces
//!
//! - **Application record**: name, email and skills for one applicant
//! - **Extractor**: ordered [`application::Matcher`] rules that pull those
//!   fields out of free text
//! - **Goal checker**: reports what is still missing, or a summary once done
//! - **Tools**: the two functions above, exposed to the model by name
//! - **Completion client**: conversation memory plus the tool-calling loop
//! - **Providers**: an OpenAI-compatible chat-completions backend (Groq by default)
//! - **Session**: the console read/print loop
//!
//! ## Example
//!
//! ```rust,no_run
//! use intake::prelude::*;
//! use intake::providers::completions::OpenAI;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Error> {
//!     let config = Config::from_env()?;
//!     let model = OpenAI::new(&config.model)?;
//!     let client = Client::new(
//!         model,
//!         DEFAULT_PREAMBLE,
//!         config.model.temperature,
//!         config.model.max_tokens,
//!         ToolSet::application(),
//!     );
//!     let mut session = Session::new(client);
//!     session.run(std::io::stdin().lock(), std::io::stdout()).await?;
//!     Ok(())
//! }
//! ```
//!
//! The tools can also be driven without a model:
//!
//! ```rust
//! use intake::prelude::*;
//!
//! let tools = ToolSet::application();
//! let mut record = ApplicationRecord::new();
//! tools.invoke("extract_application_info", "I am Ada, ada@example.com", &mut record).unwrap();
//! assert_eq!(record.name.as_deref(), Some("Ada"));
//! assert_eq!(record.email.as_deref(), Some("ada@example.com"));
//! ```

/// Applicant record, extraction rules and the completeness check
pub mod application;

/// Language model completion and conversation management
///
/// Contains:
/// - Client running the tool-calling loop
/// - Message history tracking
/// - Token usage accounting
pub mod completion;

/// Environment-driven configuration
pub mod config;

/// Error types for all library operations
pub mod error;

/// Convenience prelude exports
pub mod prelude;

/// Builtin completion model providers
pub mod providers;

/// Console host loop
pub mod session;

/// Function calling and tool execution support
pub mod tools;
