use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    application::ApplicationRecord,
    tools::{ToolCall, ToolResponse, ToolSet, ToolSetError},
};

pub const DEFAULT_PREAMBLE: &str = "You are a helpful job application assistant. \
Your goal is to collect the user's name, email, and skills. \
Use the tools provided to extract this information and check whether all required data is collected. \
Once everything is collected, inform the user that the application info is complete and stop.";

pub const DEFAULT_MAX_ITERATIONS: usize = 15;
pub const ITERATION_LIMIT_REPLY: &str = "Agent stopped due to iteration limit or time limit.";

/// Message that'll be sent in Completions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// System prompt
    Preamble(String),
    /// Message sent by the user
    User(String),
    /// Response from the assistant
    Assistant {
        content: String,
        tool_calls: Option<Vec<ToolCall>>,
    },
    /// Output of a tool the assistant asked for
    Tool(ToolResponse),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

pub type MessageHistory = Vec<Message>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("Provider error -> HTTP Status {0}: {1}")]
    ProviderError(u16, String),
    #[error("RequestError: {0}")]
    RequestError(String),
    #[error("ParseError: {0}")]
    ParseError(String),
}

/// The external text-completion service.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Send the transcript (system prompt first) and get the assistant's reply
    async fn send(
        &self,
        messages: &[Message],
        tools: Option<&ToolSet>,
        temperature: f64,
        max_tokens: usize,
    ) -> Result<(Message, TokenUsage), CompletionError>;
}

/// Result of one user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    pub text: String,
    /// The text is a return-direct tool's output, untouched by the model.
    pub returned_direct: bool,
    /// Model round-trips spent on the turn.
    pub iterations: usize,
}

/// Conversation with a completion model that can call into the tool set.
///
/// Only the user's inputs and the final replies are remembered between
/// turns; tool traffic lives for a single turn.
pub struct Client<M: CompletionModel> {
    completion_model: M,
    history: MessageHistory,

    // common prompt parameters
    temperature: f64,
    max_tokens: usize,
    max_iterations: usize,
    tools: ToolSet,

    token_usage: TokenUsage,
}

impl<M: CompletionModel> Client<M> {
    pub fn new(
        completion_model: M,
        preamble: impl AsRef<str>,
        temperature: f64,
        max_tokens: usize,
        tools: ToolSet,
    ) -> Self {
        Self {
            completion_model,
            history: vec![Message::Preamble(String::from(preamble.as_ref()))],
            temperature,
            max_tokens,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tools,
            token_usage: TokenUsage::default(),
        }
    }

    /// Caps model round-trips per turn. Values below 1 are treated as 1.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Clear conversation history while maintaining premble
    pub fn clear_history(&mut self) {
        self.history.retain(|m| matches!(m, Message::Preamble(_)));
    }

    #[must_use]
    pub fn export_history(&self) -> &MessageHistory {
        &self.history
    }

    #[must_use]
    pub fn token_usage(&self) -> &TokenUsage {
        &self.token_usage
    }

    #[must_use]
    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Runs one user turn to completion.
    ///
    /// The model is re-queried with tool outputs until it answers in plain
    /// text. A return-direct tool ends the turn with its own output. On error
    /// the history is left as it was before the turn.
    #[instrument(skip_all, fields(history_len = self.history.len()))]
    pub async fn respond(
        &mut self,
        input: &str,
        record: &mut ApplicationRecord,
    ) -> Result<AgentReply, CompletionError> {
        let mut transcript = self.history.clone();
        transcript.push(Message::User(input.to_string()));
        let tools = if self.tools.is_empty() {
            None
        } else {
            Some(&self.tools)
        };

        let mut reply = None;
        for iteration in 1..=self.max_iterations {
            let (response, usage) = self
                .completion_model
                .send(&transcript, tools, self.temperature, self.max_tokens)
                .await?;
            self.token_usage = self.token_usage.combine(&usage);

            let (content, calls) = match response {
                Message::Assistant {
                    content,
                    tool_calls: Some(calls),
                } if !calls.is_empty() => (content, calls),
                Message::Assistant { content, .. } => {
                    reply = Some(AgentReply {
                        text: content,
                        returned_direct: false,
                        iterations: iteration,
                    });
                    break;
                }
                other => {
                    return Err(CompletionError::ParseError(format!(
                        "Expected an assistant message, got {other:?}"
                    )))
                }
            };

            let mut direct = None;
            let mut responses = Vec::with_capacity(calls.len());
            for call in &calls {
                let response = run_tool(&self.tools, call, record);
                if self
                    .tools
                    .find_tool(&call.name)
                    .is_ok_and(|t| t.return_direct())
                {
                    direct = Some(response.content.clone());
                }
                responses.push(response);
            }
            info!(tool_calls = calls.len(), iteration, "Executed tool calls");

            if let Some(text) = direct {
                reply = Some(AgentReply {
                    text,
                    returned_direct: true,
                    iterations: iteration,
                });
                break;
            }

            transcript.push(Message::Assistant {
                content,
                tool_calls: Some(calls),
            });
            transcript.extend(responses.into_iter().map(Message::Tool));
        }

        let reply = reply.unwrap_or_else(|| {
            warn!(max_iterations = self.max_iterations, "Turn hit the iteration limit");
            AgentReply {
                text: ITERATION_LIMIT_REPLY.to_string(),
                returned_direct: false,
                iterations: self.max_iterations,
            }
        });

        self.history.push(Message::User(input.to_string()));
        self.history.push(Message::Assistant {
            content: reply.text.clone(),
            tool_calls: None,
        });
        if self.token_usage.total_tokens.is_some() {
            info!(
                "Total tokens used so far: {:?}",
                self.token_usage.total_tokens
            );
        }
        Ok(reply)
    }
}

/// An unknown tool is reported back to the model instead of failing the turn.
fn run_tool(tools: &ToolSet, call: &ToolCall, record: &mut ApplicationRecord) -> ToolResponse {
    match tools.call(call, record) {
        Ok(response) => response,
        Err(ToolSetError::ToolNotFound(name)) => {
            warn!(tool = %name, "Model asked for an unknown tool");
            ToolResponse {
                id: call.id.clone(),
                name: name.clone(),
                content: format!(
                    "{name} is not a valid tool, try one of [{}].",
                    tools.names().join(", ")
                ),
            }
        }
    }
}

impl TokenUsage {
    /// Adds two usages; a counter the provider didn't report stays unknown.
    #[must_use]
    pub fn combine(&self, other: &TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: combine_options(self.prompt_tokens, other.prompt_tokens),
            completion_tokens: combine_options(self.completion_tokens, other.completion_tokens),
            total_tokens: combine_options(self.total_tokens, other.total_tokens),
        }
    }
}

fn combine_options(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a_val), Some(b_val)) => Some(a_val + b_val),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays canned replies and records every transcript it was sent.
    pub(crate) struct ScriptedModel {
        replies: Mutex<VecDeque<Result<Message, CompletionError>>>,
        pub(crate) seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedModel {
        pub(crate) fn new(replies: Vec<Result<Message, CompletionError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        async fn send(
            &self,
            messages: &[Message],
            _tools: Option<&ToolSet>,
            _temperature: f64,
            _max_tokens: usize,
        ) -> Result<(Message, TokenUsage), CompletionError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(text("out of script")))?;
            Ok((
                reply,
                TokenUsage {
                    prompt_tokens: Some(10),
                    completion_tokens: Some(2),
                    total_tokens: Some(12),
                },
            ))
        }
    }

    pub(crate) fn text(content: &str) -> Message {
        Message::Assistant {
            content: content.to_string(),
            tool_calls: None,
        }
    }

    pub(crate) fn tool_call(id: &str, name: &str, arguments: &str) -> Message {
        Message::Assistant {
            content: String::new(),
            tool_calls: Some(vec![ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: arguments.to_string(),
            }]),
        }
    }

    fn client(replies: Vec<Result<Message, CompletionError>>) -> Client<ScriptedModel> {
        Client::new(
            ScriptedModel::new(replies),
            DEFAULT_PREAMBLE,
            0.0,
            256,
            ToolSet::application(),
        )
    }

    #[tokio::test]
    async fn plain_answer_needs_no_tools() {
        let mut client = client(vec![Ok(text("Hello! What's your name?"))]);
        let mut record = ApplicationRecord::new();
        let reply = client.respond("hi", &mut record).await.unwrap();
        assert_eq!(reply.text, "Hello! What's your name?");
        assert!(!reply.returned_direct);
        assert_eq!(reply.iterations, 1);
        assert_eq!(
            client.export_history(),
            &vec![
                Message::Preamble(DEFAULT_PREAMBLE.to_string()),
                Message::User("hi".to_string()),
                text("Hello! What's your name?"),
            ]
        );
    }

    #[tokio::test]
    async fn tool_output_is_fed_back_to_the_model() {
        let mut client = client(vec![
            Ok(tool_call(
                "c1",
                "extract_application_info",
                r#"{"text":"My name is Alice Wong"}"#,
            )),
            Ok(text("Thanks Alice! What's your email?")),
        ]);
        let mut record = ApplicationRecord::new();
        let reply = client
            .respond("My name is Alice Wong", &mut record)
            .await
            .unwrap();

        assert_eq!(reply.text, "Thanks Alice! What's your email?");
        assert_eq!(reply.iterations, 2);
        assert_eq!(record.name.as_deref(), Some("Alice Wong"));

        let seen = client.completion_model.seen.lock().unwrap();
        let second = seen.last().unwrap();
        assert_eq!(
            second.last().unwrap(),
            &Message::Tool(ToolResponse {
                id: "c1".to_string(),
                name: "extract_application_info".to_string(),
                content: "Name saved. Let me check what else I need.".to_string(),
            })
        );
        drop(seen);

        // tool traffic is not remembered across turns
        assert_eq!(client.export_history().len(), 3);
    }

    #[tokio::test]
    async fn return_direct_tool_ends_the_turn_verbatim() {
        let mut client = client(vec![Ok(tool_call("c9", "check_application_goal", "{}"))]);
        let mut record = ApplicationRecord {
            name: Some("Alice Wong".to_string()),
            email: Some("alice@example.com".to_string()),
            skills: Some("Rust".to_string()),
        };
        let reply = client.respond("am I done?", &mut record).await.unwrap();
        assert!(reply.returned_direct);
        assert_eq!(
            reply.text,
            "You're ready! Name: Alice Wong, Email: alice@example.com, Skills: Rust."
        );
        assert_eq!(client.completion_model.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_the_model() {
        let mut client = client(vec![
            Ok(tool_call("c1", "send_email", "{}")),
            Ok(text("Sorry, let me try again.")),
        ]);
        let mut record = ApplicationRecord::new();
        let reply = client.respond("hi", &mut record).await.unwrap();
        assert_eq!(reply.text, "Sorry, let me try again.");

        let seen = client.completion_model.seen.lock().unwrap();
        let Message::Tool(resp) = seen[1].last().unwrap() else {
            panic!("expected a tool message");
        };
        assert_eq!(
            resp.content,
            "send_email is not a valid tool, try one of [extract_application_info, check_application_goal]."
        );
    }

    #[tokio::test]
    async fn iteration_limit_stops_the_turn() {
        let replies = (0..5)
            .map(|i| {
                Ok(tool_call(
                    &format!("c{i}"),
                    "extract_application_info",
                    r#"{"text":"nothing here"}"#,
                ))
            })
            .collect();
        let mut client = client(replies).with_max_iterations(3);
        let mut record = ApplicationRecord::new();
        let reply = client.respond("hmm", &mut record).await.unwrap();
        assert_eq!(reply.text, ITERATION_LIMIT_REPLY);
        assert_eq!(reply.iterations, 3);
        assert_eq!(client.completion_model.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failed_turn_leaves_history_alone() {
        let mut client = client(vec![Err(CompletionError::ProviderError(
            401,
            "bad key".to_string(),
        ))]);
        let mut record = ApplicationRecord::new();
        let err = client.respond("hi", &mut record).await.unwrap_err();
        assert_eq!(
            err,
            CompletionError::ProviderError(401, "bad key".to_string())
        );
        assert_eq!(client.export_history().len(), 1);
    }

    #[tokio::test]
    async fn token_usage_accumulates_across_calls() {
        let mut client = client(vec![
            Ok(tool_call("c1", "extract_application_info", r#"{"text":"i know Go"}"#)),
            Ok(text("Noted.")),
        ]);
        let mut record = ApplicationRecord::new();
        client.respond("i know Go", &mut record).await.unwrap();
        assert_eq!(client.token_usage().total_tokens, Some(24));
        assert_eq!(record.skills.as_deref(), Some("Go"));
    }

    #[test]
    fn clear_history_keeps_preamble() {
        let mut client = client(vec![]);
        client.history.push(Message::User("x".to_string()));
        client.clear_history();
        assert_eq!(
            client.export_history(),
            &vec![Message::Preamble(DEFAULT_PREAMBLE.to_string())]
        );
    }
}
