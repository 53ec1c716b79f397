use crate::completion::{CompletionError, CompletionModel, Message, TokenUsage};
use crate::config::ModelConfig;
use crate::tools::{ToolCall, ToolSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};

/// Chat-completions client for any OpenAI-compatible endpoint (Groq by
/// default).
///
/// The HTTP client carries the configured request timeout. Failed calls are
/// not retried.
pub struct OpenAICompletionModel {
    api_key: String,
    api_url: String,
    client: reqwest::Client,
    model: String,
}

impl OpenAICompletionModel {
    pub fn new(config: &ModelConfig) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to build HTTP client");
                CompletionError::RequestError(e.to_string())
            })?;
        Ok(Self {
            api_key: config.api_key.clone(),
            api_url: config.completions_url(),
            client,
            model: config.model.clone(),
        })
    }

    fn request_body(
        &self,
        messages: &[Message],
        tools: Option<&ToolSet>,
        temperature: f64,
        max_tokens: usize,
    ) -> Value {
        let messages: Vec<OpenAIMessage> = messages.iter().map(OpenAIMessage::from).collect();

        let mut request_body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        if let Some(tools) = tools {
            let tools_serialized: Vec<Value> =
                tools.0.iter().map(|t| t.default_serializer()).collect();
            if let Some(obj) = request_body.as_object_mut() {
                info!(
                    tool_count = tools_serialized.len(),
                    "Including tools in request"
                );
                obj.insert("tools".to_string(), Value::Array(tools_serialized));
            }
        }
        request_body
    }
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
enum OpenAIMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<OpenAIToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Serialize, Debug, PartialEq)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    function: OpenAIFunction,
}

#[derive(Serialize, Debug, PartialEq)]
struct OpenAIFunction {
    name: String,
    arguments: String,
}

impl From<&Message> for OpenAIMessage {
    fn from(value: &Message) -> OpenAIMessage {
        match value {
            Message::Preamble(s) => Self::System { content: s.clone() },
            Message::User(s) => Self::User { content: s.clone() },
            Message::Assistant {
                content,
                tool_calls,
            } => {
                let tool_calls: Vec<OpenAIToolCall> = tool_calls
                    .iter()
                    .flatten()
                    .map(|tc| OpenAIToolCall {
                        id: tc.id.clone(),
                        kind: "function",
                        function: OpenAIFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments.clone(),
                        },
                    })
                    .collect();
                // an assistant turn that only calls tools has null content
                let content = if content.is_empty() && !tool_calls.is_empty() {
                    None
                } else {
                    Some(content.clone())
                };
                Self::Assistant {
                    content,
                    tool_calls,
                }
            }
            Message::Tool(resp) => Self::Tool {
                tool_call_id: resp.id.clone(),
                content: resp.content.clone(),
            },
        }
    }
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Deserialize, Debug)]
struct ResponseToolCall {
    id: String,
    function: ResponseFunction,
}

#[derive(Deserialize, Debug)]
struct ResponseFunction {
    name: String,
    // a JSON string per the API, though some servers send the object itself
    #[serde(default)]
    arguments: Value,
}

#[derive(Deserialize, Debug)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

fn parse_response(response_json: Value) -> Result<(Message, TokenUsage), CompletionError> {
    let response: ChatResponse = serde_json::from_value(response_json).map_err(|e| {
        error!(error = ?e, "Unexpected response shape");
        CompletionError::ParseError(e.to_string())
    })?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::ParseError("Response has no choices".to_string()))?;

    let tool_calls: Option<Vec<ToolCall>> = choice
        .message
        .tool_calls
        .filter(|calls| !calls.is_empty())
        .map(|calls| {
            info!(tool_call_count = calls.len(), "Parsed tool calls");
            calls
                .into_iter()
                .map(|tc| ToolCall {
                    id: tc.id,
                    name: tc.function.name,
                    arguments: match tc.function.arguments {
                        Value::String(s) => s,
                        Value::Null => "{}".to_string(),
                        other => other.to_string(),
                    },
                })
                .collect()
        });

    let token_usage = response
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    info!(
        prompt_tokens = token_usage.prompt_tokens,
        completion_tokens = token_usage.completion_tokens,
        total_tokens = token_usage.total_tokens,
        "Token usage recorded"
    );

    Ok((
        Message::Assistant {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
        },
        token_usage,
    ))
}

#[async_trait]
impl CompletionModel for OpenAICompletionModel {
    #[instrument(
        skip(self, messages, tools, temperature),
        fields(
            model = %self.model,
            history_len = messages.len(),
            tools = tools.is_some())
    )]
    async fn send(
        &self,
        messages: &[Message],
        tools: Option<&ToolSet>,
        temperature: f64,
        max_tokens: usize,
    ) -> Result<(Message, TokenUsage), CompletionError> {
        let request_body = self.request_body(messages, tools, temperature, max_tokens);
        debug!(request_body = ?request_body, "Sending request to completion endpoint");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Request failed");
                CompletionError::RequestError(e.to_string())
            })?;

        let status = response.status();
        debug!(%status, "Received API response");

        if !status.is_success() {
            let error_msg = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error (failed to read response body)".to_string());

            error!(
                status = %status,
                error = %error_msg,
                "API returned error response"
            );
            return Err(CompletionError::ProviderError(status.as_u16(), error_msg));
        }

        let response_json: Value = response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse response JSON");
            CompletionError::ParseError(e.to_string())
        })?;
        parse_response(response_json)
    }
}
