//! Message types and result types for conversation fitting

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// The role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message (instructions)
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// Tool message (function result)
    Tool,
}

impl Role {
    /// Wire name of the role, as it appears in the JSON schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// The function invoked by a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunction {
    /// Name of the function to call
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

/// A tool invocation emitted by an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this call, referenced by the paired tool response
    pub id: String,
    /// The function being invoked
    pub function: ToolFunction,
}

impl ToolCall {
    /// Create a tool call
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            function: ToolFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// A message in a conversation
///
/// Serializes to the chat-completion wire shape: optional fields are
/// omitted when absent, `tool_calls` only appears when non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender
    pub role: Role,
    /// Text content; may be absent when the message only carries tool calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool invocations; present only on assistant messages
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// ID of the invocation this message answers; present only on tool messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Optional participant name, charged by chat-format token accounting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create a simple text message
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(text.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    /// Create an assistant message carrying tool invocations
    pub fn assistant_with_tools(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a tool response message
    pub fn tool(text: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(text.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
            name: None,
        }
    }

    /// Text content, or the empty string when absent
    pub fn content_text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// The compression strategy to apply when a conversation is over budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Keep the longest prefix of whole units that fits
    First,
    /// Keep the longest suffix of whole units that fits
    Last,
    /// Shorten message content before eliminating messages
    Selective,
    /// Replace the oldest units with a generated summary
    Summary,
}

impl StrategyKind {
    /// Configuration name of the strategy
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::First => "first",
            StrategyKind::Last => "last",
            StrategyKind::Selective => "selective",
            StrategyKind::Summary => "summary",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(StrategyKind::First),
            "last" => Ok(StrategyKind::Last),
            "selective" => Ok(StrategyKind::Selective),
            "summary" => Ok(StrategyKind::Summary),
            other => Err(ContextError::Configuration(format!(
                "unknown strategy '{}', expected one of: first, last, selective, summary",
                other
            ))),
        }
    }
}

/// How a result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionPath {
    /// The input already fit the budget and was returned untouched
    Unchanged,
    /// The configured strategy produced the result
    Applied,
    /// Reduction or summarization could not satisfy the budget, whether
    /// through capability failure or because content floors were reached,
    /// and the strategy fell back to elimination
    Fallback,
}

/// A fitted conversation together with its measured token count
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    /// The fitted conversation
    pub messages: Vec<Message>,
    /// Measured token count of `messages`
    pub token_count: usize,
    /// True when no structurally valid result within budget exists, so
    /// `token_count` still exceeds the budget
    pub degraded: bool,
    /// How the result was produced
    pub path: CompressionPath,
}

impl CompressionOutcome {
    pub(crate) fn new(
        messages: Vec<Message>,
        token_count: usize,
        budget: usize,
        path: CompressionPath,
    ) -> Self {
        Self {
            messages,
            token_count,
            degraded: token_count > budget,
            path,
        }
    }

    /// Consume the outcome, keeping only the conversation
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// Context-window limits for a known model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelLimits {
    /// Total context window in tokens
    pub context_window: usize,
    /// Maximum tokens the model will generate
    pub max_output_tokens: usize,
    /// Model identifier
    pub model_name: String,
}

impl Default for ModelLimits {
    fn default() -> Self {
        // Safe floor for unrecognized models
        Self {
            context_window: 4096,
            max_output_tokens: 1024,
            model_name: String::from("unknown"),
        }
    }
}

impl ModelLimits {
    /// Look up limits for a known model, `None` for unrecognized names
    pub fn for_model(model: &str) -> Option<Self> {
        let limits = match model {
            // OpenAI models
            "gpt-4" | "gpt-4-0613" => Self {
                context_window: 8192,
                max_output_tokens: 4096,
                model_name: model.to_string(),
            },
            "gpt-4-turbo" | "gpt-4-turbo-preview" | "gpt-4-turbo-2024-04-09" => Self {
                context_window: 128_000,
                max_output_tokens: 4096,
                model_name: model.to_string(),
            },
            "gpt-4o" | "gpt-4o-2024-05-13" => Self {
                context_window: 128_000,
                max_output_tokens: 4096,
                model_name: model.to_string(),
            },
            "gpt-4o-mini" | "gpt-4o-mini-2024-07-18" => Self {
                context_window: 128_000,
                max_output_tokens: 16_384,
                model_name: model.to_string(),
            },
            "gpt-3.5-turbo" | "gpt-3.5-turbo-0613" => Self {
                context_window: 4096,
                max_output_tokens: 4096,
                model_name: model.to_string(),
            },
            "gpt-3.5-turbo-16k" | "gpt-3.5-turbo-16k-0613" => Self {
                context_window: 16_384,
                max_output_tokens: 4096,
                model_name: model.to_string(),
            },

            // Anthropic models
            "claude-3-opus" | "claude-3-opus-20240229" => Self {
                context_window: 200_000,
                max_output_tokens: 4096,
                model_name: model.to_string(),
            },
            "claude-3-sonnet" | "claude-3-sonnet-20240229" => Self {
                context_window: 200_000,
                max_output_tokens: 4096,
                model_name: model.to_string(),
            },
            "claude-3-haiku" | "claude-3-haiku-20240307" => Self {
                context_window: 200_000,
                max_output_tokens: 4096,
                model_name: model.to_string(),
            },

            _ => return None,
        };

        Some(limits)
    }

    /// Tokens available for the prompt after reserving output room
    pub fn available_tokens(&self, reserve_output: usize) -> usize {
        self.context_window
            .saturating_sub(reserve_output.min(self.max_output_tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape_plain_message() {
        let msg = Message::user("Hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "user", "content": "Hello"})
        );
    }

    #[test]
    fn test_wire_shape_tool_call_round_trip() {
        let raw = serde_json::json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [
                {"id": "call_1", "function": {"name": "get_weather", "arguments": "{}"}}
            ]
        });
        let msg: Message = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, None);
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].function.name, "get_weather");

        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("content").is_none());
        assert!(json.get("tool_call_id").is_none());
    }

    #[test]
    fn test_wire_shape_tool_response() {
        let msg = Message::tool("Sunny", "call_1");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "tool", "content": "Sunny", "tool_call_id": "call_1"})
        );
    }

    #[test]
    fn test_unknown_role_rejected() {
        let raw = serde_json::json!({"role": "developer", "content": "hi"});
        assert!(serde_json::from_value::<Message>(raw).is_err());
    }

    #[test]
    fn test_strategy_kind_parsing() {
        assert_eq!("last".parse::<StrategyKind>().unwrap(), StrategyKind::Last);
        assert_eq!(
            "selective".parse::<StrategyKind>().unwrap(),
            StrategyKind::Selective
        );
        let err = "middle".parse::<StrategyKind>().unwrap_err();
        assert!(err.to_string().contains("middle"));
    }

    #[test]
    fn test_model_limits_lookup_and_reserve() {
        let limits = ModelLimits::for_model("gpt-4").unwrap();
        assert_eq!(limits.context_window, 8192);
        assert_eq!(limits.available_tokens(1000), 7192);
        // A reserve beyond what the model can emit subtracts only
        // max_output_tokens
        assert_eq!(limits.available_tokens(10_000), 4096);

        let mini = ModelLimits::for_model("gpt-4o-mini").unwrap();
        assert_eq!(mini.max_output_tokens, 16_384);

        assert!(ModelLimits::for_model("unknown-model").is_none());
        assert_eq!(ModelLimits::default().context_window, 4096);
    }
}
