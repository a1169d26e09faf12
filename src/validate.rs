//! Structural validation and normalization of conversations
//!
//! A conversation is valid when optional fields sit on the roles that may
//! carry them and every assistant tool invocation is answered by a
//! contiguous block of matching tool responses. Validation never repairs;
//! broken input is surfaced to the caller.

use std::collections::HashSet;

use crate::error::ContextError;
use crate::types::{Message, Role};

/// Check the structural invariants of a conversation.
///
/// Enforced rules:
/// - `tool_calls` appear only on assistant messages
/// - `tool_call_id` appears on every tool message and nowhere else
/// - tool-call ids within one assistant message are unique
/// - an assistant message with N invocations is followed by exactly the N
///   matching tool responses (any order) before any other message
/// - no tool message answers an id that is not currently pending
pub fn validate(messages: &[Message]) -> Result<(), ContextError> {
    let mut i = 0;
    while i < messages.len() {
        let msg = &messages[i];

        if msg.role != Role::Assistant && !msg.tool_calls.is_empty() {
            return Err(ContextError::Validation(format!(
                "message {}: tool_calls on non-assistant role '{}'",
                i,
                msg.role.as_str()
            )));
        }

        match msg.role {
            Role::Tool => {
                // Paired tool responses are consumed below, so reaching one
                // here means nothing is awaiting it.
                return Err(ContextError::Validation(format!(
                    "message {}: tool response without a pending tool call",
                    i
                )));
            }
            _ if msg.tool_call_id.is_some() => {
                return Err(ContextError::Validation(format!(
                    "message {}: tool_call_id on non-tool role '{}'",
                    i,
                    msg.role.as_str()
                )));
            }
            _ => {}
        }

        if msg.role == Role::Assistant && !msg.tool_calls.is_empty() {
            let mut pending: HashSet<&str> =
                msg.tool_calls.iter().map(|call| call.id.as_str()).collect();
            if pending.len() != msg.tool_calls.len() {
                return Err(ContextError::Validation(format!(
                    "message {}: duplicate tool-call ids",
                    i
                )));
            }

            let mut j = i + 1;
            while !pending.is_empty() {
                let response = messages.get(j).filter(|m| m.role == Role::Tool).ok_or_else(|| {
                    ContextError::Validation(format!(
                        "message {}: {} tool call(s) left unanswered",
                        i,
                        pending.len()
                    ))
                })?;

                if !response.tool_calls.is_empty() {
                    return Err(ContextError::Validation(format!(
                        "message {}: tool_calls on non-assistant role 'tool'",
                        j
                    )));
                }

                let id = response.tool_call_id.as_deref().ok_or_else(|| {
                    ContextError::Validation(format!(
                        "message {}: tool response missing tool_call_id",
                        j
                    ))
                })?;

                if !pending.remove(id) {
                    return Err(ContextError::Validation(format!(
                        "message {}: tool response answers unknown call id '{}'",
                        j, id
                    )));
                }
                j += 1;
            }
            i = j;
        } else {
            i += 1;
        }
    }

    Ok(())
}

/// Canonicalize optional fields so token counting and equality comparisons
/// are stable: empty-string content becomes absent content. Semantic text
/// is never touched.
pub fn normalize(messages: Vec<Message>) -> Vec<Message> {
    messages
        .into_iter()
        .map(|mut msg| {
            if msg.content.as_deref() == Some("") {
                msg.content = None;
            }
            msg
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolCall;

    fn call(id: &str) -> ToolCall {
        ToolCall::new(id, "lookup", "{}")
    }

    #[test]
    fn test_plain_conversation_is_valid() {
        let messages = vec![
            Message::system("You are a helpful assistant."),
            Message::user("Hello!"),
            Message::assistant("Hi there!"),
        ];
        assert!(validate(&messages).is_ok());
    }

    #[test]
    fn test_paired_tool_calls_are_valid() {
        let messages = vec![
            Message::user("What's the weather?"),
            Message::assistant_with_tools(None, vec![call("call_1"), call("call_2")]),
            // Responses may arrive in any order
            Message::tool("22C", "call_2"),
            Message::tool("Sunny", "call_1"),
            Message::assistant("Sunny, 22C."),
        ];
        assert!(validate(&messages).is_ok());
    }

    #[test]
    fn test_orphan_tool_response_rejected() {
        let messages = vec![Message::user("hi"), Message::tool("result", "call_1")];
        let err = validate(&messages).unwrap_err();
        assert!(err.to_string().contains("without a pending tool call"));
    }

    #[test]
    fn test_unanswered_tool_call_rejected() {
        let messages = vec![
            Message::assistant_with_tools(None, vec![call("call_1")]),
            Message::user("never mind"),
        ];
        let err = validate(&messages).unwrap_err();
        assert!(err.to_string().contains("unanswered"));
    }

    #[test]
    fn test_interleaved_message_breaks_pairing() {
        let messages = vec![
            Message::assistant_with_tools(None, vec![call("call_1"), call("call_2")]),
            Message::tool("first", "call_1"),
            Message::user("impatient"),
            Message::tool("second", "call_2"),
        ];
        assert!(validate(&messages).is_err());
    }

    #[test]
    fn test_wrong_call_id_rejected() {
        let messages = vec![
            Message::assistant_with_tools(None, vec![call("call_1")]),
            Message::tool("result", "call_9"),
        ];
        let err = validate(&messages).unwrap_err();
        assert!(err.to_string().contains("call_9"));
    }

    #[test]
    fn test_tool_calls_on_user_rejected() {
        let mut msg = Message::user("hi");
        msg.tool_calls.push(call("call_1"));
        assert!(validate(&[msg]).is_err());
    }

    #[test]
    fn test_tool_call_id_on_assistant_rejected() {
        let mut msg = Message::assistant("hi");
        msg.tool_call_id = Some("call_1".into());
        assert!(validate(&[msg]).is_err());
    }

    #[test]
    fn test_normalize_canonicalizes_empty_content() {
        let messages = normalize(vec![Message::assistant(""), Message::user("hi")]);
        assert_eq!(messages[0].content, None);
        assert_eq!(messages[1].content.as_deref(), Some("hi"));
    }
}
