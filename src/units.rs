//! Indivisible-unit partition of a conversation
//!
//! Truncation must never separate an assistant message from its tool
//! responses, so every strategy operates over units rather than raw
//! messages. The partition is computed once per strategy invocation.

use crate::counter::TokenCounter;
use crate::types::{Message, Role};

/// A contiguous, indivisible range of messages: either a single message or
/// an assistant message together with all of its tool responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    start: usize,
    end: usize,
}

impl Unit {
    /// The messages this unit spans
    pub fn slice<'a>(&self, messages: &'a [Message]) -> &'a [Message] {
        &messages[self.start..self.end]
    }

    /// Number of messages in the unit
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the unit spans no messages
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Index of the first message in the unit
    pub fn start(&self) -> usize {
        self.start
    }

    /// Token cost of the unit's messages, excluding conversation overhead
    pub fn cost(&self, messages: &[Message], counter: &dyn TokenCounter) -> usize {
        self.slice(messages)
            .iter()
            .map(|msg| counter.count_message(msg))
            .sum()
    }
}

/// Partition a conversation into indivisible units, preserving order.
///
/// An assistant message emitting N tool calls absorbs the N tool responses
/// that follow it. The input is assumed validated; trailing tool messages
/// beyond N are left as their own units rather than silently merged.
pub fn partition(messages: &[Message]) -> Vec<Unit> {
    let mut units = Vec::new();
    let mut i = 0;

    while i < messages.len() {
        let mut end = i + 1;
        if messages[i].role == Role::Assistant {
            let calls = messages[i].tool_calls.len();
            while end < messages.len() && end - (i + 1) < calls && messages[end].role == Role::Tool
            {
                end += 1;
            }
        }
        units.push(Unit { start: i, end });
        i = end;
    }

    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolCall;

    struct MockCounter;

    impl TokenCounter for MockCounter {
        fn count_text(&self, text: &str) -> usize {
            text.len() / 4
        }

        fn model_context_window(&self) -> usize {
            4096
        }
    }

    #[test]
    fn test_plain_messages_are_single_units() {
        let messages = vec![
            Message::system("sys"),
            Message::user("hi"),
            Message::assistant("hello"),
        ];
        let units = partition(&messages);
        assert_eq!(units.len(), 3);
        assert!(units.iter().all(|u| u.len() == 1));
    }

    #[test]
    fn test_tool_responses_absorbed_into_assistant_unit() {
        let messages = vec![
            Message::user("weather?"),
            Message::assistant_with_tools(
                None,
                vec![
                    ToolCall::new("call_1", "get_weather", "{}"),
                    ToolCall::new("call_2", "get_time", "{}"),
                ],
            ),
            Message::tool("Sunny", "call_1"),
            Message::tool("12:00", "call_2"),
            Message::assistant("Sunny at noon."),
        ];
        let units = partition(&messages);
        assert_eq!(units.len(), 3);
        assert_eq!(units[1].len(), 3);
        assert_eq!(units[1].slice(&messages)[0].role, Role::Assistant);
    }

    #[test]
    fn test_unit_cost_sums_member_messages() {
        let messages = vec![
            Message::assistant_with_tools(None, vec![ToolCall::new("call_1", "lookup", "{}")]),
            Message::tool("a long tool result here", "call_1"),
        ];
        let counter = MockCounter;
        let units = partition(&messages);
        assert_eq!(units.len(), 1);
        assert_eq!(
            units[0].cost(&messages, &counter),
            counter.count_message(&messages[0]) + counter.count_message(&messages[1])
        );
    }

    #[test]
    fn test_empty_conversation_has_no_units() {
        assert!(partition(&[]).is_empty());
    }
}
