//! Keep-First and Keep-Last truncation
//!
//! Both strategies keep the longest run of whole units, scanning from the
//! start (Keep-First) or the end (Keep-Last), that fits the budget. The
//! Keep-Last scan doubles as the elimination fallback for the selective and
//! summary strategies.

use async_trait::async_trait;

use crate::counter::TokenCounter;
use crate::error::ContextError;
use crate::strategies::CompressionStrategy;
use crate::types::{CompressionOutcome, CompressionPath, Message, Role};
use crate::units::partition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Keep the longest suffix of whole units that fits the budget
#[derive(Debug, Clone)]
pub struct KeepLastStrategy {
    preserve_system: bool,
    allow_oversized: bool,
}

impl KeepLastStrategy {
    /// Create the strategy; `preserve_system` pins a leading system message
    pub fn new(preserve_system: bool) -> Self {
        Self {
            preserve_system,
            allow_oversized: false,
        }
    }

    /// When no unit fits at all, return the nearest single unit anyway as a
    /// degraded result instead of dropping everything
    pub fn with_allow_oversized(mut self, allow: bool) -> Self {
        self.allow_oversized = allow;
        self
    }
}

impl Default for KeepLastStrategy {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl CompressionStrategy for KeepLastStrategy {
    fn name(&self) -> &'static str {
        "last"
    }

    async fn compress(
        &self,
        messages: Vec<Message>,
        budget: usize,
        counter: &dyn TokenCounter,
    ) -> Result<CompressionOutcome, ContextError> {
        Ok(keep_last(
            &messages,
            budget,
            counter,
            self.preserve_system,
            self.allow_oversized,
        ))
    }
}

/// Keep the longest prefix of whole units that fits the budget
#[derive(Debug, Clone)]
pub struct KeepFirstStrategy {
    preserve_system: bool,
    allow_oversized: bool,
}

impl KeepFirstStrategy {
    /// Create the strategy; `preserve_system` pins a leading system message
    pub fn new(preserve_system: bool) -> Self {
        Self {
            preserve_system,
            allow_oversized: false,
        }
    }

    /// When no unit fits at all, return the first single unit anyway as a
    /// degraded result instead of dropping everything
    pub fn with_allow_oversized(mut self, allow: bool) -> Self {
        self.allow_oversized = allow;
        self
    }
}

impl Default for KeepFirstStrategy {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl CompressionStrategy for KeepFirstStrategy {
    fn name(&self) -> &'static str {
        "first"
    }

    async fn compress(
        &self,
        messages: Vec<Message>,
        budget: usize,
        counter: &dyn TokenCounter,
    ) -> Result<CompressionOutcome, ContextError> {
        Ok(scan(
            Direction::Forward,
            &messages,
            budget,
            counter,
            self.preserve_system,
            self.allow_oversized,
        ))
    }
}

/// Keep-Last scan over whole units. Shared with the selective and summary
/// strategies as their elimination fallback.
pub(crate) fn keep_last(
    messages: &[Message],
    budget: usize,
    counter: &dyn TokenCounter,
    preserve_system: bool,
    allow_oversized: bool,
) -> CompressionOutcome {
    scan(
        Direction::Backward,
        messages,
        budget,
        counter,
        preserve_system,
        allow_oversized,
    )
}

fn scan(
    direction: Direction,
    messages: &[Message],
    budget: usize,
    counter: &dyn TokenCounter,
    preserve_system: bool,
    allow_oversized: bool,
) -> CompressionOutcome {
    let mut used = counter.count_messages(&[]);

    if messages.is_empty() {
        return CompressionOutcome::new(Vec::new(), used, budget, CompressionPath::Applied);
    }

    let (pinned, rest) = if preserve_system && messages[0].role == Role::System {
        (Some(&messages[0]), &messages[1..])
    } else {
        (None, messages)
    };

    if let Some(pin) = pinned {
        used += counter.count_message(pin);
        if used > budget {
            tracing::warn!(
                tokens = used,
                budget,
                "pinned system message alone exceeds budget"
            );
            return CompressionOutcome::new(
                vec![pin.clone()],
                used,
                budget,
                CompressionPath::Applied,
            );
        }
    }

    let units = partition(rest);
    let mut kept = Vec::with_capacity(units.len());

    let candidates: Box<dyn Iterator<Item = &crate::units::Unit> + '_> = match direction {
        Direction::Forward => Box::new(units.iter()),
        Direction::Backward => Box::new(units.iter().rev()),
    };

    for unit in candidates {
        let cost = unit.cost(rest, counter);
        if used + cost > budget {
            break;
        }
        used += cost;
        kept.push(*unit);
    }

    if kept.is_empty() && allow_oversized {
        let nearest = match direction {
            Direction::Forward => units.first(),
            Direction::Backward => units.last(),
        };
        if let Some(unit) = nearest {
            used += unit.cost(rest, counter);
            kept.push(*unit);
        }
    }

    if direction == Direction::Backward {
        kept.reverse();
    }

    let mut result: Vec<Message> = Vec::with_capacity(messages.len());
    if let Some(pin) = pinned {
        result.push(pin.clone());
    }
    for unit in &kept {
        result.extend_from_slice(unit.slice(rest));
    }

    CompressionOutcome::new(result, used, budget, CompressionPath::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolCall;

    struct FixedCounter;

    impl TokenCounter for FixedCounter {
        fn count_text(&self, _text: &str) -> usize {
            0
        }

        fn count_message(&self, _message: &Message) -> usize {
            10
        }

        fn conversation_overhead(&self) -> usize {
            0
        }

        fn model_context_window(&self) -> usize {
            1000
        }
    }

    fn turns(n: usize) -> Vec<Message> {
        let mut messages = vec![Message::system("sys")];
        for i in 0..n {
            messages.push(Message::user(format!("question {}", i)));
            messages.push(Message::assistant(format!("answer {}", i)));
        }
        messages
    }

    #[tokio::test]
    async fn test_keep_last_keeps_newest_turns() {
        let messages = turns(4); // system + 8 messages, 10 tokens each
        let result = KeepLastStrategy::default()
            .compress(messages.clone(), 50, &FixedCounter)
            .await
            .unwrap();

        // system + last 4 messages fit in 50
        assert_eq!(result.token_count, 50);
        assert!(!result.degraded);
        assert_eq!(result.messages[0], messages[0]);
        assert_eq!(result.messages[1..], messages[5..]);
    }

    #[tokio::test]
    async fn test_keep_first_keeps_oldest_turns() {
        let messages = turns(4);
        let result = KeepFirstStrategy::default()
            .compress(messages.clone(), 50, &FixedCounter)
            .await
            .unwrap();

        assert_eq!(result.messages, messages[..5].to_vec());
        assert!(!result.degraded);
    }

    #[tokio::test]
    async fn test_without_preserve_system_the_system_message_can_drop() {
        let messages = turns(4);
        let result = KeepLastStrategy::new(false)
            .compress(messages.clone(), 30, &FixedCounter)
            .await
            .unwrap();

        assert_eq!(result.messages, messages[6..].to_vec());
        assert!(result.messages.iter().all(|m| m.role != Role::System));
    }

    #[tokio::test]
    async fn test_unit_never_split() {
        let messages = vec![
            Message::system("sys"),
            Message::user("weather?"),
            Message::assistant_with_tools(None, vec![ToolCall::new("call_1", "get_weather", "{}")]),
            Message::tool("Sunny", "call_1"),
        ];
        // Budget fits system + user + one more message, but the
        // assistant+tool unit costs 20 and must stay whole.
        let result = KeepLastStrategy::default()
            .compress(messages.clone(), 35, &FixedCounter)
            .await
            .unwrap();

        assert_eq!(result.messages.len(), 3);
        assert_eq!(result.messages[1], messages[2]);
        assert_eq!(result.messages[2], messages[3]);
        crate::validate::validate(&result.messages).unwrap();
    }

    #[tokio::test]
    async fn test_oversized_system_degrades_to_system_alone() {
        let messages = turns(2);
        let result = KeepLastStrategy::default()
            .compress(messages.clone(), 5, &FixedCounter)
            .await
            .unwrap();

        assert_eq!(result.messages, vec![messages[0].clone()]);
        assert!(result.degraded);
        assert!(result.token_count > 5);
    }

    #[tokio::test]
    async fn test_allow_oversized_returns_nearest_unit() {
        let messages = vec![Message::user("a"), Message::user("b")];
        let strict = KeepLastStrategy::new(false)
            .compress(messages.clone(), 5, &FixedCounter)
            .await
            .unwrap();
        assert!(strict.messages.is_empty());
        assert!(!strict.degraded);

        let lenient = KeepLastStrategy::new(false)
            .with_allow_oversized(true)
            .compress(messages.clone(), 5, &FixedCounter)
            .await
            .unwrap();
        assert_eq!(lenient.messages, vec![messages[1].clone()]);
        assert!(lenient.degraded);
    }

    #[tokio::test]
    async fn test_empty_conversation() {
        let result = KeepFirstStrategy::default()
            .compress(Vec::new(), 100, &FixedCounter)
            .await
            .unwrap();
        assert!(result.messages.is_empty());
        assert!(!result.degraded);
    }
}
