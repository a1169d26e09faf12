//! Selective content compression
//!
//! Shortens message content in place rather than deleting whole turns, for
//! conversations where losing entire messages is undesirable. Falls back to
//! Keep-Last elimination when shortening alone cannot satisfy the budget.

use std::sync::Arc;

use async_trait::async_trait;

use crate::counter::TokenCounter;
use crate::error::ContextError;
use crate::strategies::truncation::keep_last;
use crate::strategies::CompressionStrategy;
use crate::types::{CompressionOutcome, CompressionPath, Message, Role};

/// A text-shortening capability.
///
/// Implementations receive the full content and a token floor and return a
/// shorter but still-sensible rendition. The strategy only orchestrates
/// which messages are eligible; the shortening algorithm lives here.
pub trait ContentReducer: Send + Sync {
    /// Shorten `text` to roughly `target_tokens` tokens
    fn reduce(&self, text: &str, target_tokens: usize) -> Result<String, ContextError>;
}

/// Reducer that keeps the head and tail lines of a text and elides the
/// middle with an omission marker, then trims characters toward the target.
#[derive(Debug, Clone)]
pub struct LineElisionReducer {
    head_lines: usize,
    tail_lines: usize,
}

impl LineElisionReducer {
    /// Keep `head_lines` leading and `tail_lines` trailing lines
    pub fn new(head_lines: usize, tail_lines: usize) -> Self {
        Self {
            head_lines,
            tail_lines,
        }
    }
}

impl Default for LineElisionReducer {
    fn default() -> Self {
        Self::new(3, 3)
    }
}

impl ContentReducer for LineElisionReducer {
    fn reduce(&self, text: &str, target_tokens: usize) -> Result<String, ContextError> {
        let lines: Vec<&str> = text.lines().collect();

        let mut reduced = if lines.len() > self.head_lines + self.tail_lines + 1 {
            let omitted = lines.len() - self.head_lines - self.tail_lines;
            format!(
                "{}\n... ({} lines omitted) ...\n{}",
                lines[..self.head_lines].join("\n"),
                omitted,
                lines[lines.len() - self.tail_lines..].join("\n")
            )
        } else {
            text.to_string()
        };

        // Line elision alone may not reach the floor for single-line text;
        // finish with a character-level trim at ~4 chars per token.
        let target_chars = target_tokens.saturating_mul(4);
        if target_chars > 0 && reduced.chars().count() > target_chars {
            let mut cut: String = reduced.chars().take(target_chars).collect();
            cut.push_str(" ...");
            reduced = cut;
        }

        Ok(reduced)
    }
}

/// Shorten eligible message content toward a floor, then eliminate oldest
/// units if the conversation is still over budget
pub struct SelectiveStrategy {
    reducer: Arc<dyn ContentReducer>,
    preserve_system: bool,
    preserve_recent: usize,
    min_content_tokens: usize,
}

impl SelectiveStrategy {
    /// Create the strategy around a reducer capability
    pub fn new(reducer: Arc<dyn ContentReducer>) -> Self {
        Self {
            reducer,
            preserve_system: true,
            preserve_recent: 2,
            min_content_tokens: 50,
        }
    }

    /// Leave the most recent `count` messages untouched
    pub fn with_preserve_recent(mut self, count: usize) -> Self {
        self.preserve_recent = count;
        self
    }

    /// Floor below which content is not compressed further
    pub fn with_min_content_tokens(mut self, tokens: usize) -> Self {
        self.min_content_tokens = tokens;
        self
    }

    /// Whether a leading system message is exempt from reduction and pinned
    /// during the elimination fallback
    pub fn with_preserve_system(mut self, preserve: bool) -> Self {
        self.preserve_system = preserve;
        self
    }
}

impl Default for SelectiveStrategy {
    fn default() -> Self {
        Self::new(Arc::new(LineElisionReducer::default()))
    }
}

#[async_trait]
impl CompressionStrategy for SelectiveStrategy {
    fn name(&self) -> &'static str {
        "selective"
    }

    async fn compress(
        &self,
        messages: Vec<Message>,
        budget: usize,
        counter: &dyn TokenCounter,
    ) -> Result<CompressionOutcome, ContextError> {
        let mut working = messages;
        let protected_from = working.len().saturating_sub(self.preserve_recent);

        for (index, msg) in working.iter_mut().enumerate() {
            if index >= protected_from {
                continue;
            }
            if self.preserve_system && index == 0 && msg.role == Role::System {
                continue;
            }
            let Some(content) = msg.content.as_deref() else {
                continue;
            };
            let original_tokens = counter.count_text(content);
            if original_tokens <= self.min_content_tokens {
                continue;
            }

            match self.reducer.reduce(content, self.min_content_tokens) {
                Ok(shorter) if counter.count_text(&shorter) < original_tokens => {
                    msg.content = Some(shorter);
                }
                Ok(_) => {}
                Err(err) => {
                    // The elimination fallback below still guarantees the
                    // budget, so a failed reduction is survivable.
                    tracing::warn!(index, error = %err, "content reducer failed, keeping message intact");
                }
            }
        }

        let total = counter.count_messages(&working);
        if total <= budget {
            return Ok(CompressionOutcome::new(
                working,
                total,
                budget,
                CompressionPath::Applied,
            ));
        }

        tracing::debug!(
            tokens = total,
            budget,
            "selective reduction insufficient, eliminating oldest units"
        );
        let mut outcome = keep_last(&working, budget, counter, self.preserve_system, false);
        outcome.path = CompressionPath::Fallback;
        Ok(outcome)
    }
}
