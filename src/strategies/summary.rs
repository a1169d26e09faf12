//! Summarization-based compression
//!
//! Replaces the oldest portion of a long conversation with one synthetic
//! assistant message produced by an injected summarization client, keeping
//! the most recent units verbatim.

use std::sync::Arc;

use async_trait::async_trait;

use crate::counter::TokenCounter;
use crate::error::ContextError;
use crate::strategies::truncation::keep_last;
use crate::strategies::CompressionStrategy;
use crate::types::{CompressionOutcome, CompressionPath, Message, Role};
use crate::units::partition;

/// Placeholder in a summary prompt template that receives the rendered
/// conversation transcript
pub const TRANSCRIPT_PLACEHOLDER: &str = "{conversation}";

/// Default prompt template for conversation summarization
pub const DEFAULT_SUMMARY_PROMPT: &str = "\
The following is the earlier portion of a conversation between a user and \
an assistant. Produce a concise summary that preserves decisions, facts, \
tool results, and open tasks, so the conversation can continue seamlessly \
from the summary.

{conversation}";

/// A remote summarization capability.
///
/// The implementation owns its model and endpoint configuration, along with
/// any timeout or cancellation policy; the strategy hands it one fully
/// rendered prompt per attempt.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce summary text for the rendered prompt
    async fn summarize(&self, prompt: &str) -> Result<String, ContextError>;
}

/// Replace the oldest units with a single generated summary message
pub struct SummaryStrategy {
    summarizer: Arc<dyn Summarizer>,
    preserve_system: bool,
    preserve_recent: usize,
    prompt: String,
}

impl SummaryStrategy {
    /// Create the strategy around a summarization client
    pub fn new(summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            summarizer,
            preserve_system: true,
            preserve_recent: 5,
            prompt: DEFAULT_SUMMARY_PROMPT.to_string(),
        }
    }

    /// Keep the last `count` units verbatim instead of summarizing them
    pub fn with_preserve_recent(mut self, count: usize) -> Self {
        self.preserve_recent = count;
        self
    }

    /// Use a custom prompt template; it should contain the
    /// [`TRANSCRIPT_PLACEHOLDER`] marker
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Whether a leading system message is pinned outside the summarized range
    pub fn with_preserve_system(mut self, preserve: bool) -> Self {
        self.preserve_system = preserve;
        self
    }

    async fn summarize_once(&self, prompt: &str) -> Result<String, ContextError> {
        let text = self.summarizer.summarize(prompt).await?;
        if text.trim().is_empty() {
            return Err(ContextError::Capability {
                capability: "summarizer",
                message: "empty summary returned".into(),
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl CompressionStrategy for SummaryStrategy {
    fn name(&self) -> &'static str {
        "summary"
    }

    async fn compress(
        &self,
        messages: Vec<Message>,
        budget: usize,
        counter: &dyn TokenCounter,
    ) -> Result<CompressionOutcome, ContextError> {
        if messages.is_empty() {
            let used = counter.count_messages(&[]);
            return Ok(CompressionOutcome::new(
                Vec::new(),
                used,
                budget,
                CompressionPath::Applied,
            ));
        }

        let (pinned, rest) = if self.preserve_system && messages[0].role == Role::System {
            (Some(&messages[0]), &messages[1..])
        } else {
            (None, &messages[..])
        };

        let units = partition(rest);
        if units.len() <= self.preserve_recent {
            // Nothing old enough to summarize
            return Ok(keep_last(
                &messages,
                budget,
                counter,
                self.preserve_system,
                false,
            ));
        }

        let tail_from = if self.preserve_recent == 0 {
            rest.len()
        } else {
            units[units.len() - self.preserve_recent].start()
        };
        let (head, tail) = rest.split_at(tail_from);

        let transcript = render_transcript(head);
        let rendered = self.prompt.replace(TRANSCRIPT_PLACEHOLDER, &transcript);

        let summary_text = match self.summarize_once(&rendered).await {
            Ok(text) => text,
            Err(first) => {
                tracing::warn!(error = %first, "summarizer failed, retrying once");
                match self.summarize_once(&rendered).await {
                    Ok(text) => text,
                    Err(second) => {
                        tracing::warn!(
                            error = %second,
                            "summarizer failed twice, falling back to keep-last truncation"
                        );
                        let mut outcome = keep_last(
                            &messages,
                            budget,
                            counter,
                            self.preserve_system,
                            false,
                        );
                        outcome.path = CompressionPath::Fallback;
                        return Ok(outcome);
                    }
                }
            }
        };

        let mut result = Vec::with_capacity(tail.len() + 2);
        if let Some(pin) = pinned {
            result.push(pin.clone());
        }
        result.push(Message::assistant(format!(
            "[Summary of earlier conversation] {}",
            summary_text
        )));
        result.extend_from_slice(tail);

        let total = counter.count_messages(&result);
        if total <= budget {
            return Ok(CompressionOutcome::new(
                result,
                total,
                budget,
                CompressionPath::Applied,
            ));
        }

        // Summary plus tail still over budget: truncate the assembled
        // conversation, oldest units first (the summary drops before the tail).
        tracing::debug!(
            tokens = total,
            budget,
            "summarized conversation still over budget, truncating"
        );
        Ok(keep_last(
            &result,
            budget,
            counter,
            self.preserve_system,
            false,
        ))
    }
}

fn render_transcript(messages: &[Message]) -> String {
    let mut lines = Vec::with_capacity(messages.len());
    for msg in messages {
        let mut line = format!("{}: {}", msg.role.as_str(), msg.content_text());
        for call in &msg.tool_calls {
            line.push_str(&format!(
                " [calls {}({})]",
                call.function.name, call.function.arguments
            ));
        }
        lines.push(line);
    }
    lines.join("\n")
}
