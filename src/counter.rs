//! Token counting for chat-formatted conversations

use std::sync::Arc;

use tiktoken_rs::CoreBPE;

use crate::error::ContextError;
use crate::types::{Message, ModelLimits};

/// Counts tokens the way a chat-formatted model bills them.
///
/// Implementors supply raw text encoding; the provided methods add the
/// per-message overhead (role marker, separators, name field) and the fixed
/// per-conversation overhead on top, so `count_messages(&[])` equals the
/// conversation constant and the count grows monotonically with appends.
pub trait TokenCounter: Send + Sync {
    /// Count tokens in a piece of raw text
    fn count_text(&self, text: &str) -> usize;

    /// Fixed overhead charged per message (role markers, separators)
    fn message_overhead(&self) -> usize {
        4
    }

    /// Fixed overhead charged once per conversation (reply priming)
    fn conversation_overhead(&self) -> usize {
        3
    }

    /// Count one message including its structural overhead
    fn count_message(&self, message: &Message) -> usize {
        let mut tokens = self.count_text(message.role.as_str());

        if let Some(text) = message.content.as_deref() {
            tokens += self.count_text(text);
        }

        if let Some(name) = &message.name {
            tokens += self.count_text(name);
        }

        for call in &message.tool_calls {
            tokens += self.count_text(&call.id);
            tokens += self.count_text(&call.function.name);
            tokens += self.count_text(&call.function.arguments);
        }

        tokens + self.message_overhead()
    }

    /// Count a whole conversation including the per-conversation overhead
    fn count_messages(&self, messages: &[Message]) -> usize {
        self.conversation_overhead()
            + messages
                .iter()
                .map(|msg| self.count_message(msg))
                .sum::<usize>()
    }

    /// Context window of the model this counter measures for
    fn model_context_window(&self) -> usize;
}

/// Token counter backed by a tiktoken BPE encoder
pub struct TiktokenCounter {
    encoder: Arc<CoreBPE>,
    model_limits: ModelLimits,
    message_overhead: usize,
    conversation_overhead: usize,
}

impl std::fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenCounter")
            .field("model_limits", &self.model_limits)
            .field("message_overhead", &self.message_overhead)
            .field("conversation_overhead", &self.conversation_overhead)
            .finish_non_exhaustive()
    }
}

impl TiktokenCounter {
    /// Build a counter for a known model.
    ///
    /// Fails naming the model when either the encoder or the context-window
    /// table does not recognize it; use [`Self::for_model_or_default`] to
    /// opt into a fallback encoding instead.
    pub fn for_model(model: &str) -> Result<Self, ContextError> {
        let encoder = tiktoken_rs::get_bpe_from_model(model)
            .map_err(|e| ContextError::UnsupportedModel(format!("{}: {}", model, e)))?;

        let model_limits = ModelLimits::for_model(model)
            .ok_or_else(|| ContextError::UnsupportedModel(model.to_string()))?;

        Ok(Self::with_encoder(encoder, model_limits))
    }

    /// Build a counter for `model`, falling back to the `cl100k_base`
    /// encoding and conservative default limits when the model is unknown.
    pub fn for_model_or_default(model: &str) -> Result<Self, ContextError> {
        match Self::for_model(model) {
            Ok(counter) => Ok(counter),
            Err(_) => {
                tracing::debug!(model, "unknown model, using cl100k_base fallback encoding");
                let encoder =
                    tiktoken_rs::cl100k_base().map_err(|e| ContextError::Capability {
                        capability: "encoder",
                        message: e.to_string(),
                    })?;
                let model_limits = ModelLimits {
                    model_name: model.to_string(),
                    ..ModelLimits::default()
                };
                Ok(Self::with_encoder(encoder, model_limits))
            }
        }
    }

    /// Build a counter from an already-loaded encoder
    pub fn with_encoder(encoder: CoreBPE, model_limits: ModelLimits) -> Self {
        Self {
            encoder: Arc::new(encoder),
            model_limits,
            message_overhead: 4,
            conversation_overhead: 3,
        }
    }

    /// Override the per-message overhead constant
    pub fn with_message_overhead(mut self, tokens: usize) -> Self {
        self.message_overhead = tokens;
        self
    }

    /// Override the per-conversation overhead constant
    pub fn with_conversation_overhead(mut self, tokens: usize) -> Self {
        self.conversation_overhead = tokens;
        self
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_text(&self, text: &str) -> usize {
        self.encoder.encode_ordinary(text).len()
    }

    fn message_overhead(&self) -> usize {
        self.message_overhead
    }

    fn conversation_overhead(&self) -> usize {
        self.conversation_overhead
    }

    fn model_context_window(&self) -> usize {
        self.model_limits.context_window
    }
}

/// Character-ratio token estimator for callers that cannot ship encoder
/// tables. Roughly one token per four characters, rounded up.
#[derive(Debug, Clone)]
pub struct HeuristicCounter {
    chars_per_token: usize,
    context_window: usize,
}

impl HeuristicCounter {
    /// Create an estimator with the 4-chars-per-token heuristic
    pub fn new() -> Self {
        Self {
            chars_per_token: 4,
            context_window: 4096,
        }
    }

    /// Override the assumed context window
    pub fn with_context_window(mut self, tokens: usize) -> Self {
        self.context_window = tokens;
        self
    }
}

impl Default for HeuristicCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter for HeuristicCounter {
    fn count_text(&self, text: &str) -> usize {
        let chars = text.chars().count();
        chars.div_ceil(self.chars_per_token)
    }

    fn model_context_window(&self) -> usize {
        self.context_window
    }
}
