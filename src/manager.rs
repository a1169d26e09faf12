//! Orchestration of validation, measurement, and strategy dispatch

use std::sync::Arc;

use crate::counter::TokenCounter;
use crate::error::ContextError;
use crate::strategies::{
    CompressionStrategy, KeepFirstStrategy, KeepLastStrategy, SelectiveStrategy,
};
use crate::types::{CompressionOutcome, CompressionPath, Message, StrategyKind};
use crate::validate::{normalize, validate};

/// Fits conversations into a model's context window.
///
/// Holds only immutable configuration and `Arc`'d capabilities, so one
/// instance can be shared across concurrent callers without synchronization.
pub struct ContextManager {
    counter: Arc<dyn TokenCounter>,
    strategy: Arc<dyn CompressionStrategy>,
    max_tokens: usize,
}

impl std::fmt::Debug for ContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextManager")
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl ContextManager {
    /// Create a manager with the counter's context window as the ceiling
    /// and Keep-Last as the default strategy
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        let max_tokens = counter.model_context_window();
        Self {
            counter,
            strategy: Arc::new(KeepLastStrategy::default()),
            max_tokens,
        }
    }

    /// Override the token ceiling
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Use a specific strategy instance
    pub fn with_strategy(mut self, strategy: Arc<dyn CompressionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Select a strategy by configuration name.
    ///
    /// Only capability-free kinds can be built this way; `summary` needs a
    /// summarization client and must go through [`Self::with_strategy`].
    pub fn with_strategy_kind(mut self, kind: StrategyKind) -> Result<Self, ContextError> {
        self.strategy = match kind {
            StrategyKind::First => Arc::new(KeepFirstStrategy::default()),
            StrategyKind::Last => Arc::new(KeepLastStrategy::default()),
            StrategyKind::Selective => Arc::new(SelectiveStrategy::default()),
            StrategyKind::Summary => {
                return Err(ContextError::Configuration(
                    "summary strategy requires a summarizer client; \
                     construct a SummaryStrategy and pass it to with_strategy"
                        .into(),
                ))
            }
        };
        Ok(self)
    }

    /// The configured token ceiling
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Fit a conversation into `max_tokens - reserve_tokens`.
    ///
    /// Validates the input, returns it unchanged when it already fits, and
    /// otherwise dispatches to the configured strategy. The strategy output
    /// is re-validated before it is returned; a degraded outcome (budget
    /// unsatisfiable) is reported through the outcome, not as an error.
    pub async fn compress(
        &self,
        messages: Vec<Message>,
        reserve_tokens: usize,
    ) -> Result<CompressionOutcome, ContextError> {
        if reserve_tokens > self.max_tokens {
            return Err(ContextError::Configuration(format!(
                "reserve_tokens {} exceeds max_tokens {}",
                reserve_tokens, self.max_tokens
            )));
        }
        let budget = self.max_tokens - reserve_tokens;

        let messages = normalize(messages);
        validate(&messages)?;

        let total = self.counter.count_messages(&messages);
        if total <= budget {
            return Ok(CompressionOutcome::new(
                messages,
                total,
                budget,
                CompressionPath::Unchanged,
            ));
        }

        tracing::debug!(
            tokens = total,
            budget,
            strategy = self.strategy.name(),
            "conversation exceeds budget, compressing"
        );

        let outcome = self
            .strategy
            .compress(messages, budget, &*self.counter)
            .await?;

        // A strategy must never emit a structurally invalid conversation.
        validate(&outcome.messages).map_err(|err| {
            ContextError::Validation(format!(
                "strategy '{}' produced invalid output: {}",
                self.strategy.name(),
                err
            ))
        })?;

        if outcome.degraded {
            tracing::warn!(
                tokens = outcome.token_count,
                budget,
                "budget unsatisfiable, returning degraded result"
            );
        }

        Ok(outcome)
    }

    /// Measure a conversation without compressing it
    pub fn count_tokens(&self, messages: &[Message]) -> usize {
        self.counter.count_messages(messages)
    }

    /// Whether a conversation fits after reserving response room
    pub fn would_fit(&self, messages: &[Message], reserve_tokens: usize) -> bool {
        self.count_tokens(messages) + reserve_tokens <= self.max_tokens
    }

    /// Tokens left under the ceiling, or `None` when already over it
    pub fn tokens_remaining(&self, messages: &[Message], reserve_tokens: usize) -> Option<usize> {
        let used = self.count_tokens(messages) + reserve_tokens;
        if used <= self.max_tokens {
            Some(self.max_tokens - used)
        } else {
            None
        }
    }
}
