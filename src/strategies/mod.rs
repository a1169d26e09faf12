//! Compression strategies
//!
//! Each strategy consumes a conversation and a token budget and produces a
//! [`CompressionOutcome`] that satisfies the budget whenever a structurally
//! valid result within it exists. Strategies operate over indivisible units
//! (see [`crate::units`]) so tool-call pairing survives every policy.

mod selective;
mod summary;
mod truncation;

pub use selective::{ContentReducer, LineElisionReducer, SelectiveStrategy};
pub use summary::{SummaryStrategy, Summarizer, DEFAULT_SUMMARY_PROMPT, TRANSCRIPT_PLACEHOLDER};
pub use truncation::{KeepFirstStrategy, KeepLastStrategy};

use async_trait::async_trait;

use crate::counter::TokenCounter;
use crate::error::ContextError;
use crate::types::{CompressionOutcome, Message};

/// A policy for fitting a conversation into a token budget
#[async_trait]
pub trait CompressionStrategy: Send + Sync {
    /// Configuration name of the strategy, used in logs and errors
    fn name(&self) -> &'static str;

    /// Produce a conversation whose measured cost is within `budget`, or
    /// the best attainable degraded result when none exists.
    async fn compress(
        &self,
        messages: Vec<Message>,
        budget: usize,
        counter: &dyn TokenCounter,
    ) -> Result<CompressionOutcome, ContextError>;
}
