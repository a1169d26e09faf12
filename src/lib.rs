//! Fit LLM conversation histories into a fixed token budget.
//!
//! Applications accumulate unbounded chat history but must respect a
//! model's context window. This crate validates a conversation, measures it
//! with a pluggable [`TokenCounter`], and — only when it is over budget —
//! applies a compression strategy: keep the first turns, keep the last
//! turns, shorten message content in place, or replace the oldest turns
//! with a generated summary. Every strategy preserves message order,
//! optional system-message pinning, and tool-call/tool-response pairing.
//!
//! # Example
//!
//! ```no_run
//! use contextfit::{ContextManager, HeuristicCounter, KeepLastStrategy, Message};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), contextfit::ContextError> {
//! let manager = ContextManager::new(Arc::new(HeuristicCounter::new()))
//!     .with_max_tokens(50)
//!     .with_strategy(Arc::new(KeepLastStrategy::default()));
//!
//! let history = vec![
//!     Message::system("You are helpful"),
//!     Message::user("Hi"),
//!     Message::assistant("Hello!"),
//!     Message::user("Tell me about quantum physics"),
//! ];
//!
//! let fitted = manager.compress(history, 0).await?;
//! assert!(fitted.token_count <= 50 || fitted.degraded);
//! # Ok(())
//! # }
//! ```

pub mod counter;
pub mod error;
pub mod manager;
pub mod strategies;
pub mod types;
pub mod units;
pub mod validate;

pub use counter::{HeuristicCounter, TiktokenCounter, TokenCounter};
pub use error::ContextError;
pub use manager::ContextManager;
pub use strategies::{
    CompressionStrategy, ContentReducer, KeepFirstStrategy, KeepLastStrategy, LineElisionReducer,
    SelectiveStrategy, SummaryStrategy, Summarizer, DEFAULT_SUMMARY_PROMPT,
    TRANSCRIPT_PLACEHOLDER,
};
pub use types::{
    CompressionOutcome, CompressionPath, Message, ModelLimits, Role, StrategyKind, ToolCall,
    ToolFunction,
};
