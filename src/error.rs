use thiserror::Error;

/// Errors surfaced by the context-fitting engine.
///
/// An over-budget result is deliberately *not* an error: strategies return
/// the best attainable conversation and mark it degraded instead (see
/// [`crate::types::CompressionOutcome`]).
#[derive(Error, Debug)]
pub enum ContextError {
    /// The requested model has no known encoder.
    #[error("model not supported: {0}")]
    UnsupportedModel(String),

    /// The conversation is structurally invalid (bad field placement or
    /// broken tool-call pairing). Never auto-repaired.
    #[error("invalid conversation: {0}")]
    Validation(String),

    /// The engine was configured inconsistently.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// An injected capability (encoder, reducer, summarizer) failed and no
    /// fallback path absorbed the failure.
    #[error("{capability} capability failed: {message}")]
    Capability {
        /// Which capability failed.
        capability: &'static str,
        /// What went wrong.
        message: String,
    },
}
