//! Codec error types.

use thiserror::Error;

/// Result type alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while translating between the model and wire JSON.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode queue snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed solution message: {0}")]
    Solution(#[source] serde_json::Error),

    #[error("malformed score message: {0}")]
    Score(#[source] serde_json::Error),
}
