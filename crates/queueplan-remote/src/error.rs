//! Remote planner error types.

use queueplan_core::CodecError;
use thiserror::Error;

/// Boxed underlying cause of a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for remote planner operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors that can occur while talking to a remote planner.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// A fetch was attempted before the remote session was started.
    #[error("remote planner not running")]
    NotRunning,

    /// The facade has no validated planner installed.
    #[error("no active remote scheduler")]
    NoActiveScheduler,

    /// The configured base address cannot form a request.
    #[error("malformed address {address:?}: {reason}")]
    MalformedAddress { address: String, reason: String },

    /// The request failed at the network or HTTP level.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A reply arrived but is not shaped like a planner reply.
    #[error("not a valid remote scheduler: {message}")]
    Protocol {
        message: String,
        #[source]
        source: Option<CodecError>,
    },
}

impl RemoteError {
    pub(crate) fn transport(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub(crate) fn transport_msg(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Whether the failure happened before any request could be formed.
    pub fn is_malformed_address(&self) -> bool {
        matches!(self, Self::MalformedAddress { .. })
    }
}

impl From<CodecError> for RemoteError {
    fn from(err: CodecError) -> Self {
        Self::Protocol {
            message: err.to_string(),
            source: Some(err),
        }
    }
}
