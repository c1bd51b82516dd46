//! Transport errors surfaced to the UI.
//!
//! Messages are shown verbatim in the watch-error banner and in drill-down
//! sections, so they stay short and carry no process internals beyond the
//! failing command.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The client binary could not be started.
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    /// The client ran but exited unsuccessfully.
    #[error("{command} failed{}: {stderr}", code.map(|c| format!(" (exit {c})")).unwrap_or_default())]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A response could not be decoded.
    #[error("decode {context}: {message}")]
    Decode { context: String, message: String },

    /// The server ended a watch with an error status (e.g. 410 Gone).
    #[error("watch rejected{}: {message}", code.map(|c| format!(" ({c})")).unwrap_or_default())]
    WatchRejected { code: Option<i64>, message: String },

    /// A bounded call did not finish in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    /// The call was cancelled before it finished.
    #[error("{operation} cancelled")]
    Cancelled { operation: String },

    /// No data source answers for the request (mocks, missing objects).
    #[error("{message}")]
    Unavailable { message: String },
}

impl TransportError {
    pub fn decode(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}
