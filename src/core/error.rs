use thiserror::Error;

/// Error type returned by a match handler
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while registering participants or running a cycle
#[derive(Debug, Error)]
pub enum MatchError {
    /// Malformed submit/cancel/construction input; nothing was mutated
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A group selector broke the group contract; the cycle was aborted
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("match handler failed: {0}")]
    Handler(#[source] HandlerError),

    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("scheduler requires a tokio runtime")]
    NoRuntime,
}

impl MatchError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn violation(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }
}
