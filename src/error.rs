//! Error types for the time capsule library.

/// Top-level error type for capsule lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum CapsuleError {
    /// A reveal date string could not be parsed.
    #[error("invalid date format: {0}")]
    InvalidDateFormat(String),

    /// No capsule is stored under the requested id.
    #[error("capsule not found: {0}")]
    CapsuleNotFound(String),

    /// The key-value store rejected a write.
    #[error("store write failed: {0}")]
    StoreWriteFailed(String),

    /// Publisher, messenger or scheduler call failed.
    #[error("host API failed: {0}")]
    HostApiFailed(String),

    /// A reveal instant was not strictly in the future.
    #[error("reveal date must be in the future: {0}")]
    RevealNotInFuture(String),

    /// Draft form input is missing a required field.
    #[error("invalid draft: {0}")]
    InvalidDraft(String),

    /// The capsule is buried and can no longer be edited.
    #[error("capsule is sealed: {0}")]
    CapsuleSealed(String),

    /// A stored record or job payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Job queue error (state persistence, unknown job).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// The session task has stopped and accepts no more actions.
    #[error("session closed")]
    SessionClosed,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CapsuleError {
    /// Failures of a collaborator rather than of user input.
    ///
    /// These route an interactive session to its error page with a retry
    /// affordance; input errors are returned to the caller instead.
    pub fn is_host_failure(&self) -> bool {
        matches!(
            self,
            Self::CapsuleNotFound(_)
                | Self::StoreWriteFailed(_)
                | Self::HostApiFailed(_)
                | Self::Serialization(_)
                | Self::Scheduler(_)
                | Self::Io(_)
        )
    }
}

impl From<serde_json::Error> for CapsuleError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, CapsuleError>;
