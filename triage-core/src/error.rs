use thiserror::Error;

pub type Result<T> = std::result::Result<T, TriageError>;

/// Failure kinds a triage request can end with. No partial results exist:
/// any of these aborts the whole request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TriageError {
    /// Caller error, such as empty alert text.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The inference backend could not be reached or returned an unusable payload.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Live mode is wired without a usable credential.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl TriageError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }
}
