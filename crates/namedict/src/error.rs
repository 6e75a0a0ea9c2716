use dictionary::DictionaryError;

/// Unified error type for the namedict crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Durable key-value store read or write failed.
    #[error("storage error: {0}")]
    Storage(String),
    /// The dictionary bundle could not be loaded.
    #[error("load error: {0}")]
    Load(String),
    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DictionaryError> for CoreError {
    fn from(error: DictionaryError) -> Self {
        CoreError::Load(error.to_string())
    }
}

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;
