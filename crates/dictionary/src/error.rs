#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, DictionaryError>;

impl From<serde_json::Error> for DictionaryError {
    fn from(error: serde_json::Error) -> Self {
        DictionaryError::Parse(error.to_string())
    }
}
