use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("invalid input: {0}")]
    Invalid(&'static str),
    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    pub fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        CoreError::Storage(format!("{context}: {err}"))
    }
}
