use thiserror::Error;

#[derive(Debug, Error)]
pub enum TryOnError {
    #[error("Fetch error: {0}")]
    FetchError(String),
    #[error("{provider} generation error: {cause}")]
    GenerationError { provider: String, cause: String },
    #[error("{provider} request timed out after {seconds}s")]
    TimeoutError { provider: String, seconds: u64 },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl TryOnError {
    pub fn generation(provider: impl Into<String>, cause: impl Into<String>) -> Self {
        TryOnError::GenerationError {
            provider: provider.into(),
            cause: cause.into(),
        }
    }

    /// Short machine-readable tag, used in proxy failure details.
    pub fn kind(&self) -> &'static str {
        match self {
            TryOnError::FetchError(_) => "fetch",
            TryOnError::GenerationError { .. } => "generation",
            TryOnError::TimeoutError { .. } => "timeout",
            TryOnError::ConfigError(_) => "config",
            TryOnError::SerializationError(_) => "serialization",
            TryOnError::StorageError(_) => "storage",
            TryOnError::ValidationError(_) => "validation",
        }
    }

    /// Whether the same call may succeed if the user simply tries again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TryOnError::FetchError(_) | TryOnError::TimeoutError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TryOnError>;
