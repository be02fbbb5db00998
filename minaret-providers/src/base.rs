//! Base trait for chat model providers

use async_trait::async_trait;
use minaret_core::session::ChatTurn;
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProviderError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Transport failures, timeouts, rate limits and server-side errors
    /// are transient; malformed responses and config problems are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::HttpError(_) | ProviderError::Timeout(_) => true,
            ProviderError::ApiError { status, .. } => {
                matches!(status, 408 | 429) || *status >= 500
            }
            _ => false,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait for chat model providers
///
/// The conversation history is carried by the caller; a provider turns
/// one ordered turn list into the next model reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate the next model reply for the given turn history
    async fn generate(&self, turns: &[ChatTurn]) -> ProviderResult<String>;

    /// The model this provider targets
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::ApiError {
            status: 429,
            message: "rate limited".to_string()
        }
        .is_transient());
        assert!(ProviderError::ApiError {
            status: 503,
            message: "overloaded".to_string()
        }
        .is_transient());
        assert!(!ProviderError::ApiError {
            status: 400,
            message: "bad request".to_string()
        }
        .is_transient());
        assert!(ProviderError::Timeout(60).is_transient());
        assert!(!ProviderError::InvalidResponse("no candidates".to_string()).is_transient());
        assert!(!ProviderError::ConfigError("missing key".to_string()).is_transient());
    }
}
