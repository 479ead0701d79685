//! Error types for embedding providers and synchronization.

use thiserror::Error;

/// Errors returned by an embedding provider.
///
/// Nothing in this crate retries on these; callers decide whether and when
/// to try again.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider needs an API key and none was configured.
    #[error("no API key configured for {provider}")]
    MissingApiKey { provider: String },

    /// The provider rejected the credentials.
    #[error("authentication rejected by {provider}: {message}")]
    Unauthorized { provider: String, message: String },

    /// The provider returned a rate-limit response.
    #[error("rate limited by {provider}")]
    RateLimited { provider: String },

    /// Any other non-success HTTP status.
    #[error("HTTP {status} from {provider}: {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    /// Transport failure or timeout, propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// A response body could not be parsed.
    #[error("parse error from {provider}: {message}")]
    Parse { provider: String, message: String },

    /// The provider returned a different number of vectors than inputs sent.
    #[error("{provider} returned {actual} embeddings for {expected} inputs")]
    CountMismatch {
        provider: String,
        expected: usize,
        actual: usize,
    },

    /// A returned vector does not have the configured dimensionality.
    #[error("{provider} returned a {actual}-dimensional embedding, expected {expected}")]
    DimensionMismatch {
        provider: String,
        expected: usize,
        actual: usize,
    },
}

impl ProviderError {
    /// Returns `true` when the error is transient and the same request may
    /// succeed later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Request(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Convenience alias for provider results.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Errors that abort an embedding synchronization run.
///
/// Provider failures do not appear here: they are recorded per batch in the
/// [`SyncReport`](crate::sync::SyncReport).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("database error: {0}")]
    Database(#[from] partdb_core::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let rate = ProviderError::RateLimited {
            provider: "OpenAI".to_string(),
        };
        assert!(rate.is_transient());

        let server = ProviderError::Http {
            provider: "OpenAI".to_string(),
            status: 503,
            message: "overloaded".to_string(),
        };
        assert!(server.is_transient());

        let bad_request = ProviderError::Http {
            provider: "OpenAI".to_string(),
            status: 400,
            message: "bad input".to_string(),
        };
        assert!(!bad_request.is_transient());

        let auth = ProviderError::Unauthorized {
            provider: "OpenAI".to_string(),
            message: "invalid key".to_string(),
        };
        assert!(!auth.is_transient());
    }

    #[test]
    fn test_error_messages_name_provider() {
        let err = ProviderError::DimensionMismatch {
            provider: "local".to_string(),
            expected: 384,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "local returned a 3-dimensional embedding, expected 384"
        );
    }
}
