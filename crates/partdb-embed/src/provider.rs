//! The embedding provider capability.

use async_trait::async_trait;

use crate::config::{Config, ProviderKind};
use crate::error::{ProviderError, ProviderResult};
use crate::local::LocalProvider;
use crate::openai::OpenAiProvider;

/// Turns text into fixed-dimension vectors.
///
/// Implementations must be usable from a shared reference across tasks.
/// Every vector a provider returns must have exactly [`dimensions`] entries.
///
/// [`dimensions`]: EmbeddingProvider::dimensions
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Length of every vector this provider produces.
    fn dimensions(&self) -> usize;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>>;

    /// Embed several texts, returning one vector per input in input order.
    ///
    /// The default issues one [`embed`](EmbeddingProvider::embed) call per
    /// text; providers with a batch endpoint override it.
    async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Check that a batch response lines up with its inputs.
///
/// Rejects a wrong vector count or any vector whose length differs from the
/// provider's dimensionality.
pub fn validate_batch(
    provider: &dyn EmbeddingProvider,
    expected: usize,
    vectors: &[Vec<f32>],
) -> ProviderResult<()> {
    if vectors.len() != expected {
        return Err(ProviderError::CountMismatch {
            provider: provider.name().to_string(),
            expected,
            actual: vectors.len(),
        });
    }
    let dimensions = provider.dimensions();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
        return Err(ProviderError::DimensionMismatch {
            provider: provider.name().to_string(),
            expected: dimensions,
            actual: bad.len(),
        });
    }
    Ok(())
}

/// Build the provider selected by the configuration.
///
/// The OpenAI provider requires an API key from config or `OPENAI_API_KEY`.
pub fn from_config(config: &Config) -> ProviderResult<Box<dyn EmbeddingProvider>> {
    match config.provider {
        ProviderKind::Local => Ok(Box::new(LocalProvider::new())),
        ProviderKind::OpenAi => {
            let api_key = config.api_key().ok_or_else(|| ProviderError::MissingApiKey {
                provider: "OpenAI".to_string(),
            })?;
            let provider = OpenAiProvider::new(api_key, config.embedding_model.clone())?
                .with_base_url(config.openai_base_url.clone())
                .with_dimensions(config.embedding_dimensions)
                .with_requests_per_second(config.requests_per_second);
            Ok(Box::new(provider))
        }
    }
}
