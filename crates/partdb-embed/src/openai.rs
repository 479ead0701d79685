//! OpenAI embeddings client.
//!
//! Calls `POST {base_url}/embeddings` with a whole batch per request. The
//! response `data` array carries an `index` per vector; vectors are returned
//! in input order regardless of the order the service sends them in.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{validate_batch, EmbeddingProvider};
use crate::resilience::RateLimiter;

const PROVIDER_NAME: &str = "OpenAI";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Longest input, in characters, sent for a single text.
pub const MAX_INPUT_CHARS: usize = 8191;

/// Upper bound on inputs per request accepted by the embeddings endpoint.
const MAX_INPUTS_PER_REQUEST: usize = 2048;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// OpenAI embeddings provider.
///
/// Holds an HTTP client, the API key, and a rate limiter shared by all
/// requests made through this value.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
    rate_limiter: RateLimiter,
}

impl OpenAiProvider {
    /// Create a client for `model` with a 30 second request timeout.
    ///
    /// Dimensionality defaults to the model's native size; override it with
    /// [`with_dimensions`](Self::with_dimensions).
    pub fn new(api_key: String, model: String) -> ProviderResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("partdb/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        let dimensions = native_dimensions(&model);
        Ok(Self {
            http,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            dimensions,
            rate_limiter: RateLimiter::new(5),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    #[must_use]
    pub fn with_requests_per_second(mut self, requests_per_second: u32) -> Self {
        self.rate_limiter = RateLimiter::new(requests_per_second);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, inputs: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        self.rate_limiter.acquire().await;

        let body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            encoding_format: "float",
            dimensions: supports_dimensions(&self.model).then_some(self.dimensions),
        };

        log::debug!(
            "Requesting {} embeddings from {} ({})",
            inputs.len(),
            PROVIDER_NAME,
            self.model
        );

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }

        let vectors = parse_response(&text)?;
        validate_batch(self, inputs.len(), &vectors)?;
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        let inputs = [prepare_input(text)];
        let mut vectors = self.request(&inputs).await?;
        vectors.pop().ok_or_else(|| ProviderError::CountMismatch {
            provider: PROVIDER_NAME.to_string(),
            expected: 1,
            actual: 0,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_INPUTS_PER_REQUEST) {
            let inputs: Vec<String> = chunk.iter().map(|t| prepare_input(t)).collect();
            vectors.extend(self.request(&inputs).await?);
        }
        Ok(vectors)
    }
}

/// Normalise a text for the embeddings endpoint: newlines become spaces and
/// the result is cut to [`MAX_INPUT_CHARS`] characters.
pub fn prepare_input(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
        .chars()
        .take(MAX_INPUT_CHARS)
        .collect()
}

fn native_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

// Only the text-embedding-3 family accepts a `dimensions` parameter.
fn supports_dimensions(model: &str) -> bool {
    model.starts_with("text-embedding-3")
}

fn parse_response(body: &str) -> ProviderResult<Vec<Vec<f32>>> {
    let response: EmbeddingResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse {
            provider: PROVIDER_NAME.to_string(),
            message: e.to_string(),
        })?;

    let mut data = response.data;
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

fn classify_failure(status: StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized {
            provider: PROVIDER_NAME.to_string(),
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            provider: PROVIDER_NAME.to_string(),
        },
        _ => ProviderError::Http {
            provider: PROVIDER_NAME.to_string(),
            status: status.as_u16(),
            message,
        },
    }
}
