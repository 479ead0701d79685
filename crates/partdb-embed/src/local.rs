//! Offline embedder based on harmonic token projection.
//!
//! Each lowercase token is hashed to an integer `n`; for a set of coprime
//! moduli `m` the residue `n mod m` is placed on the unit circle as
//! `(sin, cos)` of `2π r / m`. Token vectors are mean-pooled and
//! L2-normalised. The result captures shared vocabulary, not meaning, but it
//! is deterministic and needs neither a network nor a key.

use std::f64::consts::PI;

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::provider::EmbeddingProvider;

/// Dimensionality of [`LocalProvider`] vectors.
pub const LOCAL_DIMENSIONS: usize = 384;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Deterministic embedding provider that runs in-process.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    moduli: Vec<u64>,
}

impl LocalProvider {
    pub fn new() -> Self {
        Self {
            moduli: first_primes(LOCAL_DIMENSIONS / 2),
        }
    }

    /// Embed synchronously. Text without tokens maps to the zero vector.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut sum = vec![0.0f64; LOCAL_DIMENSIONS];
        if tokens.is_empty() {
            return vec![0.0; LOCAL_DIMENSIONS];
        }

        for token in &tokens {
            let n = token_hash(token);
            for (i, &m) in self.moduli.iter().enumerate() {
                let theta = 2.0 * PI * (n % m) as f64 / m as f64;
                sum[2 * i] += theta.sin();
                sum[2 * i + 1] += theta.cos();
            }
        }

        let count = tokens.len() as f64;
        for value in &mut sum {
            *value /= count;
        }

        let norm = sum.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            sum.iter().map(|x| (x / norm) as f32).collect()
        } else {
            sum.iter().map(|&x| x as f32).collect()
        }
    }
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn dimensions(&self) -> usize {
        LOCAL_DIMENSIONS
    }

    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

// FNV-1a over the token's UTF-8 bytes.
fn token_hash(token: &str) -> u64 {
    token.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

// Distinct primes are pairwise coprime.
fn first_primes(count: usize) -> Vec<u64> {
    let mut primes: Vec<u64> = Vec::with_capacity(count);
    let mut candidate = 2u64;
    while primes.len() < count {
        if primes
            .iter()
            .take_while(|&&p| p * p <= candidate)
            .all(|&p| candidate % p != 0)
        {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_first_primes() {
        assert_eq!(first_primes(6), vec![2, 3, 5, 7, 11, 13]);
        assert_eq!(first_primes(LOCAL_DIMENSIONS / 2).len(), 192);
    }

    #[test]
    fn test_deterministic_and_normalized() {
        let provider = LocalProvider::new();
        let a = provider.embed_text("red resistor 220ohm");
        let b = provider.embed_text("red resistor 220ohm");
        assert_eq!(a, b);
        assert_eq!(a.len(), LOCAL_DIMENSIONS);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_case_and_punctuation_ignored() {
        let provider = LocalProvider::new();
        assert_eq!(
            provider.embed_text("Red, RESISTOR!"),
            provider.embed_text("red resistor")
        );
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let provider = LocalProvider::new();
        let v = provider.embed_text("  --  ");
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_shared_tokens_score_higher() {
        let provider = LocalProvider::new();
        let query = provider.embed_text("blue capacitor");
        let near = provider.embed_text("blue capacitor 10uF");
        let far = provider.embed_text("steel hex bolt m3");
        assert!(cosine(&query, &near) > cosine(&query, &far));
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let provider = LocalProvider::new();
        let texts = vec!["a b".to_string(), "c".to_string()];
        let batch = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(batch[0], provider.embed("a b").await.unwrap());
        assert_eq!(batch[1], provider.embed("c").await.unwrap());
    }
}
