//! Text embedding.
//!
//! [`Embedder`] is the seam between the pipeline and the embedding backend.
//! Production uses [`GeminiEmbedder`] against the hosted Generative Language
//! API; tests and offline smoke runs use the deterministic
//! [`CharacterNgramEmbedder`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::EmbedError;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Dimension of the hosted `models/embedding-001` vectors.
pub const GEMINI_EMBEDDING_DIMENSIONS: usize = 768;

/// Upstream cap on contents per batchEmbedContents call.
const MAX_BATCH: usize = 100;

const DEFAULT_NGRAM_DIMENSIONS: usize = 128;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    /// Embeds a batch of texts. Vector `i` corresponds to text `i`; the call
    /// either fully succeeds or fails as a whole.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbedError::Service("empty embedding response".to_string()))
    }
}

/// Remote embedder backed by the Generative Language `batchEmbedContents`
/// endpoint.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EmbedError> {
        Self::with_base_url(api_key, model, GEMINI_API_BASE, timeout)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EmbedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| EmbedError::Service(error.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            timeout,
        })
    }

    fn classify(&self, error: reqwest::Error) -> EmbedError {
        if error.is_timeout() {
            EmbedError::Timeout(self.timeout)
        } else {
            EmbedError::Service(error.to_string())
        }
    }

    async fn embed_page(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let requests: Vec<_> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": self.model,
                    "content": { "parts": [{ "text": text }] },
                })
            })
            .collect();

        let response = self
            .client
            .post(format!(
                "{}/{}:batchEmbedContents?key={}",
                self.base_url, self.model, self.api_key
            ))
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(|error| self.classify(error))?;

        if !response.status().is_success() {
            return Err(EmbedError::Service(format!(
                "embedding request returned {}",
                response.status()
            )));
        }

        let parsed: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|error| self.classify(error))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EmbedError::Service(format!(
                "embedding count {} does not match text count {}",
                parsed.embeddings.len(),
                texts.len()
            )));
        }

        Ok(parsed
            .embeddings
            .into_iter()
            .map(|embedding| embedding.values)
            .collect())
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn dimensions(&self) -> usize {
        GEMINI_EMBEDDING_DIMENSIONS
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for page in texts.chunks(MAX_BATCH) {
            vectors.extend(self.embed_page(page).await?);
        }
        Ok(vectors)
    }
}

/// Deterministic local embedder: hashed character trigram counts, normalized
/// to unit length. Good enough for similarity tests without a network.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_NGRAM_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ngram_embedder_is_deterministic() {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder.embed("the statute of limitations");
        let second = embedder.embed("the statute of limitations");
        assert_eq!(first, second);
    }

    #[test]
    fn ngram_embedder_outputs_expected_length() {
        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        assert_eq!(embedder.embed("abc").len(), 32);
        assert_eq!(embedder.dimensions(), 32);
    }

    #[tokio::test]
    async fn batch_order_matches_input_order() {
        let embedder = CharacterNgramEmbedder::default();
        let texts = vec![
            "civil procedure".to_string(),
            "criminal appeal".to_string(),
        ];
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], embedder.embed("civil procedure"));
        assert_eq!(vectors[1], embedder.embed("criminal appeal"));
    }

    #[tokio::test]
    async fn embed_one_uses_the_batch_path() {
        let embedder = CharacterNgramEmbedder::default();
        let single = embedder.embed_one("writ petition").await.unwrap();
        assert_eq!(single, embedder.embed("writ petition"));
    }
}
