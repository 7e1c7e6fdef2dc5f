use crate::error::EmbedError;
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT: usize = 384;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// An opaque text-to-vector capability. One long-lived instance is
/// constructed at startup and passed to the store and retriever; the same
/// text must always map to the same vector for a given implementation.
pub trait Embedder {
    fn dimensions(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

impl Embedder for Box<dyn Embedder> {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        (**self).embed(text)
    }
}

/// Deterministic offline embedder hashing character trigrams into a
/// unit-normalized vector. No model download, no network; the default
/// backend and the one used in tests.
#[derive(Debug, Clone, Copy)]
pub struct HashingNgramEmbedder {
    pub dimensions: usize,
}

impl Default for HashingNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl Embedder for HashingNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return Ok(vector);
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

        Ok(vector)
    }
}

/// Embedder backed by an OpenAI-style `/embeddings` endpoint.
///
/// Configured entirely from the environment; `from_env` returns `None`
/// when no endpoint is set so callers can fall back to the offline
/// hashing backend.
pub struct HttpEmbedder {
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        let base = endpoint.into();
        let endpoint = if base.ends_with("/embeddings") {
            base
        } else {
            format!("{}/embeddings", base.trim_end_matches('/'))
        };

        Self {
            endpoint,
            api_key,
            model: model.into(),
            dimensions,
            client: Client::new(),
        }
    }

    /// Reads `EMBEDDINGS_API_BASE`, `EMBEDDINGS_MODEL`,
    /// `EMBEDDINGS_DIMENSIONS`, and `LLM_API_KEY`/`OPENAI_API_KEY`.
    pub fn from_env() -> Option<Self> {
        let base = std::env::var("EMBEDDINGS_API_BASE").ok()?;
        let base = base.trim().to_string();
        if base.is_empty() {
            return None;
        }

        let model = std::env::var("EMBEDDINGS_MODEL")
            .unwrap_or_else(|_| "text-embedding-3-small".to_string());
        let dimensions = std::env::var("EMBEDDINGS_DIMENSIONS")
            .ok()
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS);
        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Some(Self::new(base, api_key, model, dimensions))
    }
}

impl Embedder for HttpEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(Duration::from_secs(60))
            .json(&json!({
                "model": self.model,
                "input": text,
            }));

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(EmbedError::BackendResponse(format!(
                "{} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: Value = response.json()?;
        parse_embedding_response(&payload, self.dimensions)
    }
}

fn parse_embedding_response(payload: &Value, expected: usize) -> Result<Vec<f32>, EmbedError> {
    let vector = payload
        .get("data")
        .and_then(|data| data.get(0))
        .and_then(|entry| entry.get("embedding"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            EmbedError::BackendResponse("response has no data[0].embedding array".to_string())
        })?;

    // A width that disagrees with the configured dimensions would poison
    // the cached matrix, so it is rejected here rather than downstream.
    if vector.len() != expected {
        return Err(EmbedError::DimensionMismatch {
            got: vector.len(),
            expected,
        });
    }

    vector
        .iter()
        .map(|value| {
            value
                .as_f64()
                .map(|number| number as f32)
                .ok_or_else(|| EmbedError::BackendResponse("non-numeric embedding value".to_string()))
        })
        .collect()
}
