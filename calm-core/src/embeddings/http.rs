//! HTTP-backed embedder client, feature-gated behind `http-embedder`.
//!
//! This is the generic shape of the capability CALM consumes from a real
//! embedding service; it is not itself the production backend (spec.md §1
//! treats the concrete backend as out of scope), just a thin typed client
//! over whatever endpoint a deployment points it at.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::error::{Error, Result};

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// An embedder that calls out to an HTTP embedding service.
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl HttpEmbedder {
    /// Builds a client against `base_url`, requesting `model` and asserting
    /// responses are `dimension`-long.
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            dimension,
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("embedding service returned no vectors".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?;

        let body: EmbedResponse = response
            .error_for_status()
            .map_err(|e| Error::Embedding(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?;

        for vector in &body.embeddings {
            if vector.len() != self.dimension {
                return Err(Error::Embedding(format!(
                    "expected {}-d embedding, got {}",
                    self.dimension,
                    vector.len()
                )));
            }
        }
        Ok(body.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
