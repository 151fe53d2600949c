//! Google Generative Language embedding backend (`embedding-001`).

use std::thread;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{EmbedError, EmbedderSettings, EmbeddingBackend, RetryPolicy};

/// Blocking client for `:batchEmbedContents`.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    endpoint: String,
    model_path: String,
    retry: RetryPolicy,
    batch_size: usize,
}

impl GeminiEmbedder {
    /// Builds a client authenticated with `api_key`.
    pub fn new(api_key: &str, settings: &EmbedderSettings) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Gemini API key");
        anyhow::ensure!(!settings.model.trim().is_empty(), "missing Gemini model name");
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim()).context("invalid Gemini API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Gemini HTTP client")?;
        let model_path = model_path(&settings.model);
        let endpoint = format!(
            "{}/{}:batchEmbedContents",
            settings.base_url.trim_end_matches('/'),
            model_path
        );
        Ok(Self {
            client,
            endpoint,
            model_path,
            retry: RetryPolicy::new(settings.max_retries),
            // the batch endpoint caps requests at 100 entries
            batch_size: settings.batch_size.clamp(1, 100),
        })
    }
}

/// `embedding-001` → `models/embedding-001`; already-qualified names pass through.
pub fn model_path(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

impl EmbeddingBackend for GeminiEmbedder {
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let request = BatchRequest {
            requests: inputs
                .iter()
                .map(|text| EmbedRequest {
                    model: &self.model_path,
                    content: Content {
                        parts: vec![Part { text: *text }],
                    },
                })
                .collect(),
        };

        let mut attempt = 0usize;
        loop {
            match self.client.post(&self.endpoint).json(&request).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: BatchResponse = resp.json()?;
                        if parsed.embeddings.len() != inputs.len() {
                            return Err(EmbedError::Malformed(format!(
                                "{} embeddings for {} inputs",
                                parsed.embeddings.len(),
                                inputs.len()
                            )));
                        }
                        return Ok(parsed.embeddings.into_iter().map(|e| e.values).collect());
                    }
                    let body = resp
                        .text()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if self.retry.should_retry(status) && self.retry.allows(attempt) {
                        attempt += 1;
                        warn!(%status, attempt, "retrying Gemini embeddings request");
                        thread::sleep(self.retry.backoff(attempt));
                        continue;
                    }
                    return Err(EmbedError::Upstream {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(err) => {
                    if self.retry.is_retryable_error(&err) && self.retry.allows(attempt) {
                        attempt += 1;
                        warn!(error = %err, attempt, "retrying Gemini embeddings request");
                        thread::sleep(self.retry.backoff(attempt));
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn model_name(&self) -> &str {
        &self.model_path
    }
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}
