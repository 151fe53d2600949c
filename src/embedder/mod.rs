//! Text-to-vector embedding: provider backends plus a caching front.

pub mod gemini;
pub mod openai;

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use lru::LruCache;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};

use crate::embeddings::{EmbeddingVector, EMBEDDING_DIM};

/// Failure classes surfaced by embedding backends.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// No API key was configured, so semantic search is off.
    #[error("no embedding API key configured")]
    MissingCredential,
    /// The service answered with a non-success status.
    #[error("embedding service returned {status}: {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
    /// Network, timeout or decoding failure.
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Response parsed but did not contain what was asked for.
    #[error("malformed embedding response: {0}")]
    Malformed(String),
    /// Vector length differs from the index dimension.
    #[error("embedding has {found} dimensions, expected {expected}")]
    Dimension {
        /// Configured dimension.
        expected: usize,
        /// Dimension actually returned.
        found: usize,
    },
}

/// Remote embedding model.
pub trait EmbeddingBackend: Send + Sync {
    /// Embeds a batch; output order matches input order.
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Embeds a single text.
    fn embed(&self, input: &str) -> Result<Vec<f32>, EmbedError> {
        self.embed_batch(&[input])?
            .pop()
            .ok_or_else(|| EmbedError::Malformed("service returned no embedding".into()))
    }

    /// Largest batch accepted per request.
    fn batch_size(&self) -> usize {
        32
    }

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// Connection settings shared by the HTTP backends.
#[derive(Debug, Clone)]
pub struct EmbedderSettings {
    /// API base URL.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Expected vector length.
    pub dimension: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts per request (at least 1).
    pub max_retries: usize,
    /// Inputs per request.
    pub batch_size: usize,
}

impl EmbedderSettings {
    /// Google Generative Language defaults (`embedding-001`, 768 dims).
    pub fn gemini() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "embedding-001".into(),
            dimension: EMBEDDING_DIM,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            batch_size: 32,
        }
    }

    /// OpenAI defaults, truncated to the index dimension.
    pub fn openai() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "text-embedding-3-small".into(),
            dimension: EMBEDDING_DIM,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            batch_size: 32,
        }
    }
}

/// Backoff rules shared by the HTTP backends.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    max_retries: usize,
}

impl RetryPolicy {
    pub(crate) fn new(max_retries: usize) -> Self {
        Self {
            max_retries: max_retries.max(1),
        }
    }

    pub(crate) fn allows(&self, attempt: usize) -> bool {
        attempt + 1 < self.max_retries
    }

    pub(crate) fn should_retry(&self, status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    pub(crate) fn is_retryable_error(&self, err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect() || err.is_body() || err.is_request()
    }

    pub(crate) fn backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        Duration::from_millis(250 * (1 << capped))
    }
}

/// Caching front over an optional backend.
///
/// Without a backend every call fails with [`EmbedError::MissingCredential`],
/// which callers treat as "use the keyword fallback".
pub struct Embedder {
    backend: Option<Box<dyn EmbeddingBackend>>,
    dimension: usize,
    cache: Mutex<LruCache<String, EmbeddingVector>>,
}

impl Embedder {
    /// Wraps a live backend; `cache_capacity == 0` keeps every query for the process lifetime.
    pub fn new(backend: Box<dyn EmbeddingBackend>, dimension: usize, cache_capacity: usize) -> Self {
        Self {
            backend: Some(backend),
            dimension,
            cache: Mutex::new(build_cache(cache_capacity)),
        }
    }

    /// Embedder with no credential: semantic search disabled.
    pub fn disabled(dimension: usize) -> Self {
        Self {
            backend: None,
            dimension,
            cache: Mutex::new(LruCache::unbounded()),
        }
    }

    /// Whether a backend is configured.
    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Vector length every output is checked against.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embeds `text`, reusing a previous result for the exact same string.
    pub fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbedError> {
        if let Some(hit) = self.cached(text) {
            return Ok(hit);
        }
        let backend = self.backend.as_ref().ok_or(EmbedError::MissingCredential)?;
        let raw = backend.embed(text)?;
        let vector = self.validate(raw)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(text.to_string(), vector.clone());
        }
        Ok(vector)
    }

    /// Embeds a user query after lower-casing and trimming it.
    pub fn embed_query(&self, query: &str) -> Result<EmbeddingVector, EmbedError> {
        self.embed(&normalize_query(query))
    }

    /// Embeds every text for index construction; never fails.
    ///
    /// A failed batch is retried item by item, and items that still fail
    /// become zero vectors so the output length always equals `texts.len()`.
    pub fn embed_all(&self, texts: &[&str]) -> Vec<EmbeddingVector> {
        let Some(backend) = &self.backend else {
            return texts
                .iter()
                .map(|_| EmbeddingVector::zeros(self.dimension))
                .collect();
        };

        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(backend.batch_size().max(1)) {
            match backend.embed_batch(batch) {
                Ok(rows) if rows.len() == batch.len() => {
                    for (text, row) in batch.iter().zip(rows) {
                        out.push(self.validate(row).unwrap_or_else(|err| {
                            warn!(error = %err, text = %preview(text), "using zero vector");
                            EmbeddingVector::zeros(self.dimension)
                        }));
                    }
                }
                Ok(rows) => {
                    warn!(
                        expected = batch.len(),
                        returned = rows.len(),
                        "batch size mismatch, embedding one by one"
                    );
                    out.extend(batch.iter().map(|text| self.embed_one_or_zero(backend.as_ref(), text)));
                }
                Err(err) => {
                    warn!(error = %err, "batch embedding failed, embedding one by one");
                    out.extend(batch.iter().map(|text| self.embed_one_or_zero(backend.as_ref(), text)));
                }
            }
        }
        debug!(count = out.len(), model = backend.model_name(), "embedded texts");
        out
    }

    fn embed_one_or_zero(&self, backend: &dyn EmbeddingBackend, text: &str) -> EmbeddingVector {
        backend
            .embed(text)
            .and_then(|raw| self.validate(raw))
            .unwrap_or_else(|err| {
                warn!(error = %err, text = %preview(text), "using zero vector");
                EmbeddingVector::zeros(self.dimension)
            })
    }

    fn cached(&self, text: &str) -> Option<EmbeddingVector> {
        self.cache.lock().ok()?.get(text).cloned()
    }

    fn validate(&self, raw: Vec<f32>) -> Result<EmbeddingVector, EmbedError> {
        if raw.len() != self.dimension {
            return Err(EmbedError::Dimension {
                expected: self.dimension,
                found: raw.len(),
            });
        }
        if raw.iter().any(|value| !value.is_finite()) {
            return Err(EmbedError::Malformed("embedding has non-finite components".into()));
        }
        Ok(EmbeddingVector::new(raw))
    }
}

/// Lower-cases and trims query text; also the cache key.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

fn build_cache(capacity: usize) -> LruCache<String, EmbeddingVector> {
    match NonZeroUsize::new(capacity) {
        Some(capacity) => LruCache::new(capacity),
        None => LruCache::unbounded(),
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        calls: Arc<AtomicUsize>,
        fail_on: Option<&'static str>,
    }

    impl EmbeddingBackend for Counting {
        fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(bad) = self.fail_on {
                if inputs.contains(&bad) {
                    return Err(EmbedError::Malformed("boom".into()));
                }
            }
            Ok(inputs
                .iter()
                .map(|t| match *t {
                    "nan" => vec![f32::NAN, 1.0],
                    _ => vec![t.len() as f32, 1.0],
                })
                .collect())
        }

        fn batch_size(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    fn embedder(fail_on: Option<&'static str>) -> (Embedder, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = Counting {
            calls: calls.clone(),
            fail_on,
        };
        (Embedder::new(Box::new(backend), 2, 0), calls)
    }

    #[test]
    fn repeated_queries_hit_the_cache() {
        let (embedder, calls) = embedder(None);
        let first = embedder.embed_query("  Rust Experience ").unwrap();
        let second = embedder.embed_query("rust experience").unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_finite_output_becomes_zero_row_or_error() {
        let (embedder, _) = embedder(None);
        assert!(matches!(embedder.embed("nan"), Err(EmbedError::Malformed(_))));
        let rows = embedder.embed_all(&["nan", "ok"]);
        assert_eq!(rows[0], EmbeddingVector::zeros(2));
        assert_eq!(rows[1].values(), &[2.0, 1.0]);
    }

    #[test]
    fn failures_are_not_cached() {
        let (embedder, calls) = embedder(Some("bad"));
        assert!(embedder.embed("bad").is_err());
        assert!(embedder.embed("bad").is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn disabled_embedder_reports_missing_credential() {
        let embedder = Embedder::disabled(768);
        assert!(matches!(
            embedder.embed("x"),
            Err(EmbedError::MissingCredential)
        ));
    }

    #[test]
    fn embed_all_keeps_length_under_partial_failure() {
        let (embedder, _) = embedder(Some("bad"));
        let vectors = embedder.embed_all(&["ok", "bad", "fine"]);
        assert_eq!(vectors.len(), 3);
        assert!(!vectors[0].is_degenerate());
        assert!(vectors[1].is_degenerate());
        assert!(!vectors[2].is_degenerate());
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = Counting { calls, fail_on: None };
        let embedder = Embedder::new(Box::new(backend), 768, 0);
        assert!(matches!(
            embedder.embed("x"),
            Err(EmbedError::Dimension { expected: 768, found: 2 })
        ));
        assert!(embedder.embed_all(&["x"])[0].is_degenerate());
    }
}
