//! Text generation services (prompt in, text out).

pub mod gemini;
pub mod openai;

use std::time::Duration;

use thiserror::Error;

pub use gemini::GeminiGenerator;
pub use openai::OpenAiGenerator;

/// Failure classes surfaced by generators.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No API key configured.
    #[error("no generation API key configured")]
    MissingCredential,
    /// Non-success HTTP status (quota, auth, server error).
    #[error("generation service returned {status}: {body}")]
    Upstream { status: u16, body: String },
    /// Network, timeout or decoding failure.
    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service answered without any text.
    #[error("generation service returned no text")]
    EmptyResponse,
}

/// Request envelope shared by the generators.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl<'a> GenerationRequest<'a> {
    /// Chat defaults: temperature 0.2, 1024 output tokens.
    pub fn chat(prompt: &'a str) -> Self {
        Self {
            prompt,
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

/// Implemented by concrete generation backends.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// Connection settings for a generator.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeneratorSettings {
    pub fn gemini() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "gemini-2.5-flash".into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn openai() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            timeout: Duration::from_secs(60),
        }
    }
}
