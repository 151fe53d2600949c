//! Command-line and environment configuration shared by the binaries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::assembler::AssemblerConfig;
use crate::credentials::{resolve_api_key, ApiCredential, CredentialSource, DEFAULT_SECRETS_PATH};
use crate::cv::CvRecord;
use crate::embedder::gemini::GeminiEmbedder;
use crate::embedder::openai::OpenAiEmbedder;
use crate::embedder::{Embedder, EmbedderSettings, EmbeddingBackend};
use crate::providers::{GeminiGenerator, GeneratorSettings, OpenAiGenerator, TextGenerator};
use crate::retriever::RetrievalConfig;

/// Embedding and generation service family.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum ProviderKind {
    /// Google Generative Language API (default).
    #[default]
    Gemini,
    /// OpenAI-compatible endpoints.
    Openai,
}

/// Options common to every binary that touches the knowledge base.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// CV JSON document
    #[arg(long, env = "PORTFOLIO_CV", default_value = "data/cv.json")]
    pub cv: PathBuf,

    /// TOML secrets file consulted when no key is in the environment
    #[arg(long, env = "PORTFOLIO_SECRETS", default_value = DEFAULT_SECRETS_PATH)]
    pub secrets: PathBuf,

    /// Embedding and generation provider
    #[arg(long, env = "PORTFOLIO_PROVIDER", value_enum, default_value_t = ProviderKind::Gemini)]
    pub provider: ProviderKind,

    /// OpenAI API key (only read with --provider openai)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Override the provider's API base URL
    #[arg(long, env = "PORTFOLIO_API_BASE")]
    pub api_base: Option<String>,

    /// Override the embedding model
    #[arg(long, env = "PORTFOLIO_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Override the generation model
    #[arg(long, env = "PORTFOLIO_GENERATION_MODEL")]
    pub generation_model: Option<String>,

    /// Embedding vector length
    #[arg(long, env = "PORTFOLIO_EMBEDDING_DIM", default_value_t = crate::embeddings::EMBEDDING_DIM)]
    pub embedding_dim: usize,

    /// Seconds before embedding requests time out
    #[arg(long, env = "PORTFOLIO_EMBED_TIMEOUT_SECS", default_value_t = 30)]
    pub embed_timeout_secs: u64,

    /// Seconds before generation requests time out
    #[arg(long, env = "PORTFOLIO_GENERATE_TIMEOUT_SECS", default_value_t = 60)]
    pub generate_timeout_secs: u64,

    /// Attempts for transient embedding errors
    #[arg(long, env = "PORTFOLIO_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: usize,

    /// Inputs per embedding request
    #[arg(long, env = "PORTFOLIO_EMBED_BATCH", default_value_t = 32)]
    pub batch_size: usize,

    /// Cached query embeddings (0 keeps every query)
    #[arg(long, default_value_t = 0)]
    pub embedding_cache_size: usize,

    /// Fragments retrieved per question
    #[arg(long, default_value_t = 5)]
    pub top_k: usize,

    /// Conversation turns kept in the prompt
    #[arg(long, default_value_t = 6)]
    pub history_turns: usize,

    /// Share of a project's name tokens a question must mention
    #[arg(long, default_value_t = 0.5)]
    pub project_match_ratio: f32,
}

impl ServiceArgs {
    /// Loads and decodes the CV document.
    pub fn load_cv(&self) -> Result<CvRecord> {
        let cv = CvRecord::load(&self.cv)?;
        info!(path = %self.cv.display(), sections = cv.section_names().count(), "loaded CV");
        Ok(cv)
    }

    /// API key for the selected provider, if one is configured.
    pub fn credential(&self) -> Option<ApiCredential> {
        let credential = match self.provider {
            ProviderKind::Gemini => resolve_api_key(&self.secrets),
            ProviderKind::Openai => self
                .openai_api_key
                .as_deref()
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(|key| ApiCredential::new(key, CredentialSource::Env("OPENAI_API_KEY"))),
        };
        if credential.is_none() {
            warn!(
                provider = ?self.provider,
                "no API key configured; using keyword retrieval and fixed replies"
            );
        }
        credential
    }

    pub fn embedder_settings(&self) -> EmbedderSettings {
        let mut settings = match self.provider {
            ProviderKind::Gemini => EmbedderSettings::gemini(),
            ProviderKind::Openai => EmbedderSettings::openai(),
        };
        if let Some(base) = &self.api_base {
            settings.base_url = base.clone();
        }
        if let Some(model) = &self.embedding_model {
            settings.model = model.clone();
        }
        settings.dimension = self.embedding_dim;
        settings.timeout = Duration::from_secs(self.embed_timeout_secs.max(1));
        settings.max_retries = self.max_retries.max(1);
        settings.batch_size = self.batch_size.max(1);
        settings
    }

    pub fn generator_settings(&self) -> GeneratorSettings {
        let mut settings = match self.provider {
            ProviderKind::Gemini => GeneratorSettings::gemini(),
            ProviderKind::Openai => GeneratorSettings::openai(),
        };
        if let Some(base) = &self.api_base {
            settings.base_url = base.clone();
        }
        if let Some(model) = &self.generation_model {
            settings.model = model.clone();
        }
        settings.timeout = Duration::from_secs(self.generate_timeout_secs.max(1));
        settings
    }

    /// Caching embedder; disabled when there is no credential.
    pub fn build_embedder(&self, credential: Option<&ApiCredential>) -> Result<Embedder> {
        let Some(credential) = credential else {
            return Ok(Embedder::disabled(self.embedding_dim));
        };
        let settings = self.embedder_settings();
        let backend: Box<dyn EmbeddingBackend> = match self.provider {
            ProviderKind::Gemini => Box::new(
                GeminiEmbedder::new(credential.expose(), &settings)
                    .context("failed to configure Gemini embedder")?,
            ),
            ProviderKind::Openai => Box::new(
                OpenAiEmbedder::new(credential.expose(), &settings)
                    .context("failed to configure OpenAI embedder")?,
            ),
        };
        info!(model = backend.model_name(), dimension = settings.dimension, "embedding backend ready");
        Ok(Embedder::new(
            backend,
            settings.dimension,
            self.embedding_cache_size,
        ))
    }

    /// Text generator, or `None` without a credential.
    pub fn build_generator(
        &self,
        credential: Option<&ApiCredential>,
    ) -> Result<Option<Arc<dyn TextGenerator>>> {
        let Some(credential) = credential else {
            return Ok(None);
        };
        let settings = self.generator_settings();
        let generator: Arc<dyn TextGenerator> = match self.provider {
            ProviderKind::Gemini => Arc::new(
                GeminiGenerator::new(credential.expose(), &settings)
                    .context("failed to configure Gemini generator")?,
            ),
            ProviderKind::Openai => Arc::new(
                OpenAiGenerator::new(credential.expose(), &settings)
                    .context("failed to configure OpenAI generator")?,
            ),
        };
        Ok(Some(generator))
    }

    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig {
            top_k: self.top_k.max(1),
        }
    }

    pub fn assembler_config(&self) -> AssemblerConfig {
        AssemblerConfig {
            history_turns: self.history_turns,
            project_match_ratio: self.project_match_ratio.clamp(0.0, 1.0),
        }
    }
}

/// Loads `.env` from the working directory, then `frontend/.env`.
///
/// Values already present in the environment are never overwritten.
pub fn load_dotenv() {
    for path in [".env", "frontend/.env"] {
        match dotenvy::from_filename(path) {
            Ok(_) => {}
            Err(err) if err.not_found() => {}
            Err(err) => eprintln!("ignoring {path}: {err}"),
        }
    }
}

/// Installs the fmt subscriber; `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
