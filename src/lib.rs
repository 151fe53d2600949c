//! Retrieval-augmented assistant over a single CV document.
//!
//! The CV is split into section-scoped fragments, embedded once, and searched
//! per question; the best fragments ground the prompt sent to a text
//! generator. Cover letters and job compatibility reports reuse the same
//! knowledge base.

pub mod assembler;
pub mod assistant;
pub mod chunker;
pub mod config;
pub mod credentials;
pub mod cv;
pub mod embedder;
pub mod embeddings;
pub mod index;
pub mod knowledge;
pub mod providers;
pub mod retriever;
pub mod server;
pub mod snapshot;
pub mod tools;

pub use assembler::{AssemblerConfig, ChatTurn, ContextAssembler, Language, Role};
pub use assistant::{ChatError, PortfolioAssistant, PreparedPrompt};
pub use chunker::{chunk, Fragment};
pub use config::{ProviderKind, ServiceArgs};
pub use credentials::{resolve_api_key, ApiCredential, CredentialSource};
pub use cv::CvRecord;
pub use embedder::{EmbedError, Embedder, EmbedderSettings, EmbeddingBackend};
pub use embeddings::{cosine, EmbeddingVector, EMBEDDING_DIM};
pub use index::{Index, ScoredRow};
pub use knowledge::KnowledgeBase;
pub use providers::{GenerationError, GenerationRequest, TextGenerator};
pub use retriever::{Retrieval, RetrievalConfig, RetrievalPath, Retriever};
pub use snapshot::{IndexSnapshot, SnapshotError};
pub use tools::{CompatibilityReport, ToolError};
