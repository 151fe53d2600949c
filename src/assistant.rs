//! Chat pipeline: retrieve, assemble, generate.

use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tracing::{info, warn};

use crate::assembler::{ChatTurn, ContextAssembler, Language};
use crate::cv::CvRecord;
use crate::knowledge::KnowledgeBase;
use crate::providers::{GenerationError, GenerationRequest, TextGenerator};
use crate::retriever::{Retrieval, RetrievalConfig};
use crate::tools::{CompatibilityAnalyzer, CompatibilityReport, CoverLetterWriter, ReportConfig, ToolError};

/// Request rejected before reaching the core.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("message must not be empty")]
    EmptyMessage,
}

/// Reply shown when no generation credential is configured.
pub fn unavailable_reply(lang: Language) -> &'static str {
    match lang {
        Language::Tr => "⚠️ AI API anahtarı bulunamadı (GEMINI_API_KEY / GOOGLE_API_KEY).",
        Language::En => "⚠️ AI API key not found (GEMINI_API_KEY / GOOGLE_API_KEY).",
    }
}

/// Reply shown when the generation call fails.
pub fn failed_reply(lang: Language) -> &'static str {
    match lang {
        Language::Tr => "⚠️ AI yanıtı alınamadı. Lütfen daha sonra tekrar deneyin.",
        Language::En => "⚠️ Could not get a reply from the AI service. Please try again later.",
    }
}

/// Retrieval result plus the prompt built from it.
#[derive(Debug, Clone)]
pub struct PreparedPrompt {
    pub retrieval: Retrieval,
    pub prompt: String,
}

/// Shared chat service.
///
/// The knowledge base sits behind a swap-on-refresh lock; requests clone the
/// current `Arc` and keep using it even if a refresh lands mid-request.
pub struct PortfolioAssistant {
    knowledge: RwLock<Arc<KnowledgeBase>>,
    generator: Option<Arc<dyn TextGenerator>>,
    retrieval: RetrievalConfig,
    assembler: ContextAssembler,
    report: ReportConfig,
}

impl PortfolioAssistant {
    pub fn new(
        knowledge: KnowledgeBase,
        generator: Option<Arc<dyn TextGenerator>>,
        retrieval: RetrievalConfig,
        assembler: ContextAssembler,
    ) -> Self {
        Self {
            knowledge: RwLock::new(Arc::new(knowledge)),
            generator,
            retrieval,
            assembler,
            report: ReportConfig::default(),
        }
    }

    pub fn with_report_config(mut self, report: ReportConfig) -> Self {
        self.report = report;
        self
    }

    /// Current knowledge base.
    pub fn knowledge(&self) -> Arc<KnowledgeBase> {
        self.knowledge
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the knowledge base with one built from `cv`.
    pub fn refresh(&self, cv: CvRecord) {
        let embedder = self.knowledge().shared_embedder();
        let next = Arc::new(KnowledgeBase::new(cv, embedder));
        *self
            .knowledge
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
        info!("knowledge base refreshed");
    }

    pub fn generator(&self) -> Option<&Arc<dyn TextGenerator>> {
        self.generator.as_ref()
    }

    pub fn retrieval_config(&self) -> RetrievalConfig {
        self.retrieval
    }

    /// Retrieves context for `message` and renders the prompt.
    pub fn prepare(
        &self,
        message: &str,
        history: &[ChatTurn],
        lang: Language,
    ) -> Result<PreparedPrompt, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let knowledge = self.knowledge();
        let retrieval = knowledge.search(message, self.retrieval.top_k);
        let prompt = self.assembler.assemble(
            message,
            history,
            &retrieval.fragments,
            knowledge.cv(),
            lang,
        );
        Ok(PreparedPrompt { retrieval, prompt })
    }

    /// Answers `message`; generation problems become a fixed reply, never an error.
    pub fn chat(
        &self,
        message: &str,
        history: &[ChatTurn],
        lang: Language,
    ) -> Result<String, ChatError> {
        let prepared = self.prepare(message, history, lang)?;
        Ok(self.generate_reply(&prepared.prompt, lang))
    }

    /// Cover letter for `job_description` against the current CV.
    pub fn cover_letter(
        &self,
        job_description: &str,
        company: Option<&str>,
        lang: Language,
    ) -> Result<String, ToolError> {
        let knowledge = self.knowledge();
        CoverLetterWriter::new(&knowledge, self.generator.as_deref())
            .with_top_k(self.retrieval.top_k)
            .write(job_description, company, lang)
    }

    /// Compatibility report for `job_description` against the current CV.
    pub fn compatibility(
        &self,
        job_description: &str,
        company: Option<&str>,
        lang: Language,
    ) -> Result<CompatibilityReport, ToolError> {
        let knowledge = self.knowledge();
        CompatibilityAnalyzer::new(&knowledge, self.generator.as_deref())
            .with_config(self.report)
            .analyze(job_description, company, lang)
    }

    /// Sends an assembled prompt to the generator, mapping failures to fixed replies.
    pub fn generate_reply(&self, prompt: &str, lang: Language) -> String {
        let Some(generator) = &self.generator else {
            warn!("no generation credential, returning fixed reply");
            return unavailable_reply(lang).to_string();
        };
        match generator.generate(&GenerationRequest::chat(prompt)) {
            Ok(reply) => reply.trim().to_string(),
            Err(GenerationError::MissingCredential) => unavailable_reply(lang).to_string(),
            Err(err) => {
                warn!(error = %err, model = generator.model_name(), "generation failed");
                failed_reply(lang).to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::Embedder;
    use serde_json::json;
    use std::sync::Mutex;

    struct Recording {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl TextGenerator for Recording {
        fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(request.prompt.to_string());
            if self.fail {
                return Err(GenerationError::Upstream {
                    status: 429,
                    body: "quota".into(),
                });
            }
            Ok("  answer  ".into())
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    fn assistant(generator: Option<Arc<dyn TextGenerator>>) -> PortfolioAssistant {
        let cv = CvRecord::from_value(json!({"name": "Ada", "profile": "Rust engineer"})).unwrap();
        PortfolioAssistant::new(
            KnowledgeBase::new(cv, Arc::new(Embedder::disabled(4))),
            generator,
            RetrievalConfig::default(),
            ContextAssembler::default(),
        )
    }

    #[test]
    fn empty_message_is_rejected() {
        assert_eq!(
            assistant(None).chat("   ", &[], Language::En),
            Err(ChatError::EmptyMessage)
        );
    }

    #[test]
    fn missing_generator_gives_fixed_reply() {
        assert_eq!(
            assistant(None).chat("hi", &[], Language::Tr).unwrap(),
            unavailable_reply(Language::Tr)
        );
    }

    #[test]
    fn upstream_failure_gives_fixed_reply() {
        let generator = Arc::new(Recording {
            prompts: Mutex::new(Vec::new()),
            fail: true,
        });
        let reply = assistant(Some(generator as Arc<dyn TextGenerator>))
            .chat("hi", &[], Language::En)
            .unwrap();
        assert_eq!(reply, failed_reply(Language::En));
    }

    #[test]
    fn reply_is_trimmed_and_prompt_carries_context() {
        let generator = Arc::new(Recording {
            prompts: Mutex::new(Vec::new()),
            fail: false,
        });
        let assistant = assistant(Some(generator.clone() as Arc<dyn TextGenerator>));
        assert_eq!(assistant.chat("rust experience", &[], Language::En).unwrap(), "answer");
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("Profile: Rust engineer"));
    }

    #[test]
    fn refresh_swaps_the_knowledge_base() {
        let assistant = assistant(None);
        let before = assistant.knowledge();
        assistant.refresh(CvRecord::from_value(json!({"name": "Grace"})).unwrap());
        assert_eq!(before.cv().display_name(), "Ada");
        assert_eq!(assistant.knowledge().cv().display_name(), "Grace");
    }
}
