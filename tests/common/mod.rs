#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use portfolio_rag::embedder::{EmbedError, Embedder, EmbeddingBackend};
use portfolio_rag::providers::{GenerationError, GenerationRequest, TextGenerator};
use portfolio_rag::CvRecord;
use serde_json::json;

/// One axis per keyword: a text scores 1.0 on every axis whose keyword it contains.
pub struct KeywordBackend {
    axes: Vec<&'static str>,
}

impl KeywordBackend {
    pub fn new(axes: &[&'static str]) -> Self {
        Self {
            axes: axes.to_vec(),
        }
    }
}

impl EmbeddingBackend for KeywordBackend {
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(inputs
            .iter()
            .map(|input| {
                let text = input.to_lowercase();
                self.axes
                    .iter()
                    .map(|axis| if text.contains(axis) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "keyword-axes"
    }
}

pub fn keyword_embedder(axes: &[&'static str]) -> Arc<Embedder> {
    Arc::new(Embedder::new(
        Box::new(KeywordBackend::new(axes)),
        axes.len(),
        0,
    ))
}

/// Generator returning scripted replies and recording prompts.
pub struct ScriptedGenerator {
    replies: Mutex<Vec<Result<String, GenerationError>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    /// Replies are served in order; once exhausted every call echoes "ok".
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(request.prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn sample_cv() -> CvRecord {
    CvRecord::from_value(json!({
        "name": "Deniz Kaya",
        "title": "Backend Engineer",
        "location": "Istanbul",
        "email": "deniz@example.com",
        "phone": "+90 555 000 0000",
        "profile": "Backend engineer building data-heavy services.",
        "education": [
            {"institution": "Bogazici University", "degree": "BSc Computer Engineering", "years": "2014-2018"},
            {"institution": "METU", "degree": "MSc Data Science", "years": "2018-2020"}
        ],
        "experience": [
            {"title": "Software Engineer", "company": "Acme", "duration": "2020-2023", "description": "Python APIs and ETL pipelines"},
            {"title": "Senior Engineer", "company": "Globex", "duration": "2023-", "description": "Rust services for payments"}
        ],
        "skills": {
            "Backend": ["Go", "Rust"],
            "Data": ["Python", "SQL"]
        },
        "projects": [
            {
                "name": "FinTurk Finansal Asistan",
                "description": "Finance chatbot for Turkish users",
                "technology": ["Python", "FastAPI", "Gemini"],
                "features": ["Portfolio tracking", "News summaries"]
            },
            {
                "name": "Route Planner",
                "description": "Delivery route optimisation",
                "technology": "Rust"
            }
        ],
        "certifications": ["AWS Developer"],
        "links": {"GitHub": "https://github.com/deniz", "LinkedIn": "https://linkedin.com/in/deniz"}
    }))
    .unwrap()
}
