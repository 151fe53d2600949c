//! Cover letter generation grounded on retrieved CV fragments.

use tracing::info;

use super::ToolError;
use crate::assembler::Language;
use crate::knowledge::KnowledgeBase;
use crate::providers::{GenerationRequest, TextGenerator};

/// Query used to pull general CV context for a letter.
pub const CV_QUERY: &str = "özgeçmiş";

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: usize = 2000;

struct Closing {
    thanks: &'static str,
    note: &'static str,
    signature: &'static str,
}

fn closing(lang: Language) -> Closing {
    match lang {
        Language::Tr => Closing {
            thanks: "Zamanınız ve dikkatiniz için teşekkür ederim.",
            note: "Bu mektup, kendi geliştirdiğim AI portföy asistanı tarafından derlenmiştir.",
            signature: "Saygılarımla,",
        },
        Language::En => Closing {
            thanks: "Thank you for your time and consideration.",
            note: "This letter was compiled by my self-developed AI portfolio assistant.",
            signature: "Sincerely,",
        },
    }
}

/// Writes a cover letter for one job description.
pub struct CoverLetterWriter<'a> {
    knowledge: &'a KnowledgeBase,
    generator: Option<&'a dyn TextGenerator>,
    top_k: usize,
}

impl<'a> CoverLetterWriter<'a> {
    pub fn new(knowledge: &'a KnowledgeBase, generator: Option<&'a dyn TextGenerator>) -> Self {
        Self {
            knowledge,
            generator,
            top_k: 5,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Generates the letter and appends the closing note and signature.
    pub fn write(
        &self,
        job_description: &str,
        company: Option<&str>,
        lang: Language,
    ) -> Result<String, ToolError> {
        let job_description = job_description.trim();
        if job_description.is_empty() {
            return Err(ToolError::EmptyJobDescription);
        }
        let generator = self.generator.ok_or(ToolError::MissingCredential)?;
        let cv_text = self.knowledge.search(CV_QUERY, self.top_k).join("\n");
        let prompt = cover_letter_prompt(job_description, &cv_text, company, lang);
        let text = generator.generate(&GenerationRequest {
            prompt: &prompt,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        })?;
        info!(lang = %lang, chars = text.len(), "generated cover letter");
        Ok(finish_letter(
            text.trim(),
            self.knowledge.cv().display_name(),
            lang,
        ))
    }
}

/// Language-specific generation prompt.
pub fn cover_letter_prompt(
    job_description: &str,
    cv_text: &str,
    company: Option<&str>,
    lang: Language,
) -> String {
    let company = company.map(str::trim).filter(|name| !name.is_empty());
    match lang {
        Language::Tr => {
            let company_line = match company {
                Some(name) => format!("Şirket Adı: {name}"),
                None => "# Şirket adını iş ilanından otomatik çıkar.".to_string(),
            };
            format!(
                "Aşağıdaki **iş ilanı** ve **CV** bilgilerini kullanarak; tamamen Türkçe,\n\
                 profesyonel ve özgün bir ön yazı yaz.\n\n\
                 {company_line}\n\n\
                 İş İlanı:\n{job}\n\n\
                 CV Bilgileri:\n{cv}\n\n\
                 # Kurallar\n\
                 - 2000 kelimeyi geçmesin\n\
                 - Köşeli parantezli şablon ifadeler bırakma\n",
                job = job_description,
                cv = cv_text.trim(),
            )
        }
        Language::En => {
            let company_line = match company {
                Some(name) => format!("Company: {name}"),
                None => "# Extract company & position from the job description.".to_string(),
            };
            format!(
                "Using the **job description** and **CV** below, craft a UNIQUE English cover letter.\n\n\
                 {company_line}\n\n\
                 Job Description:\n{job}\n\n\
                 CV Details:\n{cv}\n\n\
                 # Rules\n\
                 - Max 2000 words\n\
                 - Do NOT leave placeholders like [Company]\n",
                job = job_description,
                cv = cv_text.trim(),
            )
        }
    }
}

/// Cuts the letter after the thanks sentence (or keeps it whole) and signs it.
pub fn finish_letter(text: &str, name: &str, lang: Language) -> String {
    let closing = closing(lang);
    let body = match text.find(closing.thanks) {
        Some(at) => &text[..at + closing.thanks.len()],
        None => text,
    };
    format!(
        "{body}\n\n{note}\n\n{signature}\n{name}",
        note = closing.note,
        signature = closing.signature,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_text_after_thanks_is_dropped() {
        let letter = finish_letter(
            "Dear team,\nI am keen. Thank you for your time and consideration. Best, X",
            "Ada",
            Language::En,
        );
        assert_eq!(
            letter,
            "Dear team,\nI am keen. Thank you for your time and consideration.\n\n\
             This letter was compiled by my self-developed AI portfolio assistant.\n\n\
             Sincerely,\nAda"
        );
    }

    #[test]
    fn missing_thanks_keeps_whole_letter() {
        let letter = finish_letter("Merhaba", "Ada", Language::Tr);
        assert!(letter.starts_with("Merhaba\n\nBu mektup"));
        assert!(letter.ends_with("Saygılarımla,\nAda"));
    }

    #[test]
    fn prompt_asks_for_company_extraction_when_absent() {
        let prompt = cover_letter_prompt("Rust dev", "cv", None, Language::En);
        assert!(prompt.contains("# Extract company & position"));
        let prompt = cover_letter_prompt("Rust dev", "cv", Some("Acme"), Language::Tr);
        assert!(prompt.contains("Şirket Adı: Acme"));
    }
}
