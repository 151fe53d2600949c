//! Prompt assembly: retrieved fragments, direct project matches, recent
//! history and a language-specific instruction block.
//!
//! Assembly never fails. Missing pieces render as empty sections under their
//! usual labels.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::chunker::Fragment;
use crate::cv::{CvRecord, Project};

/// Separator placed between context parts.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Query words that pull the education block into the context.
pub const EDUCATION_KEYWORDS: [&str; 5] =
    ["eğitim", "education", "school", "university", "üniversite"];

/// Reply language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Turkish.
    #[default]
    Tr,
    /// English.
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Self::Tr => "tr",
            Self::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tr" => Ok(Self::Tr),
            "en" => Ok(Self::En),
            other => Err(format!("unsupported language '{other}'; use tr or en")),
        }
    }
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One prior message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Assembly knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblerConfig {
    /// History turns kept in the prompt.
    pub history_turns: usize,
    /// Share of a project's name tokens that must occur in the query.
    pub project_match_ratio: f32,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            history_turns: 6,
            project_match_ratio: 0.5,
        }
    }
}

struct Labels {
    context: &'static str,
    question: &'static str,
    history: &'static str,
    matched_projects: &'static str,
    education: &'static str,
    project_name: &'static str,
    technologies: &'static str,
    description: &'static str,
    features: &'static str,
}

const TR_LABELS: Labels = Labels {
    context: "CV Bağlamı",
    question: "Kullanıcı Sorusu",
    history: "Son sohbet geçmişi (referans için)",
    matched_projects: "Eşleşen Projeler",
    education: "Eğitim Bilgileri",
    project_name: "Proje Adı",
    technologies: "Teknolojiler",
    description: "Açıklama",
    features: "Özellikler",
};

const EN_LABELS: Labels = Labels {
    context: "CV Context",
    question: "User Question",
    history: "Recent conversation (for reference)",
    matched_projects: "Matched Projects",
    education: "Education Details",
    project_name: "Project Name",
    technologies: "Technologies",
    description: "Description",
    features: "Features",
};

fn labels(lang: Language) -> &'static Labels {
    match lang {
        Language::Tr => &TR_LABELS,
        Language::En => &EN_LABELS,
    }
}

/// Instruction block fixing persona, reply language and the no-fabrication rule.
pub fn instruction(lang: Language, name: &str) -> String {
    match lang {
        Language::Tr => format!(
            "Sen {name} için çalışan AI portföy asistanısın. Kullanıcının sorularını \
             yalnızca aşağıdaki CV bağlamına dayanarak yanıtla. Sadece Türkçe cevap ver. \
             İngilizce çeviri yapma. Yanıtların kısa, net ve profesyonel olsun. \
             Bağlamda bilgi yoksa bunu açıkça belirt ve uydurma."
        ),
        Language::En => format!(
            "You are the AI portfolio assistant working for {name}. Answer the user's \
             questions using only the CV context below. Answer only in English. \
             Do not provide Turkish translations. Keep answers concise, clear and \
             professional. If the context lacks the answer, say so explicitly and do \
             not make anything up."
        ),
    }
}

/// Builds the final generation prompt.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    config: AssemblerConfig,
}

impl ContextAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Renders instruction, context, question and recent history, in that order.
    pub fn assemble(
        &self,
        query: &str,
        history: &[ChatTurn],
        retrieved: &[Fragment],
        cv: &CvRecord,
        lang: Language,
    ) -> String {
        let labels = labels(lang);
        let context = self.build_context(query, retrieved, cv, lang);
        let history = self.render_history(history);
        format!(
            "{instruction}\n\n{context_label}:\n{context}\n\n{question_label}:\n{query}\n\n{history_label}:\n{history}",
            instruction = instruction(lang, cv.display_name()),
            context_label = labels.context,
            question_label = labels.question,
            history_label = labels.history,
        )
    }

    /// Retrieved fragments plus rule-based augmentations, joined by [`CONTEXT_SEPARATOR`].
    pub fn build_context(
        &self,
        query: &str,
        retrieved: &[Fragment],
        cv: &CvRecord,
        lang: Language,
    ) -> String {
        let labels = labels(lang);
        let mut parts: Vec<String> = retrieved
            .iter()
            .map(|fragment| fragment.text().to_string())
            .collect();

        let matched = self.matched_projects(query, cv);
        if !matched.is_empty() {
            let blocks: Vec<String> = matched
                .iter()
                .map(|project| project_block(project, labels))
                .collect();
            parts.push(format!(
                "{}:\n{}",
                labels.matched_projects,
                blocks.join(CONTEXT_SEPARATOR)
            ));
        }

        if mentions_education(query) && !cv.education.is_empty() {
            let lines: Vec<String> = cv
                .education
                .iter()
                .map(|entry| {
                    format!("- {} - {} ({})", entry.institution, entry.degree, entry.years)
                })
                .collect();
            parts.push(format!("{}:\n{}", labels.education, lines.join("\n")));
        }

        parts.join(CONTEXT_SEPARATOR)
    }

    /// Projects named directly in `query`.
    ///
    /// A project matches when its whole name occurs in the query, or when
    /// enough of its name tokens (longer than two characters) do.
    pub fn matched_projects<'cv>(&self, query: &str, cv: &'cv CvRecord) -> Vec<&'cv Project> {
        let query = query.to_lowercase();
        cv.projects
            .iter()
            .filter(|project| {
                let name = project.name.trim().to_lowercase();
                if name.is_empty() {
                    return false;
                }
                if query.contains(&name) {
                    return true;
                }
                let tokens = name_tokens(&name);
                if tokens.is_empty() {
                    return false;
                }
                let hits = tokens
                    .iter()
                    .filter(|token| query.contains(token.as_str()))
                    .count();
                let needed =
                    ((tokens.len() as f32 * self.config.project_match_ratio).floor() as usize).max(1);
                hits >= needed
            })
            .collect()
    }

    fn render_history(&self, history: &[ChatTurn]) -> String {
        let start = history.len().saturating_sub(self.config.history_turns);
        history[start..]
            .iter()
            .map(|turn| format!("{}: {}", turn.role.as_str(), turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn name_tokens(name: &str) -> Vec<String> {
    name.split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| token.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

fn mentions_education(query: &str) -> bool {
    let query = query.to_lowercase();
    EDUCATION_KEYWORDS.iter().any(|keyword| query.contains(keyword))
}

fn project_block(project: &Project, labels: &Labels) -> String {
    format!(
        "{}: {}\n{}: {}\n{}: {}\n{}: {}",
        labels.project_name,
        project.name,
        labels.technologies,
        project.technology,
        labels.description,
        project.description,
        labels.features,
        project.features
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cv() -> CvRecord {
        CvRecord::from_value(json!({
            "name": "Ada Lovelace",
            "education": [{"institution": "ODTÜ", "degree": "BSc", "years": "2015-2019"}],
            "projects": [
                {
                    "name": "FinTurk Finansal Asistan",
                    "description": "Financial assistant",
                    "technology": ["Python", "FastAPI"],
                    "features": "Portfolio tracking"
                },
                {"name": "Weather Bot", "description": "Forecasts"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn exact_project_name_is_matched() {
        let assembler = ContextAssembler::default();
        let prompt = assembler.assemble(
            "Tell me about FinTurk Finansal Asistan",
            &[],
            &[],
            &cv(),
            Language::En,
        );
        assert!(prompt.contains("Matched Projects:"));
        assert!(prompt.contains("Project Name: FinTurk Finansal Asistan"));
        assert!(prompt.contains("Technologies: Python, FastAPI"));
        assert!(!prompt.contains("Weather Bot"));
    }

    #[test]
    fn project_with_null_stack_is_still_matched() {
        let cv = CvRecord::from_value(json!({
            "projects": [{"name": "FinTurk Finansal Asistan", "description": "Finance bot", "technology": null}]
        }))
        .unwrap();
        let prompt = ContextAssembler::default().assemble(
            "FinTurk Finansal Asistan nedir?",
            &[],
            &[],
            &cv,
            Language::En,
        );
        assert!(prompt.contains("Project Name: FinTurk Finansal Asistan"));
        assert!(prompt.contains("Description: Finance bot"));
    }

    #[test]
    fn partial_name_tokens_meet_the_ratio() {
        let assembler = ContextAssembler::default();
        let cv = cv();
        let matched = assembler.matched_projects("what does finturk do?", &cv);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "FinTurk Finansal Asistan");

        let strict = ContextAssembler::new(AssemblerConfig {
            project_match_ratio: 1.0,
            ..AssemblerConfig::default()
        });
        assert!(strict.matched_projects("what does finturk do?", &cv).is_empty());
    }

    #[test]
    fn languages_never_mix() {
        let assembler = ContextAssembler::default();
        let tr = assembler.assemble("merhaba", &[], &[], &cv(), Language::Tr);
        let en = assembler.assemble("hello", &[], &[], &cv(), Language::En);
        assert!(tr.contains("İngilizce çeviri yapma"));
        assert!(!tr.contains("Answer only in English"));
        assert!(en.contains("Do not provide Turkish translations"));
        assert!(!en.contains("Sadece Türkçe"));
    }

    #[test]
    fn sections_appear_in_fixed_order_even_when_empty() {
        let prompt = ContextAssembler::default().assemble(
            "hello",
            &[],
            &[],
            &CvRecord::default(),
            Language::En,
        );
        let context = prompt.find("CV Context:").unwrap();
        let question = prompt.find("User Question:").unwrap();
        let history = prompt.find("Recent conversation (for reference):").unwrap();
        assert!(context < question && question < history);
        assert!(prompt.contains("the candidate"));
    }

    #[test]
    fn history_is_truncated_to_recent_turns() {
        let history: Vec<ChatTurn> = (0..8)
            .map(|i| {
                if i % 2 == 0 {
                    ChatTurn::user(format!("q{i}"))
                } else {
                    ChatTurn::assistant(format!("a{i}"))
                }
            })
            .collect();
        let prompt =
            ContextAssembler::default().assemble("x", &history, &[], &cv(), Language::En);
        assert!(!prompt.contains("user: q0"));
        assert!(!prompt.contains("assistant: a1"));
        assert!(prompt.contains("user: q2"));
        assert!(prompt.contains("assistant: a7"));
    }

    #[test]
    fn education_keywords_add_education_block() {
        let context = ContextAssembler::default().build_context(
            "Eğitim geçmişi nedir?",
            &[Fragment::new("Profile: x")],
            &cv(),
            Language::Tr,
        );
        assert_eq!(
            context,
            "Profile: x\n---\nEğitim Bilgileri:\n- ODTÜ - BSc (2015-2019)"
        );
    }

    #[test]
    fn language_parses_case_insensitively() {
        assert_eq!("EN".parse::<Language>().unwrap(), Language::En);
        assert!("de".parse::<Language>().is_err());
    }
}
