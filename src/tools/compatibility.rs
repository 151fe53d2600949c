//! Job-description compatibility analysis and report generation.
//!
//! Pipeline: extract requirements, gather CV context through retrieval,
//! score the match, then write a report. Every generation step has a
//! deterministic fallback, so the only error is an empty job description.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{strip_code_fences, ToolError};
use crate::assembler::Language;
use crate::cv::scalar_to_string;
use crate::knowledge::KnowledgeBase;
use crate::providers::{GenerationRequest, TextGenerator};

/// Broad queries run for every analysis, after the requirement-specific ones.
pub const GENERAL_QUERIES: [&str; 7] = [
    "work experience professional background career",
    "education academic qualification degree university college",
    "technical skills programming languages frameworks tools",
    "projects achievements accomplishments portfolio",
    "certifications training courses learning development",
    "leadership management team collaboration",
    "problem solving analytical thinking creativity",
];

const REQUIRED_ANALYSIS_FIELDS: [&str; 4] = [
    "overall_compatibility_score",
    "skill_analysis",
    "experience_analysis",
    "education_analysis",
];

const DEFAULT_COMPANY: &str = "Unknown Company";
const DEFAULT_SCORE: u8 = 50;

/// Report generation knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportConfig {
    /// Report attempts before the template fallback.
    pub max_retries: usize,
    /// Minimum trimmed report length accepted.
    pub min_report_length: usize,
    /// Section headings that must be present (out of four).
    pub required_sections: usize,
    /// Fragments fetched per search query.
    pub chunks_per_query: usize,
    /// Temperature of the first report attempt; each retry adds 0.1.
    pub base_temperature: f32,
    pub max_output_tokens: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_report_length: 300,
            required_sections: 3,
            chunks_per_query: 4,
            base_temperature: 0.3,
            max_output_tokens: 8000,
        }
    }
}

/// Requirements extracted from a job description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRequirements {
    #[serde(deserialize_with = "lenient_text")]
    pub position_title: String,
    #[serde(deserialize_with = "lenient_list")]
    pub required_skills: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub preferred_skills: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub experience_years: String,
    #[serde(deserialize_with = "lenient_text")]
    pub education_requirements: String,
    #[serde(deserialize_with = "lenient_list")]
    pub key_responsibilities: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub company_info: String,
    #[serde(deserialize_with = "lenient_text")]
    pub location: String,
    #[serde(deserialize_with = "lenient_text")]
    pub industry: String,
    #[serde(deserialize_with = "lenient_list")]
    pub soft_skills: Vec<String>,
}

impl JobRequirements {
    /// Stand-in used when extraction yields no position title.
    pub fn placeholder() -> Self {
        Self {
            position_title: "Position Analysis".into(),
            required_skills: vec!["analysis".into(), "evaluation".into()],
            education_requirements: "As specified in job description".into(),
            ..Self::default()
        }
    }

    /// Retrieval queries derived from the requirements, empty ones removed.
    ///
    /// Long skill and responsibility lists are split into groups so each
    /// query stays focused.
    pub fn search_queries(&self) -> Vec<String> {
        let mut queries = vec![self.position_title.clone()];
        queries.extend(grouped(&self.required_skills, 10, 8));
        queries.extend(grouped(&self.preferred_skills, 8, 6));
        queries.push(self.education_requirements.clone());
        queries.extend(grouped(&self.key_responsibilities, 5, 3));
        if !self.soft_skills.is_empty() {
            queries.push(self.soft_skills.join(" "));
        }
        queries.push(self.industry.clone());
        queries.push(self.company_info.clone());
        queries.retain(|query| !query.trim().is_empty());
        queries
    }
}

fn grouped(items: &[String], single_limit: usize, group: usize) -> Vec<String> {
    if items.is_empty() {
        return Vec::new();
    }
    if items.len() <= single_limit {
        return vec![items.join(" ")];
    }
    items.chunks(group).map(|chunk| chunk.join(" ")).collect()
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_to_string(&other).unwrap_or_default(),
    })
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(&other)
            .filter(|text| !text.trim().is_empty())
            .into_iter()
            .collect(),
    })
}

/// Final analysis result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityReport {
    pub report_text: String,
    pub job_title: String,
    pub company_name: String,
    pub candidate_name: String,
    pub compatibility_score: u8,
    pub skill_match: u8,
    pub experience_match: u8,
    pub language: Language,
    pub is_complete: bool,
    /// True when the template report was used instead of a generated one.
    pub used_fallback: bool,
}

/// Runs the compatibility pipeline against one knowledge base.
pub struct CompatibilityAnalyzer<'a> {
    knowledge: &'a KnowledgeBase,
    generator: Option<&'a dyn TextGenerator>,
    config: ReportConfig,
}

impl<'a> CompatibilityAnalyzer<'a> {
    pub fn new(knowledge: &'a KnowledgeBase, generator: Option<&'a dyn TextGenerator>) -> Self {
        Self {
            knowledge,
            generator,
            config: ReportConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReportConfig) -> Self {
        self.config = config;
        self
    }

    /// Analyzes `job_description`. Fails only when it is empty.
    pub fn analyze(
        &self,
        job_description: &str,
        company_name: Option<&str>,
        lang: Language,
    ) -> Result<CompatibilityReport, ToolError> {
        let job_description = job_description.trim();
        if job_description.is_empty() {
            return Err(ToolError::EmptyJobDescription);
        }
        let company_name = company_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_COMPANY)
            .to_string();

        let mut requirements = self.extract_requirements(job_description);
        if requirements.position_title.trim().is_empty() {
            requirements = JobRequirements::placeholder();
        }
        if requirements.company_info.trim().is_empty() {
            requirements.company_info = company_name.clone();
        }

        let cv_context = self.cv_context(&requirements);
        let analysis = self.score(&requirements, &cv_context);
        let (report_text, used_fallback) =
            self.write_report(&requirements, &analysis, lang, &company_name);
        let is_complete = is_report_complete(&report_text, lang, &self.config);
        info!(
            score = score_at(&analysis, "/overall_compatibility_score"),
            used_fallback, is_complete, "compatibility analysis finished"
        );

        Ok(CompatibilityReport {
            job_title: requirements.position_title,
            company_name,
            candidate_name: self.knowledge.cv().display_name().to_string(),
            compatibility_score: score_at(&analysis, "/overall_compatibility_score"),
            skill_match: score_at(&analysis, "/skill_analysis/required_skills_match"),
            experience_match: score_at(&analysis, "/experience_analysis/experience_quality_score"),
            language: lang,
            is_complete,
            used_fallback,
            report_text,
        })
    }

    /// Asks the generator for structured requirements; defaults on any failure.
    pub fn extract_requirements(&self, job_description: &str) -> JobRequirements {
        let Some(generator) = self.generator else {
            return JobRequirements::default();
        };
        let prompt = requirements_prompt(job_description);
        let request = GenerationRequest {
            prompt: &prompt,
            temperature: 0.1,
            max_tokens: 3000,
        };
        match generator.generate(&request) {
            Ok(text) => serde_json::from_str(strip_code_fences(&text)).unwrap_or_else(|err| {
                warn!(error = %err, "job requirements were not valid JSON");
                JobRequirements::default()
            }),
            Err(err) => {
                warn!(error = %err, "job requirement extraction failed");
                JobRequirements::default()
            }
        }
    }

    /// Unique fragments retrieved for every requirement and general query.
    pub fn cv_context(&self, requirements: &JobRequirements) -> String {
        let mut queries = requirements.search_queries();
        queries.extend(GENERAL_QUERIES.iter().map(|query| query.to_string()));

        let mut seen = HashSet::new();
        let mut chunks = Vec::new();
        for query in &queries {
            for fragment in self
                .knowledge
                .search(query, self.config.chunks_per_query)
                .fragments
            {
                let text = fragment.text().trim().to_string();
                if !text.is_empty() && seen.insert(text.clone()) {
                    chunks.push(text);
                }
            }
        }
        debug!(queries = queries.len(), chunks = chunks.len(), "collected CV context");
        if chunks.is_empty() {
            return self.knowledge.cv().to_plain_text();
        }
        chunks.join("\n\n---\n\n")
    }

    /// Generator-scored analysis, or the keyword-overlap fallback.
    pub fn score(&self, requirements: &JobRequirements, cv_context: &str) -> Value {
        let Some(generator) = self.generator else {
            return fallback_analysis(requirements, cv_context);
        };
        let prompt = analysis_prompt(requirements, cv_context);
        let request = GenerationRequest {
            prompt: &prompt,
            temperature: 0.2,
            max_tokens: self.config.max_output_tokens,
        };
        let parsed = generator
            .generate(&request)
            .map_err(|err| err.to_string())
            .and_then(|text| {
                serde_json::from_str::<Value>(strip_code_fences(&text)).map_err(|err| err.to_string())
            });
        match parsed {
            Ok(analysis)
                if REQUIRED_ANALYSIS_FIELDS
                    .iter()
                    .all(|field| analysis.get(field).is_some()) =>
            {
                analysis
            }
            Ok(_) => {
                warn!("incomplete compatibility analysis, using fallback");
                fallback_analysis(requirements, cv_context)
            }
            Err(err) => {
                warn!(error = %err, "compatibility analysis failed, using fallback");
                fallback_analysis(requirements, cv_context)
            }
        }
    }

    /// Attempt, validate, then accept, retry or fall back to the template.
    fn write_report(
        &self,
        requirements: &JobRequirements,
        analysis: &Value,
        lang: Language,
        company_name: &str,
    ) -> (String, bool) {
        let candidate = self.knowledge.cv().display_name();
        if let Some(generator) = self.generator {
            let base_prompt = report_prompt(requirements, analysis, lang, company_name, candidate);
            for attempt in 0..self.config.max_retries.max(1) {
                let mut prompt = base_prompt.clone();
                if attempt > 0 {
                    prompt.push_str(completion_instruction(lang));
                }
                let request = GenerationRequest {
                    prompt: &prompt,
                    temperature: self.config.base_temperature + attempt as f32 * 0.1,
                    max_tokens: self.config.max_output_tokens,
                };
                match generator.generate(&request) {
                    Ok(text) if is_report_complete(&text, lang, &self.config) => {
                        return (text, false);
                    }
                    Ok(_) => warn!(attempt = attempt + 1, "report looks incomplete, retrying"),
                    Err(err) => warn!(attempt = attempt + 1, error = %err, "report attempt failed"),
                }
            }
        }
        info!("using template compatibility report");
        (
            fallback_report(requirements, analysis, lang, company_name),
            true,
        )
    }
}

/// Section names checked by [`is_report_complete`].
pub fn report_sections(lang: Language) -> [&'static str; 4] {
    match lang {
        Language::Tr => ["genel değerlendirme", "teknik beceriler", "deneyim", "öneri"],
        Language::En => [
            "executive summary",
            "technical skills",
            "experience",
            "recommendation",
        ],
    }
}

/// Long enough and covers enough of the expected sections.
pub fn is_report_complete(report: &str, lang: Language, config: &ReportConfig) -> bool {
    let report = report.trim();
    if report.chars().count() < config.min_report_length {
        return false;
    }
    let lower = report.to_lowercase();
    let found = report_sections(lang)
        .iter()
        .filter(|section| lower.contains(*section))
        .count();
    found >= config.required_sections
}

/// Keyword-overlap analysis used when the generator cannot score.
pub fn fallback_analysis(requirements: &JobRequirements, cv_context: &str) -> Value {
    let score = overlap_score(requirements, cv_context);
    let required = &requirements.required_skills;
    let preferred = &requirements.preferred_skills;
    let experience_years = if score >= 60 { 2 } else { 0 };
    let background = if score >= 60 {
        "Basic compatibility indicators are positive"
    } else {
        "Some relevant background identified"
    };
    json!({
        "overall_compatibility_score": score,
        "skill_analysis": {
            "required_skills_match": score,
            "matched_required_skills": required.iter().take(3).collect::<Vec<_>>(),
            "missing_required_skills": required.iter().skip(3).collect::<Vec<_>>(),
            "preferred_skills_match": score.saturating_sub(20),
            "matched_preferred_skills": preferred.iter().take(2).collect::<Vec<_>>(),
        },
        "experience_analysis": {
            "meets_experience_requirement": score >= 60,
            "relevant_experience_years": experience_years,
            "relevant_experiences": ["Experience evaluation requires detailed analysis"],
            "experience_quality_score": score,
        },
        "education_analysis": {
            "meets_education_requirement": score >= 50,
            "education_relevance_score": score,
            "relevant_education": ["Education details require detailed analysis"],
        },
        "strengths": [
            "Detailed analysis required for comprehensive evaluation",
            background,
        ],
        "weaknesses": ["Detailed analysis needed to identify specific development areas"],
        "recommendations": [
            "Conduct detailed interview to verify compatibility",
            "Review specific technical requirements in detail",
            "Consider practical assessment if analysis scores are promising",
        ],
    })
}

/// Share of title and skill words present in the CV context, clamped to 15..=85.
pub fn overlap_score(requirements: &JobRequirements, cv_context: &str) -> u8 {
    if cv_context.trim().is_empty() {
        return DEFAULT_SCORE;
    }
    let job_text = format!(
        "{} {} {}",
        requirements.position_title,
        requirements.required_skills.join(" "),
        requirements.preferred_skills.join(" ")
    )
    .to_lowercase();
    let job_words: HashSet<&str> = job_text.split_whitespace().collect();
    if job_words.is_empty() {
        return DEFAULT_SCORE;
    }
    let cv_text = cv_context.to_lowercase();
    let cv_words: HashSet<&str> = cv_text.split_whitespace().collect();
    let matched = job_words.intersection(&cv_words).count();
    let ratio = matched as f64 / job_words.len() as f64;
    ((ratio * 100.0) as u8).clamp(15, 85)
}

fn score_at(analysis: &Value, pointer: &str) -> u8 {
    analysis
        .pointer(pointer)
        .and_then(|value| {
            value
                .as_f64()
                .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
        })
        .map(|score| score.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(DEFAULT_SCORE)
}

fn requirements_prompt(job_description: &str) -> String {
    format!(
        "Analyze this job description and extract key information in JSON format:\n\n\
         Job Description:\n{job_description}\n\n\
         Extract and return JSON with these fields:\n\
         - position_title: Job title\n\
         - required_skills: Top 5-8 essential technical skills only\n\
         - preferred_skills: Top 3-5 nice-to-have skills only\n\
         - experience_years: Required years of experience\n\
         - education_requirements: Education requirements\n\
         - key_responsibilities: Top 3-5 main responsibilities only\n\
         - company_info: Company information if mentioned\n\
         - location: Job location if mentioned\n\
         - industry: Industry/domain if identifiable\n\
         - soft_skills: Top 3-5 soft skills only\n\n\
         IMPORTANT:\n\
         - Focus on ESSENTIAL requirements only\n\
         - Limit lists to most important items\n\
         - Return ONLY valid JSON without markdown formatting."
    )
}

fn non_empty_requirements(requirements: &JobRequirements) -> Value {
    let mut value = serde_json::to_value(requirements).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.retain(|_, field| match field {
            Value::String(text) => !text.is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => true,
        });
    }
    value
}

fn analysis_prompt(requirements: &JobRequirements, cv_context: &str) -> String {
    let requirements = serde_json::to_string_pretty(&non_empty_requirements(requirements))
        .unwrap_or_default();
    format!(
        "Analyze compatibility between job requirements and candidate profile:\n\n\
         JOB REQUIREMENTS:\n{requirements}\n\n\
         CANDIDATE PROFILE:\n{cv_context}\n\n\
         Return JSON with this structure:\n\
         {{\n\
         \x20   \"overall_compatibility_score\": <number 0-100>,\n\
         \x20   \"skill_analysis\": {{\n\
         \x20       \"required_skills_match\": <percentage 0-100>,\n\
         \x20       \"matched_required_skills\": [<matched skills>],\n\
         \x20       \"missing_required_skills\": [<missing skills>],\n\
         \x20       \"preferred_skills_match\": <percentage 0-100>,\n\
         \x20       \"matched_preferred_skills\": [<matched preferred skills>]\n\
         \x20   }},\n\
         \x20   \"experience_analysis\": {{\n\
         \x20       \"meets_experience_requirement\": <true/false>,\n\
         \x20       \"relevant_experience_years\": <number>,\n\
         \x20       \"relevant_experiences\": [<top 3 relevant experiences>],\n\
         \x20       \"experience_quality_score\": <0-100>\n\
         \x20   }},\n\
         \x20   \"education_analysis\": {{\n\
         \x20       \"meets_education_requirement\": <true/false>,\n\
         \x20       \"education_relevance_score\": <0-100>,\n\
         \x20       \"relevant_education\": [<relevant education items>]\n\
         \x20   }},\n\
         \x20   \"strengths\": [<top 4-5 strengths for this role>],\n\
         \x20   \"weaknesses\": [<top 2-3 development areas>],\n\
         \x20   \"recommendations\": [<3-4 actionable recommendations>]\n\
         }}\n\n\
         Focus on essential matches and key insights only. Return ONLY valid JSON."
    )
}

fn report_prompt(
    requirements: &JobRequirements,
    analysis: &Value,
    lang: Language,
    company_name: &str,
    candidate: &str,
) -> String {
    let position = if requirements.position_title.is_empty() {
        "Unknown Position"
    } else {
        requirements.position_title.as_str()
    };
    let analysis = serde_json::to_string_pretty(analysis).unwrap_or_default();
    match lang {
        Language::Tr => format!(
            "Bu analiz sonuçlarına göre kapsamlı, profesyonel bir iş uyumluluk raporu oluştur:\n\n\
             ŞİRKET: {company_name}\nPOZİSYON: {position}\nADAY: {candidate}\n\n\
             UYUMLULUK ANALİZİ:\n{analysis}\n\n\
             TÜRKÇE olarak aşağıdaki EXACT formatı kullanarak rapor oluştur:\n\n\
             ## 1. Genel Değerlendirme\n[2-3 cümle özet + skor]\n\n\
             ## 2. Teknik Beceriler\n[eşleşen/eksik beceriler, kısa değerlendirme]\n\n\
             ## 3. Deneyim Uyumu\n[deneyim yeterliliği, ilgili roller]\n\n\
             ## 4. Eğitim Durumu\n[eğitim uygunluğu, kısa değerlendirme]\n\n\
             ## 5. Güçlü Yönler\n[3-4 ana güçlü yön]\n\n\
             ## 6. Gelişim Alanları\n[2-3 gelişim önerisi]\n\n\
             ## 7. Öneri\n[net işe alım önerisi + kısa gerekçe]\n\n\
             KURALLAR:\n\
             - Başlıkları AYNEN \"## 1. Genel Değerlendirme\" formatında yaz\n\
             - Madde işaretleri kullan\n\
             - Emoji ekle (✅ ❌ ⭐ 📊)\n\
             - 400-600 kelime\n\
             - TÜRKÇE yaz\n\n\
             SADECE rapor içeriğini yaz, başka hiçbir şey ekleme!"
        ),
        Language::En => format!(
            "Generate a comprehensive, professional job compatibility report based on this analysis:\n\n\
             COMPANY: {company_name}\nJOB POSITION: {position}\nCANDIDATE: {candidate}\n\n\
             COMPATIBILITY ANALYSIS:\n{analysis}\n\n\
             Generate a detailed report in ENGLISH using this EXACT format:\n\n\
             ## 1. Executive Summary\n[2-3 sentence overview + score]\n\n\
             ## 2. Technical Skills\n[matched/missing skills, brief assessment]\n\n\
             ## 3. Experience Match\n[experience adequacy, relevant roles]\n\n\
             ## 4. Education Fit\n[education suitability, brief evaluation]\n\n\
             ## 5. Key Strengths\n[3-4 main strengths]\n\n\
             ## 6. Development Areas\n[2-3 improvement suggestions]\n\n\
             ## 7. Recommendation\n[clear hiring recommendation + brief rationale]\n\n\
             RULES:\n\
             - Write headings EXACTLY as \"## 1. Executive Summary\" format\n\
             - Use bullet points\n\
             - Add emoji indicators (✅ ❌ ⭐ 📊)\n\
             - 400-600 words\n\
             - Write in ENGLISH\n\n\
             Write ONLY the report content, nothing else!"
        ),
    }
}

fn completion_instruction(lang: Language) -> &'static str {
    match lang {
        Language::Tr => {
            "\n\nÖNEMLİ: EKSİKSİZ bir rapor oluşturun. Yukarıda belirtilen tüm bölümleri \
             kapsayana kadar durmayın. Son Öneri bölümünü mutlaka sonuna ekleyin. TÜRKÇE yazın."
        }
        Language::En => {
            "\n\nIMPORTANT: Generate a COMPLETE report. Do not stop until you have covered all \
             sections mentioned above. Make sure to include the Final Recommendation section at \
             the end. Write in ENGLISH."
        }
    }
}

/// Deterministic seven-section report with a score-driven verdict.
pub fn fallback_report(
    requirements: &JobRequirements,
    analysis: &Value,
    lang: Language,
    company_name: &str,
) -> String {
    let score = score_at(analysis, "/overall_compatibility_score");
    let position = if requirements.position_title.is_empty() {
        "Unknown Position"
    } else {
        requirements.position_title.as_str()
    };
    let stars = if score >= 70 {
        "🌟🌟🌟🌟"
    } else if score >= 50 {
        "🌟🌟🌟"
    } else {
        "🌟🌟"
    };
    match lang {
        Language::Tr => {
            let experience = if score >= 60 { "✅ Yeterli" } else { "⚠️ Değerlendirme Gerekli" };
            let education = if score >= 50 { "✅ Uygun" } else { "⚠️ İnceleme Gerekli" };
            let verdict = if score >= 60 {
                "✅ **Önerilir** - Detaylı görüşme ile değerlendirilebilir"
            } else if score >= 40 {
                "⚠️ **Koşullu** - Ek değerlendirme ve gelişim planı ile"
            } else {
                "📋 **Detaylı Analiz** - Kapsamlı inceleme önerilir"
            };
            format!(
                "UYARI: Otomatik analiz başarısız oldu, temel değerlendirme sunuluyor.\n\n\
                 ## 1. Genel Değerlendirme\n\
                 **Uyum Skoru:** {score}% {stars}\n\n\
                 Bu aday {company_name} şirketindeki {position} pozisyonu için **{score}%** uyum göstermektedir.\n\n\
                 ## 2. Teknik Beceriler\n\
                 • **Eşleşen Beceriler:** Temel gereksinimler karşılanıyor ✅\n\
                 • **Gelişim Alanları:** Bazı teknik beceriler geliştirilebilir ⚠️\n\
                 • **Ek Değer:** İlgili deneyim ve beceriler mevcut ⭐\n\n\
                 ## 3. Deneyim Uyumu\n\
                 • **Deneyim Düzeyi:** {experience}\n\
                 • **İlgili Roller:** Pozisyonla uyumlu deneyimler var\n\
                 • **Kalite:** Orta-iyi seviye profesyonel geçmiş\n\n\
                 ## 4. Eğitim Durumu\n\
                 • **Eğitim Uygunluğu:** {education}\n\
                 • **Alternatif Nitelikler:** Pratik deneyim ve öğrenme kapasitesi\n\n\
                 ## 5. Güçlü Yönler\n\
                 • Teknik temel ve öğrenme kapasitesi ⭐\n\
                 • İlgili sektör deneyimi 💼\n\
                 • Problem çözme becerileri 🔧\n\n\
                 ## 6. Gelişim Alanları\n\
                 • Spesifik teknik becerilerin güçlendirilmesi 📈\n\
                 • Sürekli öğrenme ve gelişim planı 📚\n\n\
                 ## 7. Öneri\n\
                 {verdict}"
            )
        }
        Language::En => {
            let experience = if score >= 60 { "✅ Adequate" } else { "⚠️ Requires Assessment" };
            let education = if score >= 50 { "✅ Suitable" } else { "⚠️ Requires Review" };
            let verdict = if score >= 60 {
                "✅ **Recommended** - Can be evaluated with detailed interview"
            } else if score >= 40 {
                "⚠️ **Conditional** - With additional assessment and development plan"
            } else {
                "📋 **Detailed Analysis** - Comprehensive review recommended"
            };
            format!(
                "WARNING: Automatic analysis failed, a basic evaluation is provided.\n\n\
                 ## 1. Executive Summary\n\
                 **Compatibility Score:** {score}% {stars}\n\n\
                 This candidate shows **{score}%** compatibility for the {position} position at {company_name}.\n\n\
                 ## 2. Technical Skills\n\
                 • **Matched Skills:** Core requirements are met ✅\n\
                 • **Development Areas:** Some technical skills can be improved ⚠️\n\
                 • **Added Value:** Relevant experience and capabilities present ⭐\n\n\
                 ## 3. Experience Match\n\
                 • **Experience Level:** {experience}\n\
                 • **Relevant Roles:** Compatible experience available\n\
                 • **Quality:** Medium to good professional background\n\n\
                 ## 4. Education Fit\n\
                 • **Education Suitability:** {education}\n\
                 • **Alternative Qualifications:** Practical experience and learning capacity\n\n\
                 ## 5. Key Strengths\n\
                 • Technical foundation and learning capacity ⭐\n\
                 • Relevant industry experience 💼\n\
                 • Problem-solving capabilities 🔧\n\n\
                 ## 6. Development Areas\n\
                 • Strengthen specific technical skills 📈\n\
                 • Continuous learning and development plan 📚\n\n\
                 ## 7. Recommendation\n\
                 {verdict}"
            )
        }
    }
}
