//! Structured CV record with lenient, per-section decoding.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

/// Top-level keys merged into the single identity fragment.
pub const IDENTITY_FIELDS: [&str; 3] = ["name", "title", "location"];

/// Text that may be authored either as a single string or as a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FlexibleText {
    /// Single free-form value.
    Text(String),
    /// Bullet-style list.
    List(Vec<String>),
}

impl Default for FlexibleText {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for FlexibleText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

/// One `education` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    /// School or university.
    #[serde(deserialize_with = "scalar_text")]
    pub institution: String,
    /// Degree or programme.
    #[serde(deserialize_with = "scalar_text")]
    pub degree: String,
    /// Free-form year range, e.g. `2019 - 2023`.
    #[serde(deserialize_with = "scalar_text")]
    pub years: String,
}

/// One `experience` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    /// Role title.
    #[serde(deserialize_with = "scalar_text")]
    pub title: String,
    /// Employer.
    #[serde(deserialize_with = "scalar_text")]
    pub company: String,
    /// Free-form duration.
    #[serde(deserialize_with = "scalar_text")]
    pub duration: String,
    /// What the role involved.
    #[serde(deserialize_with = "scalar_text")]
    pub description: String,
}

/// One `projects` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Project name, matched verbatim against user questions.
    #[serde(deserialize_with = "scalar_text")]
    pub name: String,
    /// Short description (the only part that gets embedded).
    #[serde(deserialize_with = "scalar_text")]
    pub description: String,
    /// Technology stack.
    #[serde(deserialize_with = "flexible_text")]
    pub technology: FlexibleText,
    /// Notable features.
    #[serde(deserialize_with = "flexible_text")]
    pub features: FlexibleText,
}

/// Skills grouped under one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillCategory {
    /// Category label, e.g. `Backend`.
    pub category: String,
    /// Skills in authoring order.
    pub skills: Vec<String>,
}

/// A `links` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Platform label, e.g. `GitHub`.
    pub platform: String,
    /// Target URL.
    pub url: String,
}

/// The single-person knowledge base.
///
/// Known sections are decoded one by one: a section with the wrong shape is
/// dropped (and logged) instead of failing the whole record, and malformed
/// list entries are skipped. The original document is kept untouched so it
/// can be served back verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CvRecord {
    document: Map<String, Value>,
    /// Full name.
    pub name: Option<String>,
    /// Headline / job title.
    pub title: Option<String>,
    /// City or region.
    pub location: Option<String>,
    /// Free-text profile summary.
    pub profile: Option<String>,
    /// Education history.
    pub education: Vec<EducationEntry>,
    /// Work history.
    pub experience: Vec<ExperienceEntry>,
    /// Skills by category, in authoring order.
    pub skills: Vec<SkillCategory>,
    /// Portfolio projects.
    pub projects: Vec<Project>,
    /// Profile links, in authoring order.
    pub links: Vec<Link>,
    /// Sections without a typed representation (awards, references, email, ...).
    pub extra: Map<String, Value>,
}

impl CvRecord {
    /// Reads and decodes a CV JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read CV file {}", path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("invalid CV JSON in {}", path.display()))?;
        Self::from_value(value)
    }

    /// Decodes a CV from an already-parsed JSON document.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(document) = value else {
            anyhow::bail!("CV document must be a JSON object");
        };

        let mut record = Self {
            document: document.clone(),
            ..Self::default()
        };
        for (key, value) in document {
            match key.as_str() {
                "name" => record.name = identity_scalar(&key, &value),
                "title" => record.title = identity_scalar(&key, &value),
                "location" => record.location = identity_scalar(&key, &value),
                "profile" => record.profile = identity_scalar(&key, &value),
                "education" => record.education = lenient_list(&key, value),
                "experience" => record.experience = lenient_list(&key, value),
                "projects" => record.projects = lenient_list(&key, value),
                "skills" => record.skills = skill_categories(value),
                "links" => record.links = links(value),
                _ => {
                    record.extra.insert(key, value);
                }
            }
        }
        Ok(record)
    }

    /// Top-level section names in document order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.document.keys().map(String::as_str)
    }

    /// Raw JSON for any top-level section.
    pub fn section(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    /// True when the source document had no sections at all.
    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    /// Name used in prompts and signatures.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("the candidate")
    }

    /// The original document, pretty-printed.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.document).unwrap_or_default()
    }

    /// Indented plain-text rendering used when no retrieval context is available.
    pub fn to_plain_text(&self) -> String {
        let mut lines = Vec::new();
        if let Some(name) = &self.name {
            lines.push(format!("Name: {name}"));
        }
        if let Some(title) = &self.title {
            lines.push(format!("Title: {title}"));
        }
        if let Some(profile) = &self.profile {
            lines.push(format!("Profile: {profile}"));
        }
        for section in [
            "skills",
            "experience",
            "projects",
            "education",
            "certifications",
        ] {
            if let Some(value) = self.document.get(section).filter(|v| !is_blank(v)) {
                render_section(&mut lines, &title_case(section), value);
            }
        }
        lines.join("\n")
    }
}

impl Serialize for CvRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.document.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CvRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(de::Error::custom)
    }
}

/// Renders a JSON scalar as text; `None` for arrays, objects and null.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn scalar_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value).unwrap_or_default())
}

/// Scalars and scalar list items are kept; any other shape decodes as empty text.
fn flexible_text<'de, D>(deserializer: D) -> Result<FlexibleText, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => FlexibleText::List(items.iter().filter_map(scalar_to_string).collect()),
        other => FlexibleText::Text(scalar_to_string(&other).unwrap_or_default()),
    })
}

fn identity_scalar(key: &str, value: &Value) -> Option<String> {
    let text = scalar_to_string(value);
    if text.is_none() && !value.is_null() {
        warn!(section = key, "dropping non-scalar CV field");
    }
    text.filter(|text| !text.trim().is_empty())
}

fn lenient_list<T: DeserializeOwned>(key: &str, value: Value) -> Vec<T> {
    let Value::Array(items) = value else {
        warn!(section = key, "dropping CV section that is not a list");
        return Vec::new();
    };
    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if parsed.len() < total {
        warn!(
            section = key,
            skipped = total - parsed.len(),
            "skipped malformed CV entries"
        );
    }
    parsed
}

fn skill_categories(value: Value) -> Vec<SkillCategory> {
    let Value::Object(categories) = value else {
        warn!(section = "skills", "dropping CV section that is not a mapping");
        return Vec::new();
    };
    categories
        .into_iter()
        .filter_map(|(category, skills)| {
            let skills = match skills {
                Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
                other => vec![scalar_to_string(&other)?],
            };
            Some(SkillCategory { category, skills })
        })
        .collect()
}

fn links(value: Value) -> Vec<Link> {
    let Value::Object(entries) = value else {
        warn!(section = "links", "dropping CV section that is not a mapping");
        return Vec::new();
    };
    entries
        .into_iter()
        .filter_map(|(platform, url)| {
            Some(Link {
                platform,
                url: scalar_to_string(&url)?,
            })
        })
        .collect()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_to_string(other).unwrap_or_else(|| other.to_string()),
    }
}

fn render_section(lines: &mut Vec<String>, title: &str, value: &Value) {
    lines.push(format!("\n{title}:"));
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                lines.push(format!("  {key}: {}", render_value(value)));
            }
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(map) => {
                        for (key, value) in map.iter().filter(|(_, v)| !is_blank(v)) {
                            let indent = if key == "description" { "    " } else { "  " };
                            lines.push(format!("{indent}{key}: {}", render_value(value)));
                        }
                    }
                    other => lines.push(format!("  - {}", render_value(other))),
                }
            }
        }
        other => lines.push(format!("  {}", render_value(other))),
    }
}
