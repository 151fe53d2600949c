//! Splits a CV record into self-contained retrievable fragments.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cv::{scalar_to_string, CvRecord, IDENTITY_FIELDS};

/// One retrievable unit of CV text. Never spans two CV sections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragment(String);

impl Fragment {
    /// Wraps already-formatted fragment text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Fragment body.
    pub fn text(&self) -> &str {
        &self.0
    }

    /// Consumes the fragment, returning its text.
    pub fn into_text(self) -> String {
        self.0
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fragment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Cuts `cv` into fragments, in document order.
///
/// Identity fields collapse into one fragment emitted where the first of them
/// appears; list sections yield one fragment per entry; any other scalar
/// top-level field becomes `"{field}: {value}"`. Non-scalar sections without a
/// typed representation are dropped.
pub fn chunk(cv: &CvRecord) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut identity_emitted = false;

    for section in cv.section_names() {
        match section {
            field if IDENTITY_FIELDS.contains(&field) => {
                if !identity_emitted {
                    identity_emitted = true;
                    fragments.extend(identity_fragment(cv));
                }
            }
            "profile" => {
                if let Some(profile) = &cv.profile {
                    fragments.push(Fragment(format!("Profile: {profile}")));
                }
            }
            "education" => {
                if !cv.education.is_empty() {
                    let mut text = String::from("Education: ");
                    for entry in &cv.education {
                        text.push_str(&format!(
                            "{} - {} ({}); ",
                            entry.institution, entry.degree, entry.years
                        ));
                    }
                    fragments.push(Fragment(text.trim_end().to_string()));
                }
            }
            "experience" => {
                fragments.extend(cv.experience.iter().map(|entry| {
                    Fragment(format!(
                        "Experience: {} at {} ({}) - {}",
                        entry.title, entry.company, entry.duration, entry.description
                    ))
                }));
            }
            "skills" => {
                fragments.extend(cv.skills.iter().map(|group| {
                    Fragment(format!(
                        "Skills - {}: {}",
                        group.category,
                        group.skills.join(", ")
                    ))
                }));
            }
            "projects" => {
                fragments.extend(cv.projects.iter().map(|project| {
                    Fragment(format!(
                        "Project: {} - {}",
                        project.name, project.description
                    ))
                }));
            }
            "links" => {
                if !cv.links.is_empty() {
                    let joined = cv
                        .links
                        .iter()
                        .map(|link| format!("{}: {}", link.platform, link.url))
                        .collect::<Vec<_>>()
                        .join(" | ");
                    fragments.push(Fragment(format!("Links: {joined}")));
                }
            }
            other => {
                if let Some(value) = cv.extra.get(other).and_then(scalar_to_string) {
                    fragments.push(Fragment(format!("{other}: {value}")));
                }
            }
        }
    }
    fragments
}

fn identity_fragment(cv: &CvRecord) -> Option<Fragment> {
    let parts: Vec<&str> = [&cv.name, &cv.title, &cv.location]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(Fragment(format!("Personal Info: {}", parts.join(" - "))))
}
