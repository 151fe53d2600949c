//! Generation-backed tools layered on the knowledge base.

pub mod compatibility;
pub mod cover_letter;

use thiserror::Error;

use crate::providers::GenerationError;

pub use compatibility::{CompatibilityAnalyzer, CompatibilityReport, JobRequirements, ReportConfig};
pub use cover_letter::CoverLetterWriter;

/// Tool failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("job description must not be empty")]
    EmptyJobDescription,
    #[error("no generation API key configured")]
    MissingCredential,
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Strips a surrounding Markdown code fence (optionally tagged `json`).
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tagged_and_bare_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[]\n```  "), "[]");
        assert_eq!(strip_code_fences("{\"plain\":true}"), "{\"plain\":true}");
    }
}
