//! Top-k fragment retrieval with a deterministic keyword fallback.

use serde::Serialize;
use tracing::{debug, warn};

use crate::chunker::Fragment;
use crate::cv::CvRecord;
use crate::embedder::{EmbedError, Embedder};
use crate::index::Index;

/// Retrieval knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalConfig {
    /// Fragments returned per query.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Which branch produced a [`Retrieval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalPath {
    /// Cosine ranking against the index.
    Semantic,
    /// Keyword hits, in index order.
    Keyword,
    /// No keyword hit; the leading fragments were returned.
    Leading,
    /// Empty index; the raw CV was returned as one fragment.
    RawCv,
    /// Nothing to return at all.
    Empty,
}

/// Fragments selected for one query, most relevant first.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub fragments: Vec<Fragment>,
    pub path: RetrievalPath,
}

impl Retrieval {
    /// Fragment texts joined with `separator`.
    pub fn join(&self, separator: &str) -> String {
        self.fragments
            .iter()
            .map(Fragment::text)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Read-only view over an index, the embedder and the CV it was built from.
#[derive(Clone, Copy)]
pub struct Retriever<'a> {
    index: &'a Index,
    embedder: &'a Embedder,
    cv: &'a CvRecord,
}

impl<'a> Retriever<'a> {
    pub fn new(index: &'a Index, embedder: &'a Embedder, cv: &'a CvRecord) -> Self {
        Self {
            index,
            embedder,
            cv,
        }
    }

    /// Returns at most `top_k` fragments for `query`. Never fails.
    ///
    /// The semantic path runs only when the index has rows and the query
    /// embeds to a non-degenerate vector; everything else falls back to
    /// keyword matching.
    pub fn search(&self, query: &str, top_k: usize) -> Retrieval {
        if self.index.is_empty() {
            return self.raw_cv();
        }
        match self.embedder.embed_query(query) {
            Ok(vector) if !vector.is_degenerate() => {
                let fragments = self
                    .index
                    .rank(&vector, top_k)
                    .into_iter()
                    .map(|row| self.index.fragments()[row.position].clone())
                    .collect();
                debug!(top_k, "semantic retrieval");
                return Retrieval {
                    fragments,
                    path: RetrievalPath::Semantic,
                };
            }
            Ok(_) => warn!("query embedded to a zero vector, using keyword fallback"),
            Err(EmbedError::MissingCredential) => {
                debug!("no embedding credential, using keyword fallback")
            }
            Err(err) => warn!(error = %err, "query embedding failed, using keyword fallback"),
        }
        keyword_search(self.index.fragments(), query, top_k)
    }

    fn raw_cv(&self) -> Retrieval {
        if self.cv.is_empty() {
            return Retrieval {
                fragments: Vec::new(),
                path: RetrievalPath::Empty,
            };
        }
        Retrieval {
            fragments: vec![Fragment::new(self.cv.to_pretty_json())],
            path: RetrievalPath::RawCv,
        }
    }
}

/// Lower-cased whitespace tokens longer than two characters.
pub fn query_tokens(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|token| token.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Substring keyword match over `fragments`, keeping index order.
///
/// With no hits the first `top_k` fragments are returned instead, so a
/// non-empty index never yields an empty result.
pub fn keyword_search(fragments: &[Fragment], query: &str, top_k: usize) -> Retrieval {
    let tokens = query_tokens(query);
    let hits: Vec<Fragment> = fragments
        .iter()
        .filter(|fragment| {
            let haystack = fragment.text().to_lowercase();
            tokens.iter().any(|token| haystack.contains(token.as_str()))
        })
        .take(top_k)
        .cloned()
        .collect();
    if !hits.is_empty() {
        return Retrieval {
            fragments: hits,
            path: RetrievalPath::Keyword,
        };
    }
    Retrieval {
        fragments: fragments.iter().take(top_k).cloned().collect(),
        path: RetrievalPath::Leading,
    }
}
