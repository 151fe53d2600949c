//! In-memory fragment index with precomputed norms.

use tracing::info;

use crate::chunker::Fragment;
use crate::embedder::Embedder;
use crate::embeddings::{cosine, EmbeddingVector};

/// Parallel arrays of fragments, embedding rows and row norms.
///
/// Immutable once built; a CV change means building a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    fragments: Vec<Fragment>,
    vectors: Vec<Vec<f32>>,
    norms: Vec<f32>,
    dimension: usize,
}

/// One ranked row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredRow {
    /// Position in the fragment list.
    pub position: usize,
    /// Cosine similarity to the query.
    pub score: f32,
}

impl Index {
    /// Index with no rows.
    pub fn empty(dimension: usize) -> Self {
        Self {
            fragments: Vec::new(),
            vectors: Vec::new(),
            norms: Vec::new(),
            dimension,
        }
    }

    /// Embeds every fragment and stores the result.
    ///
    /// Fragments that fail to embed keep a zero row, so the arrays always line up.
    pub fn build(fragments: Vec<Fragment>, embedder: &Embedder) -> Self {
        if fragments.is_empty() {
            return Self::empty(embedder.dimension());
        }
        let texts: Vec<&str> = fragments.iter().map(Fragment::text).collect();
        let vectors = embedder.embed_all(&texts);
        let index = Self::from_vectors(fragments, vectors, embedder.dimension());
        info!(
            fragments = index.len(),
            dimension = index.dimension,
            "built fragment index"
        );
        index
    }

    /// Assembles an index from rows that were already embedded.
    ///
    /// Callers guarantee `fragments.len() == vectors.len()`; extra entries on
    /// either side are dropped.
    pub fn from_vectors(
        fragments: Vec<Fragment>,
        vectors: Vec<EmbeddingVector>,
        dimension: usize,
    ) -> Self {
        let rows = fragments.len().min(vectors.len());
        let mut fragments = fragments;
        fragments.truncate(rows);
        let (vectors, norms) = vectors
            .into_iter()
            .take(rows)
            .map(|vector| {
                let norm = vector.norm();
                (vector.into_values(), norm)
            })
            .unzip();
        Self {
            fragments,
            vectors,
            norms,
            dimension,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// True when the CV produced no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Row width.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Fragments in index order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Embedding rows in index order.
    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Row norms (`||row|| + ε`).
    pub fn norms(&self) -> &[f32] {
        &self.norms
    }

    /// Scores every row against `query` and keeps the best `top_k`.
    ///
    /// Ties keep index order.
    pub fn rank(&self, query: &EmbeddingVector, top_k: usize) -> Vec<ScoredRow> {
        let mut scored: Vec<ScoredRow> = self
            .vectors
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(position, (row, norm))| ScoredRow {
                position,
                score: sortable(cosine(query, row, *norm)),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        scored
    }
}

/// NaN sinks to the bottom; `-0.0` ties with `0.0`.
fn sortable(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else if score == 0.0 {
        0.0
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_index() -> Index {
        Index::from_vectors(
            vec![Fragment::new("x"), Fragment::new("y"), Fragment::new("xy")],
            vec![
                EmbeddingVector::new(vec![1.0, 0.0]),
                EmbeddingVector::new(vec![0.0, 1.0]),
                EmbeddingVector::new(vec![1.0, 1.0]),
            ],
            2,
        )
    }

    #[test]
    fn ranks_by_cosine_similarity() {
        let index = toy_index();
        let ranked = index.rank(&EmbeddingVector::new(vec![1.0, 0.0]), 3);
        let order: Vec<usize> = ranked.iter().map(|row| row.position).collect();
        assert_eq!(order, vec![0, 2, 1]);
    }

    #[test]
    fn ties_keep_index_order() {
        let index = Index::from_vectors(
            vec![Fragment::new("a"), Fragment::new("b"), Fragment::new("c")],
            vec![
                EmbeddingVector::new(vec![0.0, 1.0]),
                EmbeddingVector::new(vec![1.0, 0.0]),
                EmbeddingVector::new(vec![2.0, 0.0]),
            ],
            2,
        );
        let ranked = index.rank(&EmbeddingVector::new(vec![1.0, 0.0]), 2);
        assert_eq!(ranked[0].position, 1);
        assert_eq!(ranked[1].position, 2);
    }

    #[test]
    fn non_finite_rows_rank_last_without_panicking() {
        let rows = 40;
        let fragments = (0..rows).map(|i| Fragment::new(format!("f{i}"))).collect();
        let vectors = (0..rows)
            .map(|i| {
                if i % 3 == 0 {
                    EmbeddingVector::new(vec![f32::INFINITY, 1.0])
                } else {
                    EmbeddingVector::new(vec![1.0, i as f32])
                }
            })
            .collect();
        let index = Index::from_vectors(fragments, vectors, 2);
        let ranked = index.rank(&EmbeddingVector::new(vec![1.0, 0.5]), rows);
        assert_eq!(ranked.len(), rows);
        assert!(ranked[..5].iter().all(|row| row.position % 3 != 0));
        assert!(ranked.last().unwrap().score == f32::NEG_INFINITY);
    }

    #[test]
    fn top_k_is_capped_by_row_count() {
        let index = toy_index();
        assert_eq!(index.rank(&EmbeddingVector::new(vec![1.0, 1.0]), 10).len(), 3);
    }

    #[test]
    fn arrays_stay_aligned() {
        let index = toy_index();
        assert_eq!(index.fragments().len(), index.vectors().len());
        assert_eq!(index.vectors().len(), index.norms().len());
        assert!((index.norms()[2] - 2f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn disabled_embedder_builds_zero_rows() {
        let embedder = Embedder::disabled(4);
        let index = Index::build(vec![Fragment::new("Profile: hi")], &embedder);
        assert_eq!(index.len(), 1);
        assert_eq!(index.vectors()[0], vec![0.0; 4]);
    }
}
