//! Dense vectors shared by the embedder, the index and the retriever.

/// Dimension produced by the default embedding model.
pub const EMBEDDING_DIM: usize = 768;

/// Added to every norm so zero vectors never divide by zero.
pub const NORM_EPSILON: f32 = 1e-8;

/// Fixed-length vector stored alongside its precomputed L2 norm.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector {
    values: Vec<f32>,
    norm: f32,
}

impl EmbeddingVector {
    /// Wraps raw model output; `norm = ||values|| + ε`.
    pub fn new(values: Vec<f32>) -> Self {
        let norm = l2_norm(&values) + NORM_EPSILON;
        Self { values, norm }
    }

    /// All-zero placeholder used when an index entry failed to embed.
    pub fn zeros(dimension: usize) -> Self {
        Self::new(vec![0.0; dimension])
    }

    /// Raw components.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Precomputed norm (ε included).
    pub fn norm(&self) -> f32 {
        self.norm
    }

    /// Number of components.
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// True for vectors that cannot rank anything: all zeros or non-finite.
    pub fn is_degenerate(&self) -> bool {
        !self.norm.is_finite() || self.norm <= NORM_EPSILON
    }

    /// Consumes the vector, returning its components.
    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

/// Plain dot product over the shared prefix of both slices.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean length without the ε adjustment.
pub fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Cosine similarity using both vectors' precomputed norms.
pub fn cosine(query: &EmbeddingVector, row: &[f32], row_norm: f32) -> f32 {
    dot(query.values(), row) / (row_norm * query.norm())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_includes_epsilon() {
        let v = EmbeddingVector::new(vec![3.0, 4.0]);
        assert!((v.norm() - 5.0).abs() < 1e-6);
        assert_eq!(EmbeddingVector::zeros(4).norm(), NORM_EPSILON);
    }

    #[test]
    fn zero_vector_is_degenerate() {
        assert!(EmbeddingVector::zeros(768).is_degenerate());
        assert!(!EmbeddingVector::new(vec![0.0, 0.1]).is_degenerate());
    }

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        let q = EmbeddingVector::new(vec![1.0, 1.0]);
        let row = [2.0, 2.0];
        let sim = cosine(&q, &row, l2_norm(&row) + NORM_EPSILON);
        assert!((sim - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_against_zero_row_is_zero() {
        let q = EmbeddingVector::new(vec![1.0, 0.0]);
        assert_eq!(cosine(&q, &[0.0, 0.0], NORM_EPSILON), 0.0);
    }
}
