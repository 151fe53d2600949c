//! Persisted index snapshot (CBOR) produced by `index_builder`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunker::Fragment;
use crate::cv::CvRecord;
use crate::embeddings::EmbeddingVector;
use crate::index::Index;

/// Why a snapshot could not be used.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot is not valid CBOR: {0}")]
    Decode(String),
    #[error("failed to encode snapshot: {0}")]
    Encode(String),
    /// Rows disagree on width, or the width is not the expected dimension.
    #[error("vector matrix is not rank-2 with width {expected}: row {row} has {found} columns")]
    NotRank2 {
        expected: usize,
        row: usize,
        found: usize,
    },
    #[error("snapshot has {fragments} fragments but {rows} vector rows")]
    LengthMismatch { fragments: usize, rows: usize },
    #[error("vector row {row} has non-finite components")]
    NonFinite { row: usize },
}

/// On-disk form of an [`Index`] plus the CV it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub fragments: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
    pub source_cv: CvRecord,
}

impl IndexSnapshot {
    /// Captures `index` together with the CV it came from.
    pub fn from_index(index: &Index, source_cv: &CvRecord) -> Self {
        Self {
            fragments: index
                .fragments()
                .iter()
                .map(|fragment| fragment.text().to_string())
                .collect(),
            vectors: index.vectors().to_vec(),
            source_cv: source_cv.clone(),
        }
    }

    /// Writes the snapshot as CBOR.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let mut writer = BufWriter::new(File::create(path)?);
        ciborium::into_writer(self, &mut writer)
            .map_err(|err| SnapshotError::Encode(err.to_string()))?;
        writer.flush()?;
        Ok(())
    }

    /// Reads a snapshot written by [`IndexSnapshot::save`].
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let reader = BufReader::new(File::open(path)?);
        ciborium::from_reader(reader).map_err(|err| SnapshotError::Decode(err.to_string()))
    }

    /// `(rows, columns)` of the vector matrix; columns is 0 for an empty matrix.
    pub fn shape(&self) -> (usize, usize) {
        (
            self.vectors.len(),
            self.vectors.first().map_or(0, Vec::len),
        )
    }

    /// Whether this snapshot was built from `cv`.
    pub fn is_fresh_for(&self, cv: &CvRecord) -> bool {
        &self.source_cv == cv
    }

    /// Validates the matrix and turns the snapshot into a live index.
    pub fn into_index(self, dimension: usize) -> Result<Index, SnapshotError> {
        if self.fragments.len() != self.vectors.len() {
            return Err(SnapshotError::LengthMismatch {
                fragments: self.fragments.len(),
                rows: self.vectors.len(),
            });
        }
        if let Some((row, found)) = self
            .vectors
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, width)| *width != dimension)
        {
            return Err(SnapshotError::NotRank2 {
                expected: dimension,
                row,
                found,
            });
        }
        if let Some(row) = self
            .vectors
            .iter()
            .position(|row| row.iter().any(|value| !value.is_finite()))
        {
            return Err(SnapshotError::NonFinite { row });
        }
        let fragments = self.fragments.into_iter().map(Fragment::new).collect();
        let vectors = self.vectors.into_iter().map(EmbeddingVector::new).collect();
        Ok(Index::from_vectors(fragments, vectors, dimension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cv() -> CvRecord {
        CvRecord::from_value(json!({"name": "Ada", "profile": "Engineer"})).unwrap()
    }

    fn snapshot(vectors: Vec<Vec<f32>>) -> IndexSnapshot {
        IndexSnapshot {
            fragments: vec!["Personal Info: Ada".into(), "Profile: Engineer".into()],
            vectors,
            source_cv: cv(),
        }
    }

    #[test]
    fn saved_snapshot_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.cbor");
        let original = snapshot(vec![vec![1.0, 0.0], vec![0.5, 0.5]]);
        original.save(&path).unwrap();
        let loaded = IndexSnapshot::load(&path).unwrap();
        assert_eq!(loaded, original);
        assert!(loaded.is_fresh_for(&cv()));
        assert_eq!(loaded.into_index(2).unwrap().len(), 2);
    }

    #[test]
    fn ragged_matrix_is_rejected() {
        let err = snapshot(vec![vec![1.0, 0.0], vec![1.0]])
            .into_index(2)
            .unwrap_err();
        assert!(matches!(err, SnapshotError::NotRank2 { row: 1, found: 1, .. }));
    }

    #[test]
    fn non_finite_rows_are_rejected() {
        let err = snapshot(vec![vec![1.0, 0.0], vec![f32::INFINITY, 1.0]])
            .into_index(2)
            .unwrap_err();
        assert!(matches!(err, SnapshotError::NonFinite { row: 1 }));
    }

    #[test]
    fn wrong_width_is_rejected() {
        let err = snapshot(vec![vec![1.0; 3], vec![1.0; 3]])
            .into_index(2)
            .unwrap_err();
        assert!(matches!(err, SnapshotError::NotRank2 { expected: 2, .. }));
    }

    #[test]
    fn row_count_must_match_fragments() {
        let err = snapshot(vec![vec![1.0, 0.0]]).into_index(2).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::LengthMismatch { fragments: 2, rows: 1 }
        ));
    }

    #[test]
    fn changed_cv_makes_snapshot_stale() {
        let other = CvRecord::from_value(json!({"name": "Grace"})).unwrap();
        assert!(!snapshot(vec![]).is_fresh_for(&other));
    }

    #[test]
    fn garbage_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.cbor");
        std::fs::write(&path, b"\xff\x00not cbor").unwrap();
        assert!(matches!(
            IndexSnapshot::load(&path),
            Err(SnapshotError::Decode(_))
        ));
    }
}
