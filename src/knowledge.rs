//! CV plus its lazily built fragment index.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing::{info, warn};

use crate::chunker::chunk;
use crate::cv::CvRecord;
use crate::embedder::Embedder;
use crate::index::Index;
use crate::retriever::{Retrieval, Retriever};
use crate::snapshot::IndexSnapshot;

/// Immutable knowledge base for one CV.
///
/// The index is built on first use, exactly once; concurrent first callers
/// wait for the in-flight build instead of starting another one.
pub struct KnowledgeBase {
    cv: CvRecord,
    embedder: Arc<Embedder>,
    index: OnceLock<Index>,
}

impl KnowledgeBase {
    /// Knowledge base whose index is built on first search.
    pub fn new(cv: CvRecord, embedder: Arc<Embedder>) -> Self {
        Self {
            cv,
            embedder,
            index: OnceLock::new(),
        }
    }

    /// Knowledge base serving an index that was already built.
    pub fn with_index(cv: CvRecord, embedder: Arc<Embedder>, index: Index) -> Self {
        Self {
            cv,
            embedder,
            index: OnceLock::from(index),
        }
    }

    /// Uses the snapshot at `path` when it is valid and was built from `cv`,
    /// otherwise falls back to a lazy rebuild.
    pub fn from_snapshot_or_cv(cv: CvRecord, embedder: Arc<Embedder>, path: &Path) -> Self {
        match IndexSnapshot::load(path) {
            Ok(snapshot) if !snapshot.is_fresh_for(&cv) => {
                warn!(path = %path.display(), "index snapshot is stale, rebuilding from CV");
            }
            Ok(snapshot) => match snapshot.into_index(embedder.dimension()) {
                Ok(index) => {
                    info!(path = %path.display(), fragments = index.len(), "loaded index snapshot");
                    return Self::with_index(cv, embedder, index);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "rejecting index snapshot");
                }
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "index snapshot unavailable");
            }
        }
        Self::new(cv, embedder)
    }

    pub fn cv(&self) -> &CvRecord {
        &self.cv
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Shared handle to the embedder, for building a replacement knowledge base.
    pub fn shared_embedder(&self) -> Arc<Embedder> {
        Arc::clone(&self.embedder)
    }

    /// The fragment index, building it if this is the first call.
    pub fn index(&self) -> &Index {
        self.index.get_or_init(|| {
            info!("building fragment index from CV");
            Index::build(chunk(&self.cv), &self.embedder)
        })
    }

    /// Whether the index has been built (or loaded) yet.
    pub fn is_indexed(&self) -> bool {
        self.index.get().is_some()
    }

    pub fn retriever(&self) -> Retriever<'_> {
        Retriever::new(self.index(), &self.embedder, &self.cv)
    }

    pub fn search(&self, query: &str, top_k: usize) -> Retrieval {
        self.retriever().search(query, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use serde_json::json;

    use crate::embedder::{EmbedError, EmbeddingBackend};

    struct SlowCounting {
        batches: Arc<AtomicUsize>,
    }

    impl EmbeddingBackend for SlowCounting {
        fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Ok(inputs.iter().map(|_| vec![1.0, 0.0, 0.0, 0.0]).collect())
        }

        fn model_name(&self) -> &str {
            "slow-counting"
        }
    }

    fn cv() -> CvRecord {
        CvRecord::from_value(json!({"name": "Ada", "profile": "Rust engineer"})).unwrap()
    }

    #[test]
    fn index_is_built_lazily_once() {
        let kb = KnowledgeBase::new(cv(), Arc::new(Embedder::disabled(4)));
        assert!(!kb.is_indexed());
        let first = kb.index() as *const Index;
        let second = kb.index() as *const Index;
        assert!(kb.is_indexed());
        assert_eq!(first, second);
        assert_eq!(kb.index().len(), 2);
    }

    #[test]
    fn concurrent_first_callers_share_one_build() {
        let batches = Arc::new(AtomicUsize::new(0));
        let backend = SlowCounting {
            batches: Arc::clone(&batches),
        };
        let kb = KnowledgeBase::new(cv(), Arc::new(Embedder::new(Box::new(backend), 4, 0)));
        let callers = 8;
        let barrier = Barrier::new(callers);
        let (kb_ref, barrier_ref) = (&kb, &barrier);

        let pointers: Vec<usize> = thread::scope(|scope| {
            let handles: Vec<_> = (0..callers)
                .map(|_| {
                    scope.spawn(move || {
                        barrier_ref.wait();
                        kb_ref.index() as *const Index as usize
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(batches.load(Ordering::SeqCst), 1);
        assert!(pointers.iter().all(|p| *p == pointers[0]));
        assert_eq!(kb.index().len(), 2);
    }

    #[test]
    fn stale_snapshot_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.cbor");
        let old_cv = CvRecord::from_value(json!({"name": "Someone else"})).unwrap();
        IndexSnapshot {
            fragments: vec!["Personal Info: Someone else".into()],
            vectors: vec![vec![1.0; 4]],
            source_cv: old_cv,
        }
        .save(&path)
        .unwrap();

        let kb = KnowledgeBase::from_snapshot_or_cv(cv(), Arc::new(Embedder::disabled(4)), &path);
        assert!(!kb.is_indexed());
        assert_eq!(kb.index().fragments()[0].text(), "Personal Info: Ada");
    }

    #[test]
    fn missing_snapshot_falls_back_to_rebuild() {
        let kb = KnowledgeBase::from_snapshot_or_cv(
            cv(),
            Arc::new(Embedder::disabled(4)),
            Path::new("/nonexistent/index.cbor"),
        );
        assert!(!kb.is_indexed());
        assert_eq!(kb.search("rust", 5).fragments.len(), 1);
    }
}
