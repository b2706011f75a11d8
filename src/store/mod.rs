//! Document vector store.
//!
//! The store holds the full corpus as an immutable [`IndexSnapshot`]: a
//! metadata record list and an `[N, D]` matrix of unit-normalized embedding
//! vectors, where row `i` of the matrix belongs to document `i` of the list.
//! That row/record parity is maintained on every mutation of the
//! [`SnapshotBuilder`] and re-validated when a persisted snapshot is loaded.
//!
//! Snapshots are published through an atomic reference swap: a rebuild
//! constructs the new snapshot off to the side and [`SearchIndex::publish`]
//! installs it with a single `ArcSwap` store. In-flight searches keep the
//! `Arc` they loaded, so readers always observe a fully consistent snapshot,
//! old or new, and the write path never blocks them.

pub mod persist;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use ndarray::{Array2, ArrayView1, ArrayView2};
use thiserror::Error;

use crate::models::Document;

/// Errors that can occur in the vector store.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A vector's dimension does not match the snapshot dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the snapshot was created with
        expected: usize,
        /// Dimension of the rejected vector
        actual: usize,
    },

    /// A document with the same identifier is already present
    #[error("Duplicate document id: {0}")]
    DuplicateId(String),

    /// A persisted snapshot failed consistency validation on load
    #[error("Index corruption: {0}")]
    Corruption(String),

    /// Filesystem failure while persisting or loading a snapshot
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata record list could not be serialized or parsed
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// An immutable corpus snapshot: documents plus their embedding matrix.
///
/// Row `i` of the matrix is the embedding of document `i`. Snapshots are
/// never mutated after construction; reprocessing builds a replacement.
#[derive(Debug)]
pub struct IndexSnapshot {
    documents: Vec<Document>,
    vectors: Array2<f32>,
    by_id: HashMap<String, usize>,
}

impl IndexSnapshot {
    /// An empty snapshot with the given vector dimension.
    pub fn empty(dimension: usize) -> Self {
        Self {
            documents: Vec::new(),
            vectors: Array2::zeros((0, dimension)),
            by_id: HashMap::new(),
        }
    }

    /// Number of documents (equals the matrix row count).
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the snapshot holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Vector dimension D.
    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    /// Look up a document by its identifier.
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.by_id.get(id).map(|&row| &self.documents[row])
    }

    /// All documents, in insertion order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// The full `[N, D]` embedding matrix.
    pub fn vectors(&self) -> ArrayView2<'_, f32> {
        self.vectors.view()
    }

    /// Iterate over `(document, vector)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Document, ArrayView1<'_, f32>)> {
        self.documents.iter().zip(self.vectors.rows())
    }
}

/// Builder that accumulates documents and vectors into a snapshot.
///
/// Every `push` is all-or-nothing: a dimension mismatch or duplicate
/// identifier is rejected before any state changes, so a failed push leaves
/// the builder exactly as it was.
#[derive(Debug)]
pub struct SnapshotBuilder {
    dimension: usize,
    documents: Vec<Document>,
    data: Vec<f32>,
    seen: HashSet<String>,
}

impl SnapshotBuilder {
    /// Create a builder for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            documents: Vec::new(),
            data: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Number of documents accumulated so far.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the builder holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Append a document and its embedding vector.
    ///
    /// # Errors
    /// Returns `IndexError::DimensionMismatch` if the vector is not of the
    /// builder's dimension, or `IndexError::DuplicateId` if a document with
    /// the same identifier was already pushed. In both cases the builder is
    /// left unchanged.
    pub fn push(&mut self, document: Document, vector: Vec<f32>) -> IndexResult<()> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if self.seen.contains(&document.id) {
            return Err(IndexError::DuplicateId(document.id));
        }

        self.seen.insert(document.id.clone());
        self.documents.push(document);
        self.data.extend_from_slice(&vector);
        Ok(())
    }

    /// Finalize into an immutable snapshot.
    pub fn build(self) -> IndexSnapshot {
        let rows = self.documents.len();
        let vectors = Array2::from_shape_vec((rows, self.dimension), self.data)
            .expect("push maintains row count * dimension parity");
        let by_id = self
            .documents
            .iter()
            .enumerate()
            .map(|(row, doc)| (doc.id.clone(), row))
            .collect();
        IndexSnapshot {
            documents: self.documents,
            vectors,
            by_id,
        }
    }
}

/// Shared, atomically swappable handle to the current corpus snapshot.
///
/// Readers call [`snapshot`](SearchIndex::snapshot) and work against the
/// `Arc` they receive; the only writer builds a replacement snapshot and
/// [`publish`](SearchIndex::publish)es it. No locks on the read path.
pub struct SearchIndex {
    current: ArcSwap<IndexSnapshot>,
}

impl SearchIndex {
    /// Create an index with an empty snapshot of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            current: ArcSwap::from_pointee(IndexSnapshot::empty(dimension)),
        }
    }

    /// Create an index seeded with an existing snapshot.
    pub fn with_snapshot(snapshot: IndexSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.current.load_full()
    }

    /// Atomically replace the published snapshot.
    pub fn publish(&self, snapshot: IndexSnapshot) {
        self.current.store(Arc::new(snapshot));
    }

    /// Load a persisted snapshot from `dir` and publish it.
    ///
    /// The snapshot is fully built and validated off to the side before the
    /// swap; on any failure the previously published snapshot stays active.
    ///
    /// # Errors
    /// Returns `IndexError::Corruption` if the persisted artifacts are
    /// inconsistent, or `IndexError::Io`/`IndexError::Metadata` if they
    /// cannot be read.
    pub fn load_dir(&self, dir: &std::path::Path, expected_dimension: usize) -> IndexResult<()> {
        let snapshot = persist::load_snapshot(dir, expected_dimension)?;
        self.publish(snapshot);
        Ok(())
    }
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snap = self.current.load();
        f.debug_struct("SearchIndex")
            .field("documents", &snap.len())
            .field("dimension", &snap.dimension())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::Document;

    /// Build a document with the fields that matter for store and rank tests.
    pub fn document(id: &str, title: &str, year: i32) -> Document {
        Document {
            id: id.to_string(),
            title: title.to_string(),
            abstract_text: format!("Abstract of {}", title),
            authors: vec!["Test Author".to_string()],
            journal: "Test Journal".to_string(),
            year,
            doi: format!("10.1000/{}", id),
            keywords: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::document;
    use super::*;

    #[test]
    fn builder_maintains_row_record_parity() {
        let mut builder = SnapshotBuilder::new(3);
        builder.push(document("a", "A", 2020), vec![1.0, 0.0, 0.0]).unwrap();
        builder.push(document("b", "B", 2021), vec![0.0, 1.0, 0.0]).unwrap();
        let snap = builder.build();

        assert_eq!(snap.len(), 2);
        assert_eq!(snap.vectors().nrows(), snap.documents().len());
        assert_eq!(snap.dimension(), 3);
        assert_eq!(snap.get("b").unwrap().title, "B");
    }

    #[test]
    fn push_rejects_dimension_mismatch_without_mutation() {
        let mut builder = SnapshotBuilder::new(3);
        builder.push(document("a", "A", 2020), vec![1.0, 0.0, 0.0]).unwrap();

        let err = builder
            .push(document("b", "B", 2021), vec![1.0, 0.0])
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch { expected: 3, actual: 2 }
        ));

        // prior state unchanged
        let snap = builder.build();
        assert_eq!(snap.len(), 1);
        assert!(snap.get("b").is_none());
    }

    #[test]
    fn push_rejects_duplicate_id_without_mutation() {
        let mut builder = SnapshotBuilder::new(2);
        builder.push(document("a", "Original", 2020), vec![1.0, 0.0]).unwrap();

        let err = builder
            .push(document("a", "Different content", 2023), vec![0.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, IndexError::DuplicateId(ref id) if id == "a"));

        let snap = builder.build();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get("a").unwrap().title, "Original");
        assert_eq!(snap.get("a").unwrap().year, 2020);
    }

    #[test]
    fn iter_pairs_documents_with_their_rows() {
        let mut builder = SnapshotBuilder::new(2);
        builder.push(document("a", "A", 2020), vec![1.0, 0.0]).unwrap();
        builder.push(document("b", "B", 2021), vec![0.0, 1.0]).unwrap();
        let snap = builder.build();

        let pairs: Vec<_> = snap.iter().collect();
        assert_eq!(pairs[0].0.id, "a");
        assert_eq!(pairs[0].1.to_vec(), vec![1.0, 0.0]);
        assert_eq!(pairs[1].0.id, "b");
        assert_eq!(pairs[1].1.to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn publish_swaps_snapshot_while_old_reader_keeps_its_copy() {
        let index = SearchIndex::new(2);
        let before = index.snapshot();
        assert!(before.is_empty());

        let mut builder = SnapshotBuilder::new(2);
        builder.push(document("a", "A", 2020), vec![1.0, 0.0]).unwrap();
        index.publish(builder.build());

        // the old reader's snapshot is untouched; new readers see the update
        assert!(before.is_empty());
        assert_eq!(index.snapshot().len(), 1);
    }

    #[test]
    fn empty_snapshot_reports_dimension() {
        let snap = IndexSnapshot::empty(384);
        assert_eq!(snap.dimension(), 384);
        assert!(snap.is_empty());
    }
}
