//! Brute-force vector storage; distance scans are driven by the caller.

use ahash::AHashMap;

use crate::data::DocumentAccessor;
use crate::index::vector::{DistanceMetric, VectorParams};
use crate::index::{DocId, insert_sorted, remove_sorted};

/// Dense per-document vector storage for a single VECTOR field.
#[derive(Debug)]
pub struct FlatVectorIndex {
    dimension: usize,
    metric: DistanceMetric,
    vectors: AHashMap<DocId, Vec<f32>>,
    docs: Vec<DocId>,
}

impl FlatVectorIndex {
    pub fn new(params: &VectorParams) -> Self {
        Self {
            dimension: params.dimension,
            metric: params.metric,
            vectors: AHashMap::with_capacity(params.capacity),
            docs: Vec::with_capacity(params.capacity),
        }
    }

    pub fn info(&self) -> (usize, DistanceMetric) {
        (self.dimension, self.metric)
    }

    /// Store a document's vector. A vector of the wrong length refuses the
    /// document.
    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        let Some(vector) = access.vector(field) else {
            return true;
        };
        if vector.len() != self.dimension {
            return false;
        }
        self.vectors.insert(doc, vector.to_vec());
        insert_sorted(&mut self.docs, doc);
        true
    }

    pub fn remove(&mut self, doc: DocId, _access: &dyn DocumentAccessor, _field: &str) {
        if self.vectors.remove(&doc).is_some() {
            remove_sorted(&mut self.docs, doc);
        }
    }

    /// The stored vector for a document, if any.
    pub fn get(&self, doc: DocId) -> Option<&[f32]> {
        self.vectors.get(&doc).map(Vec::as_slice)
    }

    /// Ascending ids of all documents holding a vector.
    pub fn all_docs_with_values(&self) -> &[DocId] {
        &self.docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataValue, Document};

    fn doc(v: Vec<f32>) -> Document {
        Document::new().add_field("v", DataValue::Vector(v))
    }

    #[test]
    fn stores_and_returns_vectors() {
        let mut index = FlatVectorIndex::new(&VectorParams::flat(2));
        assert!(index.add(1, &doc(vec![1.0, 0.0]), "v"));
        assert!(index.add(2, &doc(vec![0.0, 1.0]), "v"));

        assert_eq!(index.get(1), Some(&[1.0, 0.0][..]));
        assert_eq!(index.get(3), None);
        assert_eq!(index.all_docs_with_values(), [1, 2]);
    }

    #[test]
    fn wrong_dimension_is_refused() {
        let mut index = FlatVectorIndex::new(&VectorParams::flat(2));
        assert!(!index.add(1, &doc(vec![1.0, 0.0, 0.0]), "v"));
        assert!(index.all_docs_with_values().is_empty());
    }

    #[test]
    fn missing_field_is_accepted_without_indexing() {
        let mut index = FlatVectorIndex::new(&VectorParams::flat(2));
        assert!(index.add(1, &Document::new(), "v"));
        assert!(index.all_docs_with_values().is_empty());
    }
}
