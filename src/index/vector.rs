//! Vector field indices: flat brute-force storage and an HNSW graph.

pub mod flat;
pub mod hnsw;

use serde::{Deserialize, Serialize};

use crate::data::DocumentAccessor;
use crate::index::DocId;

pub use flat::FlatVectorIndex;
pub use hnsw::HnswVectorIndex;

/// Distance function used to compare vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared Euclidean distance.
    #[default]
    L2,
    /// Cosine distance (`1 - cosine similarity`).
    Cosine,
}

/// Compute the distance between two equal-length vectors.
pub fn distance(a: &[f32], b: &[f32], metric: DistanceMetric) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    match metric {
        DistanceMetric::L2 => a
            .iter()
            .zip(b)
            .map(|(x, y)| {
                let d = x - y;
                d * d
            })
            .sum(),
        DistanceMetric::Cosine => {
            let mut dot = 0.0f32;
            let mut norm_a = 0.0f32;
            let mut norm_b = 0.0f32;
            for (x, y) in a.iter().zip(b) {
                dot += x * y;
                norm_a += x * x;
                norm_b += y * y;
            }
            let denom = norm_a.sqrt() * norm_b.sqrt();
            if denom == 0.0 {
                1.0
            } else {
                1.0 - dot / denom
            }
        }
    }
}

/// Per-field parameters for vector indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorParams {
    /// Vector dimensionality; documents with other lengths are refused.
    pub dimension: usize,
    #[serde(default)]
    pub metric: DistanceMetric,
    /// Expected number of vectors, used for pre-allocation.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Build an HNSW graph instead of flat storage.
    #[serde(default)]
    pub use_hnsw: bool,
    /// Maximum connections per graph layer.
    #[serde(default = "default_m")]
    pub m: usize,
    /// Beam width while building the graph.
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
    /// Default beam width while searching the graph.
    #[serde(default = "default_ef_runtime")]
    pub ef_runtime: usize,
}

fn default_capacity() -> usize {
    1024
}

fn default_m() -> usize {
    16
}

fn default_ef_construction() -> usize {
    200
}

fn default_ef_runtime() -> usize {
    10
}

impl VectorParams {
    pub fn flat(dimension: usize) -> Self {
        Self {
            dimension,
            metric: DistanceMetric::default(),
            capacity: default_capacity(),
            use_hnsw: false,
            m: default_m(),
            ef_construction: default_ef_construction(),
            ef_runtime: default_ef_runtime(),
        }
    }

    pub fn hnsw(dimension: usize) -> Self {
        Self {
            use_hnsw: true,
            ..Self::flat(dimension)
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }
}

/// A vector index of either kind.
#[derive(Debug)]
pub enum VectorIndex {
    Flat(FlatVectorIndex),
    Hnsw(HnswVectorIndex),
}

impl VectorIndex {
    pub fn new(params: &VectorParams) -> Self {
        if params.use_hnsw {
            VectorIndex::Hnsw(HnswVectorIndex::new(params))
        } else {
            VectorIndex::Flat(FlatVectorIndex::new(params))
        }
    }

    /// `(dimension, metric)` of the indexed vectors.
    pub fn info(&self) -> (usize, DistanceMetric) {
        match self {
            VectorIndex::Flat(ix) => ix.info(),
            VectorIndex::Hnsw(ix) => ix.info(),
        }
    }

    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        match self {
            VectorIndex::Flat(ix) => ix.add(doc, access, field),
            VectorIndex::Hnsw(ix) => ix.add(doc, access, field),
        }
    }

    pub fn remove(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) {
        match self {
            VectorIndex::Flat(ix) => ix.remove(doc, access, field),
            VectorIndex::Hnsw(ix) => ix.remove(doc, access, field),
        }
    }

    pub fn all_docs_with_values(&self) -> &[DocId] {
        match self {
            VectorIndex::Flat(ix) => ix.all_docs_with_values(),
            VectorIndex::Hnsw(ix) => ix.all_docs_with_values(),
        }
    }
}
