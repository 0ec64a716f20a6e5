//! Hierarchical navigable small-world graph for approximate k-NN.
//!
//! Layer 0 holds every vector with up to `2*m` connections; higher layers
//! hold geometrically fewer nodes with up to `m` connections. Search descends
//! greedily from the top layer, then runs a beam search of width `ef` on
//! layer 0. The level RNG is seeded, so index shape is reproducible.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::DocumentAccessor;
use crate::index::vector::{DistanceMetric, VectorParams, distance};
use crate::index::{DocId, insert_sorted, remove_sorted};

const LEVEL_SEED: u64 = 0x5045_4e47;
const MAX_LEVEL: usize = 16;

/// A `(distance, doc)` candidate ordered ascending by distance, ties broken
/// by ascending id.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Scored {
    dist: f32,
    doc: DocId,
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then(self.doc.cmp(&other.doc))
    }
}

#[derive(Debug)]
struct Node {
    vector: Vec<f32>,
    /// Neighbour ids per layer; index 0 is the base layer.
    neighbors: Vec<Vec<DocId>>,
}

impl Node {
    fn top_level(&self) -> usize {
        self.neighbors.len() - 1
    }
}

/// An HNSW index over the vectors of a single VECTOR field.
#[derive(Debug)]
pub struct HnswVectorIndex {
    dimension: usize,
    metric: DistanceMetric,
    m: usize,
    ef_construction: usize,
    default_ef_runtime: usize,
    /// Level multiplier `1 / ln(m)`.
    ml: f64,
    entry: Option<DocId>,
    nodes: AHashMap<DocId, Node>,
    docs: Vec<DocId>,
    rng: StdRng,
}

impl HnswVectorIndex {
    pub fn new(params: &VectorParams) -> Self {
        let m = params.m.max(2);
        Self {
            dimension: params.dimension,
            metric: params.metric,
            m,
            ef_construction: params.ef_construction.max(1),
            default_ef_runtime: params.ef_runtime.max(1),
            ml: 1.0 / (m as f64).ln(),
            entry: None,
            nodes: AHashMap::with_capacity(params.capacity),
            docs: Vec::with_capacity(params.capacity),
            rng: StdRng::seed_from_u64(LEVEL_SEED),
        }
    }

    pub fn info(&self) -> (usize, DistanceMetric) {
        (self.dimension, self.metric)
    }

    /// Ascending ids of all documents holding a vector.
    pub fn all_docs_with_values(&self) -> &[DocId] {
        &self.docs
    }

    fn max_connections(&self, level: usize) -> usize {
        if level == 0 { self.m * 2 } else { self.m }
    }

    fn sample_level(&mut self) -> usize {
        let unit: f64 = 1.0 - self.rng.random::<f64>();
        ((-unit.ln() * self.ml).floor() as usize).min(MAX_LEVEL)
    }

    fn dist_to(&self, query: &[f32], doc: DocId) -> f32 {
        distance(query, &self.nodes[&doc].vector, self.metric)
    }

    /// Insert a document's vector. A vector of the wrong length refuses the
    /// document.
    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        let Some(vector) = access.vector(field) else {
            return true;
        };
        if vector.len() != self.dimension {
            return false;
        }
        self.insert_vector(doc, vector.to_vec());
        true
    }

    fn insert_vector(&mut self, doc: DocId, vector: Vec<f32>) {
        let level = self.sample_level();
        let query = vector.clone();
        self.nodes.insert(
            doc,
            Node {
                vector,
                neighbors: vec![Vec::new(); level + 1],
            },
        );
        insert_sorted(&mut self.docs, doc);

        let Some(entry) = self.entry else {
            self.entry = Some(doc);
            return;
        };
        let top = self.nodes[&entry].top_level();

        let mut ep = entry;
        for lvl in (level + 1..=top).rev() {
            ep = self.greedy_closest(&query, ep, lvl);
        }

        for lvl in (0..=level.min(top)).rev() {
            let candidates = self.search_layer(&query, &[ep], self.ef_construction, lvl, None);
            let max = self.max_connections(lvl);
            for &Scored { doc: neighbor, .. } in candidates.iter().take(max) {
                if neighbor == doc {
                    continue;
                }
                self.nodes.get_mut(&doc).unwrap().neighbors[lvl].push(neighbor);
                self.nodes.get_mut(&neighbor).unwrap().neighbors[lvl].push(doc);
                self.prune_neighbors(neighbor, lvl);
            }
            if let Some(closest) = candidates.first() {
                ep = closest.doc;
            }
        }

        if level > top {
            self.entry = Some(doc);
        }
    }

    /// Truncate an over-full neighbour list, keeping the closest.
    fn prune_neighbors(&mut self, doc: DocId, level: usize) {
        let max = self.max_connections(level);
        if self.nodes[&doc].neighbors[level].len() <= max {
            return;
        }
        let base = self.nodes[&doc].vector.clone();
        let mut scored: Vec<Scored> = self.nodes[&doc].neighbors[level]
            .iter()
            .map(|&n| Scored {
                dist: distance(&base, &self.nodes[&n].vector, self.metric),
                doc: n,
            })
            .collect();
        scored.sort_unstable();
        scored.dedup_by_key(|s| s.doc);
        scored.truncate(max);
        self.nodes.get_mut(&doc).unwrap().neighbors[level] =
            scored.into_iter().map(|s| s.doc).collect();
    }

    /// Greedy descent within one layer: follow the closest neighbour until
    /// no improvement.
    fn greedy_closest(&self, query: &[f32], start: DocId, level: usize) -> DocId {
        let mut current = start;
        let mut current_dist = self.dist_to(query, current);
        loop {
            let mut improved = false;
            for &n in &self.nodes[&current].neighbors[level] {
                let d = self.dist_to(query, n);
                if d < current_dist {
                    current = n;
                    current_dist = d;
                    improved = true;
                }
            }
            if !improved {
                return current;
            }
        }
    }

    /// Beam search of width `ef` within one layer. When `allowed` is set,
    /// only allowed documents enter the result set; traversal is unrestricted
    /// so the graph stays navigable.
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[DocId],
        ef: usize,
        level: usize,
        allowed: Option<&AHashSet<DocId>>,
    ) -> Vec<Scored> {
        let mut visited: AHashSet<DocId> = AHashSet::new();
        let mut candidates: BinaryHeap<Reverse<Scored>> = BinaryHeap::new();
        let mut results: BinaryHeap<Scored> = BinaryHeap::new();

        for &ep in entry_points {
            if !visited.insert(ep) {
                continue;
            }
            let scored = Scored {
                dist: self.dist_to(query, ep),
                doc: ep,
            };
            candidates.push(Reverse(scored));
            if allowed.is_none_or(|a| a.contains(&ep)) {
                results.push(scored);
            }
        }

        while let Some(Reverse(current)) = candidates.pop() {
            let worst = if results.len() >= ef {
                results.peek().map(|s| s.dist).unwrap_or(f32::INFINITY)
            } else {
                f32::INFINITY
            };
            if current.dist > worst {
                break;
            }
            for &n in &self.nodes[&current.doc].neighbors[level] {
                if !visited.insert(n) {
                    continue;
                }
                let d = self.dist_to(query, n);
                if results.len() < ef || d < worst {
                    candidates.push(Reverse(Scored { dist: d, doc: n }));
                    if allowed.is_none_or(|a| a.contains(&n)) {
                        results.push(Scored { dist: d, doc: n });
                        if results.len() > ef {
                            results.pop();
                        }
                    }
                }
            }
        }

        let mut out = results.into_vec();
        out.sort_unstable();
        out
    }

    /// The `limit` nearest documents, ascending by distance.
    pub fn knn(&self, query: &[f32], limit: usize, ef_runtime: Option<usize>) -> Vec<(f32, DocId)> {
        self.knn_inner(query, limit, ef_runtime, None)
    }

    /// Like [`Self::knn`], restricted to `allowed` documents.
    pub fn knn_filtered(
        &self,
        query: &[f32],
        limit: usize,
        ef_runtime: Option<usize>,
        allowed: &[DocId],
    ) -> Vec<(f32, DocId)> {
        let allowed: AHashSet<DocId> = allowed.iter().copied().collect();
        self.knn_inner(query, limit, ef_runtime, Some(&allowed))
    }

    fn knn_inner(
        &self,
        query: &[f32],
        limit: usize,
        ef_runtime: Option<usize>,
        allowed: Option<&AHashSet<DocId>>,
    ) -> Vec<(f32, DocId)> {
        debug_assert_eq!(query.len(), self.dimension);
        let Some(entry) = self.entry else {
            return Vec::new();
        };
        let ef = ef_runtime.unwrap_or(self.default_ef_runtime).max(limit);

        let mut ep = entry;
        for lvl in (1..=self.nodes[&entry].top_level()).rev() {
            ep = self.greedy_closest(query, ep, lvl);
        }
        let mut results = self.search_layer(query, &[ep], ef, 0, allowed);
        results.truncate(limit);
        results.into_iter().map(|s| (s.dist, s.doc)).collect()
    }

    /// Detach a document from the graph, repairing neighbour lists.
    pub fn remove(&mut self, doc: DocId, _access: &dyn DocumentAccessor, _field: &str) {
        let Some(node) = self.nodes.remove(&doc) else {
            return;
        };
        remove_sorted(&mut self.docs, doc);

        // Pruning makes edges asymmetric, so sweep every list.
        for other in self.nodes.values_mut() {
            for list in &mut other.neighbors {
                list.retain(|&n| n != doc);
            }
        }

        // Bridge the removed node's neighbours so the layer stays connected.
        for (level, neighbors) in node.neighbors.iter().enumerate() {
            for &n in neighbors {
                if !self.nodes.contains_key(&n) {
                    continue;
                }
                for &other in neighbors {
                    if other == n || !self.nodes.contains_key(&other) {
                        continue;
                    }
                    let list = &mut self.nodes.get_mut(&n).unwrap().neighbors[level];
                    if !list.contains(&other) {
                        list.push(other);
                    }
                }
                self.prune_neighbors(n, level);
            }
        }

        if self.entry == Some(doc) {
            self.entry = self
                .nodes
                .iter()
                .max_by_key(|(id, n)| (n.top_level(), Reverse(*id)))
                .map(|(id, _)| *id);
        }
    }
}
