//! Search façade: parse a query once, evaluate it against any registry.

pub(crate) mod eval;
pub mod profile;

use tracing::{debug, info};

use crate::index::DocId;
use crate::indices::FieldIndices;
use crate::query::ast::{AstNode, QueryParams};
use crate::query::parser::parse_query;
use crate::search::eval::Searcher;
use crate::search::profile::QueryProfile;

/// The outcome of one evaluation.
///
/// A populated `error` marks a failed search; the other fields are then
/// meaningless and callers must discard them.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    /// Number of matched documents.
    pub total: usize,
    /// Matched ids. Ascending, except for k-NN queries where they come in
    /// distance order.
    pub ids: Vec<DocId>,
    /// `(doc, distance)` pairs parallel to `ids`, present for k-NN queries.
    pub knn_scores: Vec<(DocId, f32)>,
    /// Size of the k-NN pre-filter result, before ranking cut it down.
    pub preagg_total: usize,
    /// Per-node trace, when profiling was enabled.
    pub profile: Option<QueryProfile>,
    /// First evaluation error, if any.
    pub error: Option<String>,
}

/// Sort metadata of a top-level k-NN query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnnScoreSortOption {
    pub score_alias: String,
    pub limit: usize,
}

/// A parsed query, reusable across registries.
///
/// `init` parses once; `search` evaluates against a registry with a fresh
/// evaluator per call, so one instance can serve many searches.
#[derive(Debug, Default)]
pub struct SearchAlgorithm {
    query: Option<AstNode>,
    profiling_enabled: bool,
}

impl SearchAlgorithm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `query`, resolving `$name` references against `params`.
    ///
    /// Returns `false` on a syntax error or an empty query; the failure is
    /// logged, not surfaced.
    pub fn init(&mut self, query: &str, params: Option<&QueryParams>) -> bool {
        match parse_query(query, params) {
            Ok(ast) if ast.is_empty() => {
                info!(query, "empty result after parsing query");
                false
            }
            Ok(ast) => {
                self.query = Some(ast);
                true
            }
            Err(err) => {
                info!(query, error = %err, "failed to parse query");
                false
            }
        }
    }

    /// Record a per-node profile on subsequent searches.
    pub fn enable_profiling(&mut self) {
        self.profiling_enabled = true;
    }

    /// Evaluate the parsed query against a registry.
    pub fn search(&self, indices: &FieldIndices) -> SearchResult {
        debug_assert!(self.query.is_some(), "init must succeed before search");
        let Some(query) = &self.query else {
            return SearchResult {
                error: Some("query was not initialized".to_string()),
                ..SearchResult::default()
            };
        };

        let mut searcher = Searcher::new(indices);
        if self.profiling_enabled {
            searcher.enable_profiling();
        }
        let result = searcher.search(query);
        debug!(
            total = result.total,
            error = result.error.as_deref().unwrap_or(""),
            "search finished"
        );
        result
    }

    /// Sort metadata when the root of the query is a k-NN clause.
    pub fn knn_score_sort_option(&self) -> Option<KnnScoreSortOption> {
        match &self.query {
            Some(AstNode::Knn(knn)) => Some(KnnScoreSortOption {
                score_alias: knn.score_alias.clone(),
                limit: knn.limit,
            }),
            _ => None,
        }
    }
}
