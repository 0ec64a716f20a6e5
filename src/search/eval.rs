//! Query evaluation: document-id set representation, set algebra, and the
//! per-node evaluators.

use std::mem;

use crate::index::numeric::{RangeIter, RangeResult};
use crate::index::posting::{PostingIter, PostingList};
use crate::index::vector::{VectorIndex, distance};
use crate::index::{DocId, FieldIndex, NumericIndex, TagIndex, TextIndex};
use crate::indices::FieldIndices;
use crate::query::ast::{AffixNode, AstNode, KnnNode, LogicalOp, MatchKind, RangeNode};
use crate::search::profile::ProfileBuilder;
use crate::search::SearchResult;

/// A document-id set produced by one evaluation step.
///
/// Owned sets come out of merges and exact term lookups; the borrowed forms
/// lend index-internal structures to the evaluator without copying. Every
/// form iterates in strictly ascending id order. `size()` is an upper bound
/// suitable for pre-allocation.
#[derive(Debug)]
pub(crate) enum IndexResult<'a> {
    Owned(Vec<DocId>),
    Slice(&'a [DocId]),
    Posting(&'a PostingList),
    Range(RangeResult<'a>),
}

impl<'a> IndexResult<'a> {
    pub(crate) fn empty() -> Self {
        IndexResult::Owned(Vec::new())
    }

    pub(crate) fn size(&self) -> usize {
        match self {
            IndexResult::Owned(v) => v.len(),
            IndexResult::Slice(s) => s.len(),
            IndexResult::Posting(p) => p.len(),
            IndexResult::Range(r) => r.len(),
        }
    }

    pub(crate) fn iter(&self) -> ResultIter<'_> {
        match self {
            IndexResult::Owned(v) => ResultIter::Slice(v.iter()),
            IndexResult::Slice(s) => ResultIter::Slice(s.iter()),
            IndexResult::Posting(p) => ResultIter::Posting(p.iter()),
            IndexResult::Range(r) => ResultIter::Range(r.iter()),
        }
    }

    /// Move out of an owned set, or materialise a borrowed one.
    pub(crate) fn take(self) -> Vec<DocId> {
        match self {
            IndexResult::Owned(v) => v,
            other => {
                let mut out = Vec::with_capacity(other.size());
                out.extend(other.iter());
                out
            }
        }
    }
}

/// Uniform ascending iteration over any [`IndexResult`] form.
pub(crate) enum ResultIter<'r> {
    Slice(std::slice::Iter<'r, DocId>),
    Posting(PostingIter<'r>),
    Range(RangeIter<'r>),
}

impl Iterator for ResultIter<'_> {
    type Item = DocId;

    fn next(&mut self) -> Option<DocId> {
        match self {
            ResultIter::Slice(it) => it.next().copied(),
            ResultIter::Posting(it) => it.next(),
            ResultIter::Range(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            ResultIter::Slice(it) => it.size_hint(),
            ResultIter::Posting(it) => it.size_hint(),
            ResultIter::Range(it) => it.size_hint(),
        }
    }
}

/// Sorted two-way intersection.
fn intersect_into(
    out: &mut Vec<DocId>,
    mut a: impl Iterator<Item = DocId>,
    mut b: impl Iterator<Item = DocId>,
) {
    let mut x = a.next();
    let mut y = b.next();
    while let (Some(da), Some(db)) = (x, y) {
        match da.cmp(&db) {
            std::cmp::Ordering::Less => x = a.next(),
            std::cmp::Ordering::Greater => y = b.next(),
            std::cmp::Ordering::Equal => {
                out.push(da);
                x = a.next();
                y = b.next();
            }
        }
    }
}

/// Sorted two-way union.
fn union_into(
    out: &mut Vec<DocId>,
    mut a: impl Iterator<Item = DocId>,
    mut b: impl Iterator<Item = DocId>,
) {
    let mut x = a.next();
    let mut y = b.next();
    loop {
        match (x, y) {
            (Some(da), Some(db)) => match da.cmp(&db) {
                std::cmp::Ordering::Less => {
                    out.push(da);
                    x = a.next();
                }
                std::cmp::Ordering::Greater => {
                    out.push(db);
                    y = b.next();
                }
                std::cmp::Ordering::Equal => {
                    out.push(da);
                    x = a.next();
                    y = b.next();
                }
            },
            (Some(da), None) => {
                out.push(da);
                x = a.next();
            }
            (None, Some(db)) => {
                out.push(db);
                y = b.next();
            }
            (None, None) => break,
        }
    }
}

fn is_ascending(result: &IndexResult<'_>) -> bool {
    result.iter().is_sorted()
}

/// One evaluation pass over a parsed query.
///
/// Holds the evaluator-scoped state: the sticky first error, the reusable
/// merge scratch buffer, and the k-NN score sink.
pub(crate) struct Searcher<'a> {
    indices: &'a FieldIndices,
    error: Option<String>,
    profile: Option<ProfileBuilder>,
    scratch: Vec<DocId>,
    knn_scores: Vec<(DocId, f32)>,
    preagg_total: usize,
}

impl<'a> Searcher<'a> {
    pub(crate) fn new(indices: &'a FieldIndices) -> Self {
        Self {
            indices,
            error: None,
            profile: None,
            scratch: Vec::new(),
            knn_scores: Vec::new(),
            preagg_total: 0,
        }
    }

    pub(crate) fn enable_profiling(&mut self) {
        self.profile = Some(ProfileBuilder::default());
    }

    /// Evaluate the whole query and package the outcome.
    pub(crate) fn search(mut self, query: &AstNode) -> SearchResult {
        let result = self.eval(query, "", true);
        let profile = self.profile.take().map(ProfileBuilder::take);
        let ids = result.take();
        SearchResult {
            total: ids.len(),
            ids,
            knn_scores: self.knn_scores,
            preagg_total: self.preagg_total,
            profile,
            error: self.error,
        }
    }

    /// The first error wins; later ones are dropped.
    fn set_error(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }

    fn base_index(&mut self, field: &str) -> Option<&'a FieldIndex> {
        match self.indices.index(field) {
            Some(index) => Some(index),
            None => {
                self.set_error(format!("Invalid field: {field}"));
                None
            }
        }
    }

    fn text_index(&mut self, field: &str) -> Option<&'a TextIndex> {
        let index = self.base_index(field)?;
        match index.as_text() {
            Some(index) => Some(index),
            None => {
                self.set_error(format!("Wrong access type for field: {field}"));
                None
            }
        }
    }

    fn tag_index(&mut self, field: &str) -> Option<&'a TagIndex> {
        let index = self.base_index(field)?;
        match index.as_tag() {
            Some(index) => Some(index),
            None => {
                self.set_error(format!("Wrong access type for field: {field}"));
                None
            }
        }
    }

    fn numeric_index(&mut self, field: &str) -> Option<&'a NumericIndex> {
        let index = self.base_index(field)?;
        match index.as_numeric() {
            Some(index) => Some(index),
            None => {
                self.set_error(format!("Wrong access type for field: {field}"));
                None
            }
        }
    }

    fn vector_index(&mut self, field: &str) -> Option<&'a VectorIndex> {
        let index = self.base_index(field)?;
        match index.as_vector() {
            Some(index) => Some(index),
            None => {
                self.set_error(format!("Wrong access type for field: {field}"));
                None
            }
        }
    }

    /// Merge `matched` into `current` under `op`, reusing the scratch buffer
    /// and keeping the previous owned allocation alive for the next merge.
    fn merge(&mut self, matched: IndexResult<'a>, current: &mut IndexResult<'a>, op: LogicalOp) {
        self.scratch.clear();
        match op {
            LogicalOp::And => {
                self.scratch.reserve(matched.size().min(current.size()));
                intersect_into(&mut self.scratch, matched.iter(), current.iter());
            }
            LogicalOp::Or => {
                self.scratch.reserve(matched.size() + current.size());
                union_into(&mut self.scratch, matched.iter(), current.iter());
            }
        }
        match current {
            IndexResult::Owned(v) => {
                mem::swap(v, &mut self.scratch);
                self.scratch.clear();
            }
            _ => *current = IndexResult::Owned(mem::take(&mut self.scratch)),
        }
    }

    /// Reduce sub-results under `op`, smallest operand first.
    ///
    /// For AND the running set only shrinks, so starting with the smallest
    /// minimises comparisons; for OR unifying smaller sets first reduces the
    /// element traversals on average.
    fn unify_results(
        &mut self,
        mut sub_results: Vec<IndexResult<'a>>,
        op: LogicalOp,
    ) -> IndexResult<'a> {
        if sub_results.is_empty() {
            return IndexResult::empty();
        }
        sub_results.sort_by_key(IndexResult::size);

        let mut iter = sub_results.into_iter();
        let mut out = iter.next().unwrap();
        for matched in iter {
            self.merge(matched, &mut out, op);
        }
        out
    }

    /// OR together the posting lists yielded by one affix match.
    fn collect_postings(&mut self, lists: Vec<&'a PostingList>) -> IndexResult<'a> {
        let mut result = IndexResult::empty();
        for list in lists {
            self.merge(IndexResult::Posting(list), &mut result, LogicalOp::Or);
        }
        result
    }

    fn eval_star(&mut self, active_field: &str) -> IndexResult<'a> {
        debug_assert!(active_field.is_empty());
        IndexResult::Slice(self.indices.all_docs())
    }

    fn eval_star_field(&mut self, active_field: &str) -> IndexResult<'a> {
        // A sort index, when present, is the cheapest non-null set.
        if let Some(sort_index) = self.indices.sort_index(active_field) {
            return IndexResult::Slice(sort_index.all_docs_with_values());
        }
        match self.base_index(active_field) {
            Some(index) => IndexResult::Slice(index.all_docs_with_values()),
            None => IndexResult::empty(),
        }
    }

    /// Exact term: synonym-expanded lookup on the scoped text index, or an
    /// OR across every text index when no field scope is set.
    fn eval_term(&mut self, affix: &AffixNode, active_field: &str) -> IndexResult<'a> {
        let mut term = affix.affix.clone();
        let mut strip_whitespace = true;
        if let Some(synonyms) = self.indices.synonyms()
            && let Some(group) = synonyms.group_token(&term)
        {
            term = group.to_string();
            strip_whitespace = false;
        }

        if !active_field.is_empty() {
            return match self.text_index(active_field) {
                Some(index) => IndexResult::Owned(index.matching(&term, strip_whitespace)),
                None => IndexResult::empty(),
            };
        }

        let sub_results: Vec<IndexResult<'a>> = self
            .indices
            .text_indices()
            .into_iter()
            .map(|index| IndexResult::Owned(index.matching(&term, strip_whitespace)))
            .collect();
        self.unify_results(sub_results, LogicalOp::Or)
    }

    /// Prefix/suffix/infix: same fan-out as terms, with the matched
    /// vocabulary entries of each index OR-merged.
    fn eval_affix(&mut self, affix: &AffixNode, active_field: &str) -> IndexResult<'a> {
        let indices: Vec<&'a TextIndex> = if !active_field.is_empty() {
            match self.text_index(active_field) {
                Some(index) => vec![index],
                None => return IndexResult::empty(),
            }
        } else {
            self.indices.text_indices()
        };

        let mut sub_results = Vec::with_capacity(indices.len());
        for index in indices {
            let mut lists: Vec<&'a PostingList> = Vec::new();
            match affix.kind {
                MatchKind::Prefix => index.match_prefix(&affix.affix, |l| lists.push(l)),
                MatchKind::Suffix => index.match_suffix(&affix.affix, |l| lists.push(l)),
                MatchKind::Infix => index.match_infix(&affix.affix, |l| lists.push(l)),
                MatchKind::Term => debug_assert!(false, "terms are evaluated separately"),
            }
            sub_results.push(self.collect_postings(lists));
        }
        self.unify_results(sub_results, LogicalOp::Or)
    }

    fn eval_range(&mut self, range: &RangeNode, active_field: &str) -> IndexResult<'a> {
        debug_assert!(!active_field.is_empty());
        match self.numeric_index(active_field) {
            Some(index) => IndexResult::Range(index.range(range.lo, range.hi)),
            None => IndexResult::empty(),
        }
    }

    /// Complement with respect to the master id list.
    fn eval_negate(&mut self, child: &AstNode, active_field: &str) -> IndexResult<'a> {
        let matched = self.eval(child, active_field, false).take();
        let mut all: Vec<DocId> = self.indices.all_docs().to_vec();
        all.retain(|doc| matched.binary_search(doc).is_err());
        IndexResult::Owned(all)
    }

    fn eval_logical(
        &mut self,
        op: LogicalOp,
        nodes: &[AstNode],
        active_field: &str,
    ) -> IndexResult<'a> {
        let mut sub_results = Vec::with_capacity(nodes.len());
        for node in nodes {
            sub_results.push(self.eval(node, active_field, false));
        }
        self.unify_results(sub_results, op)
    }

    fn eval_tags(&mut self, tags: &[AffixNode], active_field: &str) -> IndexResult<'a> {
        let Some(index) = self.tag_index(active_field) else {
            return IndexResult::empty();
        };

        let mut sub_results = Vec::with_capacity(tags.len());
        for tag in tags {
            let result = match tag.kind {
                MatchKind::Term => IndexResult::Owned(index.matching(&tag.affix)),
                MatchKind::Prefix | MatchKind::Suffix | MatchKind::Infix => {
                    let mut lists: Vec<&'a PostingList> = Vec::new();
                    match tag.kind {
                        MatchKind::Prefix => index.match_prefix(&tag.affix, |l| lists.push(l)),
                        MatchKind::Suffix => index.match_suffix(&tag.affix, |l| lists.push(l)),
                        _ => index.match_infix(&tag.affix, |l| lists.push(l)),
                    }
                    self.collect_postings(lists)
                }
            };
            sub_results.push(result);
        }
        self.unify_results(sub_results, LogicalOp::Or)
    }

    /// k-NN driver: evaluate the pre-filter, then rank by distance either
    /// through the graph index or by brute-force scan.
    fn eval_knn(&mut self, knn: &KnnNode, active_field: &str) -> IndexResult<'a> {
        debug_assert!(active_field.is_empty());
        let sub_results = self.eval(&knn.filter, "", false);

        let Some(index) = self.vector_index(&knn.field) else {
            return IndexResult::empty();
        };
        let (dimension, metric) = index.info();
        if dimension != knn.vec.len() {
            self.set_error(format!(
                "Wrong vector index dimensions, got: {}, expected: {}",
                knn.vec.len(),
                dimension
            ));
            return IndexResult::empty();
        }

        self.preagg_total = sub_results.size();
        self.knn_scores.clear();

        let cmp = |a: &(f32, DocId), b: &(f32, DocId)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
        let distances: Vec<(f32, DocId)> = match index {
            VectorIndex::Hnsw(hnsw) => {
                // A filter covering every document is no filter at all.
                if self.indices.all_docs().len() == sub_results.size() {
                    hnsw.knn(&knn.vec, knn.limit, knn.ef_runtime)
                } else {
                    hnsw.knn_filtered(&knn.vec, knn.limit, knn.ef_runtime, &sub_results.take())
                }
            }
            VectorIndex::Flat(flat) => {
                let mut distances = Vec::with_capacity(sub_results.size());
                for doc in sub_results.iter() {
                    if let Some(vector) = flat.get(doc) {
                        distances.push((distance(&knn.vec, vector, metric), doc));
                    }
                }
                let keep = knn.limit.min(distances.len());
                if keep > 0 && keep < distances.len() {
                    distances.select_nth_unstable_by(keep - 1, cmp);
                }
                distances.truncate(keep);
                distances.sort_unstable_by(cmp);
                distances
            }
        };

        let mut out = Vec::with_capacity(distances.len());
        self.knn_scores.reserve(distances.len());
        for (dist, doc) in distances {
            self.knn_scores.push((doc, dist));
            out.push(doc);
        }
        IndexResult::Owned(out)
    }

    /// Dispatch one node, short-circuiting after the first error.
    ///
    /// Top-level and k-NN results may be unsorted (they feed scoring); every
    /// other result must come back ascending.
    fn eval(&mut self, node: &AstNode, active_field: &str, top_level: bool) -> IndexResult<'a> {
        if self.error.is_some() {
            return IndexResult::empty();
        }

        let started = self.profile.as_mut().map(ProfileBuilder::start);

        let result = match node {
            AstNode::Empty => IndexResult::empty(),
            AstNode::Star => self.eval_star(active_field),
            AstNode::StarField => self.eval_star_field(active_field),
            AstNode::Affix(affix) if affix.kind == MatchKind::Term => {
                self.eval_term(affix, active_field)
            }
            AstNode::Affix(affix) => self.eval_affix(affix, active_field),
            AstNode::Range(range) => self.eval_range(range, active_field),
            AstNode::Negate(child) => self.eval_negate(child, active_field),
            AstNode::Logical { op, nodes } => self.eval_logical(*op, nodes, active_field),
            AstNode::Tags(tags) => self.eval_tags(tags, active_field),
            AstNode::Field { field, node } => {
                debug_assert!(active_field.is_empty());
                self.eval(node, field, false)
            }
            AstNode::Knn(knn) => self.eval_knn(knn, active_field),
        };

        debug_assert!(
            top_level || matches!(node, AstNode::Knn(_)) || is_ascending(&result),
            "non-top-level results must be ascending"
        );

        if let (Some(start), Some(profile)) = (started, self.profile.as_mut()) {
            profile.finish(start, node, result.size());
        }

        result
    }
}
