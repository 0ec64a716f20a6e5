//! Numeric field index: value-partitioned blocks with borrowing range queries.

use ahash::AHashMap;

use crate::data::DocumentAccessor;
use crate::index::{DocId, insert_sorted, remove_sorted};
use crate::schema::NumericParams;

/// One contiguous value partition.
///
/// `entries` stays sorted by `(value, doc)` for boundary filtering; `docs`
/// keeps the same documents in ascending id order so that fully-covered
/// blocks can be lent out without copying.
#[derive(Debug, Default)]
struct Block {
    entries: Vec<(f64, DocId)>,
    docs: Vec<DocId>,
}

impl Block {
    fn min(&self) -> f64 {
        self.entries.first().map(|e| e.0).unwrap_or(f64::INFINITY)
    }

    fn max(&self) -> f64 {
        self.entries.last().map(|e| e.0).unwrap_or(f64::NEG_INFINITY)
    }

    fn insert(&mut self, value: f64, doc: DocId) {
        let pos = self
            .entries
            .partition_point(|&(v, d)| v < value || (v == value && d < doc));
        self.entries.insert(pos, (value, doc));
        insert_sorted(&mut self.docs, doc);
    }

    fn remove(&mut self, value: f64, doc: DocId) -> bool {
        let pos = self
            .entries
            .partition_point(|&(v, d)| v < value || (v == value && d < doc));
        if self.entries.get(pos) == Some(&(value, doc)) {
            self.entries.remove(pos);
            remove_sorted(&mut self.docs, doc);
            true
        } else {
            false
        }
    }

    /// Ascending ids of the entries with values in `[lo, hi]`.
    fn filtered(&self, lo: f64, hi: f64) -> Vec<DocId> {
        let mut ids: Vec<DocId> = self
            .entries
            .iter()
            .filter(|&&(v, _)| lo <= v && v <= hi)
            .map(|&(_, d)| d)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// One ascending id source inside a [`RangeResult`].
#[derive(Debug)]
pub enum BlockSet<'a> {
    Borrowed(&'a [DocId]),
    Owned(Vec<DocId>),
}

impl BlockSet<'_> {
    pub fn len(&self) -> usize {
        match self {
            BlockSet::Borrowed(s) => s.len(),
            BlockSet::Owned(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[DocId] {
        match self {
            BlockSet::Borrowed(s) => s,
            BlockSet::Owned(v) => v,
        }
    }
}

/// Result of a numeric range query.
///
/// At most two id sources are exposed; a query touching more blocks is
/// collapsed into a single owned sequence. Iteration is ascending in every
/// form and the reported size is exact.
#[derive(Debug)]
pub enum RangeResult<'a> {
    Single(BlockSet<'a>),
    Two(BlockSet<'a>, BlockSet<'a>),
}

impl<'a> RangeResult<'a> {
    pub fn empty() -> Self {
        RangeResult::Single(BlockSet::Owned(Vec::new()))
    }

    pub fn len(&self) -> usize {
        match self {
            RangeResult::Single(s) => s.len(),
            RangeResult::Two(a, b) => a.len() + b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> RangeIter<'_> {
        match self {
            RangeResult::Single(s) => RangeIter {
                left: s.as_slice(),
                right: &[],
            },
            RangeResult::Two(a, b) => RangeIter {
                left: a.as_slice(),
                right: b.as_slice(),
            },
        }
    }

    pub fn to_vec(&self) -> Vec<DocId> {
        self.iter().collect()
    }

    fn from_sources(mut sources: Vec<BlockSet<'a>>) -> Self {
        match sources.len() {
            0 => RangeResult::empty(),
            1 => RangeResult::Single(sources.pop().unwrap()),
            2 => {
                let b = sources.pop().unwrap();
                let a = sources.pop().unwrap();
                RangeResult::Two(a, b)
            }
            _ => {
                let mut merged: Vec<DocId> =
                    Vec::with_capacity(sources.iter().map(BlockSet::len).sum());
                for source in &sources {
                    merged.extend_from_slice(source.as_slice());
                }
                merged.sort_unstable();
                RangeResult::Single(BlockSet::Owned(merged))
            }
        }
    }
}

/// Ascending merge over the (disjoint) id sources of a range result.
#[derive(Debug)]
pub struct RangeIter<'a> {
    left: &'a [DocId],
    right: &'a [DocId],
}

impl Iterator for RangeIter<'_> {
    type Item = DocId;

    fn next(&mut self) -> Option<DocId> {
        match (self.left.first(), self.right.first()) {
            (Some(&l), Some(&r)) if l <= r => {
                self.left = &self.left[1..];
                Some(l)
            }
            (_, Some(&r)) => {
                self.right = &self.right[1..];
                Some(r)
            }
            (Some(&l), None) => {
                self.left = &self.left[1..];
                Some(l)
            }
            (None, None) => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.left.len() + self.right.len();
        (len, Some(len))
    }
}

/// An index over the values of a single NUMERIC field.
#[derive(Debug)]
pub struct NumericIndex {
    block_size: usize,
    blocks: Vec<Block>,
    values: AHashMap<DocId, f64>,
    docs: Vec<DocId>,
}

impl NumericIndex {
    pub fn new(params: &NumericParams) -> Self {
        Self {
            block_size: params.block_size.max(1),
            blocks: Vec::new(),
            values: AHashMap::new(),
            docs: Vec::new(),
        }
    }

    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        let value = match access.numeric(field) {
            Ok(Some(value)) => value,
            Ok(None) => return true,
            Err(_) => return false,
        };
        self.values.insert(doc, value);
        insert_sorted(&mut self.docs, doc);

        let pos = if self.blocks.is_empty() {
            self.blocks.push(Block::default());
            0
        } else {
            self.blocks
                .partition_point(|b| b.max() < value)
                .min(self.blocks.len() - 1)
        };
        self.blocks[pos].insert(value, doc);
        if self.blocks[pos].entries.len() > 2 * self.block_size {
            self.split_block(pos);
        }
        true
    }

    fn split_block(&mut self, pos: usize) {
        let mid = self.blocks[pos].entries.len() / 2;
        let upper_entries = self.blocks[pos].entries.split_off(mid);
        let mut upper = Block::default();
        for (value, doc) in upper_entries {
            remove_sorted(&mut self.blocks[pos].docs, doc);
            upper.insert(value, doc);
        }
        self.blocks.insert(pos + 1, upper);
    }

    pub fn remove(&mut self, doc: DocId, _access: &dyn DocumentAccessor, _field: &str) {
        let Some(value) = self.values.remove(&doc) else {
            return;
        };
        remove_sorted(&mut self.docs, doc);
        // Blocks may share boundary values, so probe every candidate.
        let start = self.blocks.partition_point(|b| b.max() < value);
        for pos in start..self.blocks.len() {
            if self.blocks[pos].min() > value {
                break;
            }
            if self.blocks[pos].remove(value, doc) {
                if self.blocks[pos].entries.is_empty() {
                    self.blocks.remove(pos);
                }
                return;
            }
        }
    }

    /// All documents with `lo <= value <= hi`, ascending.
    pub fn range(&self, lo: f64, hi: f64) -> RangeResult<'_> {
        if lo > hi {
            return RangeResult::empty();
        }
        let start = self.blocks.partition_point(|b| b.max() < lo);
        let end = self.blocks.partition_point(|b| b.min() <= hi);
        let mut sources = Vec::new();
        for block in &self.blocks[start..end] {
            if lo <= block.min() && block.max() <= hi {
                sources.push(BlockSet::Borrowed(block.docs.as_slice()));
            } else {
                let filtered = block.filtered(lo, hi);
                if !filtered.is_empty() {
                    sources.push(BlockSet::Owned(filtered));
                }
            }
        }
        RangeResult::from_sources(sources)
    }

    /// Ascending ids of all documents holding a value in this field.
    pub fn all_docs_with_values(&self) -> &[DocId] {
        &self.docs
    }
}
