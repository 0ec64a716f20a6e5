//! Sort indexes: per-document sortable values for SORTABLE fields.

use ahash::AHashMap;

use crate::data::DocumentAccessor;
use crate::index::{DocId, insert_sorted, remove_sorted};

/// A value usable as a sort key.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SortableValue {
    #[default]
    Null,
    Num(f64),
    Str(String),
}

/// Sortable string values of a TEXT or TAG field.
#[derive(Debug, Default)]
pub struct StringSortIndex {
    values: AHashMap<DocId, String>,
    docs: Vec<DocId>,
}

impl StringSortIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        let Some(value) = access.text(field).or_else(|| access.tags(field)) else {
            return true;
        };
        self.values.insert(doc, value.to_string());
        insert_sorted(&mut self.docs, doc);
        true
    }

    pub fn remove(&mut self, doc: DocId, _access: &dyn DocumentAccessor, _field: &str) {
        if self.values.remove(&doc).is_some() {
            remove_sorted(&mut self.docs, doc);
        }
    }

    pub fn lookup(&self, doc: DocId) -> SortableValue {
        self.values
            .get(&doc)
            .map(|s| SortableValue::Str(s.clone()))
            .unwrap_or_default()
    }

    pub fn all_docs_with_values(&self) -> &[DocId] {
        &self.docs
    }
}

/// Sortable numeric values of a NUMERIC field.
#[derive(Debug, Default)]
pub struct NumericSortIndex {
    values: AHashMap<DocId, f64>,
    docs: Vec<DocId>,
}

impl NumericSortIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        let value = match access.numeric(field) {
            Ok(Some(value)) => value,
            Ok(None) => return true,
            Err(_) => return false,
        };
        self.values.insert(doc, value);
        insert_sorted(&mut self.docs, doc);
        true
    }

    pub fn remove(&mut self, doc: DocId, _access: &dyn DocumentAccessor, _field: &str) {
        if self.values.remove(&doc).is_some() {
            remove_sorted(&mut self.docs, doc);
        }
    }

    pub fn lookup(&self, doc: DocId) -> SortableValue {
        self.values
            .get(&doc)
            .map(|&n| SortableValue::Num(n))
            .unwrap_or_default()
    }

    pub fn all_docs_with_values(&self) -> &[DocId] {
        &self.docs
    }
}

/// A sort index of either kind.
#[derive(Debug)]
pub enum SortFieldIndex {
    Str(StringSortIndex),
    Num(NumericSortIndex),
}

impl SortFieldIndex {
    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        match self {
            SortFieldIndex::Str(ix) => ix.add(doc, access, field),
            SortFieldIndex::Num(ix) => ix.add(doc, access, field),
        }
    }

    pub fn remove(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) {
        match self {
            SortFieldIndex::Str(ix) => ix.remove(doc, access, field),
            SortFieldIndex::Num(ix) => ix.remove(doc, access, field),
        }
    }

    pub fn lookup(&self, doc: DocId) -> SortableValue {
        match self {
            SortFieldIndex::Str(ix) => ix.lookup(doc),
            SortFieldIndex::Num(ix) => ix.lookup(doc),
        }
    }

    pub fn all_docs_with_values(&self) -> &[DocId] {
        match self {
            SortFieldIndex::Str(ix) => ix.all_docs_with_values(),
            SortFieldIndex::Num(ix) => ix.all_docs_with_values(),
        }
    }
}
