//! The per-field index registry: owns one content index per indexed field,
//! sort indexes for SORTABLE fields, and the master ascending id list.

use std::sync::Arc;

use ahash::AHashMap;

use crate::data::DocumentAccessor;
use crate::error::{Result, SorrelError};
use crate::index::sort::{NumericSortIndex, SortFieldIndex, SortableValue, StringSortIndex};
use crate::index::vector::VectorIndex;
use crate::index::{DocId, FieldIndex, NumericIndex, TagIndex, TextIndex};
use crate::schema::{FieldParams, IndicesOptions, Schema};
use crate::synonyms::Synonyms;

/// All indices of one document collection.
///
/// Reads need no synchronisation; concurrent [`FieldIndices::add`] /
/// [`FieldIndices::remove`] against reads are the host's responsibility to
/// serialise.
#[derive(Debug)]
pub struct FieldIndices {
    schema: Schema,
    synonyms: Option<Arc<Synonyms>>,
    indices: AHashMap<String, FieldIndex>,
    sort_indices: AHashMap<String, SortFieldIndex>,
    all_ids: Vec<DocId>,
}

impl FieldIndices {
    /// Create one content index per indexed field and one sort index per
    /// SORTABLE field of sortable type.
    pub fn new(schema: Schema, options: IndicesOptions, synonyms: Option<Arc<Synonyms>>) -> Self {
        let stopwords = Arc::new(options.stopwords);
        let mut indices = AHashMap::new();
        let mut sort_indices = AHashMap::new();

        for field in schema.fields() {
            if !field.no_index {
                let index = match &field.params {
                    FieldParams::Text(params) => FieldIndex::Text(TextIndex::new(
                        stopwords.clone(),
                        synonyms.clone(),
                        params.with_suffixtrie,
                    )),
                    FieldParams::Numeric(params) => {
                        FieldIndex::Numeric(NumericIndex::new(params))
                    }
                    FieldParams::Tag(params) => FieldIndex::Tag(TagIndex::new(params.clone())),
                    FieldParams::Vector(params) => {
                        FieldIndex::Vector(VectorIndex::new(params))
                    }
                };
                indices.insert(field.identifier.clone(), index);
            }

            if field.sortable {
                let sort_index = match &field.params {
                    FieldParams::Text(_) | FieldParams::Tag(_) => {
                        Some(SortFieldIndex::Str(StringSortIndex::new()))
                    }
                    FieldParams::Numeric(_) => Some(SortFieldIndex::Num(NumericSortIndex::new())),
                    FieldParams::Vector(_) => None,
                };
                if let Some(sort_index) = sort_index {
                    sort_indices.insert(field.identifier.clone(), sort_index);
                }
            }
        }

        Self {
            schema,
            synonyms,
            indices,
            sort_indices,
            all_ids: Vec::new(),
        }
    }

    /// Index a document across every field index, atomically.
    ///
    /// If any index refuses the document, every index that had already
    /// accepted it is rolled back and `false` is returned; the registry is
    /// unchanged. Adding an id that is already present is a caller contract
    /// violation.
    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor) -> bool {
        let mut added_content: Vec<String> = Vec::with_capacity(self.indices.len());
        let mut added_sort: Vec<String> = Vec::with_capacity(self.sort_indices.len());
        let mut was_added = true;

        for (field, index) in self.indices.iter_mut() {
            if index.add(doc, access, field) {
                added_content.push(field.clone());
            } else {
                was_added = false;
                break;
            }
        }

        if was_added {
            for (field, index) in self.sort_indices.iter_mut() {
                if index.add(doc, access, field) {
                    added_sort.push(field.clone());
                } else {
                    was_added = false;
                    break;
                }
            }
        }

        if !was_added {
            for field in added_sort.iter().rev() {
                self.sort_indices
                    .get_mut(field)
                    .expect("rolled-back sort index exists")
                    .remove(doc, access, field);
            }
            for field in added_content.iter().rev() {
                self.indices
                    .get_mut(field)
                    .expect("rolled-back index exists")
                    .remove(doc, access, field);
            }
            return false;
        }

        let pos = self.all_ids.partition_point(|&d| d <= doc);
        debug_assert!(pos == 0 || self.all_ids[pos - 1] != doc);
        self.all_ids.insert(pos, doc);
        true
    }

    /// Un-index a document from every index. The id must be present.
    pub fn remove(&mut self, doc: DocId, access: &dyn DocumentAccessor) {
        for (field, index) in self.indices.iter_mut() {
            index.remove(doc, access, field);
        }
        for (field, index) in self.sort_indices.iter_mut() {
            index.remove(doc, access, field);
        }

        let pos = self.all_ids.partition_point(|&d| d < doc);
        debug_assert!(self.all_ids.get(pos) == Some(&doc));
        if self.all_ids.get(pos) == Some(&doc) {
            self.all_ids.remove(pos);
        }
    }

    /// Content index for a field name or alias.
    pub fn index(&self, field: &str) -> Option<&FieldIndex> {
        self.indices.get(self.schema.lookup_alias(field))
    }

    /// Sort index for a field name or alias.
    pub fn sort_index(&self, field: &str) -> Option<&SortFieldIndex> {
        self.sort_indices.get(self.schema.lookup_alias(field))
    }

    /// Text indices in schema declaration order, skipping NOINDEX fields.
    pub fn text_indices(&self) -> Vec<&TextIndex> {
        self.schema
            .fields()
            .iter()
            .filter(|f| f.is_text() && !f.no_index)
            .filter_map(|f| self.indices.get(&f.identifier)?.as_text())
            .collect()
    }

    /// The master ascending list of every indexed document id.
    pub fn all_docs(&self) -> &[DocId] {
        &self.all_ids
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn synonyms(&self) -> Option<&Synonyms> {
        self.synonyms.as_deref()
    }

    /// Sortable value of a document in a SORTABLE field, by identifier.
    pub fn sort_index_value(&self, doc: DocId, field_identifier: &str) -> Result<SortableValue> {
        let index = self.sort_indices.get(field_identifier).ok_or_else(|| {
            SorrelError::invalid_argument(format!("Invalid sort field: {field_identifier}"))
        })?;
        Ok(index.lookup(doc))
    }
}
