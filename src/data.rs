//! Document model: field values and the typed accessor consumed by indices.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SorrelError};

/// The value stored in a document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataValue {
    /// Explicit null; the field is treated as absent.
    Null,
    /// Free text for full-text indexing.
    Text(String),
    /// A numeric value.
    Numeric(f64),
    /// A separated tag list in its raw form (e.g. `"red,blue"`).
    Tags(String),
    /// A dense embedding vector.
    Vector(Vec<f32>),
}

/// An in-memory document: an ordered mapping from field identifier to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    fields: BTreeMap<String, DataValue>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field value.
    pub fn add_field(mut self, name: impl Into<String>, value: DataValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&DataValue> {
        self.fields.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Typed field views used by index `add`/`remove`.
///
/// Indices never see concrete documents; they pull the one view they index.
/// A `None` means the field carries no usable value and the document is
/// simply not indexed under it. `numeric` alone is fallible: a present but
/// malformed value must refuse the whole document so that the registry can
/// roll back.
pub trait DocumentAccessor {
    /// Free-text view of a field.
    fn text(&self, field: &str) -> Option<&str>;

    /// Raw tag-list view of a field. Text values are accepted as tag lists.
    fn tags(&self, field: &str) -> Option<&str>;

    /// Numeric view of a field. `Err` marks a present but unparseable value.
    fn numeric(&self, field: &str) -> Result<Option<f64>>;

    /// Vector view of a field.
    fn vector(&self, field: &str) -> Option<&[f32]>;
}

impl DocumentAccessor for Document {
    fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(DataValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    fn tags(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(DataValue::Tags(s)) | Some(DataValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    fn numeric(&self, field: &str) -> Result<Option<f64>> {
        match self.fields.get(field) {
            Some(DataValue::Numeric(n)) => Ok(Some(*n)),
            Some(DataValue::Text(s)) => match s.trim().parse::<f64>() {
                Ok(n) => Ok(Some(n)),
                Err(_) => Err(SorrelError::invalid_argument(format!(
                    "field '{field}' holds non-numeric value '{s}'"
                ))),
            },
            _ => Ok(None),
        }
    }

    fn vector(&self, field: &str) -> Option<&[f32]> {
        match self.fields.get(field) {
            Some(DataValue::Vector(v)) => Some(v),
            _ => None,
        }
    }
}
