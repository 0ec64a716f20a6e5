//! Schema: field declarations, alias resolution, and indexing options.

use std::collections::HashMap;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::index::vector::VectorParams;

/// Per-field parameters for text indexing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextParams {
    /// Maintain a suffix table for fast suffix/infix matching.
    #[serde(default)]
    pub with_suffixtrie: bool,
}

/// Per-field parameters for numeric indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericParams {
    /// Target number of entries per value block.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

fn default_block_size() -> usize {
    1024
}

impl Default for NumericParams {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
        }
    }
}

/// Per-field parameters for tag indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagParams {
    /// Character separating tags inside a single value.
    #[serde(default = "default_separator")]
    pub separator: char,
    /// Keep tag case as-is instead of lowercasing.
    #[serde(default)]
    pub case_sensitive: bool,
    /// Maintain a suffix table for fast suffix/infix matching.
    #[serde(default)]
    pub with_suffixtrie: bool,
}

fn default_separator() -> char {
    ','
}

impl Default for TagParams {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            case_sensitive: false,
            with_suffixtrie: false,
        }
    }
}

/// Type-specific parameters; the variant determines the field type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "options", rename_all = "snake_case")]
pub enum FieldParams {
    Text(TextParams),
    Numeric(NumericParams),
    Tag(TagParams),
    Vector(VectorParams),
}

/// A single field declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Canonical field identifier.
    pub identifier: String,
    /// Short display name returned by identifier lookups.
    pub short_name: String,
    /// The field carries data but is never indexed.
    #[serde(default)]
    pub no_index: bool,
    /// Maintain a sort index for this field.
    #[serde(default)]
    pub sortable: bool,
    pub params: FieldParams,
}

impl FieldInfo {
    fn new(identifier: impl Into<String>, params: FieldParams) -> Self {
        let identifier = identifier.into();
        Self {
            short_name: identifier.clone(),
            identifier,
            no_index: false,
            sortable: false,
            params,
        }
    }

    pub fn text(identifier: impl Into<String>) -> Self {
        Self::new(identifier, FieldParams::Text(TextParams::default()))
    }

    pub fn text_with(identifier: impl Into<String>, params: TextParams) -> Self {
        Self::new(identifier, FieldParams::Text(params))
    }

    pub fn numeric(identifier: impl Into<String>) -> Self {
        Self::new(identifier, FieldParams::Numeric(NumericParams::default()))
    }

    pub fn numeric_with(identifier: impl Into<String>, params: NumericParams) -> Self {
        Self::new(identifier, FieldParams::Numeric(params))
    }

    pub fn tag(identifier: impl Into<String>) -> Self {
        Self::new(identifier, FieldParams::Tag(TagParams::default()))
    }

    pub fn tag_with(identifier: impl Into<String>, params: TagParams) -> Self {
        Self::new(identifier, FieldParams::Tag(params))
    }

    pub fn vector(identifier: impl Into<String>, params: VectorParams) -> Self {
        Self::new(identifier, FieldParams::Vector(params))
    }

    pub fn short_name(mut self, name: impl Into<String>) -> Self {
        self.short_name = name.into();
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn no_index(mut self) -> Self {
        self.no_index = true;
        self
    }

    pub fn is_text(&self) -> bool {
        matches!(self.params, FieldParams::Text(_))
    }
}

/// Field declarations in declaration order, plus an alias table.
///
/// Both lookups fall back to returning their input unchanged, so unknown
/// names flow through to index lookup where they surface as evaluation
/// errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldInfo>,
    #[serde(default)]
    aliases: HashMap<String, String>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Resolve an alias to its field identifier, or return it unchanged.
    pub fn lookup_alias<'a>(&'a self, alias: &'a str) -> &'a str {
        self.aliases.get(alias).map(String::as_str).unwrap_or(alias)
    }

    /// Resolve a field identifier to its short display name, or return it
    /// unchanged.
    pub fn lookup_identifier<'a>(&'a self, identifier: &'a str) -> &'a str {
        self.field(identifier)
            .map(|f| f.short_name.as_str())
            .unwrap_or(identifier)
    }

    pub fn field(&self, identifier: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.identifier == identifier)
    }

    /// All field declarations, in declaration order.
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldInfo>,
    aliases: HashMap<String, String>,
}

impl SchemaBuilder {
    pub fn field(mut self, info: FieldInfo) -> Self {
        self.fields.push(info);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>, identifier: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), identifier.into());
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            fields: self.fields,
            aliases: self.aliases,
        }
    }
}

/// Options shared by every index of a registry.
#[derive(Debug, Clone)]
pub struct IndicesOptions {
    /// Tokens dropped during text tokenisation and term lookup.
    pub stopwords: AHashSet<String>,
}

impl Default for IndicesOptions {
    fn default() -> Self {
        const DEFAULT_STOPWORDS: &[&str] = &[
            "a", "is", "the", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in",
            "into", "it", "no", "not", "of", "on", "or", "such", "that", "their", "then", "there",
            "these", "they", "this", "to", "was", "will", "with",
        ];
        Self {
            stopwords: DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_resolution_falls_back_to_input() {
        let schema = Schema::builder()
            .field(FieldInfo::text("title").short_name("t"))
            .alias("headline", "title")
            .build();

        assert_eq!(schema.lookup_alias("headline"), "title");
        assert_eq!(schema.lookup_alias("title"), "title");
        assert_eq!(schema.lookup_alias("unknown"), "unknown");

        assert_eq!(schema.lookup_identifier("title"), "t");
        assert_eq!(schema.lookup_identifier("unknown"), "unknown");
    }

    #[test]
    fn declaration_order_is_preserved() {
        let schema = Schema::builder()
            .field(FieldInfo::text("b"))
            .field(FieldInfo::text("a"))
            .field(FieldInfo::numeric("c"))
            .build();

        let names: Vec<&str> = schema.fields().iter().map(|f| f.identifier.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn default_stopwords_contain_common_words() {
        let options = IndicesOptions::default();
        assert!(options.stopwords.contains("the"));
        assert!(options.stopwords.contains("with"));
        assert!(!options.stopwords.contains("red"));
        assert_eq!(options.stopwords.len(), 32);
    }

    #[test]
    fn schema_from_json() {
        let raw = r#"{
            "fields": [
                {
                    "identifier": "title",
                    "short_name": "title",
                    "sortable": true,
                    "params": { "type": "text", "options": { "with_suffixtrie": true } }
                },
                {
                    "identifier": "price",
                    "short_name": "price",
                    "params": { "type": "numeric", "options": {} }
                }
            ],
            "aliases": { "t": "title" }
        }"#;

        let schema: Schema = serde_json::from_str(raw).unwrap();
        assert_eq!(schema.fields().len(), 2);
        assert!(schema.field("title").unwrap().sortable);
        assert_eq!(schema.lookup_alias("t"), "title");
        match &schema.field("price").unwrap().params {
            FieldParams::Numeric(p) => assert_eq!(p.block_size, 1024),
            other => panic!("unexpected params: {other:?}"),
        }
    }
}
