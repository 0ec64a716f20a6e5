//! # Sorrel
//!
//! An in-memory secondary-index search engine for Rust.
//!
//! ## Features
//!
//! - Typed per-field indices: text, tag, numeric, and vector (flat or HNSW)
//! - Query language with field scopes, affixes, ranges, tag sets, negation
//!   and k-nearest-neighbour clauses
//! - Set-algebra evaluation over ascending document-id sets, borrowing
//!   index-internal structures where possible
//! - Atomic multi-index document add/remove with rollback
//! - Optional per-node evaluation profiling

pub mod data;
mod error;
pub mod index;
pub mod indices;
pub mod query;
pub mod schema;
pub mod search;
pub mod synonyms;

// Re-exports for the public API
pub use data::{DataValue, Document, DocumentAccessor};
pub use error::{Result, SorrelError};
pub use index::{DistanceMetric, DocId, SortableValue, VectorParams};
pub use indices::FieldIndices;
pub use query::{AstNode, QueryParams};
pub use schema::{FieldInfo, IndicesOptions, Schema};
pub use search::profile::{ProfileEvent, QueryProfile};
pub use search::{KnnScoreSortOption, SearchAlgorithm, SearchResult};
pub use synonyms::Synonyms;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
