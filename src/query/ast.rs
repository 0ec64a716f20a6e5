//! Query syntax tree.
//!
//! Construction happens in [`super::parser`]; the node set is closed, so
//! evaluation dispatches over a plain enum instead of trait objects.

/// Match mode of a single term or tag element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Exact term match (with synonym expansion for text fields).
    Term,
    /// Terms starting with the affix.
    Prefix,
    /// Terms ending with the affix.
    Suffix,
    /// Terms containing the affix.
    Infix,
}

/// A term or affix pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct AffixNode {
    pub kind: MatchKind,
    pub affix: String,
}

impl AffixNode {
    pub fn new(kind: MatchKind, affix: impl Into<String>) -> Self {
        Self {
            kind,
            affix: affix.into(),
        }
    }

    pub fn term(affix: impl Into<String>) -> Self {
        Self::new(MatchKind::Term, affix)
    }
}

/// Operator of a [`AstNode::Logical`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// An inclusive numeric range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeNode {
    pub lo: f64,
    pub hi: f64,
}

/// A k-nearest-neighbour clause.
#[derive(Debug, Clone, PartialEq)]
pub struct KnnNode {
    /// Number of neighbours to keep.
    pub limit: usize,
    /// Vector field to search.
    pub field: String,
    /// Query vector.
    pub vec: Vec<f32>,
    /// Search-breadth override for approximate indices.
    pub ef_runtime: Option<usize>,
    /// Alias under which the host sorts by distance.
    pub score_alias: String,
    /// Pre-filter; the virtual all-documents node when absent in the query.
    pub filter: Box<AstNode>,
}

/// A parsed query node.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    /// Matches nothing.
    Empty,
    /// Matches every document. Only valid outside a field scope.
    Star,
    /// Matches every document with a non-null value in the active field.
    StarField,
    /// Term or affix match against text fields.
    Affix(AffixNode),
    /// Inclusive numeric range on the active field.
    Range(RangeNode),
    /// Complement of the child with respect to all documents.
    Negate(Box<AstNode>),
    /// AND/OR combination of children.
    Logical {
        op: LogicalOp,
        nodes: Vec<AstNode>,
    },
    /// Tag-set match against the active tag field.
    Tags(Vec<AffixNode>),
    /// Field scope for the subtree. Scopes do not nest.
    Field {
        field: String,
        node: Box<AstNode>,
    },
    /// k-nearest-neighbour search with optional pre-filter.
    Knn(KnnNode),
}

impl AstNode {
    pub fn logical(op: LogicalOp, nodes: Vec<AstNode>) -> Self {
        AstNode::Logical { op, nodes }
    }

    pub fn field(field: impl Into<String>, node: AstNode) -> Self {
        AstNode::Field {
            field: field.into(),
            node: Box::new(node),
        }
    }

    pub fn negate(node: AstNode) -> Self {
        AstNode::Negate(Box::new(node))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, AstNode::Empty)
    }
}

/// Runtime parameters referenced from a query as `$name`.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    texts: ahash::AHashMap<String, String>,
    vectors: ahash::AHashMap<String, Vec<f32>>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.texts.insert(name.into(), value.into());
        self
    }

    pub fn with_vector(mut self, name: impl Into<String>, value: Vec<f32>) -> Self {
        self.vectors.insert(name.into(), value);
        self
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts.get(name).map(String::as_str)
    }

    pub fn vector(&self, name: &str) -> Option<&[f32]> {
        self.vectors.get(name).map(Vec::as_slice)
    }
}
