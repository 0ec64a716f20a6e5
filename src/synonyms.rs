//! Synonym groups for term expansion.

use ahash::AHashMap;

/// A table of synonym groups.
///
/// Every group is identified by a group token; any member term of a group
/// resolves back to that token. Text indices consult the table at add time
/// (member terms are additionally indexed under their group token) and the
/// evaluator consults it at query time (a member term is rewritten to its
/// group token before lookup).
#[derive(Debug, Default)]
pub struct Synonyms {
    groups: AHashMap<String, Vec<String>>,
    term_to_group: AHashMap<String, String>,
}

impl Synonyms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synonym group. Terms are lowercased; re-registering a
    /// group replaces its members.
    pub fn add_group(&mut self, group_id: impl Into<String>, terms: &[&str]) {
        let group_id = group_id.into();
        let terms: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        for term in &terms {
            self.term_to_group.insert(term.clone(), group_id.clone());
        }
        self.groups.insert(group_id, terms);
    }

    /// Resolve a term to its group token, if it belongs to a group.
    pub fn group_token(&self, term: &str) -> Option<&str> {
        self.term_to_group
            .get(&term.to_lowercase())
            .map(String::as_str)
    }

    pub fn group_members(&self, group_id: &str) -> Option<&[String]> {
        self.groups.get(group_id).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
