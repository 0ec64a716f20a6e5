//! Full-text field index with affix matching and synonym expansion.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashSet;

use crate::data::DocumentAccessor;
use crate::index::posting::PostingList;
use crate::index::{DocId, insert_sorted, remove_sorted};
use crate::synonyms::Synonyms;

/// Lowercase and split into alphanumeric tokens, dropping stopwords.
pub(crate) fn tokenize(text: &str, stopwords: &AHashSet<String>) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !stopwords.contains(*t))
        .map(str::to_string)
        .collect()
}

/// An inverted index over the tokens of a single text field.
///
/// The term dictionary is ordered, so prefix matching is a range scan. When
/// `with_suffixtrie` is set, a suffix table maps every token suffix back to
/// its tokens, making suffix matching a lookup and infix matching a range
/// scan; without it both fall back to a dictionary scan.
#[derive(Debug)]
pub struct TextIndex {
    stopwords: Arc<AHashSet<String>>,
    synonyms: Option<Arc<Synonyms>>,
    postings: BTreeMap<String, PostingList>,
    suffixes: Option<BTreeMap<String, Vec<String>>>,
    docs: Vec<DocId>,
}

impl TextIndex {
    pub fn new(
        stopwords: Arc<AHashSet<String>>,
        synonyms: Option<Arc<Synonyms>>,
        with_suffixtrie: bool,
    ) -> Self {
        Self {
            stopwords,
            synonyms,
            postings: BTreeMap::new(),
            suffixes: with_suffixtrie.then(BTreeMap::new),
            docs: Vec::new(),
        }
    }

    /// Index a document's field value. Documents without the field are
    /// accepted unchanged.
    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        let Some(text) = access.text(field) else {
            return true;
        };
        let tokens = tokenize(text, &self.stopwords);
        insert_sorted(&mut self.docs, doc);
        for token in &tokens {
            if let Some(synonyms) = &self.synonyms
                && let Some(group) = synonyms.group_token(token)
            {
                let group = group.to_string();
                self.insert_term(group, doc);
            }
            self.insert_term(token.clone(), doc);
        }
        true
    }

    /// Un-index a document. The accessor must present the same value that
    /// was added.
    pub fn remove(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) {
        let Some(text) = access.text(field) else {
            return;
        };
        let tokens = tokenize(text, &self.stopwords);
        remove_sorted(&mut self.docs, doc);
        for token in &tokens {
            if let Some(synonyms) = &self.synonyms
                && let Some(group) = synonyms.group_token(token)
            {
                let group = group.to_string();
                self.remove_term(&group, doc);
            }
            self.remove_term(token, doc);
        }
    }

    fn insert_term(&mut self, term: String, doc: DocId) {
        match self.postings.get_mut(&term) {
            Some(list) => list.insert(doc),
            None => {
                if let Some(suffixes) = &mut self.suffixes {
                    for (pos, _) in term.char_indices() {
                        suffixes
                            .entry(term[pos..].to_string())
                            .or_default()
                            .push(term.clone());
                    }
                }
                let mut list = PostingList::default();
                list.insert(doc);
                self.postings.insert(term, list);
            }
        }
    }

    fn remove_term(&mut self, term: &str, doc: DocId) {
        let Some(list) = self.postings.get_mut(term) else {
            return;
        };
        list.remove(doc);
        if list.is_empty() {
            self.postings.remove(term);
            if let Some(suffixes) = &mut self.suffixes {
                for (pos, _) in term.char_indices() {
                    let suffix = &term[pos..];
                    if let Some(terms) = suffixes.get_mut(suffix) {
                        terms.retain(|t| t != term);
                        if terms.is_empty() {
                            suffixes.remove(suffix);
                        }
                    }
                }
            }
        }
    }

    /// Exact term lookup; returns an owned ascending id list.
    pub fn matching(&self, term: &str, strip_whitespace: bool) -> Vec<DocId> {
        let term = if strip_whitespace { term.trim() } else { term };
        let needle = term.to_lowercase();
        self.postings
            .get(&needle)
            .map(PostingList::to_vec)
            .unwrap_or_default()
    }

    /// Invoke `cb` with the posting list of every term starting with `affix`.
    pub fn match_prefix<'s>(&'s self, affix: &str, mut cb: impl FnMut(&'s PostingList)) {
        let needle = affix.to_lowercase();
        for (term, list) in self.postings.range(needle.clone()..) {
            if !term.starts_with(&needle) {
                break;
            }
            cb(list);
        }
    }

    /// Invoke `cb` with the posting list of every term ending with `affix`.
    pub fn match_suffix<'s>(&'s self, affix: &str, mut cb: impl FnMut(&'s PostingList)) {
        let needle = affix.to_lowercase();
        match &self.suffixes {
            Some(suffixes) => {
                if let Some(terms) = suffixes.get(&needle) {
                    for term in terms {
                        cb(&self.postings[term]);
                    }
                }
            }
            None => {
                for (term, list) in &self.postings {
                    if term.ends_with(&needle) {
                        cb(list);
                    }
                }
            }
        }
    }

    /// Invoke `cb` with the posting list of every term containing `affix`.
    pub fn match_infix<'s>(&'s self, affix: &str, mut cb: impl FnMut(&'s PostingList)) {
        let needle = affix.to_lowercase();
        match &self.suffixes {
            Some(suffixes) => {
                // A term contains the affix iff one of its suffixes starts
                // with it; several suffixes of one term can, so dedupe.
                let mut seen = AHashSet::new();
                for (suffix, terms) in suffixes.range(needle.clone()..) {
                    if !suffix.starts_with(&needle) {
                        break;
                    }
                    for term in terms {
                        if seen.insert(term.as_str()) {
                            cb(&self.postings[term]);
                        }
                    }
                }
            }
            None => {
                for (term, list) in &self.postings {
                    if term.contains(&needle) {
                        cb(list);
                    }
                }
            }
        }
    }

    /// Ascending ids of all documents holding a value in this field.
    pub fn all_docs_with_values(&self) -> &[DocId] {
        &self.docs
    }

    #[cfg(test)]
    fn term_count(&self) -> usize {
        self.postings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataValue, Document};
    use crate::schema::IndicesOptions;

    fn stopwords() -> Arc<AHashSet<String>> {
        Arc::new(IndicesOptions::default().stopwords)
    }

    fn doc(text: &str) -> Document {
        Document::new().add_field("body", DataValue::Text(text.into()))
    }

    #[test]
    fn exact_matching() {
        let mut index = TextIndex::new(stopwords(), None, false);
        index.add(1, &doc("red shoes"), "body");
        index.add(2, &doc("blue shoes"), "body");
        index.add(3, &doc("red hat"), "body");

        assert_eq!(index.matching("red", true), [1, 3]);
        assert_eq!(index.matching("  shoes ", true), [1, 2]);
        assert_eq!(index.matching("green", true), Vec::<DocId>::new());
    }

    #[test]
    fn stopwords_are_not_indexed() {
        let mut index = TextIndex::new(stopwords(), None, false);
        index.add(1, &doc("the red shoes"), "body");

        assert_eq!(index.matching("the", true), Vec::<DocId>::new());
        assert_eq!(index.term_count(), 2);
    }

    #[test]
    fn synonym_group_is_indexed_alongside_members() {
        let mut synonyms = Synonyms::new();
        synonyms.add_group("grp", &["cold", "chilly"]);

        let mut index = TextIndex::new(stopwords(), Some(Arc::new(synonyms)), false);
        index.add(1, &doc("cold day"), "body");
        index.add(2, &doc("chilly night"), "body");

        assert_eq!(index.matching("grp", false), [1, 2]);
        assert_eq!(index.matching("cold", true), [1]);
    }

    #[test]
    fn affix_matching_with_and_without_suffix_table() {
        for with_suffixtrie in [false, true] {
            let mut index = TextIndex::new(stopwords(), None, with_suffixtrie);
            index.add(1, &doc("intention"), "body");
            index.add(2, &doc("attention"), "body");
            index.add(3, &doc("intent"), "body");

            let mut prefix_ids: Vec<DocId> = Vec::new();
            index.match_prefix("intent", |list| prefix_ids.extend(list.iter()));
            prefix_ids.sort_unstable();
            assert_eq!(prefix_ids, [1, 3], "with_suffixtrie={with_suffixtrie}");

            let mut suffix_ids: Vec<DocId> = Vec::new();
            index.match_suffix("tent", |list| suffix_ids.extend(list.iter()));
            suffix_ids.sort_unstable();
            assert_eq!(suffix_ids, [3], "with_suffixtrie={with_suffixtrie}");

            let mut infix_ids: Vec<DocId> = Vec::new();
            index.match_infix("tent", |list| infix_ids.extend(list.iter()));
            infix_ids.sort_unstable();
            infix_ids.dedup();
            assert_eq!(infix_ids, [1, 2, 3], "with_suffixtrie={with_suffixtrie}");
        }
    }

    #[test]
    fn remove_cleans_up_terms_and_suffixes() {
        let mut index = TextIndex::new(stopwords(), None, true);
        index.add(1, &doc("unique"), "body");
        index.add(2, &doc("shared"), "body");
        index.remove(1, &doc("unique"), "body");

        assert_eq!(index.matching("unique", true), Vec::<DocId>::new());
        assert_eq!(index.all_docs_with_values(), [2]);

        let mut ids: Vec<DocId> = Vec::new();
        index.match_infix("niqu", |list| ids.extend(list.iter()));
        assert!(ids.is_empty());
    }
}
