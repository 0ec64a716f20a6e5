//! Tag field index: exact and affix matching over separated tag values.

use std::collections::BTreeMap;

use ahash::AHashSet;

use crate::data::DocumentAccessor;
use crate::index::posting::PostingList;
use crate::index::{DocId, insert_sorted, remove_sorted};
use crate::schema::TagParams;

/// An index over the tag elements of a single TAG field.
///
/// Field values are split on the configured separator and trimmed; unless
/// the field is case-sensitive, tags are lowercased. Tags are matched whole,
/// never tokenised.
#[derive(Debug)]
pub struct TagIndex {
    params: TagParams,
    postings: BTreeMap<String, PostingList>,
    suffixes: Option<BTreeMap<String, Vec<String>>>,
    docs: Vec<DocId>,
}

impl TagIndex {
    pub fn new(params: TagParams) -> Self {
        let suffixes = params.with_suffixtrie.then(BTreeMap::new);
        Self {
            params,
            postings: BTreeMap::new(),
            suffixes,
            docs: Vec::new(),
        }
    }

    fn normalize(&self, tag: &str) -> String {
        let tag = tag.trim();
        if self.params.case_sensitive {
            tag.to_string()
        } else {
            tag.to_lowercase()
        }
    }

    fn split<'v>(&self, value: &'v str) -> impl Iterator<Item = &'v str> {
        let separator = self.params.separator;
        value.split(separator).map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn add(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) -> bool {
        let Some(value) = access.tags(field) else {
            return true;
        };
        let tags: Vec<String> = self.split(value).map(|t| self.normalize(t)).collect();
        insert_sorted(&mut self.docs, doc);
        for tag in tags {
            self.insert_tag(tag, doc);
        }
        true
    }

    pub fn remove(&mut self, doc: DocId, access: &dyn DocumentAccessor, field: &str) {
        let Some(value) = access.tags(field) else {
            return;
        };
        let tags: Vec<String> = self.split(value).map(|t| self.normalize(t)).collect();
        remove_sorted(&mut self.docs, doc);
        for tag in tags {
            self.remove_tag(&tag, doc);
        }
    }

    fn insert_tag(&mut self, tag: String, doc: DocId) {
        match self.postings.get_mut(&tag) {
            Some(list) => list.insert(doc),
            None => {
                if let Some(suffixes) = &mut self.suffixes {
                    for (pos, _) in tag.char_indices() {
                        suffixes
                            .entry(tag[pos..].to_string())
                            .or_default()
                            .push(tag.clone());
                    }
                }
                let mut list = PostingList::default();
                list.insert(doc);
                self.postings.insert(tag, list);
            }
        }
    }

    fn remove_tag(&mut self, tag: &str, doc: DocId) {
        let Some(list) = self.postings.get_mut(tag) else {
            return;
        };
        list.remove(doc);
        if list.is_empty() {
            self.postings.remove(tag);
            if let Some(suffixes) = &mut self.suffixes {
                for (pos, _) in tag.char_indices() {
                    let suffix = &tag[pos..];
                    if let Some(tags) = suffixes.get_mut(suffix) {
                        tags.retain(|t| t != tag);
                        if tags.is_empty() {
                            suffixes.remove(suffix);
                        }
                    }
                }
            }
        }
    }

    /// Exact tag lookup; returns an owned ascending id list.
    pub fn matching(&self, tag: &str) -> Vec<DocId> {
        let needle = self.normalize(tag);
        self.postings
            .get(&needle)
            .map(PostingList::to_vec)
            .unwrap_or_default()
    }

    /// Invoke `cb` with the posting list of every tag starting with `affix`.
    pub fn match_prefix<'s>(&'s self, affix: &str, mut cb: impl FnMut(&'s PostingList)) {
        let needle = self.normalize(affix);
        for (tag, list) in self.postings.range(needle.clone()..) {
            if !tag.starts_with(&needle) {
                break;
            }
            cb(list);
        }
    }

    /// Invoke `cb` with the posting list of every tag ending with `affix`.
    pub fn match_suffix<'s>(&'s self, affix: &str, mut cb: impl FnMut(&'s PostingList)) {
        let needle = self.normalize(affix);
        match &self.suffixes {
            Some(suffixes) => {
                if let Some(tags) = suffixes.get(&needle) {
                    for tag in tags {
                        cb(&self.postings[tag]);
                    }
                }
            }
            None => {
                for (tag, list) in &self.postings {
                    if tag.ends_with(&needle) {
                        cb(list);
                    }
                }
            }
        }
    }

    /// Invoke `cb` with the posting list of every tag containing `affix`.
    pub fn match_infix<'s>(&'s self, affix: &str, mut cb: impl FnMut(&'s PostingList)) {
        let needle = self.normalize(affix);
        match &self.suffixes {
            Some(suffixes) => {
                let mut seen = AHashSet::new();
                for (suffix, tags) in suffixes.range(needle.clone()..) {
                    if !suffix.starts_with(&needle) {
                        break;
                    }
                    for tag in tags {
                        if seen.insert(tag.as_str()) {
                            cb(&self.postings[tag]);
                        }
                    }
                }
            }
            None => {
                for (tag, list) in &self.postings {
                    if tag.contains(&needle) {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataValue, Document};

    fn doc(tags: &str) -> Document {
        Document::new().add_field("color", DataValue::Tags(tags.into()))
    }

    #[test]
    fn separator_split_and_trim() {
        let mut index = TagIndex::new(TagParams::default());
        index.add(1, &doc("red, dark blue"), "color");
        index.add(2, &doc("Red"), "color");

        assert_eq!(index.matching("red"), [1, 2]);
        assert_eq!(index.matching("dark blue"), [1]);
        assert_eq!(index.matching("blue"), Vec::<DocId>::new());
    }

    #[test]
    fn case_sensitive_tags() {
        let params = TagParams {
            case_sensitive: true,
            ..TagParams::default()
        };
        let mut index = TagIndex::new(params);
        index.add(1, &doc("Red"), "color");

        assert_eq!(index.matching("Red"), [1]);
        assert_eq!(index.matching("red"), Vec::<DocId>::new());
    }

    #[test]
    fn custom_separator() {
        let params = TagParams {
            separator: ';',
            ..TagParams::default()
        };
        let mut index = TagIndex::new(params);
        index.add(1, &doc("a;b,c"), "color");

        assert_eq!(index.matching("a"), [1]);
        assert_eq!(index.matching("b,c"), [1]);
    }

    #[test]
    fn affix_matching_over_tags() {
        let mut index = TagIndex::new(TagParams::default());
        index.add(1, &doc("darkblue"), "color");
        index.add(2, &doc("lightblue"), "color");
        index.add(3, &doc("darkred"), "color");

        let mut prefix_ids: Vec<DocId> = Vec::new();
        index.match_prefix("dark", |list| prefix_ids.extend(list.iter()));
        prefix_ids.sort_unstable();
        assert_eq!(prefix_ids, [1, 3]);

        let mut suffix_ids: Vec<DocId> = Vec::new();
        index.match_suffix("blue", |list| suffix_ids.extend(list.iter()));
        suffix_ids.sort_unstable();
        assert_eq!(suffix_ids, [1, 2]);

        let mut infix_ids: Vec<DocId> = Vec::new();
        index.match_infix("kb", |list| infix_ids.extend(list.iter()));
        assert_eq!(infix_ids, [1]);
    }

    #[test]
    fn remove_detaches_document() {
        let mut index = TagIndex::new(TagParams::default());
        index.add(1, &doc("red,blue"), "color");
        index.add(2, &doc("red"), "color");
        index.remove(1, &doc("red,blue"), "color");

        assert_eq!(index.matching("red"), [2]);
        assert_eq!(index.matching("blue"), Vec::<DocId>::new());
        assert_eq!(index.all_docs_with_values(), [2]);
    }
}
