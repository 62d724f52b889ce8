//! Prefix trie over one string column
//!
//! A nested map from character to subtree with a terminal marker per
//! node. Words are lower-cased on the way in and prefix queries are
//! case-insensitive.
//!
//! Removal is logical: the terminal marker is cleared and the subtree is
//! left in place, so removal is O(word length). Tries are rebuilt
//! wholesale when a table is registered, which reclaims dead nodes.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default, Clone)]
struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    terminal: bool,
}

impl TrieNode {
    /// True when a live word ends at or below this node
    fn has_terminal(&self) -> bool {
        self.terminal || self.children.values().any(TrieNode::has_terminal)
    }

    /// Pre-order walk. Children iterate in char order and a word ending
    /// here precedes its extensions, so output is lexicographic.
    fn collect(&self, path: &mut String, out: &mut Vec<String>) {
        if self.terminal {
            out.push(path.clone());
        }
        for (c, child) in &self.children {
            path.push(*c);
            child.collect(path, out);
            path.pop();
        }
    }
}

/// Case-insensitive prefix trie
#[derive(Debug, Default, Clone)]
pub struct PrefixTrie {
    root: TrieNode,
}

impl PrefixTrie {
    pub fn new() -> Self {
        Self::default()
    }

    fn walk(&self, prefix: &str) -> Option<&TrieNode> {
        let mut node = &self.root;
        for c in prefix.to_lowercase().chars() {
            node = node.children.get(&c)?;
        }
        Some(node)
    }

    /// Inserts a word. Empty words are ignored.
    pub fn add_word(&mut self, word: &str) {
        if word.is_empty() {
            return;
        }
        let mut node = &mut self.root;
        for c in word.to_lowercase().chars() {
            node = node.children.entry(c).or_default();
        }
        node.terminal = true;
    }

    /// Clears the terminal marker of `word`. No-op if it is not a full path.
    pub fn remove_word(&mut self, word: &str) {
        let mut node = &mut self.root;
        for c in word.to_lowercase().chars() {
            match node.children.get_mut(&c) {
                Some(child) => node = child,
                None => return,
            }
        }
        node.terminal = false;
    }

    /// True when `word` was added and not removed
    pub fn contains_word(&self, word: &str) -> bool {
        !word.is_empty() && self.walk(word).map(|n| n.terminal).unwrap_or(false)
    }

    /// True when `prefix` can be walked from the root and at least one
    /// live word continues from it.
    ///
    /// Nodes left behind by logical removal do not count as prefixes.
    pub fn is_prefix(&self, prefix: &str) -> bool {
        self.walk(prefix).map(TrieNode::has_terminal).unwrap_or(false)
    }

    /// Every live word starting with `prefix`, sorted ascending.
    pub fn get_prefix(&self, prefix: &str) -> Vec<String> {
        let Some(node) = self.walk(prefix) else {
            return Vec::new();
        };
        let mut path = prefix.to_lowercase();
        let mut out = Vec::new();
        node.collect(&mut path, &mut out);
        out
    }
}

/// Trie over the values of one column, tolerant of duplicate values.
///
/// Several rows may hold the same value; the word only leaves the trie
/// when the last row holding it is removed.
#[derive(Debug, Default, Clone)]
pub struct TrieIndex {
    trie: PrefixTrie,
    counts: HashMap<String, usize>,
}

impl TrieIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_value(&mut self, value: &str) {
        let word = value.to_lowercase();
        if word.is_empty() {
            return;
        }
        let count = self.counts.entry(word.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            self.trie.add_word(&word);
        }
    }

    pub fn remove_value(&mut self, value: &str) {
        let word = value.to_lowercase();
        if let Some(count) = self.counts.get_mut(&word) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&word);
                self.trie.remove_word(&word);
            }
        }
    }

    pub fn trie(&self) -> &PrefixTrie {
        &self.trie
    }

    pub fn clear(&mut self) {
        self.trie = PrefixTrie::new();
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get_prefix() {
        let mut trie = PrefixTrie::new();
        for w in ["Jones", "john", "Jon", "alice"] {
            trie.add_word(w);
        }

        assert_eq!(trie.get_prefix("jo"), vec!["john", "jon", "jones"]);
        assert_eq!(trie.get_prefix("JON"), vec!["jon", "jones"]);
        assert!(trie.get_prefix("x").is_empty());
    }

    #[test]
    fn test_is_prefix() {
        let mut trie = PrefixTrie::new();
        trie.add_word("hello");
        assert!(trie.is_prefix("hel"));
        assert!(trie.is_prefix("HELLO"));
        assert!(!trie.is_prefix("help"));
        assert!(!trie.is_prefix("hello world"));
    }

    #[test]
    fn test_remove_is_logical_and_idempotent() {
        let mut trie = PrefixTrie::new();
        trie.add_word("car");
        trie.add_word("cart");

        trie.remove_word("cart");
        trie.remove_word("cart");

        assert!(!trie.contains_word("cart"));
        assert!(!trie.is_prefix("cart"));
        assert!(trie.contains_word("car"));
        assert!(trie.is_prefix("ca"));
        assert_eq!(trie.get_prefix("ca"), vec!["car"]);
    }

    #[test]
    fn test_remove_missing_word_is_noop() {
        let mut trie = PrefixTrie::new();
        trie.add_word("dog");
        trie.remove_word("dogs");
        trie.remove_word("cat");
        assert!(trie.contains_word("dog"));
    }

    #[test]
    fn test_trie_index_counts_duplicates() {
        let mut index = TrieIndex::new();
        index.insert_value("Smith");
        index.insert_value("smith");

        index.remove_value("SMITH");
        assert!(index.trie().contains_word("smith"));

        index.remove_value("smith");
        assert!(!index.trie().contains_word("smith"));
    }
}
