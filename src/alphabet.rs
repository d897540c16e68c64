//! Insertion-ordered string interning.

use std::collections::HashMap;
use std::hash::Hash;

/// Bidirectional mapping between keys and dense, 0-based indices.
///
/// Indices are handed out in first-seen order and never change. There is no
/// removal: the document relies on a word ID keeping its position for the
/// lifetime of the document, even after the word object itself was cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet<K: Hash + Eq + Clone> {
    symbols: Vec<K>,
    indices: HashMap<K, usize>,
}

impl<K: Hash + Eq + Clone> Default for Alphabet<K> {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            indices: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> Alphabet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `key`, assigning the next free index on first occurrence.
    pub fn index_of(&mut self, key: &K) -> usize {
        if let Some(&idx) = self.indices.get(key) {
            return idx;
        }
        let idx = self.symbols.len();
        self.symbols.push(key.clone());
        self.indices.insert(key.clone(), idx);
        idx
    }

    /// Index of `key` without assigning one.
    pub fn get(&self, key: &K) -> Option<usize> {
        self.indices.get(key).copied()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.indices.contains_key(key)
    }

    pub fn symbol_at(&self, index: usize) -> Option<&K> {
        self.symbols.get(index)
    }

    /// Number of distinct keys seen.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Keys in index order.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.symbols.iter()
    }
}

impl Alphabet<String> {
    /// Convenience for string alphabets: look up by `&str`.
    pub fn index_of_str(&mut self, key: &str) -> usize {
        if let Some(&idx) = self.indices.get(key) {
            return idx;
        }
        self.index_of(&key.to_string())
    }

    pub fn get_str(&self, key: &str) -> Option<usize> {
        self.indices.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_in_first_seen_order() {
        let mut alph: Alphabet<String> = Alphabet::new();
        let keys = ["b", "a", "b", "c", "a", "d"];
        let indices: Vec<usize> = keys.iter().map(|k| alph.index_of_str(k)).collect();

        assert_eq!(indices, vec![0, 1, 0, 2, 1, 3]);
        assert_eq!(alph.len(), 4);
        assert_eq!(
            alph.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            vec!["b", "a", "c", "d"]
        );
    }

    #[test]
    fn test_reverse_lookup() {
        let mut alph: Alphabet<(u32, u32)> = Alphabet::new();
        let idx = alph.index_of(&(1, 2));
        assert_eq!(alph.symbol_at(idx), Some(&(1, 2)));
        assert_eq!(alph.symbol_at(5), None);
    }

    #[test]
    fn test_get_does_not_assign() {
        let mut alph: Alphabet<String> = Alphabet::new();
        alph.index_of_str("x");
        assert_eq!(alph.get_str("y"), None);
        assert_eq!(alph.len(), 1);
        assert!(alph.contains(&"x".to_string()));
    }
}
