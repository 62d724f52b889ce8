//! Sorted primary-key index
//!
//! The ordered set of primary keys physically present in a table, kept
//! in a `Vec` with binary-search insertion. Every adapter maintains one
//! per table.
//!
//! Keys are kept ascending unless the index is created unsorted, in
//! which case insertion order is preserved (uuid and time-ordered keys).
//!
//! Mixed key types on a sorted index are unsupported: the ordering is
//! total, but a table whose keys change type yields an order that means
//! nothing to callers.

use crate::value::Value;

/// Ordered primary keys of one table plus its auto-increment counter
#[derive(Debug, Clone, Default)]
pub struct SortedIndex {
    keys: Vec<Value>,
    sorted: bool,
    do_auto_increment: bool,
    auto_increment_counter: i64,
}

impl SortedIndex {
    pub fn new(sorted: bool, do_auto_increment: bool) -> Self {
        Self {
            keys: Vec::new(),
            sorted,
            do_auto_increment,
            auto_increment_counter: 0,
        }
    }

    /// Rebuilds an index from a key enumeration (e.g. an adapter's stored keys).
    pub fn from_keys(keys: impl IntoIterator<Item = Value>, sorted: bool, do_auto_increment: bool) -> Self {
        let mut index = Self::new(sorted, do_auto_increment);
        for key in keys {
            index.add(key);
        }
        index
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn does_auto_increment(&self) -> bool {
        self.do_auto_increment
    }

    pub fn auto_increment_counter(&self) -> i64 {
        self.auto_increment_counter
    }

    /// Adds a key. No-op if already present.
    pub fn add(&mut self, key: Value) {
        if self.do_auto_increment {
            let n = match &key {
                Value::Int(n) => Some(*n),
                Value::Float(x) if x.is_finite() => Some(x.ceil() as i64),
                _ => None,
            };
            if let Some(n) = n {
                self.auto_increment_counter = self.auto_increment_counter.max(n);
            }
        }

        if self.sorted {
            if let Err(pos) = self.keys.binary_search(&key) {
                self.keys.insert(pos, key);
            }
        } else if !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    /// Removes a key. No-op if absent.
    pub fn remove(&mut self, key: &Value) {
        if let Some(pos) = self.index_of(key) {
            self.keys.remove(pos);
        }
    }

    /// Position of `key`, or `None` when absent
    pub fn index_of(&self, key: &Value) -> Option<usize> {
        if self.sorted {
            self.keys.binary_search(key).ok()
        } else {
            self.keys.iter().position(|k| k == key)
        }
    }

    pub fn contains(&self, key: &Value) -> bool {
        self.index_of(key).is_some()
    }

    /// The key the next auto-assigned row receives.
    ///
    /// Does not mutate: the counter only moves when the key is `add`ed.
    pub fn next_auto_increment(&self) -> i64 {
        self.auto_increment_counter + 1
    }

    /// Keys with `low <= key <= high`, in index order.
    ///
    /// A missing bound is open on that side.
    pub fn range(&self, low: Option<&Value>, high: Option<&Value>) -> Vec<Value> {
        if !self.sorted {
            return self
                .keys
                .iter()
                .filter(|k| low.map_or(true, |l| *k >= l) && high.map_or(true, |h| *k <= h))
                .cloned()
                .collect();
        }

        let start = low.map_or(0, |l| self.keys.partition_point(|k| k < l));
        let end = high.map_or(self.keys.len(), |h| self.keys.partition_point(|k| k <= h));
        if start >= end {
            return Vec::new();
        }
        self.keys[start..end].to_vec()
    }

    /// Window read of `limit` keys after skipping `offset`.
    ///
    /// With `reverse`, the window is taken from the tail, newest/largest first.
    pub fn keys_at(&self, offset: usize, limit: usize, reverse: bool) -> Vec<Value> {
        if reverse {
            self.keys.iter().rev().skip(offset).take(limit).cloned().collect()
        } else {
            self.keys.iter().skip(offset).take(limit).cloned().collect()
        }
    }

    pub fn keys(&self) -> &[Value] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Drops every key. The auto-increment counter is kept so keys are not reused.
    pub fn clear(&mut self) {
        self.keys.clear();
    }
}
