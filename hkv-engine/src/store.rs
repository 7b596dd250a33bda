//! # Entry Store
//!
//! Purpose: Hold all live entries and link them in a recency-ordered
//! doubly-linked list with a keyed index for O(1) lookup, as a single
//! consistent structure so the index and the list can never desync.
//!
//! ## Design Principles
//!
//! 1. **Arena + Integer Indices**: Entries live in a dense `Vec`; the index
//!    maps key -> slot number; `prev`/`next` are slot numbers. Avoids
//!    pointer aliasing entirely and plays well with move semantics.
//! 2. **Shared Key Buffer**: The index and each node share the same `Arc<K>`
//!    to avoid a second allocation per entry.
//! 3. **MRU-at-Head**: The list runs MRU (head) to LRU (tail), matching the
//!    external contract's `all()` ordering directly.
//! 4. **No Locking Here**: This type is not thread-safe on its own; the
//!    engine wraps it in a single mutex (see `engine.rs`).
//!
//! ## Structure Overview
//!
//! ```text
//! Store<K, V>
//!   ├── map: HashMap<Arc<K>, usize>
//!   ├── nodes: Vec<Option<Node<K, V>>>
//!   ├── free: Vec<usize>
//!   └── head/tail: recency list ends
//!         └── Node { key, value, expires_at, prev, next }
//! ```

use std::sync::Arc;
use std::time::Instant;

use ahash::RandomState;
use hashbrown::HashMap;

use crate::key::CacheKey;

/// Internal node representing a single key/value entry.
///
/// Uses an index-based intrusive list for O(1) LRU updates without heap
/// pointers, keeping the arena safe and cache-friendly.
#[derive(Debug)]
struct Node<K, V> {
    key: Arc<K>,
    value: V,
    expires_at: Option<Instant>,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<K, V> Node<K, V> {
    /// Returns true when the entry has expired at `now`.
    fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// The entry store: a keyed index colocated with a recency list.
///
/// Colocating ownership of both structures in one component prevents the
/// well-known desync bug where an entry is removed from one but not the
/// other (invariant 1 in the cache's contract).
#[derive(Debug)]
pub struct Store<K, V> {
    /// Key -> node index for O(1) lookup.
    map: HashMap<Arc<K>, usize, RandomState>,
    /// Dense node storage; `None` marks a recycled slot.
    nodes: Vec<Option<Node<K, V>>>,
    /// Free-list for recycling node slots.
    free: Vec<usize>,
    /// Most-recently-used end of the list.
    head: Option<usize>,
    /// Least-recently-used end of the list.
    tail: Option<usize>,
}

impl<K, V> Store<K, V>
where
    K: CacheKey,
    V: Clone,
{
    /// Creates an empty store.
    pub fn new() -> Self {
        Store {
            map: HashMap::with_hasher(RandomState::new()),
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    /// Number of live entries.
    pub fn size(&self) -> usize {
        self.map.len()
    }

    /// Looks up a key without mutating recency order.
    ///
    /// Returns the entry's value and whether it is expired at `now`; the
    /// caller decides what to do with an expired entry (the store itself
    /// performs no structural mutation here).
    pub fn lookup(&self, key: &K, now: Instant) -> Option<(V, bool)> {
        let idx = *self.map.get(key)?;
        let node = self.nodes[idx].as_ref().expect("indexed node exists");
        Some((node.value.clone(), node.is_expired(now)))
    }

    /// Unlinks `idx` from its current position and relinks it at the head
    /// (MRU). O(1). No-op if already at head.
    pub fn touch(&mut self, key: &K) {
        let Some(&idx) = self.map.get(key) else {
            return;
        };
        if self.head == Some(idx) {
            return;
        }
        self.lru_remove(idx);
        self.lru_push_front(idx);
    }

    /// Inserts a new entry or overwrites an existing one, moving it to MRU.
    ///
    /// Returns `true` when a new entry was added (as opposed to an
    /// overwrite), which callers use to decide whether capacity may have
    /// been exceeded.
    pub fn insert(&mut self, key: K, value: V, expires_at: Option<Instant>) -> bool {
        if let Some(&idx) = self.map.get(&key) {
            let node = self.nodes[idx].as_mut().expect("indexed node exists");
            node.value = value;
            node.expires_at = expires_at;
            if self.head != Some(idx) {
                self.lru_remove(idx);
                self.lru_push_front(idx);
            }
            return false;
        }

        let key = Arc::new(key);
        let idx = self.free.pop().unwrap_or_else(|| {
            self.nodes.push(None);
            self.nodes.len() - 1
        });

        self.nodes[idx] = Some(Node {
            key: Arc::clone(&key),
            value,
            expires_at,
            prev: None,
            next: None,
        });
        self.lru_push_front(idx);
        self.map.insert(key, idx);
        true
    }

    /// Removes a key's entry, if present. O(1).
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = *self.map.get(key)?;
        Some(self.remove_idx(idx))
    }

    /// Removes and returns the least-recently-used entry's key/value, or
    /// `None` when the store is empty. O(1).
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let idx = self.tail?;
        let key = Arc::clone(&self.nodes[idx].as_ref().expect("tail node exists").key);
        let value = self.remove_idx(idx);
        Some(((*key).clone(), value))
    }

    /// Removes every expired entry, returning how many were removed.
    ///
    /// This is a keyed, not list-ordered, scan: expired entries can be
    /// anywhere in the recency list, so there is no shortcut via the head
    /// or tail alone.
    pub fn remove_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| match slot {
                Some(node) if node.is_expired(now) => Some(idx),
                _ => None,
            })
            .collect();

        let removed = expired.len();
        for idx in expired {
            self.remove_idx(idx);
        }
        removed
    }

    /// Removes every expired entry, visiting at most `limit` slots in this
    /// call. Returns `(removed, positions_visited)`, where
    /// `positions_visited` counts every slot walked over — free-list holes
    /// included — so the caller can measure batch progress against
    /// [`Store::slot_count`] instead of against the live-entry count, which
    /// a dense store (no holes) would otherwise hold at `limit` forever.
    pub fn remove_expired_batch(&mut self, now: Instant, start: usize, limit: usize) -> (usize, usize) {
        if self.nodes.is_empty() {
            return (0, 0);
        }
        let len = self.nodes.len();
        let scan = limit.min(len);
        let mut expired = Vec::new();
        for offset in 0..scan {
            let idx = (start + offset) % len;
            if let Some(node) = self.nodes[idx].as_ref() {
                if node.is_expired(now) {
                    expired.push(idx);
                }
            }
        }
        let removed = expired.len();
        for idx in expired {
            self.remove_idx(idx);
        }
        (removed, scan)
    }

    /// Total number of slots in the arena, including recycled (free-list)
    /// holes. Upper bound on how many positions one logical sweep must
    /// visit to cover the whole store once.
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    /// Empties the store entirely. Counters are not this type's concern.
    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    /// Snapshot of all entries in MRU -> LRU order, skipping entries
    /// expired at `now`. Read-only: does not mutate recency.
    pub fn iterate(&self, now: Instant) -> Vec<(K, V)> {
        let mut out = Vec::with_capacity(self.map.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let node = self.nodes[idx].as_ref().expect("list node exists");
            if !node.is_expired(now) {
                out.push(((*node.key).clone(), node.value.clone()));
            }
            cursor = node.next;
        }
        out
    }

    /// Returns the key currently at the tail (LRU), if any, without
    /// removing it. Used by tests asserting eviction locality.
    #[cfg(test)]
    pub fn peek_lru_key(&self) -> Option<K> {
        let idx = self.tail?;
        Some((*self.nodes[idx].as_ref()?.key).clone())
    }

    /// Returns the key currently at the head (MRU), if any.
    #[cfg(test)]
    pub fn peek_mru_key(&self) -> Option<K> {
        let idx = self.head?;
        Some((*self.nodes[idx].as_ref()?.key).clone())
    }

    /// Verifies invariant 1: the index's key set equals the recency
    /// list's key set. Exposed for property tests.
    #[cfg(test)]
    pub fn index_matches_list(&self) -> bool {
        let mut list_keys: std::collections::HashSet<*const K> = std::collections::HashSet::new();
        let mut cursor = self.head;
        let mut count = 0;
        while let Some(idx) = cursor {
            let node = self.nodes[idx].as_ref().expect("list node exists");
            list_keys.insert(Arc::as_ptr(&node.key));
            cursor = node.next;
            count += 1;
        }
        if count != self.map.len() {
            return false;
        }
        self.map
            .values()
            .all(|&idx| {
                let node = self.nodes[idx].as_ref().expect("indexed node exists");
                list_keys.contains(&Arc::as_ptr(&node.key))
            })
    }

    fn lru_remove(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.nodes[idx].as_ref().expect("node exists");
            (node.prev, node.next)
        };

        match prev {
            Some(prev_idx) => {
                self.nodes[prev_idx].as_mut().expect("prev node exists").next = next;
            }
            None => self.head = next,
        }

        match next {
            Some(next_idx) => {
                self.nodes[next_idx].as_mut().expect("next node exists").prev = prev;
            }
            None => self.tail = prev,
        }

        let node = self.nodes[idx].as_mut().expect("node exists");
        node.prev = None;
        node.next = None;
    }

    fn lru_push_front(&mut self, idx: usize) {
        let head = self.head;
        {
            let node = self.nodes[idx].as_mut().expect("node exists");
            node.prev = None;
            node.next = head;
        }

        if let Some(head_idx) = head {
            self.nodes[head_idx].as_mut().expect("head node exists").prev = Some(idx);
        } else {
            self.tail = Some(idx);
        }

        self.head = Some(idx);
    }

    fn remove_idx(&mut self, idx: usize) -> V {
        self.lru_remove(idx);
        let node = self.nodes[idx].take().expect("node exists");
        self.map.remove(&node.key);
        self.free.push(idx);
        node.value
    }
}

impl<K, V> Default for Store<K, V>
where
    K: CacheKey,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn insert_then_lookup_roundtrips() {
        let mut store: Store<String, i32> = Store::new();
        assert!(store.insert("a".to_string(), 1, None));
        let (value, expired) = store.lookup(&"a".to_string(), Instant::now()).unwrap();
        assert_eq!(value, 1);
        assert!(!expired);
    }

    #[test]
    fn insert_overwrite_reports_false_and_moves_to_head() {
        let mut store: Store<String, i32> = Store::new();
        store.insert("a".to_string(), 1, None);
        store.insert("b".to_string(), 2, None);
        assert!(!store.insert("a".to_string(), 9, None));
        assert_eq!(store.peek_mru_key(), Some("a".to_string()));
    }

    #[test]
    fn pop_lru_removes_tail() {
        let mut store: Store<String, i32> = Store::new();
        store.insert("a".to_string(), 1, None);
        store.insert("b".to_string(), 2, None);
        assert_eq!(store.peek_lru_key(), Some("a".to_string()));
        let (key, value) = store.pop_lru().unwrap();
        assert_eq!(key, "a");
        assert_eq!(value, 1);
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn touch_moves_entry_to_head() {
        let mut store: Store<String, i32> = Store::new();
        store.insert("a".to_string(), 1, None);
        store.insert("b".to_string(), 2, None);
        store.touch(&"a".to_string());
        assert_eq!(store.peek_mru_key(), Some("a".to_string()));
        assert_eq!(store.peek_lru_key(), Some("b".to_string()));
    }

    #[test]
    fn remove_expired_counts_and_deletes() {
        let mut store: Store<String, i32> = Store::new();
        let now = Instant::now();
        store.insert("a".to_string(), 1, Some(now - Duration::from_secs(1)));
        store.insert("b".to_string(), 2, None);
        let removed = store.remove_expired(now);
        assert_eq!(removed, 1);
        assert_eq!(store.size(), 1);
        assert!(store.lookup(&"a".to_string(), now).is_none());
    }

    #[test]
    fn iterate_is_mru_to_lru_and_skips_expired() {
        let mut store: Store<String, i32> = Store::new();
        let now = Instant::now();
        store.insert("a".to_string(), 1, None);
        store.insert("b".to_string(), 2, Some(now - Duration::from_secs(1)));
        store.insert("c".to_string(), 3, None);
        let snapshot = store.iterate(now);
        assert_eq!(
            snapshot,
            vec![("c".to_string(), 3), ("a".to_string(), 1)]
        );
    }

    #[test]
    fn index_matches_list_after_churn() {
        let mut store: Store<String, i32> = Store::new();
        for i in 0..20 {
            store.insert(format!("k{i}"), i, None);
        }
        for i in 0..10 {
            store.remove(&format!("k{i}"));
        }
        store.touch(&"k15".to_string());
        assert!(store.index_matches_list());
    }
}
