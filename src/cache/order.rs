//! Recency Order Module
//!
//! Tracks entries by recency of touch for the bounded cache.

use std::collections::HashMap;
use std::hash::Hash;

use generational_arena::{Arena, Index};

use crate::cache::CacheEntry;

#[derive(Debug)]
struct Node<K, V> {
    entry: CacheEntry<K, V>,
    prev: Option<Index>,
    next: Option<Index>,
}

// == Recency Order ==
/// Hash index over an arena-backed doubly linked list of entries.
///
/// - Head = most recently touched
/// - Tail = least recently touched
///
/// Every operation is O(1) apart from `clear` and `keys`. The index and the
/// list always hold the same set of keys.
#[derive(Debug)]
pub(crate) struct RecencyOrder<K, V> {
    nodes: Arena<Node<K, V>>,
    index: HashMap<K, Index>,
    head: Option<Index>,
    tail: Option<Index>,
}

impl<K, V> RecencyOrder<K, V> {
    // == Constructor ==
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        debug_assert_eq!(self.index.len(), self.nodes.len());
        self.index.len()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }
}

impl<K, V> RecencyOrder<K, V>
where
    K: Eq + Hash + Clone,
{
    // Unlinks a node without removing it from the arena or the index.
    fn unlink(&mut self, idx: Index) {
        let (prev, next) = {
            let node = &self.nodes[idx];
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
    }

    fn link_front(&mut self, idx: Index) {
        let old_head = self.head;
        {
            let node = &mut self.nodes[idx];
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            self.nodes[h].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    // == Touch ==
    /// Replaces the value of an existing key and moves it to the front.
    ///
    /// Returns the new value back as `Err` if the key is absent.
    pub(crate) fn touch(&mut self, key: &K, value: V) -> std::result::Result<(), V> {
        let Some(&idx) = self.index.get(key) else {
            return Err(value);
        };
        self.nodes[idx].entry.replace(value);
        if self.head != Some(idx) {
            self.unlink(idx);
            self.link_front(idx);
        }
        Ok(())
    }

    // == Push Front ==
    /// Inserts a key that is not yet tracked at the most-recent end.
    pub(crate) fn push_front(&mut self, key: K, value: V) {
        debug_assert!(!self.index.contains_key(&key));
        let idx = self.nodes.insert(Node {
            entry: CacheEntry::new(key.clone(), value),
            prev: None,
            next: None,
        });
        self.index.insert(key, idx);
        self.link_front(idx);
    }

    fn remove_at(&mut self, idx: Index) -> Option<CacheEntry<K, V>> {
        self.unlink(idx);
        let node = self.nodes.remove(idx)?;
        self.index.remove(node.entry.key());
        Some(node.entry)
    }

    // == Pop Newest ==
    /// Removes and returns the most recently touched entry.
    pub(crate) fn pop_newest(&mut self) -> Option<CacheEntry<K, V>> {
        let idx = self.head?;
        self.remove_at(idx)
    }

    // == Pop Oldest ==
    /// Removes and returns the least recently touched entry.
    pub(crate) fn pop_oldest(&mut self) -> Option<CacheEntry<K, V>> {
        let idx = self.tail?;
        self.remove_at(idx)
    }

    // == Peek ==
    /// Looks up a value without changing its position.
    pub(crate) fn peek(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&idx| &self.nodes[idx].entry.value)
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Keys from most to least recently touched.
    pub(crate) fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut current = self.head;
        while let Some(idx) = current {
            let node = &self.nodes[idx];
            keys.push(node.entry.key().clone());
            current = node.next;
        }
        keys
    }
}
