//! Bounded recency map: a `HashMap` of values plus a `BTreeMap` ordered by
//! (last access, tick). The tick breaks ties between accesses that share a
//! timestamp, so eviction order is always well defined.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

type Stamp = (DateTime<Utc>, u64);

#[derive(Debug)]
struct Slot<V> {
    value: V,
    stamp: Stamp,
}

#[derive(Debug)]
pub struct RecencyMap<V> {
    slots: HashMap<String, Slot<V>>,
    order: BTreeMap<Stamp, String>,
    tick: u64,
}

impl<V> Default for RecencyMap<V> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            order: BTreeMap::new(),
            tick: 0,
        }
    }
}

impl<V> RecencyMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_stamp(&mut self, at: DateTime<Utc>) -> Stamp {
        self.tick += 1;
        (at, self.tick)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Insert or replace, marking the key as most recently used. Returns the
    /// previous value.
    pub fn insert(&mut self, key: String, value: V, at: DateTime<Utc>) -> Option<V> {
        let stamp = self.next_stamp(at);
        let previous = self.slots.insert(key.clone(), Slot { value, stamp });
        if let Some(old) = &previous {
            self.order.remove(&old.stamp);
        }
        self.order.insert(stamp, key);
        previous.map(|slot| slot.value)
    }

    /// Read without changing recency.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.slots.get(key).map(|slot| &slot.value)
    }

    /// Mark as most recently used and return the value.
    pub fn touch(&mut self, key: &str, at: DateTime<Utc>) -> Option<&mut V> {
        if !self.slots.contains_key(key) {
            return None;
        }
        let stamp = self.next_stamp(at);
        let slot = self.slots.get_mut(key)?;
        self.order.remove(&slot.stamp);
        slot.stamp = stamp;
        self.order.insert(stamp, key.to_string());
        Some(&mut slot.value)
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let slot = self.slots.remove(key)?;
        self.order.remove(&slot.stamp);
        Some(slot.value)
    }

    /// Remove and return the least recently used entry.
    pub fn pop_oldest(&mut self) -> Option<(String, V)> {
        let (_, key) = self.order.pop_first()?;
        let slot = self.slots.remove(&key)?;
        Some((key, slot.value))
    }

    /// Keys last accessed strictly before `cutoff`, oldest first.
    pub fn keys_accessed_before(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        self.order
            .range(..(cutoff, 0))
            .map(|(_, key)| key.clone())
            .collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.slots.values().map(|slot| &slot.value)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
    }
}
