//! # Cache store: time-bounded memo of loaded units.
//!
//! ## Rules
//! - **Lazy expiry**: `get` checks the age of the entry and purges it when older than
//!   the TTL. There is no background sweep.
//! - **Insertion-order eviction**: once the store holds more than `capacity` entries the
//!   earliest *inserted* one goes, whatever its access pattern (FIFO, not LRU).
//! - **Stable position**: re-inserting a name replaces its entry without moving it to the back.
//!
//! Time comes from [`tokio::time::Instant`], so paused-clock tests can age entries.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::time::Instant;

use crate::units::UnitHandle;

/// A cached unit.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub name: String,
    pub handle: UnitHandle,
    /// Time between the request and completion of the load.
    pub load_time: Duration,
    pub created_at: Instant,
}

impl CacheEntry {
    pub fn new(name: impl Into<String>, handle: UnitHandle, load_time: Duration) -> Self {
        Self {
            name: name.into(),
            handle,
            load_time,
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Bounded, TTL-checked store keyed by module name.
#[derive(Debug)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    ttl: Duration,
    capacity: usize,
    enabled: bool,
}

impl CacheStore {
    pub fn new(ttl: Duration, capacity: usize, enabled: bool) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            ttl,
            capacity,
            enabled,
        }
    }

    /// Returns a live entry, purging it first if it outlived the TTL.
    pub fn get(&mut self, name: &str) -> Option<&CacheEntry> {
        if !self.enabled {
            return None;
        }
        if self.entries.get(name)?.is_expired(self.ttl) {
            self.remove(name);
            return None;
        }
        self.entries.get(name)
    }

    /// Stores `entry` under `name` and returns the evicted name, if any.
    pub fn put(&mut self, name: impl Into<String>, entry: CacheEntry) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let name = name.into();
        if self.entries.insert(name.clone(), entry).is_none() {
            self.order.push_back(name);
        }

        if self.entries.len() > self.capacity {
            let oldest = self.order.pop_front()?;
            self.entries.remove(&oldest);
            return Some(oldest);
        }
        None
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&mut self, name: &str) {
        if self.entries.remove(name).is_some() {
            self.order.retain(|n| n != name);
        }
    }
}
