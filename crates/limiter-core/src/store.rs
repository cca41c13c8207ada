use crate::window::Counters;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Per-key record. The lock scopes every read-modify-write of the counters.
///
/// A state that has been evicted keeps `None` behind its lock, so a caller
/// that fetched it just before eviction sees the absence instead of mutating
/// an orphan.
#[derive(Debug)]
pub struct KeyState {
    counters: Mutex<Option<Counters>>,
}

impl KeyState {
    fn new(now: u64) -> Self {
        Self {
            counters: Mutex::new(Some(Counters::new(now))),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Option<Counters>> {
        self.counters.lock()
    }
}

fn started_before(counters: &Option<Counters>, cutoff: u64) -> bool {
    counters.map_or(true, |c| c.window_start < cutoff)
}

/// Concurrent map of key to [`KeyState`], owned by one limiter.
#[derive(Debug, Default)]
pub struct KeyStore {
    entries: DashMap<String, Arc<KeyState>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Returns the state for `key`, creating it anchored at `now` on first
    /// touch. Concurrent first touches all receive the same state.
    pub fn get_or_create(&self, key: &str, now: u64) -> Arc<KeyState> {
        if let Some(existing) = self.entries.get(key) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(KeyState::new(now)));
        Arc::clone(entry.value())
    }

    pub fn get(&self, key: &str) -> Option<Arc<KeyState>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Removes `key` and retires its state. Removing a missing key is a no-op.
    pub fn remove(&self, key: &str) {
        if let Some((_, state)) = self.entries.remove(key) {
            *state.lock() = None;
        }
    }

    /// Drops every entry whose window started before `cutoff`, deciding each
    /// one under that key's lock. Returns how many entries were removed.
    ///
    /// The scan only `try_lock`s, so it never waits on a key while holding a
    /// shard. A key that is locked during the scan is in use and is skipped.
    pub fn evict_started_before(&self, cutoff: u64) -> usize {
        let candidates: Vec<(String, Arc<KeyState>)> = self
            .entries
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .counters
                    .try_lock()
                    .is_some_and(|counters| started_before(&counters, cutoff))
            })
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut evicted = 0;
        for (key, state) in candidates {
            let mut guard = state.lock();
            if !started_before(&guard, cutoff) {
                continue;
            }
            // Lock order is key state, then shard. Nothing takes them the
            // other way round while blocking.
            let removed = self
                .entries
                .remove_if(&key, |_, current| Arc::ptr_eq(current, &state))
                .is_some();
            if removed {
                *guard = None;
                evicted += 1;
            }
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
