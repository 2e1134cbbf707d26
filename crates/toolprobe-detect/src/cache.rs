//! Per-detector result cache
//!
//! Each detector owns one [`ResultCache`]. Entries are keyed by the search
//! roots a request used plus its reduction mode. A generation counter guards
//! against a detection that started before [`ResultCache::invalidate`]
//! writing its (now stale) answer back afterwards.

use std::collections::HashMap;
use std::sync::Mutex;

use toolprobe_core::prelude::*;
use toolprobe_core::Detection;

/// Cache key: search roots as given, plus the reduction mode
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub roots: Vec<String>,
    pub multiple: bool,
}

impl CacheKey {
    pub fn new(roots: &[String], multiple: bool) -> Self {
        Self {
            roots: roots.to_vec(),
            multiple,
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    generation: u64,
    entries: HashMap<CacheKey, Detection>,
}

/// Memo of the last detection per key
#[derive(Debug)]
pub struct ResultCache {
    detector: &'static str,
    state: Mutex<CacheState>,
}

impl ResultCache {
    pub fn new(detector: &'static str) -> Self {
        Self {
            detector,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current generation, captured by a detection before it starts scanning
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn get(&self, key: &CacheKey) -> Option<Detection> {
        let hit = self.lock().entries.get(key).cloned();
        match &hit {
            Some(_) => debug!("{} cache hit for {:?}", self.detector, key.roots),
            None => debug!("{} cache miss for {:?}", self.detector, key.roots),
        }
        hit
    }

    /// Store `detection` unless the cache was invalidated since `generation`
    ///
    /// Returns whether the entry was written.
    pub fn put(&self, key: CacheKey, detection: Detection, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            debug!(
                "{} dropping stale result (generation {} < {})",
                self.detector, generation, state.generation
            );
            return false;
        }
        state.entries.insert(key, detection);
        true
    }

    /// Drop every entry and start a new generation
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.generation += 1;
        debug!(
            "{} cache invalidated (generation {})",
            self.detector, state.generation
        );
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}
