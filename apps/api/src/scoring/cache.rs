//! Score cache — a bounded, time-expiring key-value store for `ScoreReport`s.
//!
//! Keyed by a SHA-256 of the document content. The clock is injected so tests
//! control expiry; the cache is passed in via `AppState` rather than held as
//! module state, so it can be swapped for a distributed cache without touching
//! call sites.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::document::Document;
use crate::scoring::ScoreReport;

/// Injected time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

type CacheKey = [u8; 32];

struct Entry {
    stored_at: Instant,
    report: ScoreReport,
}

/// Bounded TTL cache. Eviction is FIFO by insertion order once the cap is hit;
/// expired entries are dropped lazily on access.
pub struct ScoreCache {
    inner: Mutex<CacheInner>,
    ttl: Duration,
    capacity: usize,
    clock: Box<dyn Clock>,
}

struct CacheInner {
    entries: HashMap<CacheKey, Entry>,
    order: VecDeque<CacheKey>,
}

impl ScoreCache {
    pub fn new(ttl: Duration, capacity: usize, clock: Box<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            ttl,
            capacity,
            clock,
        }
    }

    /// Content hash of title + body. Markup is excluded on purpose: trackers
    /// and timestamps churn the raw page without changing what we score.
    pub fn key_for(doc: &Document) -> CacheKey {
        let mut hasher = Sha256::new();
        hasher.update(doc.title.as_bytes());
        hasher.update([0u8]);
        hasher.update(doc.body.as_bytes());
        hasher.finalize().into()
    }

    pub fn get(&self, key: &CacheKey) -> Option<ScoreReport> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().expect("score cache lock poisoned");

        match inner.entries.get(key) {
            Some(entry) if now.duration_since(entry.stored_at) < self.ttl => {
                Some(entry.report.clone())
            }
            Some(_) => {
                inner.entries.remove(key);
                inner.order.retain(|k| k != key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: CacheKey, report: ScoreReport) {
        let now = self.clock.now();
        let mut inner = self.inner.lock().expect("score cache lock poisoned");

        if inner.entries.insert(key, Entry { stored_at: now, report }).is_none() {
            inner.order.push_back(key);
        }

        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
    }
}
