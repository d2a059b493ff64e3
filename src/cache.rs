//! Result cache: TTL + capacity bounded memoization with per-key single-flight.
//!
//! Entries expire lazily on lookup. At capacity, expired entries are purged
//! first, then the least recently used one is evicted. Concurrent requests
//! for a key that is being computed wait on the leader's `watch` channel
//! instead of starting a second computation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{AnalyzeError, Result};

type Slot<V> = Option<std::result::Result<V, AnalyzeError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    Hit,
    Miss,
    Joined,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Joined => "JOINED",
        }
    }
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    last_used: u64,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    inflight: HashMap<String, watch::Receiver<Slot<V>>>,
    tick: u64,
}

pub struct ResultCache<V> {
    inner: Mutex<Inner<V>>,
    ttl: Duration,
    capacity: usize,
}

enum Role<V> {
    Leader(watch::Sender<Slot<V>>),
    Follower(watch::Receiver<Slot<V>>),
}

/// Releases the in-flight slot when the leader finishes or is dropped mid-computation.
struct InflightGuard<'a, V> {
    cache: &'a ResultCache<V>,
    key: &'a str,
}

impl<V> Drop for InflightGuard<'_, V> {
    fn drop(&mut self) {
        let mut inner = self.cache.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.inflight.remove(self.key);
    }
}

impl<V: Clone + Send + Sync> ResultCache<V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                inflight: HashMap::new(),
                tick: 0,
            }),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Fresh value for `key`, if any. Expired entries are dropped here.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.lock();
        Self::lookup(&mut inner, key, self.ttl)
    }

    fn lookup(inner: &mut Inner<V>, key: &str, ttl: Duration) -> Option<V> {
        inner.tick += 1;
        let tick = inner.tick;
        let expired = match inner.entries.get_mut(key) {
            Some(e) if e.inserted_at.elapsed() > ttl => true,
            Some(e) => {
                e.last_used = tick;
                return Some(e.value.clone());
            }
            None => return None,
        };
        if expired {
            debug!(%key, "cache entry expired");
            inner.entries.remove(key);
        }
        None
    }

    pub fn put(&self, key: &str, value: V) {
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.capacity {
            let ttl = self.ttl;
            inner.entries.retain(|_, e| e.inserted_at.elapsed() <= ttl);
            if inner.entries.len() >= self.capacity {
                let lru = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(k, _)| k.clone());
                if let Some(k) = lru {
                    debug!(key = %k, "cache evicting least recently used");
                    inner.entries.remove(&k);
                }
            }
        }

        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                inserted_at: Instant::now(),
                last_used: tick,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value or compute it, with at most one computation per key
    /// in flight. Successful values are cached; errors reach every waiter but are
    /// not cached. If the leader is dropped, a waiter takes over the computation.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<(V, CacheStatus)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let mut compute = Some(compute);
        loop {
            let role = {
                let mut inner = self.lock();
                if let Some(v) = Self::lookup(&mut inner, key, self.ttl) {
                    return Ok((v, CacheStatus::Hit));
                }
                match inner.inflight.get(key) {
                    Some(rx) => Role::Follower(rx.clone()),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        inner.inflight.insert(key.to_string(), rx);
                        Role::Leader(tx)
                    }
                }
            };

            match role {
                Role::Follower(rx) => match Self::wait(rx).await {
                    Some(result) => return result.map(|v| (v, CacheStatus::Joined)),
                    None => {
                        debug!(%key, "in-flight leader abandoned; retrying");
                        continue;
                    }
                },
                Role::Leader(tx) => {
                    let Some(compute) = compute.take() else {
                        return Err(AnalyzeError::Internal(
                            "in-flight analysis was abandoned".to_string(),
                        ));
                    };
                    let guard = InflightGuard { cache: self, key };
                    let result = compute().await;
                    if let Ok(v) = &result {
                        self.put(key, v.clone());
                    }
                    drop(guard);
                    // no receivers left is fine
                    let _ = tx.send(Some(result.clone()));
                    return result.map(|v| (v, CacheStatus::Miss));
                }
            }
        }
    }

    /// `None` when the leader went away without publishing a result.
    async fn wait(mut rx: watch::Receiver<Slot<V>>) -> Slot<V> {
        loop {
            let current = rx.borrow_and_update().clone();
            if current.is_some() {
                return current;
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }
}
