//! Keyed TTL cache and in-flight fetch registry.
//!
//! Both maps live in one [`CacheState`] behind one mutex, so a key's status
//! transition and its cache write happen atomically.
//!
//! Entry state machine:
//!
//! ```text
//! Empty --fetch--> Fetching --ok--> Fresh --ttl elapses--> Stale
//!                     |                                     |
//!                     +--err--> (prior status)   Fetching <-+ (revalidate / refetch)
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::dispatch::Payload;
use crate::handle::RequestId;

/// Observable status of a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Stored value is within its TTL.
    Fresh,
    /// Stored value outlived its TTL.
    Stale,
    /// A fetch for the key is outstanding.
    Fetching,
}

/// A stored task result.
#[derive(Clone)]
pub struct CacheEntry {
    /// Cache key.
    pub key: String,
    pub(crate) value: Payload,
    /// When the value was stored.
    pub created_at: Instant,
    /// How long the value stays fresh.
    pub ttl: Duration,
}

impl CacheEntry {
    /// Fresh or stale, computed from `now`. Never `Fetching`.
    pub fn status(&self, now: Instant) -> CacheStatus {
        if now.saturating_duration_since(self.created_at) < self.ttl {
            CacheStatus::Fresh
        } else {
            CacheStatus::Stale
        }
    }

    /// Borrow the value as `T`.
    pub fn value<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("created_at", &self.created_at)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Identifies one fetch started by [`CacheState::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct FetchId(u64);

/// Outstanding fetch for one key.
#[derive(Debug)]
struct InFlight {
    key: String,
    /// Requests to deliver the result to, in arrival order.
    waiters: Vec<RequestId>,
    /// TTL of the entry the fetch will store.
    ttl: Duration,
    /// Cleared by `invalidate` so an outdated result is delivered but not stored.
    store_result: bool,
}

/// Result of looking a key up for a caller expecting `T`.
pub(crate) enum CacheLookup {
    Fresh(Payload),
    Stale(Payload),
    /// Nothing usable is stored: absent, or stored with a different type.
    Miss,
}

#[derive(Default)]
pub(crate) struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Every fetch still running, joinable or not.
    fetches: HashMap<FetchId, InFlight>,
    /// The fetch new callers for a key attach to.
    joinable: HashMap<String, FetchId>,
    next_fetch: u64,
}

impl CacheState {
    pub(crate) fn lookup<T: Any>(&self, key: &str, now: Instant) -> CacheLookup {
        let Some(entry) = self.entries.get(key) else {
            return CacheLookup::Miss;
        };
        if !entry.value.is::<T>() {
            tracing::debug!(key, "Cached value has a different type; treating as miss");
            return CacheLookup::Miss;
        }
        let payload = Arc::clone(&entry.value);
        match entry.status(now) {
            CacheStatus::Fresh => CacheLookup::Fresh(payload),
            _ => CacheLookup::Stale(payload),
        }
    }

    /// Attach `request` to the joinable fetch for `key`. Returns `false` if none.
    pub(crate) fn join(&mut self, key: &str, request: RequestId) -> bool {
        let Some(fetch) = self
            .joinable
            .get(key)
            .and_then(|id| self.fetches.get_mut(id))
        else {
            return false;
        };
        fetch.waiters.push(request);
        true
    }

    /// Register a new fetch with `request` as first waiter.
    ///
    /// The fetch becomes joinable unless another joinable fetch for `key` is
    /// already running.
    pub(crate) fn begin(&mut self, key: &str, request: RequestId, ttl: Duration) -> FetchId {
        self.next_fetch += 1;
        let id = FetchId(self.next_fetch);
        self.fetches.insert(
            id,
            InFlight {
                key: key.to_string(),
                waiters: vec![request],
                ttl,
                store_result: true,
            },
        );
        self.joinable.entry(key.to_string()).or_insert(id);
        id
    }

    /// Close fetch `id` and return its waiters.
    ///
    /// A successful result is stored unless the key was invalidated while
    /// the fetch ran. A failure leaves any existing entry untouched.
    pub(crate) fn complete(
        &mut self,
        id: FetchId,
        result: Option<&Payload>,
        now: Instant,
    ) -> Vec<RequestId> {
        let Some(fetch) = self.fetches.remove(&id) else {
            return Vec::new();
        };
        if self.joinable.get(&fetch.key) == Some(&id) {
            self.joinable.remove(&fetch.key);
        }
        if let Some(value) = result
            && fetch.store_result
        {
            self.entries.insert(
                fetch.key.clone(),
                CacheEntry {
                    key: fetch.key,
                    value: Arc::clone(value),
                    created_at: now,
                    ttl: fetch.ttl,
                },
            );
        }
        fetch.waiters
    }

    /// Remove the entry for `key` and detach its running fetches.
    ///
    /// Detached fetches still deliver to their waiters, store nothing, and
    /// take no new waiters.
    pub(crate) fn invalidate(&mut self, key: &str) -> bool {
        self.joinable.remove(key);
        for fetch in self.fetches.values_mut().filter(|fetch| fetch.key == key) {
            fetch.store_result = false;
        }
        self.entries.remove(key).is_some()
    }

    pub(crate) fn invalidate_all(&mut self) -> usize {
        self.joinable.clear();
        for fetch in self.fetches.values_mut() {
            fetch.store_result = false;
        }
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Forget every outstanding fetch. Returns how many there were.
    pub(crate) fn abandon_fetches(&mut self) -> usize {
        let count = self.fetches.len();
        self.fetches.clear();
        self.joinable.clear();
        count
    }

    pub(crate) fn status(&self, key: &str, now: Instant) -> Option<CacheStatus> {
        if self.joinable.contains_key(key) {
            return Some(CacheStatus::Fetching);
        }
        self.entries.get(key).map(|entry| entry.status(now))
    }

    pub(crate) fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
