use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use crate::errors::NormalizedError;

// --- Keys ---

/// Resource
///
/// The server resource types this console reads and mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Items,
    User,
    Password,
}

/// Scope
///
/// Which slice of a resource a cache entry addresses: the whole collection,
/// a single record, or the current user's singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    List,
    Item(Uuid),
    Me,
}

/// ResourceKey
///
/// Address of one cache-held server resource collection or record.
/// Uniqueness: one live entry per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub resource: Resource,
    pub scope: Scope,
}

impl ResourceKey {
    pub fn items_list() -> Self {
        Self {
            resource: Resource::Items,
            scope: Scope::List,
        }
    }

    pub fn item(id: Uuid) -> Self {
        Self {
            resource: Resource::Items,
            scope: Scope::Item(id),
        }
    }

    pub fn current_user() -> Self {
        Self {
            resource: Resource::User,
            scope: Scope::Me,
        }
    }
}

// --- Entries ---

/// EntryStatus
///
/// Lifecycle of one cache entry. `Stale` covers both "never fetched" and
/// "invalidated"; `Errored` keeps the last-known-good data alongside the
/// failure (stale-while-error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Fresh,
    Stale,
    Loading,
    Errored,
}

/// EntrySnapshot
///
/// The externally visible state of one cache entry, published to
/// subscribers on every change. `data` survives invalidation and fetch
/// failures so views can keep rendering the last-known-good value.
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
    pub status: EntryStatus,
    pub data: Option<Value>,
    pub error: Option<NormalizedError>,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl EntrySnapshot {
    fn empty() -> Self {
        Self {
            status: EntryStatus::Stale,
            data: None,
            error: None,
            last_fetched_at: None,
        }
    }
}

struct Entry {
    snapshot: EntrySnapshot,
    // Bumped on every invalidation; in-flight fetches carry the generation
    // they started under and their results are discarded on mismatch.
    generation: u64,
    subscribers: usize,
    publisher: watch::Sender<EntrySnapshot>,
}

impl Entry {
    fn new() -> Self {
        let (publisher, _) = watch::channel(EntrySnapshot::empty());
        Self {
            snapshot: EntrySnapshot::empty(),
            generation: 0,
            subscribers: 0,
            publisher,
        }
    }

    fn publish(&self) {
        self.publisher.send_replace(self.snapshot.clone());
    }
}

// --- Fetch seam ---

/// ResourceFetcher
///
/// The cache's only collaborator: resolves a key to the corresponding
/// remote read. Implemented over the API transport in production
/// (`transport::ApiFetcher`) and by scripted stubs in tests, so the cache
/// itself depends on nothing concrete.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, key: &ResourceKey) -> Result<Value, NormalizedError>;
}

// --- Cache ---

enum Plan {
    Hit(Value),
    Fetch(u64),
    Wait(watch::Receiver<EntrySnapshot>),
}

enum Settled {
    Done(Result<Value, NormalizedError>),
    // The entry was invalidated or destroyed while we waited; re-plan.
    Restart,
}

/// ResourceCache
///
/// Keyed, invalidatable read-through cache of server resource collections.
/// Owns every `CacheEntry`; views hold subscriptions, never the entries
/// themselves.
///
/// Concurrency rules:
/// - at most one in-flight fetch per key: concurrent `ensure_fresh` callers
///   attach to the running fetch through the entry's watch channel.
/// - fetch completions only apply when their generation matches the entry's
///   current generation, so a slow fetch never overwrites data that an
///   invalidation has superseded.
/// - invalidation eagerly re-fetches only keys with live subscribers;
///   unwatched entries refresh lazily on their next read.
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<CacheShared>,
}

struct CacheShared {
    entries: Mutex<HashMap<ResourceKey, Entry>>,
    fetcher: Arc<dyn ResourceFetcher>,
}

impl ResourceCache {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            inner: Arc::new(CacheShared {
                entries: Mutex::new(HashMap::new()),
                fetcher,
            }),
        }
    }

    /// read
    ///
    /// Synchronous view of the entry's current state. Creates the entry on
    /// first read (status `Stale`, no data) without triggering a fetch.
    pub fn read(&self, key: &ResourceKey) -> EntrySnapshot {
        let mut entries = self.inner.entries.lock();
        entries
            .entry(*key)
            .or_insert_with(Entry::new)
            .snapshot
            .clone()
    }

    /// ensure_fresh
    ///
    /// Returns the entry's data, fetching from the remote API only if the
    /// entry is absent, stale, or errored. A call that finds a fetch
    /// already in flight awaits that fetch's outcome instead of issuing a
    /// duplicate network call.
    pub async fn ensure_fresh(&self, key: &ResourceKey) -> Result<Value, NormalizedError> {
        loop {
            let plan = {
                let mut entries = self.inner.entries.lock();
                let entry = entries.entry(*key).or_insert_with(Entry::new);
                match entry.snapshot.status {
                    EntryStatus::Fresh => {
                        Plan::Hit(entry.snapshot.data.clone().unwrap_or(Value::Null))
                    }
                    EntryStatus::Loading => Plan::Wait(entry.publisher.subscribe()),
                    EntryStatus::Stale | EntryStatus::Errored => {
                        entry.snapshot.status = EntryStatus::Loading;
                        entry.publish();
                        Plan::Fetch(entry.generation)
                    }
                }
            };

            match plan {
                Plan::Hit(value) => return Ok(value),
                Plan::Fetch(generation) => return self.run_fetch(key, generation).await,
                Plan::Wait(rx) => match Self::wait_settled(rx).await {
                    Settled::Done(result) => return result,
                    Settled::Restart => continue,
                },
            }
        }
    }

    /// invalidate
    ///
    /// Marks the entry stale and bumps its generation so any in-flight
    /// fetch result is discarded. Entries with live subscribers are
    /// re-fetched eagerly in a background task; unwatched entries wait for
    /// their next read. Unknown keys are a no-op.
    pub fn invalidate(&self, key: &ResourceKey) {
        let eager = {
            let mut entries = self.inner.entries.lock();
            let Some(entry) = entries.get_mut(key) else {
                return;
            };
            entry.generation += 1;
            entry.snapshot.status = EntryStatus::Stale;
            entry.publish();
            entry.subscribers > 0
        };
        tracing::debug!("cache invalidated: {key:?} (eager_refetch={eager})");
        if eager {
            let cache = self.clone();
            let key = *key;
            tokio::spawn(async move {
                if let Err(e) = cache.ensure_fresh(&key).await {
                    tracing::debug!("eager refetch of {key:?} failed: {e}");
                }
            });
        }
    }

    /// subscribe
    ///
    /// Registers a reference-counted reader of the key. The subscription
    /// streams every snapshot change; dropping the last subscription for a
    /// key destroys the entry.
    pub fn subscribe(&self, key: &ResourceKey) -> CacheSubscription {
        let rx = {
            let mut entries = self.inner.entries.lock();
            let entry = entries.entry(*key).or_insert_with(Entry::new);
            entry.subscribers += 1;
            entry.publisher.subscribe()
        };
        CacheSubscription {
            key: *key,
            cache: self.clone(),
            rx,
        }
    }

    async fn run_fetch(&self, key: &ResourceKey, generation: u64) -> Result<Value, NormalizedError> {
        let result = self.inner.fetcher.fetch(key).await;

        let mut entries = self.inner.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            // Entry destroyed while the fetch was in flight. The caller
            // still gets the result; there is just nothing left to cache.
            return result;
        };
        if entry.generation != generation {
            // A newer generation owns this entry; the late result must not
            // overwrite fresher data.
            tracing::debug!("discarding stale fetch result for {key:?}");
            return result;
        }
        match &result {
            Ok(value) => {
                entry.snapshot.status = EntryStatus::Fresh;
                entry.snapshot.data = Some(value.clone());
                entry.snapshot.error = None;
                entry.snapshot.last_fetched_at = Some(Utc::now());
            }
            Err(error) => {
                // Stale-while-error: prior data is retained for display.
                entry.snapshot.status = EntryStatus::Errored;
                entry.snapshot.error = Some(error.clone());
            }
        }
        entry.publish();
        result
    }

    async fn wait_settled(mut rx: watch::Receiver<EntrySnapshot>) -> Settled {
        loop {
            let snapshot = rx.borrow().clone();
            match snapshot.status {
                EntryStatus::Fresh => {
                    return Settled::Done(Ok(snapshot.data.unwrap_or(Value::Null)));
                }
                EntryStatus::Errored => {
                    let error = snapshot
                        .error
                        .unwrap_or_else(|| NormalizedError::server("Fetch failed.", false));
                    return Settled::Done(Err(error));
                }
                // Invalidated while loading: go back to planning, which
                // either attaches to the replacement fetch or starts one.
                EntryStatus::Stale => return Settled::Restart,
                EntryStatus::Loading => {
                    if rx.changed().await.is_err() {
                        return Settled::Restart;
                    }
                }
            }
        }
    }
}

/// CacheSubscription
///
/// A view's weak handle on one cache entry. Holds the live snapshot stream
/// and keeps the entry alive; the entry is destroyed when the last
/// subscription for its key is dropped.
pub struct CacheSubscription {
    key: ResourceKey,
    cache: ResourceCache,
    rx: watch::Receiver<EntrySnapshot>,
}

impl CacheSubscription {
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    /// Latest published snapshot, without waiting.
    pub fn current(&self) -> EntrySnapshot {
        self.rx.borrow().clone()
    }

    /// Waits for the next snapshot change. Returns `None` once the entry
    /// has been destroyed.
    pub async fn changed(&mut self) -> Option<EntrySnapshot> {
        if self.rx.changed().await.is_err() {
            return None;
        }
        Some(self.rx.borrow().clone())
    }
}

impl Drop for CacheSubscription {
    fn drop(&mut self) {
        let mut entries = self.cache.inner.entries.lock();
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                entries.remove(&self.key);
            }
        }
    }
}
