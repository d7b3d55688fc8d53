use bytes::Bytes;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::{Duration, Instant};

/// The Store is responsible for managing key-value pairs, with optional time-to-live settings for
/// each key. Expired keys are removed lazily, by the first lookup that observes them.
///
/// The store is designed to be thread-safe, allowing it to be shared and cloned cheaply using
/// reference counting. Every operation runs under a single lock, so the check-and-evict of `get`
/// can never be observed half done by another connection.
#[derive(Clone)]
pub struct Store {
    inner: Arc<InnerStore>,
}

impl Store {
    pub fn new() -> Store {
        let state = State {
            keys: HashMap::new(),
        };

        Self {
            inner: Arc::new(InnerStore {
                state: Mutex::new(state),
            }),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Store {
    type Target = InnerStore;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub struct InnerStore {
    state: Mutex<State>,
}

impl InnerStore {
    pub fn lock(&self) -> InnerStoreLocked<'_> {
        // Nothing panics while holding the lock, and the map stays consistent even if something
        // did, so a poisoned lock is still safe to use.
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        InnerStoreLocked { state }
    }
}

pub struct InnerStoreLocked<'a> {
    state: MutexGuard<'a, State>,
}

impl<'a> InnerStoreLocked<'a> {
    /// Stores `data` under `key`, replacing any previous value and its expiration. A missing or
    /// zero `ttl` means the key never expires.
    pub fn set(&mut self, key: Key, data: Bytes, ttl: Option<Duration>) {
        let expires_at = ttl
            .filter(|ttl| !ttl.is_zero())
            .map(|ttl| Instant::now() + ttl);

        self.state.keys.insert(key, Value { data, expires_at });
    }

    /// Returns the value stored under `key`, evicting it first if it has expired.
    pub fn get(&mut self, key: &str) -> Option<Bytes> {
        let now = Instant::now();

        let expired = self.state.keys.get(key)?.is_expired(now);
        if expired {
            self.remove(key);
            return None;
        }

        self.state.keys.get(key).map(|value| value.data.clone())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.state.keys.remove(key)
    }

    /// Number of entries held, including expired ones no lookup has evicted yet.
    pub fn size(&self) -> usize {
        self.state.keys.len()
    }
}

type Key = String;

pub struct Value {
    pub data: Bytes,
    pub expires_at: Option<Instant>,
}

impl Value {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

struct State {
    keys: HashMap<Key, Value>,
}
