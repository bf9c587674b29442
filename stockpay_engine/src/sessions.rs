//! Per-actor conversational state with a time-to-live.
//!
//! A few flows span more than one request from the same actor: an owner who asked for a refund sends their payout
//! address in a later message, and an admin in upload mode sends stock payloads one at a time. The store remembers what
//! each actor is in the middle of. Entries are removed when the flow completes and are treated as absent once their TTL
//! has lapsed.
//!
//! `SessionStore` is a cheap handle; clones share the same underlying map.
use std::{
    collections::HashMap,
    fmt::Debug,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Duration, Utc};
use log::*;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore<K, V> {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<K, Entry<V>>>>,
}

impl<K, V> Debug for SessionStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionStore(ttl: {}s)", self.ttl.num_seconds())
    }
}

impl<K, V> SessionStore<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Starts (or restarts) a session for `key`, replacing any previous value.
    pub fn open(&self, key: K, value: V) {
        self.open_at(key, value, Utc::now());
    }

    /// A TTL that runs past the end of representable time keeps the session open indefinitely.
    pub fn open_at(&self, key: K, value: V, now: DateTime<Utc>) {
        trace!("🧵️ Opening session for {key:?}");
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let entry = Entry { value, expires_at };
        self.lock().insert(key, entry);
    }

    /// Returns the live session value for `key`. Expired entries are evicted on the way.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    pub fn get_at(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at >= now => Some(entry.value.clone()),
            Some(_) => {
                trace!("🧵️ Session for {key:?} has expired");
                entries.remove(key);
                None
            },
            None => None,
        }
    }

    /// Ends the session for `key` and returns its value if it was still live.
    pub fn close(&self, key: &K) -> Option<V> {
        let now = Utc::now();
        self.lock().remove(key).filter(|e| e.expires_at >= now).map(|e| e.value)
    }

    /// Drops every expired entry and returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at >= now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The map is never left half-updated, so a poisoned lock is safe to recover.
    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
