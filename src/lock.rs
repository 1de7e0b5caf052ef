//! Keyed async mutual exclusion for booking commits.
//!
//! Each key maps to its own fair mutex, so bookings contending for the same
//! restaurant/sector/start acquire in arrival order while unrelated bookings
//! proceed in parallel. Entries are reference-counted and reclaimed when the
//! last waiter releases.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

struct LockEntry {
    mutex: Arc<Mutex<()>>,
    refs: Arc<AtomicUsize>,
}

#[derive(Default)]
pub struct KeyedMutex {
    entries: DashMap<String, LockEntry>,
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Acquires the lock for `key`, waiting behind earlier acquirers of the
    /// same key. The returned guard releases on drop.
    pub async fn acquire(&self, key: &str) -> KeyedGuard<'_> {
        let (mutex, refs) = {
            let entry = self.entries.entry(key.to_owned()).or_insert_with(|| LockEntry {
                mutex: Arc::new(Mutex::new(())),
                refs: Arc::new(AtomicUsize::new(0)),
            });
            entry.refs.fetch_add(1, Ordering::SeqCst);
            (Arc::clone(&entry.mutex), Arc::clone(&entry.refs))
        };

        let inner = mutex.lock_owned().await;
        trace!(key, "lock acquired");

        KeyedGuard {
            owner: self,
            key: key.to_owned(),
            refs,
            inner: Some(inner),
        }
    }

    /// True when no key currently holds an entry. Test hook for reclamation.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn release(&self, key: &str, refs: &AtomicUsize) {
        if refs.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Re-check under the shard lock: a new waiter may have arrived
            // between the decrement and the removal.
            self.entries
                .remove_if(key, |_, entry| entry.refs.load(Ordering::SeqCst) == 0);
        }
        trace!(key, "lock released");
    }
}

pub struct KeyedGuard<'a> {
    owner: &'a KeyedMutex,
    key: String,
    refs: Arc<AtomicUsize>,
    inner: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex before decrementing so the next waiter sees a
        // consistent entry.
        drop(self.inner.take());
        self.owner.release(&self.key, &self.refs);
    }
}
