//! Per-key mutual exclusion for serializing hold creation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A registry of per-key async mutexes.
///
/// `acquire` suspends the caller until no other caller holds the key, then
/// returns a guard that releases the key on drop — so release happens on
/// every exit path of the critical section. Waiters are parked and woken
/// by the runtime, never spun. At most one holder per key per process;
/// this is a single-process safeguard, cross-instance correctness rests on
/// the storage layer's conditional updates.
#[derive(Default)]
pub struct KeyedMutex {
    entries: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedMutex {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the mutex for `key`, waiting if another caller holds it.
    pub async fn acquire(&self, key: &str) -> KeyGuard {
        let entry = {
            let mut entries = self.entries.lock().unwrap();
            Arc::clone(entries.entry(key.to_string()).or_default())
        };
        KeyGuard {
            _guard: entry.lock_owned().await,
        }
    }

    /// Returns the number of keys ever acquired through this registry.
    pub fn key_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// Holds a key until dropped.
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
}
