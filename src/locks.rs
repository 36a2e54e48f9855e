//! One async mutex per entity id, acquired with a bounded wait.

use crate::models::{TournamentError, TournamentResult};
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Held while mutating one entity; dropping it releases the lock.
pub type EntityGuard = OwnedMutexGuard<()>;

pub struct EntityLocks<K> {
    name: &'static str,
    timeout: Duration,
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K: Copy + Eq + Hash + Display> EntityLocks<K> {
    pub fn new(name: &'static str, timeout: Duration) -> Self {
        Self {
            name,
            timeout,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `id`, at most the configured timeout.
    pub async fn acquire(&self, id: K) -> TournamentResult<EntityGuard> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Only the map holds an idle lock; nobody can be waiting on it.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks.entry(id).or_default().clone()
        };
        tokio::time::timeout(self.timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                log::warn!("Timed out after {:?} waiting for {} {}", self.timeout, self.name, id);
                TournamentError::LockTimeout(format!("{} {}", self.name, id))
            })
    }

    /// Number of ids with a live lock.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
