//! Coalescing of concurrent identical reads.
//!
//! The first caller for a key drives the underlying request; callers arriving
//! while it runs subscribe to its outcome instead of issuing their own. The
//! entry is removed as soon as the leader finishes, so nothing is cached.

use anyhow::anyhow;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

use crate::metrics::inc_inflight_joined;

/// Outcome shared by every waiter on a key.
pub type Shared<V> = Result<V, Arc<anyhow::Error>>;

pub struct Inflight<K, V> {
    pending: Mutex<HashMap<K, broadcast::Sender<Shared<V>>>>,
}

impl<K, V> Default for Inflight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Inflight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Number of keys with a request currently running.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    /// Run `fut` for `key`, or wait for the identical request already running.
    /// `fut` is dropped unpolled when joining.
    pub async fn run<F>(&self, key: K, fut: F) -> Shared<V>
    where
        F: Future<Output = anyhow::Result<V>>,
    {
        let joined = {
            let mut pending = self.lock();
            match pending.get(&key) {
                Some(tx) => Some(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    pending.insert(key.clone(), tx);
                    None
                }
            }
        };

        if let Some(mut rx) = joined {
            inc_inflight_joined();
            return match rx.recv().await {
                Ok(result) => result,
                Err(e) => Err(Arc::new(anyhow!("in-flight request abandoned: {e}"))),
            };
        }

        let mut leader = Leader {
            owner: self,
            key: Some(key),
        };
        let result = fut.await.map_err(Arc::new);
        if let Some(tx) = leader.finish() {
            // No subscribers is fine.
            let _ = tx.send(result.clone());
        }
        result
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, broadcast::Sender<Shared<V>>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Removes the entry even if the leading future is dropped mid-flight, which
// closes the channel and releases the waiters with an error.
struct Leader<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    owner: &'a Inflight<K, V>,
    key: Option<K>,
}

impl<K, V> Leader<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn finish(&mut self) -> Option<broadcast::Sender<Shared<V>>> {
        let key = self.key.take()?;
        self.owner.lock().remove(&key)
    }
}

impl<K, V> Drop for Leader<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        self.finish();
    }
}
