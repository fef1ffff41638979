use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Per-key single-flight registry (§4.3 "per-shard single-flight", §9
/// "promise-based single-flight → per-shard future registry"), generalized
/// from the teacher's per-term `LazyIndexReader` cache to an arbitrary key.
///
/// The first caller for a key becomes the `Leader` and is responsible for
/// doing the load and calling `finish`; every other concurrent caller gets a
/// `Follower` handle to await.
pub struct InflightRegistry<K> {
    pending: Mutex<HashMap<K, Arc<Notify>>>,
}

pub enum Slot {
    Leader,
    Follower(Arc<Notify>),
}

impl<K: Eq + Hash + Clone> InflightRegistry<K> {
    pub fn new() -> Self {
        InflightRegistry { pending: Mutex::new(HashMap::new()) }
    }

    pub fn acquire(&self, key: K) -> Slot {
        let mut pending = self.pending.lock();
        if let Some(notify) = pending.get(&key) {
            Slot::Follower(notify.clone())
        } else {
            pending.insert(key, Arc::new(Notify::new()));
            Slot::Leader
        }
    }

    /// Called by the leader once the load has completed (successfully or
    /// not) and the result has been placed wherever followers expect to find
    /// it. Wakes every follower waiting on this key.
    pub fn finish(&self, key: &K) {
        let mut pending = self.pending.lock();
        if let Some(notify) = pending.remove(key) {
            notify.notify_waiters();
        }
    }
}

impl<K: Eq + Hash + Clone> Default for InflightRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_caller_follows_first() {
        let registry: InflightRegistry<u32> = InflightRegistry::new();
        let first = registry.acquire(1);
        assert!(matches!(first, Slot::Leader));
        let second = registry.acquire(1);
        let notify = match second {
            Slot::Follower(n) => n,
            Slot::Leader => panic!("expected follower"),
        };

        let waited = tokio::spawn(async move {
            notify.notified().await;
        });
        registry.finish(&1);
        waited.await.unwrap();

        // Key is now free; a new caller becomes leader again.
        assert!(matches!(registry.acquire(1), Slot::Leader));
    }
}
