use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

/// Per-key locks, created lazily and reclaimed once nothing references
/// them (spec.md §9, Design Note "Single-flight per key": "a 'map of
/// locks' with weak values ... satisfies the contract"). Concurrent
/// `process` calls for the same key share one lock; calls for different
/// keys never block each other.
pub struct SingleFlight<K> {
    locks: Mutex<HashMap<K, Weak<AsyncMutex<()>>>>,
}

impl<K> Default for SingleFlight<K>
where
    K: std::hash::Hash + Eq + Clone,
{
    fn default() -> Self {
        Self { locks: Mutex::new(HashMap::new()) }
    }
}

impl<K> SingleFlight<K>
where
    K: std::hash::Hash + Eq + Clone,
{
    /// Returns the lock for `key`, creating it if this is the first live
    /// reference. The caller is expected to `.lock().await` the result
    /// and hold the guard for the duration of its `process` call.
    pub fn lock_for(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        if let Some(existing) = locks.get(key).and_then(Weak::upgrade) {
            return existing;
        }
        let fresh = Arc::new(AsyncMutex::new(()));
        locks.insert(key.clone(), Arc::downgrade(&fresh));
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_serializes_concurrent_callers() {
        let flight: Arc<SingleFlight<&'static str>> = Arc::new(SingleFlight::default());
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..5 {
            let flight = Arc::clone(&flight);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let lock = flight.lock_for(&"k");
                let _guard = lock.lock().await;
                order.lock().push(i);
                tokio::time::sleep(Duration::from_millis(1)).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(order.lock().len(), 5);
    }

    #[test]
    fn unreferenced_lock_is_reclaimed() {
        let flight: SingleFlight<&'static str> = SingleFlight::default();
        {
            let _lock = flight.lock_for(&"k");
        }
        // The only strong reference was dropped; a fresh lookup creates
        // a brand-new lock rather than upgrading a dead `Weak`.
        let fresh = flight.lock_for(&"k");
        assert_eq!(Arc::strong_count(&fresh), 1);
    }
}
