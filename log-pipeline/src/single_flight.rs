//! Per-key mutual exclusion.
//!
//! At most one holder per key at a time; distinct keys never wait on each
//! other. A key's slot is dropped when its last holder or waiter leaves,
//! including waiters whose future is cancelled.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

struct Slot {
    lock: Arc<AsyncMutex<()>>,
    /// Holder plus waiters registered on this key.
    leases: usize,
}

/// Serializes async work per key.
pub struct SingleFlight<K> {
    slots: Mutex<HashMap<K, Slot>>,
}

impl<K> Default for SingleFlight<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> std::fmt::Debug for SingleFlight<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("active_keys", &self.active_keys())
            .finish()
    }
}

impl<K> SingleFlight<K> {
    /// Number of keys with a holder or waiter.
    pub fn active_keys(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<K: Eq + Hash + Clone> SingleFlight<K> {
    /// Waits until this caller is the only holder of `key`.
    pub async fn acquire(&self, key: K) -> FlightGuard<'_, K> {
        let lock = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = slots.entry(key.clone()).or_insert_with(|| Slot {
                lock: Arc::new(AsyncMutex::new(())),
                leases: 0,
            });
            slot.leases += 1;
            Arc::clone(&slot.lock)
        };
        // Registered before waiting so a cancelled wait still releases the slot.
        let lease = Lease { flight: self, key };
        let permit = lock.lock_owned().await;
        FlightGuard {
            _permit: permit,
            _lease: lease,
        }
    }
}

struct Lease<'a, K: Eq + Hash> {
    flight: &'a SingleFlight<K>,
    key: K,
}

impl<K: Eq + Hash> Drop for Lease<'_, K> {
    fn drop(&mut self) {
        let mut slots = self
            .flight
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.leases -= 1;
            if slot.leases == 0 {
                slots.remove(&self.key);
            }
        }
    }
}

/// Exclusive hold on a key; released on drop.
pub struct FlightGuard<'a, K: Eq + Hash> {
    // Field order matters: the permit is released before the lease.
    _permit: OwnedMutexGuard<()>,
    _lease: Lease<'a, K>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_serialized() {
        let flight = Arc::new(SingleFlight::<String>::default());
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let (flight, inside, peak) = (flight.clone(), inside.clone(), peak.clone());
            tasks.push(tokio::spawn(async move {
                let _g = flight.acquire("k".to_string()).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(flight.active_keys(), 0);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block() {
        let flight = SingleFlight::<&'static str>::default();
        let _a = flight.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), flight.acquire("b")).await;
        assert!(b.is_ok());
        assert_eq!(flight.active_keys(), 2);
    }

    #[tokio::test]
    async fn cancelled_waiter_releases_slot() {
        let flight = Arc::new(SingleFlight::<u32>::default());
        let held = flight.acquire(1).await;

        let waiter = {
            let flight = flight.clone();
            tokio::spawn(async move {
                let _g = flight.acquire(1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        waiter.abort();
        let _ = waiter.await;

        drop(held);
        assert_eq!(flight.active_keys(), 0);
    }
}
