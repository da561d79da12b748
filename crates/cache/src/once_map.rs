//! Keyed exactly-once construction
//!
//! [`OnceMap`] maps a key to a value that is built at most once. Every slot is
//! either `Pending` (a construction is in flight) or `Ready`. The first caller
//! for an absent key claims it, runs the constructor outside of any map lock and
//! publishes the outcome to everyone who queued up behind it:
//!
//! ```text
//! absent -> constructing -> present
//! absent -> constructing -> failed -> absent
//! absent -> constructing -> drained -> absent (value handed back as orphan)
//! ```
//!
//! Locking is per DashMap shard and only held for the slot transition, so
//! unrelated keys never wait on each other's constructions.

use crate::stats::CacheStats;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mage_core::Result;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

type Outcome<V> = Option<Result<V>>;

/// How [`OnceMap::try_init`] obtained its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Init<V> {
    /// The value is in the map
    Stored(V),
    /// The value was built, but its slot was drained while it was being
    /// constructed. The map does not own it; the caller must dispose of it.
    Orphaned(V),
}

impl<V> Init<V> {
    pub fn into_inner(self) -> V {
        match self {
            Init::Stored(value) | Init::Orphaned(value) => value,
        }
    }
}

enum Slot<V> {
    Pending {
        flight: u64,
        outcome: watch::Receiver<Outcome<V>>,
    },
    Ready(V),
}

enum Step<V> {
    Wait(watch::Receiver<Outcome<V>>),
    Claimed {
        flight: u64,
        publish: watch::Sender<Outcome<V>>,
    },
}

/// Concurrent map whose values are constructed exactly once per key
pub struct OnceMap<K, V> {
    slots: DashMap<K, Slot<V>>,
    next_flight: AtomicU64,
    stats: CacheStats,
}

impl<K, V> Default for OnceMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> OnceMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            next_flight: AtomicU64::new(0),
            stats: CacheStats::default(),
        }
    }

    /// Return the value for `key`, building it with `init` if absent.
    ///
    /// Concurrent callers for the same key share one call to `init`. If it
    /// fails, each of them receives the same error and the key returns to
    /// absent. If the constructing caller is cancelled, the key returns to
    /// absent and one of the waiters claims it. A value whose slot was
    /// drained mid-construction is returned to the constructing caller only.
    pub async fn get_or_try_init<F, Fut>(&self, key: &K, init: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        self.try_init(key, init).await.map(Init::into_inner)
    }

    /// Like [`OnceMap::get_or_try_init`], but tells the caller whether the
    /// value ended up in the map.
    ///
    /// An [`Init::Orphaned`] value is never published: callers waiting on
    /// the same construction retry and may claim the key themselves.
    pub async fn try_init<F, Fut>(&self, key: &K, init: F) -> Result<Init<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let (flight, publish) = loop {
            if let Some(value) = self.get(key) {
                self.stats.record_hit();
                return Ok(Init::Stored(value));
            }

            let step = match self.slots.entry(key.clone()) {
                Entry::Occupied(entry) => match entry.get() {
                    Slot::Ready(value) => {
                        self.stats.record_hit();
                        return Ok(Init::Stored(value.clone()));
                    }
                    Slot::Pending { outcome, .. } => Step::Wait(outcome.clone()),
                },
                Entry::Vacant(entry) => {
                    let flight = self.next_flight.fetch_add(1, Ordering::Relaxed);
                    let (publish, outcome) = watch::channel(None);
                    entry.insert(Slot::Pending { flight, outcome });
                    Step::Claimed { flight, publish }
                }
            };

            match step {
                Step::Claimed { flight, publish } => break (flight, publish),
                Step::Wait(mut outcome) => {
                    self.stats.record_wait();
                    // An error means the constructor was dropped before it
                    // published; the slot is gone, so try to claim it.
                    if let Ok(published) = outcome.wait_for(Option::is_some).await {
                        if let Some(result) = published.clone() {
                            return result.map(Init::Stored);
                        }
                    }
                }
            }
        };

        self.stats.record_miss();
        let mut guard = FlightGuard {
            slots: &self.slots,
            key,
            flight,
            armed: true,
        };

        let result = init().await;
        guard.armed = false;

        match result {
            Ok(value) => {
                let stored = match self.slots.get_mut(key) {
                    Some(mut slot) if slot.is_flight(flight) => {
                        *slot = Slot::Ready(value.clone());
                        true
                    }
                    _ => false,
                };
                if !stored {
                    self.stats.record_orphan();
                    tracing::debug!(flight, "construction finished after its slot was drained");
                    // Dropping `publish` unblocks the waiters without a value.
                    return Ok(Init::Orphaned(value));
                }
                // Waiters may all have gone away; nothing to deliver then.
                let _ = publish.send(Some(Ok(value.clone())));
                Ok(Init::Stored(value))
            }
            Err(e) => {
                self.stats.record_failure();
                remove_flight(&self.slots, key, flight);
                let _ = publish.send(Some(Err(e.clone())));
                Err(e)
            }
        }
    }

    /// The constructed value for `key`, without waiting on a construction
    pub fn get(&self, key: &K) -> Option<V> {
        self.slots.get(key).and_then(|slot| match &*slot {
            Slot::Ready(value) => Some(value.clone()),
            Slot::Pending { .. } => None,
        })
    }

    /// Whether a constructed value exists for `key`
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Number of constructed values
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every constructed value and return them.
    ///
    /// Slots are removed one key at a time, so a value published while the
    /// drain runs is either returned here or reported as
    /// [`Init::Orphaned`] to its constructor. Constructions in flight are
    /// forgotten and end up orphaned.
    pub fn drain(&self) -> Vec<(K, V)> {
        let keys: Vec<K> = self.slots.iter().map(|slot| slot.key().clone()).collect();
        keys.into_iter()
            .filter_map(|key| self.slots.remove(&key))
            .filter_map(|(key, slot)| match slot {
                Slot::Ready(value) => Some((key, value)),
                Slot::Pending { .. } => None,
            })
            .collect()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl<V> Slot<V> {
    fn is_flight(&self, id: u64) -> bool {
        matches!(self, Slot::Pending { flight, .. } if *flight == id)
    }
}

fn remove_flight<K, V>(slots: &DashMap<K, Slot<V>>, key: &K, flight: u64)
where
    K: Eq + Hash,
{
    slots.remove_if(key, |_, slot| slot.is_flight(flight));
}

/// Clears a pending slot whose constructor never finished
struct FlightGuard<'a, K, V>
where
    K: Eq + Hash,
{
    slots: &'a DashMap<K, Slot<V>>,
    key: &'a K,
    flight: u64,
    armed: bool,
}

impl<K, V> Drop for FlightGuard<'_, K, V>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(flight = self.flight, "abandoned construction, clearing slot");
            remove_flight(self.slots, self.key, self.flight);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mage_core::Error;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_value_is_built_once() {
        let map: OnceMap<String, Arc<String>> = OnceMap::new();
        let calls = AtomicUsize::new(0);
        let key = "mage_system".to_string();

        let first = map
            .get_or_try_init(&key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new("session".to_string()))
            })
            .await
            .unwrap();
        let second = map
            .get_or_try_init(&key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new("other".to_string()))
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(map.stats().snapshot().hits, 1);
        assert_eq!(map.stats().snapshot().misses, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_construction() {
        let map: Arc<OnceMap<u32, Arc<u32>>> = Arc::new(OnceMap::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let map = Arc::clone(&map);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    map.get_or_try_init(&7, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(Arc::new(7))
                    })
                    .await
                })
            })
            .collect();

        let mut values = Vec::new();
        for task in tasks {
            values.push(task.await.unwrap().unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waiters_share_the_failure() {
        let map: Arc<OnceMap<u32, u32>> = Arc::new(OnceMap::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let map = Arc::clone(&map);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    map.get_or_try_init(&1, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err(Error::keyspace_unavailable("unknown_keyspace", "does not exist"))
                    })
                    .await
                })
            })
            .collect();

        for task in tasks {
            let result = task.await.unwrap();
            assert!(matches!(result, Err(Error::KeyspaceUnavailable { .. })));
        }
        // Callers arriving after the failure start a new attempt, so only
        // a lower bound on sharing can be asserted.
        assert!(calls.load(Ordering::SeqCst) < 8);
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let map: OnceMap<u32, u32> = OnceMap::new();

        let failed = map
            .get_or_try_init(&1, || async { Err(Error::connectivity("c", "down")) })
            .await;
        assert!(failed.is_err());
        assert!(!map.contains_key(&1));

        let value = map.get_or_try_init(&1, || async { Ok(5) }).await.unwrap();
        assert_eq!(value, 5);
        assert_eq!(map.stats().snapshot().failures, 1);
    }

    #[tokio::test]
    async fn test_cancelled_construction_leaves_no_slot() {
        let map: Arc<OnceMap<u32, u32>> = Arc::new(OnceMap::new());

        let slow = {
            let map = Arc::clone(&map);
            tokio::spawn(async move {
                map.get_or_try_init(&3, || async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(1)
                })
                .await
            })
        };
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        slow.abort();
        let _ = slow.await;

        let value = tokio::time::timeout(
            Duration::from_secs(5),
            map.get_or_try_init(&3, || async { Ok(2) }),
        )
        .await
        .expect("a cancelled construction must not block later callers")
        .unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drained_construction_is_orphaned() {
        let map: Arc<OnceMap<u32, u32>> = Arc::new(OnceMap::new());

        let builder = {
            let map = Arc::clone(&map);
            tokio::spawn(async move {
                map.try_init(&4, || async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(40)
                })
                .await
            })
        };
        let waiter = {
            let map = Arc::clone(&map);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                map.try_init(&4, || async { Ok(41) }).await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(map.drain().is_empty());

        assert_eq!(builder.await.unwrap().unwrap(), Init::Orphaned(40));
        // the waiter is released without the orphan and claims the key
        assert_eq!(waiter.await.unwrap().unwrap(), Init::Stored(41));
        assert_eq!(map.get(&4), Some(41));
        assert_eq!(map.stats().snapshot().orphans, 1);
    }

    #[tokio::test]
    async fn test_drain_empties_the_map() {
        let map: OnceMap<u32, u32> = OnceMap::new();
        map.get_or_try_init(&1, || async { Ok(10) }).await.unwrap();
        map.get_or_try_init(&2, || async { Ok(20) }).await.unwrap();

        let mut drained = map.drain();
        drained.sort();
        assert_eq!(drained, vec![(1, 10), (2, 20)]);
        assert!(map.is_empty());
        assert!(map.drain().is_empty());
    }
}
