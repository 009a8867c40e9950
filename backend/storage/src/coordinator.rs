//! Per-target write serialization.
//!
//! One async mutex per storage key, created on first use and kept for the
//! life of the process. Entries are never evicted: removing one could race
//! with a writer that still holds it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chanlogs_core::StorageKey;
use tokio::sync::{Mutex, RwLock};
use tracing::trace;

#[derive(Debug, Default)]
pub struct WriteCoordinator {
    locks: RwLock<HashMap<StorageKey, Arc<Mutex<()>>>>,
}

impl WriteCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create the lock for `key`. Creation happens under the write
    /// lock, so concurrent first users of a key agree on one mutex.
    async fn lock_for(&self, key: &StorageKey) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(key) {
            return Arc::clone(lock);
        }
        let mut locks = self.locks.write().await;
        let lock = locks.entry(key.clone()).or_insert_with(|| {
            trace!(key = %key, "Creating write lock");
            Arc::new(Mutex::new(()))
        });
        Arc::clone(lock)
    }

    /// Run `action` while holding the lock for `key`.
    ///
    /// The guard is dropped on every exit path: normal return, an error
    /// carried in the output, a panic inside `action`, or cancellation of
    /// the returned future.
    pub async fn with_lock<F, Fut, T>(&self, key: &StorageKey, action: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lock = self.lock_for(key).await;
        let _guard = lock.lock().await;
        action().await
    }

    /// Number of keys that have ever been locked.
    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chanlogs_core::{
        CanonicalEvent, EventType, MemoryToggleStore, ResolverPolicy, TargetResolver,
    };
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn key(target: &str) -> StorageKey {
        let toggles = Arc::new(MemoryToggleStore::new());
        let resolver = TargetResolver::new(ResolverPolicy::default(), toggles);
        let event =
            CanonicalEvent::builder(target, EventType::Privmsg, Utc::now().fixed_offset()).build();
        resolver.storage_key(&event)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_is_mutually_exclusive() {
        let coordinator = Arc::new(WriteCoordinator::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..64 {
            let coordinator = Arc::clone(&coordinator);
            let inside = Arc::clone(&inside);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                coordinator
                    .with_lock(&key("#rust"), || async {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_distinct_keys_do_not_block() {
        let coordinator = Arc::new(WriteCoordinator::new());
        let (held_tx, held_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let holder = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator
                    .with_lock(&key("#a"), || async move {
                        let _ = held_tx.send(());
                        let _ = release_rx.await;
                    })
                    .await;
            })
        };
        held_rx.await.unwrap();

        // #a is held indefinitely; #b must still be acquirable.
        let other = tokio::time::timeout(
            Duration::from_secs(2),
            coordinator.with_lock(&key("#b"), || async { "written" }),
        )
        .await;
        assert_eq!(other.unwrap(), "written");

        // #a itself stays blocked while held.
        let same = tokio::time::timeout(
            Duration::from_millis(100),
            coordinator.with_lock(&key("#a"), || async {}),
        )
        .await;
        assert!(same.is_err());

        release_tx.send(()).unwrap();
        holder.await.unwrap();
        assert_eq!(coordinator.len().await, 2);
    }

    #[tokio::test]
    async fn test_lock_released_after_panic() {
        let coordinator = Arc::new(WriteCoordinator::new());
        let c = Arc::clone(&coordinator);
        let result = tokio::spawn(async move {
            c.with_lock(&key("#rust"), || async { panic!("writer blew up") }).await
        })
        .await;
        assert!(result.is_err());

        let reacquired = tokio::time::timeout(
            Duration::from_secs(1),
            coordinator.with_lock(&key("#rust"), || async { true }),
        )
        .await;
        assert!(reacquired.unwrap());
    }

    #[tokio::test]
    async fn test_lock_released_after_error() {
        let coordinator = WriteCoordinator::new();
        let failed: Result<(), &str> =
            coordinator.with_lock(&key("#rust"), || async { Err("disk full") }).await;
        assert!(failed.is_err());
        let ok: Result<(), &str> = coordinator.with_lock(&key("#rust"), || async { Ok(()) }).await;
        assert!(ok.is_ok());
    }
}
