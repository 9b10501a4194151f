//! Release state storage and per-artist locking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::types::ArtistReleaseState;

/// Where release state lives between checks.
///
/// Keys are normalized artist names.
#[async_trait]
pub trait ReleaseStateStore: Send + Sync {
    /// State for `artist_key`, empty if never saved.
    async fn load(&self, artist_key: &str) -> ArtistReleaseState;

    async fn save(&self, artist_key: &str, state: ArtistReleaseState);

    /// Operator reset for one artist.
    async fn reset(&self, artist_key: &str) {
        let mut state = self.load(artist_key).await;
        state.reset();
        self.save(artist_key, state).await;
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryReleaseStore {
    states: RwLock<HashMap<String, ArtistReleaseState>>,
}

impl InMemoryReleaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

#[async_trait]
impl ReleaseStateStore for InMemoryReleaseStore {
    async fn load(&self, artist_key: &str) -> ArtistReleaseState {
        self.states
            .read()
            .await
            .get(artist_key)
            .cloned()
            .unwrap_or_default()
    }

    async fn save(&self, artist_key: &str, state: ArtistReleaseState) {
        self.states
            .write()
            .await
            .insert(artist_key.to_string(), state);
    }
}

/// One async mutex per key, created on first use and dropped once nobody holds
/// or waits for it.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    entries: StdMutex<HashMap<String, LockEntry>>,
}

#[derive(Debug, Default)]
struct LockEntry {
    lock: Arc<Mutex<()>>,
    /// Holders plus waiters.
    users: usize,
}

impl KeyedLocks {
    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> KeyedLockGuard<'_> {
        let lock = {
            let mut entries = self.entries();
            let entry = entries.entry(key.to_string()).or_default();
            entry.users += 1;
            Arc::clone(&entry.lock)
        };
        // Registered before waiting, so a cancelled wait still releases its entry.
        let mut held = KeyedLockGuard {
            locks: self,
            key: key.to_string(),
            guard: None,
        };
        held.guard = Some(lock.lock_owned().await);
        held
    }

    /// Number of keys currently locked or waited on.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, LockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive access to one key of a [`KeyedLocks`].
#[derive(Debug)]
pub struct KeyedLockGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut entries = self.locks.entries();
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.users = entry.users.saturating_sub(1);
            if entry.users == 0 {
                entries.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceId;
    use std::time::Duration;

    #[tokio::test]
    async fn test_in_memory_round_trip_and_reset() {
        let store = InMemoryReleaseStore::new();
        assert!(store.load("echo").await.known.is_empty());

        let mut state = ArtistReleaseState::default();
        state.record_known("Sunrise", SourceId::Mirlo);
        store.save("echo", state).await;
        assert_eq!(store.load("echo").await.known.len(), 1);
        assert_eq!(store.len().await, 1);

        store.reset("echo").await;
        assert!(store.load("echo").await.known.is_empty());
    }

    #[tokio::test]
    async fn test_keyed_locks_serialize_same_key() {
        let locks = Arc::new(KeyedLocks::default());
        let guard = locks.lock("echo").await;

        let other_key = tokio::time::timeout(Duration::from_millis(50), locks.lock("other")).await;
        assert!(other_key.is_ok());

        let same_key = tokio::time::timeout(Duration::from_millis(50), locks.lock("echo")).await;
        assert!(same_key.is_err());

        drop(guard);
        let same_key = tokio::time::timeout(Duration::from_millis(50), locks.lock("echo")).await;
        assert!(same_key.is_ok());
    }

    #[tokio::test]
    async fn test_keyed_locks_forget_released_keys() {
        let locks = KeyedLocks::default();
        for i in 0..1000 {
            let _guard = locks.lock(&format!("artist-{}", i)).await;
        }
        assert!(locks.is_empty());

        let held = locks.lock("echo").await;
        assert_eq!(locks.len(), 1);
        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_keyed_locks_cancelled_waiter_releases_entry() {
        let locks = KeyedLocks::default();
        let held = locks.lock("echo").await;

        let waiter = tokio::time::timeout(Duration::from_millis(20), locks.lock("echo")).await;
        assert!(waiter.is_err());
        assert_eq!(locks.len(), 1);

        drop(held);
        assert!(locks.is_empty());
    }
}
