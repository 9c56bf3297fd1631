//! Per-user runtime state: the last sent onboarding message and the lock
//! that serializes work for one user.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::model::OnboardingMessage;

/// Default number of users whose last message is remembered.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

struct CacheInner {
    messages: HashMap<String, OnboardingMessage>,
    /// Least recently sent first.
    order: VecDeque<String>,
}

/// Bounded map of user → last sent onboarding message.
///
/// When full, the user whose message was sent longest ago is evicted; their
/// next interaction starts again from the template (completion flags live in
/// the store, so no progress is lost, only the ability to edit the old
/// message in place).
pub struct MessageCache {
    inner: RwLock<CacheInner>,
    capacity: usize,
}

impl MessageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                messages: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The saved message for a user, if any.
    pub async fn get(&self, user: &str) -> Option<OnboardingMessage> {
        self.inner.read().await.messages.get(user).cloned()
    }

    /// Replace the saved message for a user wholesale.
    pub async fn insert(&self, user: &str, message: OnboardingMessage) {
        let mut inner = self.inner.write().await;

        if inner.messages.insert(user.to_string(), message).is_some() {
            inner.order.retain(|u| u != user);
        }
        inner.order.push_back(user.to_string());

        while inner.order.len() > self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.messages.remove(&evicted);
                tracing::debug!(user = %evicted, "Evicted saved onboarding message");
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MessageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

/// One async mutex per user key.
///
/// Work for the same user runs one at a time; different users never wait on
/// each other. Idle entries are pruned on acquisition.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user`'s state.
    pub async fn acquire(&self, user: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Only the map holds an idle entry.
            locks.retain(|key, lock| key == user || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(user.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of users with a live lock entry.
    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn message(channel: &str) -> OnboardingMessage {
        OnboardingMessage {
            channel: Some(channel.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insert_replaces_wholesale() {
        let cache = MessageCache::new(4);
        cache.insert("U1", message("D1")).await;
        cache
            .insert(
                "U1",
                OnboardingMessage {
                    ts: Some("1.0".into()),
                    ..Default::default()
                },
            )
            .await;

        let saved = cache.get("U1").await.unwrap();
        assert!(saved.channel.is_none());
        assert_eq!(saved.ts.as_deref(), Some("1.0"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn evicts_least_recently_sent() {
        let cache = MessageCache::new(2);
        cache.insert("U1", message("D1")).await;
        cache.insert("U2", message("D2")).await;
        // Re-sending to U1 makes U2 the oldest.
        cache.insert("U1", message("D1")).await;
        cache.insert("U3", message("D3")).await;

        assert!(cache.get("U1").await.is_some());
        assert!(cache.get("U2").await.is_none());
        assert!(cache.get("U3").await.is_some());
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let cache = MessageCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert("U1", message("D1")).await;
        assert!(!cache.is_empty().await);
    }

    #[tokio::test]
    async fn same_user_is_serialized() {
        let locks = Arc::new(UserLocks::new());
        let guard = locks.acquire("U1").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("U1").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("second acquire should proceed once the first guard drops")
            .unwrap();
    }

    #[tokio::test]
    async fn different_users_do_not_block() {
        let locks = UserLocks::new();
        let _u1 = locks.acquire("U1").await;
        tokio::time::timeout(Duration::from_secs(1), locks.acquire("U2"))
            .await
            .expect("other users must not wait");
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = UserLocks::new();
        drop(locks.acquire("U1").await);
        drop(locks.acquire("U2").await);
        drop(locks.acquire("U3").await);
        assert_eq!(locks.tracked().await, 1);
    }
}
