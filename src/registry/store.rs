//! Connection registry implementation
//!
//! Maps each user to its single live conduit. Every operation takes one
//! short lock around the map and never touches conduit I/O while holding it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::conduit::{Conduit, ConduitId, ConduitReceiver};
use super::config::RegistryConfig;
use crate::ids::UserId;

/// Registry of active stream connections, one per user
///
/// Registering a user that already has a conduit replaces it. The replaced
/// conduit loses its registry-held sender, so its session sees the conduit
/// close and shuts itself down.
pub struct ConnectionRegistry {
    conduits: Mutex<HashMap<UserId, Conduit>>,
    next_conduit_id: AtomicU64,
    config: RegistryConfig,
}

impl ConnectionRegistry {
    /// Create a registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            conduits: Mutex::new(HashMap::new()),
            next_conduit_id: AtomicU64::new(1),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Create a conduit for `user_id` and make it the user's current one
    pub fn register(&self, user_id: UserId) -> ConduitReceiver {
        let id = ConduitId(self.next_conduit_id.fetch_add(1, Ordering::Relaxed));
        let (conduit, receiver) = Conduit::channel(
            id,
            user_id,
            self.config.conduit_capacity,
            self.config.delivery_policy,
        );

        let replaced = self.conduits.lock().insert(user_id, conduit);

        match replaced {
            Some(previous) => tracing::info!(
                user_id = %user_id,
                conduit_id = %id,
                replaced_conduit_id = %previous.id(),
                "Conduit registered, replacing existing connection"
            ),
            None => tracing::debug!(
                user_id = %user_id,
                conduit_id = %id,
                "Conduit registered"
            ),
        }

        receiver
    }

    /// Remove whatever conduit is registered for `user_id`
    pub fn unregister(&self, user_id: UserId) -> Option<Conduit> {
        let removed = self.conduits.lock().remove(&user_id);

        if let Some(ref conduit) = removed {
            tracing::debug!(
                user_id = %user_id,
                conduit_id = %conduit.id(),
                "Conduit unregistered"
            );
        }

        removed
    }

    /// Remove the entry for `user_id` only if it is still `conduit_id`
    ///
    /// Returns `false` when the entry is gone or belongs to a newer
    /// registration, which is left untouched.
    pub fn release(&self, user_id: UserId, conduit_id: ConduitId) -> bool {
        let removed = {
            let mut conduits = self.conduits.lock();
            match conduits.get(&user_id) {
                Some(current) if current.id() == conduit_id => conduits.remove(&user_id),
                _ => None,
            }
        };

        if removed.is_some() {
            tracing::debug!(
                user_id = %user_id,
                conduit_id = %conduit_id,
                "Conduit released"
            );
            true
        } else {
            tracing::debug!(
                user_id = %user_id,
                conduit_id = %conduit_id,
                "Conduit already replaced, nothing to release"
            );
            false
        }
    }

    /// Current conduit for `user_id`
    pub fn lookup(&self, user_id: UserId) -> Option<Conduit> {
        self.conduits.lock().get(&user_id).cloned()
    }

    pub fn is_connected(&self, user_id: UserId) -> bool {
        self.conduits.lock().contains_key(&user_id)
    }

    /// Number of registered users
    pub fn len(&self) -> usize {
        self.conduits.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of registered users, sorted
    pub fn connected_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.conduits.lock().keys().copied().collect();
        users.sort_unstable();
        users
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_register_then_lookup() {
        let registry = ConnectionRegistry::new();

        let receiver = registry.register(UserId(1));
        let conduit = registry.lookup(UserId(1)).unwrap();

        assert_eq!(conduit.id(), receiver.id());
        assert_eq!(conduit.user_id(), UserId(1));
        assert!(registry.is_connected(UserId(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister() {
        let registry = ConnectionRegistry::new();
        let _receiver = registry.register(UserId(1));

        assert!(registry.unregister(UserId(1)).is_some());
        assert!(registry.lookup(UserId(1)).is_none());
        assert!(registry.is_empty());

        // Second unregister is a no-op
        assert!(registry.unregister(UserId(1)).is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = ConnectionRegistry::new();

        let first = registry.register(UserId(7));
        let second = registry.register(UserId(7));

        assert_ne!(first.id(), second.id());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(UserId(7)).unwrap().id(), second.id());
    }

    #[tokio::test]
    async fn test_replaced_conduit_closes() {
        let registry = ConnectionRegistry::new();

        let mut first = registry.register(UserId(7));
        let _second = registry.register(UserId(7));

        // Registry dropped the only sender of the first conduit
        assert!(first.recv().await.is_none());
    }

    #[test]
    fn test_release_only_if_owner() {
        let registry = ConnectionRegistry::new();

        let stale = registry.register(UserId(3));
        let current = registry.register(UserId(3));

        assert!(!registry.release(UserId(3), stale.id()));
        assert_eq!(registry.lookup(UserId(3)).unwrap().id(), current.id());

        assert!(registry.release(UserId(3), current.id()));
        assert!(registry.lookup(UserId(3)).is_none());

        assert!(!registry.release(UserId(3), current.id()));
    }

    #[test]
    fn test_concurrent_register_same_user() {
        let registry = Arc::new(ConnectionRegistry::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.register(UserId(42)).id())
            })
            .collect();
        let ids: Vec<ConduitId> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(registry.len(), 1);
        let winner = registry.lookup(UserId(42)).unwrap().id();
        assert!(ids.contains(&winner));
    }

    #[test]
    fn test_concurrent_distinct_users() {
        let registry = Arc::new(ConnectionRegistry::new());

        // Each thread owns a disjoint key range: register all, release the odd
        // ones, unregister every fourth, and check its own view throughout.
        let handles: Vec<_> = (0..8i64)
            .map(|t| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let users: Vec<UserId> = (0..100).map(|i| UserId(t * 1000 + i)).collect();
                    let mut receivers = Vec::new();
                    for &user in &users {
                        let receiver = registry.register(user);
                        assert_eq!(registry.lookup(user).unwrap().id(), receiver.id());
                        receivers.push(receiver);
                    }
                    for (user, receiver) in users.iter().zip(&receivers) {
                        match user.get() % 4 {
                            1 | 3 => assert!(registry.release(*user, receiver.id())),
                            0 => {
                                let removed = registry.unregister(*user).unwrap();
                                assert_eq!(removed.id(), receiver.id());
                                assert!(registry.unregister(*user).is_none());
                            }
                            _ => {}
                        }
                    }
                    for (user, receiver) in users.iter().zip(&receivers) {
                        let found = registry.lookup(*user);
                        if user.get() % 4 != 2 {
                            assert!(found.is_none());
                        } else {
                            let conduit = found.unwrap();
                            assert_eq!(conduit.id(), receiver.id());
                            assert_eq!(conduit.user_id(), *user);
                        }
                    }
                    receivers
                })
            })
            .collect();

        let receivers: Vec<_> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(registry.len(), 8 * 25);
        for receiver in &receivers {
            if receiver.user_id().get() % 4 == 2 {
                assert_eq!(
                    registry.lookup(receiver.user_id()).unwrap().id(),
                    receiver.id()
                );
            }
        }
        assert!(registry.connected_users().iter().all(|u| u.get() % 4 == 2));
    }
}
