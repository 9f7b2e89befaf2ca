use std::{
    collections::{HashMap, HashSet},
    sync::RwLock,
};

/// Read-only access to a remote key-value store holding rollout overrides.
///
/// Implementations must absorb their own failures: an unreachable store, a timeout, or a
/// value of the wrong type is reported as absent (or an empty set). Evaluation then falls back
/// to configuration, which keeps rollouts closed while the store is unavailable.
pub trait ExternalStore {
    /// Scalar value stored under `key`.
    fn get_value(&self, key: &str) -> Option<String>;

    /// Members of the set stored under `key`. Empty when absent.
    fn get_set(&self, key: &str) -> HashSet<String>;
}

/// Store that knows nothing. Used when no store is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

impl ExternalStore for NoopStore {
    fn get_value(&self, _key: &str) -> Option<String> {
        None
    }

    fn get_set(&self, _key: &str) -> HashSet<String> {
        HashSet::new()
    }
}

/// In-process store allowing concurrent readers and writers.
///
/// Useful for hosts that sync rollout overrides from elsewhere, and for tests.
///
/// ```
/// # use rollout::{ExternalStore, MemoryStore};
/// let store = MemoryStore::new();
/// store.set_value("gator.rollout.enabled", "1");
/// store.add_member("gator.rollout.owners", "carlad");
///
/// assert_eq!(store.get_value("gator.rollout.enabled").as_deref(), Some("1"));
/// assert!(store.get_set("gator.rollout.owners").contains("carlad"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
    sets: RwLock<HashMap<String, HashSet<String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set scalar `key` to `value`, returning the previous value.
    pub fn set_value(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let mut values = self.values.write().ok()?;
        values.insert(key.into(), value.into())
    }

    /// Add `member` to the set under `key`. Returns `true` if it was not present.
    pub fn add_member(&self, key: impl Into<String>, member: impl Into<String>) -> bool {
        let Ok(mut sets) = self.sets.write() else {
            return false;
        };
        sets.entry(key.into()).or_default().insert(member.into())
    }

    /// Remove every value and set.
    pub fn clear(&self) {
        if let Ok(mut values) = self.values.write() {
            values.clear();
        }
        if let Ok(mut sets) = self.sets.write() {
            sets.clear();
        }
    }
}

impl ExternalStore for MemoryStore {
    fn get_value(&self, key: &str) -> Option<String> {
        // read() only fails if a writer panicked while holding the lock. Treat that as absent
        // rather than crashing the caller.
        let values = self.values.read().ok()?;
        values.get(key).cloned()
    }

    fn get_set(&self, key: &str) -> HashSet<String> {
        self.sets
            .read()
            .ok()
            .and_then(|sets| sets.get(key).cloned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{ExternalStore, MemoryStore, NoopStore};

    #[test]
    fn noop_store_is_empty() {
        assert_eq!(NoopStore.get_value("gator.rollout.enabled"), None);
        assert!(NoopStore.get_set("gator.rollout.owners").is_empty());
    }

    #[test]
    fn memory_store_values_and_sets() {
        let store = MemoryStore::new();
        assert_eq!(store.set_value("sync.rollout.percent", "10"), None);
        assert_eq!(
            store.set_value("sync.rollout.percent", "20").as_deref(),
            Some("10")
        );
        assert!(store.add_member("sync.rollout.users", "carlad"));
        assert!(!store.add_member("sync.rollout.users", "carlad"));
        assert!(store.add_member("sync.rollout.users", "svenfuchs"));

        assert_eq!(store.get_value("sync.rollout.percent").as_deref(), Some("20"));
        assert_eq!(store.get_set("sync.rollout.users").len(), 2);
        assert!(store.get_set("sync.rollout.owners").is_empty());

        store.clear();
        assert_eq!(store.get_value("sync.rollout.percent"), None);
        assert!(store.get_set("sync.rollout.users").is_empty());
    }

    #[test]
    fn can_write_from_another_thread() {
        let store = Arc::new(MemoryStore::new());

        {
            let store = store.clone();
            let _ = std::thread::spawn(move || {
                store.set_value("gator.rollout.enabled", "1");
            })
            .join();
        }

        assert_eq!(store.get_value("gator.rollout.enabled").as_deref(), Some("1"));
    }
}
