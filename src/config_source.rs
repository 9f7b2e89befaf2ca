use std::collections::{BTreeMap, HashMap};

/// Read-only access to flat, string-keyed configuration.
///
/// Keys are case-sensitive. Implementations must not fail: a value that cannot be read is
/// reported as absent.
///
/// Implemented for [`Env`], string maps, and closures:
/// ```
/// # use rollout::ConfigSource;
/// let source = |key: &str| (key == "ENV").then(|| "production".to_owned());
/// assert_eq!(source.get("ENV").as_deref(), Some("production"));
/// assert_eq!(source.get("ROLLOUT"), None);
/// ```
pub trait ConfigSource {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;
}

/// Process environment.
///
/// Variables that are not valid unicode are treated as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Env;

impl ConfigSource for Env {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

impl<T: Fn(&str) -> Option<String>> ConfigSource for T {
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}
