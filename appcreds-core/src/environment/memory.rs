//! In-memory environment implementation.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::Environment;

/// In-memory environment for testing and embedding.
///
/// Behaves like the process environment but is private to the value, so
/// tests can run in parallel without racing on real variables.
pub struct MemoryEnvironment {
    vars: RwLock<BTreeMap<String, String>>,
}

impl MemoryEnvironment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self {
            vars: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create an environment with initial variables.
    pub fn with_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: RwLock::new(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.vars.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.read().is_empty()
    }
}

impl Default for MemoryEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEnvironment")
            .field("vars_count", &self.len())
            .finish()
    }
}

impl Environment for MemoryEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.vars.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.vars.write().remove(key);
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.vars
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_environment_set_get() {
        let env = MemoryEnvironment::new();
        env.set("MTCA::DEFAULT::USERNAME", "alice");

        assert_eq!(env.get("MTCA::DEFAULT::USERNAME").as_deref(), Some("alice"));
        assert!(env.get("MTCA::DEFAULT::PASSWORD").is_none());
    }

    #[test]
    fn test_memory_environment_remove() {
        let env = MemoryEnvironment::with_vars([("A", "1"), ("B", "2")]);
        env.remove("A");
        env.remove("NEVER_SET");

        assert_eq!(env.len(), 1);
        assert_eq!(env.vars(), vec![("B".to_string(), "2".to_string())]);
    }
}
