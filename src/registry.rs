//! Concurrent registry of named value sources.

use log::{debug, trace};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{PublishError, Result};
use crate::source::ValueSource;

/// A thread-safe mapping from metric name to value source
///
/// The registry holds shared references; the registering caller keeps its
/// own handle and mutates the variable live. Registration is safe to call
/// concurrently with an in-progress publish tick.
pub struct VarRegistry {
    vars: RwLock<HashMap<String, Arc<dyn ValueSource>>>,
}

impl VarRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            vars: RwLock::new(HashMap::new()),
        }
    }

    /// Register a value source under a name
    ///
    /// A duplicate name replaces the previous source.
    pub fn register(&self, name: impl Into<String>, source: Arc<dyn ValueSource>) -> Result<()> {
        let name = name.into();

        let mut vars = self
            .vars
            .write()
            .map_err(|_| PublishError::Registry("Lock poisoned".to_string()))?;

        if vars.insert(name.clone(), source).is_some() {
            debug!("Replaced existing variable '{}'", name);
        } else {
            trace!("Registered variable '{}'", name);
        }

        Ok(())
    }

    /// Take a point-in-time snapshot of the registered variables
    ///
    /// The lock is released before this returns, so rendering and writing
    /// never block a concurrent `register`. Order is unspecified.
    pub fn snapshot(&self) -> Result<Vec<(String, Arc<dyn ValueSource>)>> {
        let vars = self
            .vars
            .read()
            .map_err(|_| PublishError::Registry("Lock poisoned".to_string()))?;

        Ok(vars
            .iter()
            .map(|(name, source)| (name.clone(), Arc::clone(source)))
            .collect())
    }

    /// Number of registered variables
    pub fn len(&self) -> usize {
        self.vars.read().map(|vars| vars.len()).unwrap_or(0)
    }

    /// Check whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the current variables as a JSON object
    ///
    /// Values that parse as numbers become JSON numbers; anything else is
    /// kept as a string. Rendering happens outside the lock.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let snapshot = self.snapshot()?;

        let mut map = serde_json::Map::with_capacity(snapshot.len());
        for (name, source) in snapshot {
            let rendered = source.render();
            let value = match rendered.parse::<f64>() {
                Ok(n) => serde_json::Number::from_f64(n)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::String(rendered)),
                Err(_) => serde_json::Value::String(rendered),
            };
            map.insert(name, value);
        }

        Ok(serde_json::Value::Object(map))
    }
}

impl Default for VarRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::IntVar;

    #[test]
    fn test_duplicate_name_replaces() {
        let registry = VarRegistry::new();

        let first = Arc::new(IntVar::new());
        first.set(1);
        let second = Arc::new(IntVar::new());
        second.set(2);

        registry.register("dup", first).unwrap();
        registry.register("dup", second).unwrap();

        let snapshot = registry.snapshot().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, "dup");
        assert_eq!(snapshot[0].1.render(), "2");
    }

    #[test]
    fn test_snapshot_is_point_in_time() {
        let registry = VarRegistry::new();
        registry.register("a", Arc::new(IntVar::new())).unwrap();

        let snapshot = registry.snapshot().unwrap();
        registry.register("b", Arc::new(IntVar::new())).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_to_json_renders_numbers() {
        let registry = VarRegistry::new();
        let i = Arc::new(IntVar::new());
        i.set(34);
        registry.register("test.foo.i", i).unwrap();

        let json = registry.to_json().unwrap();
        assert_eq!(json["test.foo.i"], serde_json::json!(34.0));
    }
}
