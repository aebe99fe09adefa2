//! A minimal in-process demand-driven evaluator handle.
//!
//! The real evaluator runtime is an external collaborator (§1, §6); this is
//! a reference implementation for tests and standalone use, modeled after
//! this workspace's parallel-compilation pool (`rayon::ThreadPoolBuilder` +
//! `into_par_iter` in `compile/project.rs`) for concurrent lookups, with a
//! published-value registry standing in for the evaluator's memoization
//! graph.

use crate::collab::{EvaluatorHandle, EvaluatorValues};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Looks up values by key against a registry populated by `publish`.
///
/// Keys not yet published are reported missing rather than panicking or
/// blocking, the same cooperative-suspend contract the core expects from a
/// real evaluator (§5 suspension points).
pub struct InProcessEvaluator<V> {
    published: RwLock<BTreeMap<String, V>>,
}

impl<V> Default for InProcessEvaluator<V> {
    fn default() -> Self {
        Self { published: RwLock::new(BTreeMap::new()) }
    }
}

impl<V: Clone + Send + Sync> InProcessEvaluator<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a value for `key`, simulating the generating action's
    /// result becoming available (§5 ordering guarantee).
    pub fn publish(&self, key: impl Into<String>, value: V) {
        self.published.write().expect("evaluator registry lock poisoned").insert(key.into(), value);
    }
}

impl<V: Clone + Send + Sync> EvaluatorHandle<V> for InProcessEvaluator<V> {
    fn get_values(&self, keys: &[String]) -> EvaluatorValues<V> {
        let registry = self.published.read().expect("evaluator registry lock poisoned");
        let (found, missing): (Vec<_>, Vec<_>) =
            keys.par_iter().map(|k| (k.clone(), registry.get(k).cloned())).collect::<Vec<_>>().into_iter().fold(
                (Vec::new(), Vec::new()),
                |(mut found, mut missing), (k, v)| {
                    match v {
                        Some(value) => found.push((k, value)),
                        None => missing.push(k),
                    }
                    (found, missing)
                },
            );
        EvaluatorValues { found: found.into_iter().collect(), missing }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_until_published() {
        let evaluator: InProcessEvaluator<u32> = InProcessEvaluator::new();
        let result = evaluator.get_values(&["a".to_string()]);
        assert!(!result.all_present());

        evaluator.publish("a", 7);
        let result = evaluator.get_values(&["a".to_string()]);
        assert!(result.all_present());
        assert_eq!(result.found.get("a"), Some(&7));
    }
}
