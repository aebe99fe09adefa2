//! Module-Graph Resolver (§4.5).
//!
//! Computes, from the set of header modules an action's pre-scan found used,
//! the minimal "top-level" set whose transitive closures cover every used
//! module — via callouts to a demand-driven evaluator that may report values
//! as not-yet-available rather than blocking.

use crate::artifact::Artifact;
use crate::collab::{EvaluatorHandle, EvaluatorValues};
use std::collections::{BTreeMap, BTreeSet};

/// The value published by a module-producing action: its own discovered
/// module closure, persisted from when *it* was compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleActionValue {
    pub module: Artifact,
    pub discovered_modules: BTreeSet<Artifact>,
}

/// Outcome of a module-resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleResolution {
    Ready { top_level_modules: BTreeSet<Artifact>, discovered_modules: BTreeSet<Artifact> },
    /// No partial state is memoized on suspend: the whole computation restarts
    /// from `used_modules` once the evaluator reports these keys available.
    Suspend { missing: Vec<String> },
}

/// Resolves `used_modules` against the evaluator, keying each module via
/// `key_of` (the module-producing action's lookup key, opaque to this crate).
pub fn resolve_modules(
    used_modules: &BTreeSet<Artifact>,
    evaluator: &dyn EvaluatorHandle<ModuleActionValue>,
    key_of: impl Fn(&Artifact) -> String,
) -> ModuleResolution {
    if used_modules.is_empty() {
        return ModuleResolution::Ready { top_level_modules: BTreeSet::new(), discovered_modules: BTreeSet::new() };
    }

    let mut key_to_module = BTreeMap::new();
    let mut keys = Vec::with_capacity(used_modules.len());
    for m in used_modules {
        let k = key_of(m);
        key_to_module.insert(k.clone(), m.clone());
        keys.push(k);
    }

    let values: EvaluatorValues<ModuleActionValue> = evaluator.get_values(&keys);
    if !values.all_present() {
        return ModuleResolution::Suspend { missing: values.missing };
    }

    let mut transitive: BTreeMap<Artifact, BTreeSet<Artifact>> = BTreeMap::new();
    for (key, value) in &values.found {
        if let Some(module) = key_to_module.get(key) {
            transitive.insert(module.clone(), value.discovered_modules.clone());
        }
    }

    // top_level_modules: used_modules minus anything covered by another used
    // module's transitive closure.
    let mut top_level: BTreeSet<Artifact> = used_modules.clone();
    for (m, covers) in &transitive {
        for other in covers {
            if other != m {
                top_level.remove(other);
            }
        }
    }

    let mut discovered = top_level.clone();
    for m in &top_level {
        if let Some(covers) = transitive.get(m) {
            discovered.extend(covers.iter().cloned());
        }
    }

    ModuleResolution::Ready { top_level_modules: top_level, discovered_modules: discovered }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ActionLookupKey;

    fn module(name: &str) -> Artifact {
        Artifact::derived(
            format!("{name}.pcm"),
            crate::path::PathFragment::new("out"),
            ActionLookupKey(format!("//pkg:{name}")),
        )
    }

    struct FakeEvaluator {
        values: BTreeMap<String, ModuleActionValue>,
        missing: Vec<String>,
    }

    impl EvaluatorHandle<ModuleActionValue> for FakeEvaluator {
        fn get_values(&self, keys: &[String]) -> EvaluatorValues<ModuleActionValue> {
            let mut found = BTreeMap::new();
            let mut missing = Vec::new();
            for k in keys {
                if self.missing.contains(k) {
                    missing.push(k.clone());
                } else if let Some(v) = self.values.get(k) {
                    found.insert(k.clone(), v.clone());
                }
            }
            EvaluatorValues { found, missing }
        }
    }

    #[test]
    fn suspends_when_a_module_value_is_missing() {
        let m = module("m");
        let used = [m.clone()].into_iter().collect();
        let evaluator = FakeEvaluator { values: BTreeMap::new(), missing: vec!["//pkg:m".into()] };
        let result = resolve_modules(&used, &evaluator, |a| {
            a.owner().map(|o| o.0.clone()).unwrap_or_default()
        });
        assert_eq!(result, ModuleResolution::Suspend { missing: vec!["//pkg:m".into()] });
    }

    #[test]
    fn module_pruning_flow_s4() {
        // m depends on n transitively.
        let m = module("m");
        let n = module("n");
        let used: BTreeSet<Artifact> = [m.clone()].into_iter().collect();
        let mut values = BTreeMap::new();
        values.insert(
            "//pkg:m".to_string(),
            ModuleActionValue { module: m.clone(), discovered_modules: [n.clone()].into_iter().collect() },
        );
        let evaluator = FakeEvaluator { values, missing: vec![] };
        let result = resolve_modules(&used, &evaluator, |a| a.owner().map(|o| o.0.clone()).unwrap_or_default());
        match result {
            ModuleResolution::Ready { top_level_modules, discovered_modules } => {
                assert_eq!(top_level_modules, [m.clone()].into_iter().collect());
                assert_eq!(discovered_modules, [m, n].into_iter().collect());
            }
            ModuleResolution::Suspend { .. } => panic!("expected Ready"),
        }
    }

    #[test]
    fn module_covered_by_another_used_module_is_not_top_level() {
        let m = module("m");
        let n = module("n");
        let used: BTreeSet<Artifact> = [m.clone(), n.clone()].into_iter().collect();
        let mut values = BTreeMap::new();
        values.insert(
            "//pkg:m".to_string(),
            ModuleActionValue { module: m.clone(), discovered_modules: [n.clone()].into_iter().collect() },
        );
        values.insert(
            "//pkg:n".to_string(),
            ModuleActionValue { module: n.clone(), discovered_modules: BTreeSet::new() },
        );
        let evaluator = FakeEvaluator { values, missing: vec![] };
        let result = resolve_modules(&used, &evaluator, |a| a.owner().map(|o| o.0.clone()).unwrap_or_default());
        match result {
            ModuleResolution::Ready { top_level_modules, discovered_modules } => {
                assert_eq!(top_level_modules, [m.clone()].into_iter().collect());
                assert_eq!(discovered_modules, [m, n].into_iter().collect());
            }
            ModuleResolution::Suspend { .. } => panic!("expected Ready"),
        }
    }
}
