//! Header-Discovery Engine (§4.2).
//!
//! Resolves the raw paths surfaced by `.d`/`/showIncludes` parsing against
//! the universe of artifacts a compile action is allowed to know about,
//! dropping anything under a built-in system-include prefix and flagging
//! anything that cannot be resolved to a known artifact when validation is
//! enabled.

use crate::artifact::Artifact;
use crate::error::{ActionError, Owner, Result};
use crate::path::PathFragment;
use std::collections::BTreeMap;
use std::path::Path;

/// The universe of artifacts a single discovery pass may resolve dependency
/// paths against: direct exec-path lookups plus tree artifacts, any path
/// beneath which satisfies inclusion.
pub struct HeaderDiscoveryEngine {
    known: BTreeMap<PathFragment, Artifact>,
    tree_artifacts: Vec<Artifact>,
    built_in_system_prefixes: Vec<PathFragment>,
}

impl HeaderDiscoveryEngine {
    pub fn new(
        known_artifacts: impl IntoIterator<Item = Artifact>,
        built_in_system_prefixes: Vec<PathFragment>,
    ) -> Self {
        let mut known = BTreeMap::new();
        let mut tree_artifacts = Vec::new();
        for artifact in known_artifacts {
            if artifact.is_tree() {
                tree_artifacts.push(artifact);
            } else {
                known.insert(artifact.exec_path().clone(), artifact);
            }
        }
        Self { known, tree_artifacts, built_in_system_prefixes }
    }

    /// Resolves `paths` (as produced by [`crate::depset::DependencySet`] or a
    /// `/showIncludes` parser) into artifacts.
    ///
    /// If `validate` is `true`, any path that cannot be resolved and does not
    /// fall under a built-in system prefix is collected and reported as a
    /// single consolidated [`ActionError::UndeclaredInclusion`]. If `false`,
    /// unresolved paths are silently dropped (they simply cannot become
    /// declared inputs).
    pub fn resolve(
        &self,
        paths: &[std::path::PathBuf],
        validate: bool,
        owner: &Owner,
        source_file: &Path,
    ) -> Result<Vec<Artifact>> {
        let mut resolved = Vec::new();
        let mut offending = Vec::new();

        for path in paths {
            let fragment = PathFragment::new(path);

            if let Some(artifact) = self.known.get(&fragment) {
                resolved.push(artifact.clone());
                continue;
            }

            if let Some(tree) = self.tree_artifacts.iter().find(|t| fragment.starts_with(t.exec_path())) {
                resolved.push(synthesize_tree_member(tree, &fragment));
                continue;
            }

            if fragment.starts_with_any(self.built_in_system_prefixes.iter()) {
                tracing::trace!(path = %fragment, "dropping built-in system include");
                continue;
            }

            if validate {
                offending.push(path.clone());
            } else {
                tracing::debug!(path = %fragment, "unresolved dependency path, discovery validation disabled");
            }
        }

        if !offending.is_empty() {
            return Err(ActionError::undeclared_inclusion(
                owner.clone(),
                source_file.to_path_buf(),
                offending.into_iter().map(Artifact::source).collect(),
                &[],
                &[],
            ));
        }

        Ok(resolved)
    }
}

fn synthesize_tree_member(tree: &Artifact, fragment: &PathFragment) -> Artifact {
    match tree.root() {
        crate::artifact::ArtifactRoot::Source => Artifact::source(fragment.clone()),
        crate::artifact::ArtifactRoot::Derived(root) => Artifact::derived(
            fragment.clone(),
            root.clone(),
            tree.owner().cloned().expect("derived artifacts always have an owner"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ActionLookupKey;

    fn owner() -> Owner {
        Owner("//pkg:a".into())
    }

    #[test]
    fn resolves_known_artifact_by_exec_path() {
        let known = Artifact::source("h/x.h");
        let engine = HeaderDiscoveryEngine::new(vec![known.clone()], vec![]);
        let resolved =
            engine.resolve(&[std::path::PathBuf::from("h/x.h")], true, &owner(), Path::new("a.cc")).unwrap();
        assert_eq!(resolved, vec![known]);
    }

    #[test]
    fn drops_built_in_system_include() {
        let engine = HeaderDiscoveryEngine::new(vec![], vec![PathFragment::new("usr/include")]);
        let resolved = engine
            .resolve(&[std::path::PathBuf::from("usr/include/stdio.h")], true, &owner(), Path::new("a.cc"))
            .unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn unresolved_path_is_an_error_when_validating() {
        let engine = HeaderDiscoveryEngine::new(vec![], vec![]);
        let err = engine
            .resolve(&[std::path::PathBuf::from("secret.h")], true, &owner(), Path::new("a.cc"))
            .unwrap_err();
        assert!(err.to_string().contains("secret.h"));
    }

    #[test]
    fn unresolved_path_is_silently_dropped_without_validation() {
        let engine = HeaderDiscoveryEngine::new(vec![], vec![]);
        let resolved = engine
            .resolve(&[std::path::PathBuf::from("secret.h")], false, &owner(), Path::new("a.cc"))
            .unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn tree_artifact_covers_any_descendant_path() {
        let tree = Artifact::tree(
            "gen/headers",
            PathFragment::new("bazel-out/k8-fastbuild/bin"),
            ActionLookupKey("//pkg:gen".into()),
        );
        let engine = HeaderDiscoveryEngine::new(vec![tree], vec![]);
        let resolved = engine
            .resolve(&[std::path::PathBuf::from("gen/headers/sub/y.h")], true, &owner(), Path::new("a.cc"))
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].exec_path().as_str(), "gen/headers/sub/y.h");
    }
}
