//! Value types for the build-graph files the action reads and writes.

use crate::path::PathFragment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An action-lookup key identifying the action that produces a derived artifact.
///
/// Opaque to this crate beyond equality/ordering; the evaluator collaborator
/// interprets it to find the generating action's value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionLookupKey(pub String);

/// The root an artifact's exec-path is resolved against.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArtifactRoot {
    /// The source tree; never written by an action.
    Source,
    /// A derived-output root, identified by its own relative path (e.g. `bazel-out/k8-fastbuild/bin`).
    Derived(PathFragment),
}

/// What kind of artifact this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// An ordinary file tracked under [`ArtifactRoot::Source`].
    Source,
    /// An ordinary file produced by an action.
    Derived,
    /// A directory whose contents are only known at execution time.
    Tree,
    /// A stand-in for a group of inputs, expanded transparently where needed.
    Middleman,
}

/// An identified file in the build graph.
///
/// Two artifacts with the same exec-path under different roots are distinct:
/// equality and ordering include the root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Artifact {
    exec_path: PathFragment,
    root: ArtifactRoot,
    kind: ArtifactKind,
    /// Set iff `kind` is `Derived`/`Tree`/`Middleman`: the action that produces this artifact.
    owner: Option<ActionLookupKey>,
}

impl Artifact {
    pub fn source(exec_path: impl Into<PathFragment>) -> Self {
        Self { exec_path: exec_path.into(), root: ArtifactRoot::Source, kind: ArtifactKind::Source, owner: None }
    }

    pub fn derived(
        exec_path: impl Into<PathFragment>,
        root: PathFragment,
        owner: ActionLookupKey,
    ) -> Self {
        Self {
            exec_path: exec_path.into(),
            root: ArtifactRoot::Derived(root),
            kind: ArtifactKind::Derived,
            owner: Some(owner),
        }
    }

    pub fn tree(exec_path: impl Into<PathFragment>, root: PathFragment, owner: ActionLookupKey) -> Self {
        Self {
            exec_path: exec_path.into(),
            root: ArtifactRoot::Derived(root),
            kind: ArtifactKind::Tree,
            owner: Some(owner),
        }
    }

    pub fn middleman(exec_path: impl Into<PathFragment>, owner: ActionLookupKey) -> Self {
        Self {
            exec_path: exec_path.into(),
            root: ArtifactRoot::Source,
            kind: ArtifactKind::Middleman,
            owner: Some(owner),
        }
    }

    pub fn exec_path(&self) -> &PathFragment {
        &self.exec_path
    }

    pub fn root(&self) -> &ArtifactRoot {
        &self.root
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn owner(&self) -> Option<&ActionLookupKey> {
        self.owner.as_ref()
    }

    pub fn is_source(&self) -> bool {
        self.kind == ArtifactKind::Source
    }

    pub fn is_tree(&self) -> bool {
        self.kind == ArtifactKind::Tree
    }

    pub fn is_middleman(&self) -> bool {
        self.kind == ArtifactKind::Middleman
    }

    /// `true` if this artifact's output path ends in `.pcm` (a header module).
    pub fn is_module(&self) -> bool {
        self.exec_path.as_str().ends_with(".pcm")
    }

    /// The root-relative path: the exec-path with any derived-root prefix stripped.
    ///
    /// For source artifacts this is the exec-path itself.
    pub fn root_relative_path(&self) -> PathBuf {
        self.exec_path.as_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_exec_path_different_root_are_distinct() {
        let a = Artifact::source("h/x.h");
        let b = Artifact::derived(
            "h/x.h",
            PathFragment::new("bazel-out/k8-fastbuild/bin"),
            ActionLookupKey("//pkg:gen".into()),
        );
        assert_ne!(a, b);
    }

    #[test]
    fn module_detection_is_suffix_based() {
        assert!(Artifact::source("mod.pcm").is_module());
        assert!(!Artifact::source("mod.h").is_module());
    }
}
