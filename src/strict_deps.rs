//! Strict-Deps Validator (§4.3).
//!
//! Decides, for each header actually consumed by a compile, whether it was
//! reachable through the declared `CcCompilationContext` — either directly
//! (mandatory inputs, declared sources, prunable headers), through an
//! ignored system-include prefix, or through a declared include directory
//! that isn't itself shadowed by a nested package boundary.

use crate::artifact::{Artifact, ArtifactKind};
use crate::collab::ArtifactExpander;
use crate::context::CcCompilationContext;
use crate::error::{ActionError, Owner, Result};
use crate::path::PathFragment;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Name of the package-definition marker file; an ancestor directory
/// containing one is a package boundary that a declared include directory
/// may not be claimed to cover transitively (§4.3 step 4).
pub const PACKAGE_MARKER_FILE: &str = "BUILD";

/// Directory segment Bazel uses for the "virtual include" link tree that
/// makes a derived header addressable by its logical include path. Derived
/// artifacts outside such a tree can never satisfy `is_declared_in` (§4.3
/// step 1): nothing else gives a derived header a stable root-relative path
/// that a declared include dir could plausibly cover.
pub const VIRTUAL_INCLUDE_SEGMENT: &str = "_virtual_includes";

/// Answers "does this directory contain a package-definition file?", so the
/// package-boundary walk can be performed without the validator owning a
/// concrete filesystem type.
pub trait PackageBoundaries {
    fn has_package_marker(&self, dir: &PathFragment) -> bool;
}

/// A [`PackageBoundaries`] backed by real filesystem stats under an
/// execution root, exactly as a strict-deps validator runs in production.
pub struct FsPackageBoundaries {
    exec_root: std::path::PathBuf,
}

impl FsPackageBoundaries {
    pub fn new(exec_root: std::path::PathBuf) -> Self {
        Self { exec_root }
    }
}

impl PackageBoundaries for FsPackageBoundaries {
    fn has_package_marker(&self, dir: &PathFragment) -> bool {
        self.exec_root.join(dir.as_path()).join(PACKAGE_MARKER_FILE).is_file()
    }
}

pub struct StrictDepsValidator<'a> {
    context: &'a CcCompilationContext,
    mandatory_inputs: &'a BTreeSet<Artifact>,
    additional_prunable_headers: &'a BTreeSet<Artifact>,
    built_in_include_directories: &'a [PathFragment],
    strict_system_includes: bool,
    validation_debug_warn: bool,
    boundaries: &'a dyn PackageBoundaries,
    expander: &'a dyn ArtifactExpander,
    marker_cache: RefCell<HashMap<PathFragment, bool>>,
}

impl<'a> StrictDepsValidator<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: &'a CcCompilationContext,
        mandatory_inputs: &'a BTreeSet<Artifact>,
        additional_prunable_headers: &'a BTreeSet<Artifact>,
        built_in_include_directories: &'a [PathFragment],
        strict_system_includes: bool,
        validation_debug_warn: bool,
        boundaries: &'a dyn PackageBoundaries,
        expander: &'a dyn ArtifactExpander,
    ) -> Self {
        Self {
            context,
            mandatory_inputs,
            additional_prunable_headers,
            built_in_include_directories,
            strict_system_includes,
            validation_debug_warn,
            boundaries,
            expander,
            marker_cache: RefCell::new(HashMap::new()),
        }
    }

    /// `mandatory_inputs ∪ declared_include_srcs ∪ additional_prunable_headers`,
    /// with every tree/middleman artifact expanded into its concrete member
    /// artifacts via the context's expander (§4.3: "expanding tree and
    /// middleman artifacts via the context's expander"). A header reachable
    /// only through such a member — not through the raw tree/middleman entry
    /// itself — must still be found here.
    fn allowed(&self) -> BTreeSet<Artifact> {
        let mut allowed = BTreeSet::new();
        for artifact in self
            .mandatory_inputs
            .iter()
            .chain(self.context.declared_include_srcs.iter())
            .chain(self.additional_prunable_headers.iter())
        {
            allowed.insert(artifact.clone());
            if matches!(artifact.kind(), ArtifactKind::Tree | ArtifactKind::Middleman) {
                allowed.extend(self.expander.expand(artifact));
            }
        }
        allowed
    }

    fn ignore_dirs(&self) -> Vec<&PathFragment> {
        let mut dirs: Vec<&PathFragment> = self.built_in_include_directories.iter().collect();
        if !self.strict_system_includes {
            dirs.extend(self.context.system_include_dirs.iter());
        }
        dirs
    }

    /// Validates `inputs`, returning a single consolidated
    /// [`ActionError::UndeclaredInclusion`] naming every offending path, or
    /// `Ok(())` if every input clears validation.
    pub fn validate_inclusions(
        &self,
        inputs: &[Artifact],
        owner: &Owner,
        source_file: &Path,
    ) -> Result<()> {
        let allowed = self.allowed();
        let ignore_dirs = self.ignore_dirs();
        let mut offending = Vec::new();

        for input in inputs {
            if input.is_module() {
                continue;
            }
            if allowed.contains(input) {
                continue;
            }
            if input.exec_path().starts_with_any(ignore_dirs.iter().copied()) {
                continue;
            }
            if !self.is_declared_in(input) {
                offending.push(input.clone());
            }
        }

        if offending.is_empty() {
            Ok(())
        } else {
            if self.validation_debug_warn {
                tracing::warn!(
                    owner = %owner,
                    count = offending.len(),
                    "strict-deps validation found undeclared inclusions"
                );
            }
            Err(ActionError::undeclared_inclusion(
                owner.clone(),
                source_file.to_path_buf(),
                offending,
                &self.context.declared_include_srcs.iter().cloned().collect::<Vec<_>>(),
                &self.context.declared_include_dirs.iter().map(|d| d.prefix().clone()).collect::<Vec<_>>(),
            ))
        }
    }

    /// Filters `inputs` down to those that pass validation, without erroring
    /// on the rest. Used before execution (§4.1 step 7) to keep headers the
    /// sandboxed compiler process is not permitted to see out of its view,
    /// rather than to report them as a build failure.
    pub fn filter_declared(&self, inputs: &[Artifact]) -> Vec<Artifact> {
        let allowed = self.allowed();
        let ignore_dirs = self.ignore_dirs();
        inputs
            .iter()
            .filter(|input| {
                input.is_module()
                    || allowed.contains(input)
                    || input.exec_path().starts_with_any(ignore_dirs.iter().copied())
                    || self.is_declared_in(input)
            })
            .cloned()
            .collect()
    }

    /// §4.3 step 4: the package-boundary-aware upward walk.
    fn is_declared_in(&self, artifact: &Artifact) -> bool {
        if artifact.kind() == ArtifactKind::Derived
            && !artifact.exec_path().as_str().contains(VIRTUAL_INCLUDE_SEGMENT)
        {
            return false;
        }

        let include_dir = PathFragment::new(artifact.root_relative_path()).parent();
        if include_dir.is_empty() || self.context.permits_dir(&include_dir) {
            return true;
        }

        let mut remembered = Vec::new();
        let mut probe = include_dir;
        loop {
            remembered.push(probe.clone());
            let parent = probe.parent();
            if parent == probe {
                return false;
            }
            if self.context.permits_dir(&parent) {
                let boundary_hit = remembered.iter().any(|dir| self.has_package_marker(dir));
                return !boundary_hit;
            }
            probe = parent;
        }
    }

    fn has_package_marker(&self, dir: &PathFragment) -> bool {
        if let Some(cached) = self.marker_cache.borrow().get(dir) {
            return *cached;
        }
        let found = self.boundaries.has_package_marker(dir);
        self.marker_cache.borrow_mut().insert(dir.clone(), found);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ActionLookupKey;
    use crate::context::DeclaredIncludeDir;
    use crate::support::fakes::IdentityExpander;

    struct NoBoundaries;
    impl PackageBoundaries for NoBoundaries {
        fn has_package_marker(&self, _dir: &PathFragment) -> bool {
            false
        }
    }

    struct MarkerAt(PathFragment);
    impl PackageBoundaries for MarkerAt {
        fn has_package_marker(&self, dir: &PathFragment) -> bool {
            dir == &self.0
        }
    }

    fn owner() -> Owner {
        Owner("//pkg:a".into())
    }

    #[test]
    fn declared_source_passes() {
        let ctx = CcCompilationContext {
            declared_include_srcs: [Artifact::source("h/x.h")].into_iter().collect(),
            ..Default::default()
        };
        let mandatory = BTreeSet::new();
        let prunable = BTreeSet::new();
        let boundaries = NoBoundaries;
        let expander = IdentityExpander;
        let validator = StrictDepsValidator::new(&ctx, &mandatory, &prunable, &[], false, false, &boundaries, &expander);
        assert!(validator.validate_inclusions(&[Artifact::source("h/x.h")], &owner(), Path::new("a.cc")).is_ok());
    }

    #[test]
    fn undeclared_header_is_rejected() {
        let ctx = CcCompilationContext::default();
        let mandatory = BTreeSet::new();
        let prunable = BTreeSet::new();
        let boundaries = NoBoundaries;
        let expander = IdentityExpander;
        let validator = StrictDepsValidator::new(&ctx, &mandatory, &prunable, &[], false, false, &boundaries, &expander);
        let err = validator
            .validate_inclusions(&[Artifact::source("secret.h")], &owner(), Path::new("a.cc"))
            .unwrap_err();
        assert!(err.to_string().contains("secret.h"));
    }

    #[test]
    fn declared_dir_accepts_header_under_it() {
        let ctx = CcCompilationContext {
            declared_include_dirs: vec![DeclaredIncludeDir::Exact(PathFragment::new("h"))],
            ..Default::default()
        };
        let mandatory = BTreeSet::new();
        let prunable = BTreeSet::new();
        let boundaries = NoBoundaries;
        let expander = IdentityExpander;
        let validator = StrictDepsValidator::new(&ctx, &mandatory, &prunable, &[], false, false, &boundaries, &expander);
        assert!(validator.validate_inclusions(&[Artifact::source("h/x.h")], &owner(), Path::new("a.cc")).is_ok());
    }

    #[test]
    fn recursive_declared_dir_accepts_subpackage_walk_up() {
        let ctx = CcCompilationContext {
            declared_include_dirs: vec![DeclaredIncludeDir::Exact(PathFragment::new("vendor"))],
            ..Default::default()
        };
        let mandatory = BTreeSet::new();
        let prunable = BTreeSet::new();
        let boundaries = NoBoundaries;
        let expander = IdentityExpander;
        let validator = StrictDepsValidator::new(&ctx, &mandatory, &prunable, &[], false, false, &boundaries, &expander);
        // vendor/lib/x.h: parent is vendor/lib, not declared directly; walk up to `vendor`.
        assert!(
            validator.validate_inclusions(&[Artifact::source("vendor/lib/x.h")], &owner(), Path::new("a.cc")).is_ok()
        );
    }

    #[test]
    fn package_boundary_blocks_the_upward_walk() {
        let ctx = CcCompilationContext {
            declared_include_dirs: vec![DeclaredIncludeDir::Exact(PathFragment::new("vendor"))],
            ..Default::default()
        };
        let mandatory = BTreeSet::new();
        let prunable = BTreeSet::new();
        // `vendor/lib` itself is a package: claiming it via `vendor` must be rejected.
        let boundaries = MarkerAt(PathFragment::new("vendor/lib"));
        let expander = IdentityExpander;
        let validator = StrictDepsValidator::new(&ctx, &mandatory, &prunable, &[], false, false, &boundaries, &expander);
        let err = validator
            .validate_inclusions(&[Artifact::source("vendor/lib/x.h")], &owner(), Path::new("a.cc"))
            .unwrap_err();
        assert!(err.to_string().contains("vendor/lib/x.h"));
    }

    #[test]
    fn declared_tree_artifact_is_expanded_to_cover_its_members() {
        let tree = Artifact::tree(
            "gen/headers",
            PathFragment::new("bazel-out/k8-fastbuild/bin"),
            ActionLookupKey("//pkg:gen".into()),
        );
        let member = Artifact::derived(
            "gen/headers/sub/y.h",
            PathFragment::new("bazel-out/k8-fastbuild/bin"),
            ActionLookupKey("//pkg:gen".into()),
        );
        let ctx =
            CcCompilationContext { declared_include_srcs: [tree.clone()].into_iter().collect(), ..Default::default() };
        let mandatory = BTreeSet::new();
        let prunable = BTreeSet::new();
        let boundaries = NoBoundaries;
        struct TreeExpander(Artifact, Artifact);
        impl ArtifactExpander for TreeExpander {
            fn expand(&self, artifact: &Artifact) -> Vec<Artifact> {
                if artifact == &self.0 {
                    vec![self.1.clone()]
                } else {
                    vec![artifact.clone()]
                }
            }
        }
        let expander = TreeExpander(tree, member.clone());
        let validator = StrictDepsValidator::new(&ctx, &mandatory, &prunable, &[], false, false, &boundaries, &expander);
        assert!(validator.validate_inclusions(&[member], &owner(), Path::new("a.cc")).is_ok());
    }

    #[test]
    fn module_artifacts_are_never_validated() {
        let ctx = CcCompilationContext::default();
        let mandatory = BTreeSet::new();
        let prunable = BTreeSet::new();
        let boundaries = NoBoundaries;
        let expander = IdentityExpander;
        let validator = StrictDepsValidator::new(&ctx, &mandatory, &prunable, &[], false, false, &boundaries, &expander);
        assert!(validator.validate_inclusions(&[Artifact::source("m.pcm")], &owner(), Path::new("a.cc")).is_ok());
    }
}
