//! `CcCompilationContext`: the declared, statically-known envelope of what a
//! translation unit is allowed to see (§3).

use crate::artifact::Artifact;
use crate::path::PathFragment;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How strictly discovered headers are checked against the declared set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadersCheckingMode {
    Strict,
    Loose,
    Off,
}

/// A declared include directory, optionally covering all subdirectories.
///
/// `X/**` is represented as `Recursive(X)`; a bare `X` is `Exact(X)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeclaredIncludeDir {
    Exact(PathFragment),
    Recursive(PathFragment),
}

impl DeclaredIncludeDir {
    pub fn prefix(&self) -> &PathFragment {
        match self {
            DeclaredIncludeDir::Exact(p) | DeclaredIncludeDir::Recursive(p) => p,
        }
    }

    /// `true` if `dir` is permitted by this declaration: an exact match for
    /// `Exact`, or any descendant (including itself) for `Recursive`.
    pub fn permits(&self, dir: &PathFragment) -> bool {
        match self {
            DeclaredIncludeDir::Exact(p) => dir == p,
            DeclaredIncludeDir::Recursive(p) => dir.starts_with(p),
        }
    }
}

/// The declared-inputs envelope for a C/C++ translation unit.
#[derive(Debug, Clone, Default)]
pub struct CcCompilationContext {
    pub declared_include_srcs: BTreeSet<Artifact>,
    pub declared_include_dirs: Vec<DeclaredIncludeDir>,
    pub quote_include_dirs: Vec<PathFragment>,
    pub include_dirs: Vec<PathFragment>,
    pub system_include_dirs: Vec<PathFragment>,
    /// `.pcm` artifacts reachable from dependencies, keyed by whether the
    /// caller asked for the position-independent-code variant.
    transitive_modules_pic: BTreeSet<Artifact>,
    transitive_modules_no_pic: BTreeSet<Artifact>,
    /// Headers covered by this translation unit's own module map, if any.
    pub header_module_srcs: BTreeSet<Artifact>,
    /// Precomputed header → providing-module mapping, consulted by the
    /// module-graph resolver (§4.5) to compute `used_modules`.
    pub header_to_module: BTreeMap<PathFragment, Artifact>,
    pub headers_checking_mode: HeadersCheckingMode,
}

impl CcCompilationContext {
    pub fn transitive_modules(&self, use_pic: bool) -> &BTreeSet<Artifact> {
        if use_pic {
            &self.transitive_modules_pic
        } else {
            &self.transitive_modules_no_pic
        }
    }

    pub fn set_transitive_modules(&mut self, use_pic: bool, modules: BTreeSet<Artifact>) {
        if use_pic {
            self.transitive_modules_pic = modules;
        } else {
            self.transitive_modules_no_pic = modules;
        }
    }

    /// `true` if any declared dir directly or recursively permits `dir`.
    pub fn permits_dir(&self, dir: &PathFragment) -> bool {
        self.declared_include_dirs.iter().any(|d| d.permits(dir))
    }
}

impl Default for HeadersCheckingMode {
    fn default() -> Self {
        HeadersCheckingMode::Strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recursive_dir_permits_descendants() {
        let dir = DeclaredIncludeDir::Recursive(PathFragment::new("vendor"));
        assert!(dir.permits(&PathFragment::new("vendor/sub/x")));
        assert!(dir.permits(&PathFragment::new("vendor")));
    }

    #[test]
    fn exact_dir_rejects_descendants() {
        let dir = DeclaredIncludeDir::Exact(PathFragment::new("vendor"));
        assert!(!dir.permits(&PathFragment::new("vendor/sub")));
        assert!(dir.permits(&PathFragment::new("vendor")));
    }
}
