//! Fingerprint Protocol (§4.6).
//!
//! Builds the action's cache key the same way this workspace already builds
//! content-addressed ids elsewhere (`buildinfo::RawBuildInfo::new`): a single
//! hasher fed sequential `update()` calls in a fixed field order, finalized
//! once and hex-encoded. Every "stable digest of a set" step below flattens
//! through a [`digest::NestedSet`] and hashes through [`digest::stable_digest`],
//! so the digest depends only on content, never on insertion, construction, or
//! traversal order (§4.6 final paragraph, §9 Design Note).

use crate::artifact::Artifact;
use crate::context::DeclaredIncludeDir;
use crate::digest::{self, finalize_hex, NestedSet, Order};
use crate::path::PathFragment;
use md5::{Digest, Md5};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Everything `compute_key` needs, borrowed from the action and the current
/// execution's command line.
pub struct FingerprintInputs<'a> {
    pub action_class_id: Uuid,
    pub action_environment: &'a BTreeMap<String, String>,
    pub compile_command_line_environment: &'a BTreeMap<String, String>,
    pub execution_info: &'a BTreeMap<String, String>,
    pub argv: &'a [String],
    pub declared_include_srcs: &'a BTreeSet<Artifact>,
    pub mandatory_inputs: &'a BTreeSet<Artifact>,
    pub additional_prunable_headers: &'a BTreeSet<Artifact>,
    pub declared_include_dirs: &'a [DeclaredIncludeDir],
    pub built_in_include_directories: &'a [PathFragment],
    pub inputs_for_invalidation: &'a BTreeSet<Artifact>,
}

/// A digest over `argv` with any token referencing a `.pcm` module elided.
///
/// Module args are discovered, not declared, so they cannot be allowed to
/// perturb the key; correctness instead relies on module *content* being
/// reflected through the transitive input fingerprints (§4.6 step 5, and
/// testable property 2).
pub fn command_line_key(argv: &[String]) -> String {
    let mut hasher = Md5::new();
    for arg in argv {
        if arg.contains(".pcm") {
            continue;
        }
        hasher.update(arg.as_bytes());
        hasher.update(b"\0");
    }
    finalize_hex(hasher)
}

/// Computes the action's cache key per the 14-field concatenation of §4.6.
pub fn compute_key(inputs: &FingerprintInputs<'_>) -> String {
    let mut hasher = Md5::new();

    hasher.update(inputs.action_class_id.as_bytes());
    digest_env_map(&mut hasher, inputs.action_environment);
    digest_env_map(&mut hasher, inputs.compile_command_line_environment);
    digest_env_map(&mut hasher, inputs.execution_info);
    hasher.update(command_line_key(inputs.argv).as_bytes());

    digest_artifacts(&mut hasher, inputs.declared_include_srcs);
    hasher.update(b"|");
    digest_artifacts(&mut hasher, inputs.mandatory_inputs);
    hasher.update(b"|");
    digest_artifacts(&mut hasher, inputs.additional_prunable_headers);

    digest_include_dirs(&mut hasher, inputs.declared_include_dirs);

    for dir in inputs.built_in_include_directories {
        hasher.update(dir.as_str().as_bytes());
        hasher.update(b"\0");
    }
    hasher.update(b"|");

    digest_artifacts(&mut hasher, inputs.inputs_for_invalidation);

    finalize_hex(hasher)
}

fn digest_env_map(hasher: &mut Md5, map: &BTreeMap<String, String>) {
    // Already a BTreeMap: iteration order is key order, independent of
    // insertion order.
    for (k, v) in map {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"\0");
    }
}

/// Flattens `artifacts` through a [`NestedSet`] (exercising the same
/// lazily-memoized traversal path the rest of the workspace flattens
/// transitive inputs through, §5) and then feeds the result through
/// [`digest::stable_digest`], so the final bytes depend only on set content.
fn digest_artifacts(hasher: &mut Md5, artifacts: &BTreeSet<Artifact>) {
    // Each path carries its own trailing NUL before flattening, so `stable_digest`
    // (which concatenates sorted items with no separator of its own) still can't
    // confuse a boundary between two artifacts for one inside a single path.
    let paths: Vec<String> = artifacts.iter().map(|a| format!("{}\0", a.exec_path().as_str())).collect();
    let nested = NestedSet::leaf(Order::Stable, paths);
    let flattened = nested.to_list();
    digest::stable_digest(hasher, flattened.iter().map(String::as_str));
}

fn digest_include_dirs(hasher: &mut Md5, dirs: &[DeclaredIncludeDir]) {
    let encoded: Vec<String> = dirs
        .iter()
        .map(|dir| match dir {
            DeclaredIncludeDir::Exact(p) => format!("={}\0", p.as_str()),
            DeclaredIncludeDir::Recursive(p) => format!("**{}\0", p.as_str()),
        })
        .collect();
    let nested = NestedSet::leaf(Order::Stable, encoded);
    let flattened = nested.to_list();
    digest::stable_digest(hasher, flattened.iter().map(String::as_str));
}
