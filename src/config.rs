//! Typed configuration threaded immutably through an action (§1A, §6).
//!
//! `FeatureSet` replaces process-environment or toolchain-feature lookups
//! inside the core: the rule layer resolves these booleans once (from
//! whatever toolchain-feature configuration it consumes) and builds a
//! [`FeatureSet`], which is then the only configuration surface the core
//! ever reads.

use serde::{Deserialize, Serialize};

/// Boolean capability toggles controlling discovery, module handling and
/// validation for a single compile action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// The toolchain emits Windows-style `/showIncludes` output instead of a `.d` file.
    pub parse_show_includes: bool,
    /// Header modules (`.pcm`) are enabled for this compilation.
    pub header_modules: bool,
    /// Module pruning: compute `top_level_modules`/`discovered_modules` via the evaluator.
    pub module_pruning: bool,
    /// Layering-check: an additional, stricter discipline on module boundaries.
    ///
    /// Carried through for collaborators that consult it; the core does not
    /// branch on it directly beyond exposing it on [`FeatureSet`].
    pub layering_check: bool,
    /// Only the toolchain's built-in include dirs are exempt from strict-deps
    /// validation; otherwise the context's system include dirs are exempt too.
    pub strict_system_includes: bool,
    /// Whether discovered includes are validated against declared sources/dirs at all.
    pub include_validation: bool,
    /// Whether dependency-file (`.d`) parsing happens after execution.
    pub dotd_scanning: bool,
    /// Whether the pre-execution include scanner runs at all.
    pub scan_includes: bool,
    /// Opt-in diagnostic (§9 open question): log inconsistent discovered vs.
    /// declared state to stderr via `tracing::warn!` instead of staying silent.
    ///
    /// The spec explicitly declines to guess the behavior an active branch
    /// should have beyond "log it"; this flag is the mechanism callers use to
    /// opt into that logging at runtime, read by
    /// `StrictDepsValidator::validate_inclusions`.
    pub validation_debug_warn: bool,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            parse_show_includes: false,
            header_modules: false,
            module_pruning: false,
            layering_check: false,
            strict_system_includes: false,
            include_validation: true,
            dotd_scanning: true,
            scan_includes: true,
            validation_debug_warn: false,
        }
    }
}

impl FeatureSet {
    /// `should_prune_modules ⇒ should_scan_includes` (§3 invariants).
    pub fn is_consistent(&self) -> bool {
        !self.module_pruning || self.scan_includes
    }
}
