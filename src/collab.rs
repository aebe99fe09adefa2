//! External collaborator contracts (§6).
//!
//! These traits are the seam between this crate's core and everything the
//! spec declares out of scope: the command-line front-end, the spawn
//! executor, the evaluator runtime, and the include scanner. They follow the
//! small-trait-with-associated-types shape this workspace already uses for
//! `Compiler`/`CompilerInput`/`ParsedSource` — default methods where a
//! sensible default exists, no behavior baked in beyond what the contract
//! requires.

use crate::artifact::Artifact;
use crate::error::Result;
use crate::path::PathFragment;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Produces the compiler invocation given an overriding variable map.
///
/// Command-line *generation from toolchain features* is explicitly out of
/// scope (§1 non-goals); this trait is the opaque boundary the core calls
/// through, never the generator itself.
pub trait CommandLineBuilder {
    /// Ordered argv, with `overwritten_vars` substituted into whatever
    /// variable expansions the builder supports (e.g. `module_files`).
    fn build(&self, overwritten_vars: &BTreeMap<String, String>) -> Result<Vec<String>>;

    /// Environment variables contributed by the command line (merged after
    /// the action environment per §6, later wins).
    fn environment(&self) -> BTreeMap<String, String>;

    fn tool_path(&self) -> String;

    /// The `.d` output location, if the compiler is asked to emit one.
    fn dotd_file(&self) -> Option<DotDFile>;

    fn source_file(&self) -> Artifact;
}

/// Where a `.d` file's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DotDFile {
    /// Written by the compiler to this exec-path; read from disk after execution.
    OnDisk(PathFragment),
    /// Not written to disk; the executor returns the bytes directly in its reply.
    Virtual(PathFragment),
}

/// A single spawned process's result.
#[derive(Debug, Clone)]
pub struct SpawnResult {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Set by the executor if the failure should halt the whole build, not
    /// just this action.
    pub catastrophic: bool,
}

impl SpawnResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a process and returns its streams, status, and an optional in-memory
/// `.d` reply (used when [`DotDFile::Virtual`] is requested).
pub trait SpawnExecutor {
    fn exec_with_reply(
        &self,
        argv: &[String],
        env: &BTreeMap<String, String>,
        owner: &crate::error::Owner,
    ) -> Result<(SpawnResult, Option<Vec<u8>>)>;
}

/// The outcome of an evaluator lookup for a batch of keys.
#[derive(Debug, Clone, Default)]
pub struct EvaluatorValues<V> {
    pub found: BTreeMap<String, V>,
    pub missing: Vec<String>,
}

impl<V> EvaluatorValues<V> {
    pub fn all_present(&self) -> bool {
        self.missing.is_empty()
    }
}

/// A demand-driven evaluator handle: looks up values by key, reporting which
/// keys (if any) are not yet available rather than blocking (§5 suspension
/// points).
pub trait EvaluatorHandle<V> {
    fn get_values(&self, keys: &[String]) -> EvaluatorValues<V>;
}

/// Expands tree artifacts and middlemen into their concrete member artifacts.
pub trait ArtifactExpander {
    fn expand(&self, artifact: &Artifact) -> Vec<Artifact>;
}

/// Pre-execution lexical scan of sources for `#include` targets (§4.1 step 5).
///
/// Interface only: the scanning algorithm itself lives outside this crate's
/// scope. A `None` return means "scanner disabled", distinct from `Some(Vec::new())`.
pub trait IncludeScanner {
    fn scan(&self, header_data: &IncludeScanningHeaderData) -> Result<Option<Vec<Artifact>>>;
}

/// The view an include scanner is handed: the universe of headers the
/// compilation is statically permitted to see, augmented with whatever the
/// command line additionally exposes.
#[derive(Debug, Clone)]
pub struct IncludeScanningHeaderData {
    pub declared_include_srcs: Vec<Artifact>,
    pub declared_include_dirs: Vec<PathFragment>,
    pub system_include_dirs: Vec<PathFragment>,
    pub cmdline_includes: Vec<PathBuf>,
}

/// Filesystem access needed by the core: creating empty coverage-note files
/// and reading a `.d` written to disk. Archive/source-tree primitives beyond
/// this are out of scope (§1).
pub trait ActionFilesystem {
    fn read(&self, path: &PathFragment) -> Result<Vec<u8>>;
    fn create_empty_file(&self, path: &PathFragment) -> Result<()>;
    fn exists(&self, path: &PathFragment) -> bool;
}

/// The execution context bundles the collaborators `discover_inputs`/`execute`
/// need beyond the action's own declared fields.
pub trait ExecutionContext {
    type Evaluator: EvaluatorHandle<crate::modules::ModuleActionValue>;
    type Expander: ArtifactExpander;
    type Scanner: IncludeScanner;
    type Executor: SpawnExecutor;
    type Filesystem: ActionFilesystem;

    fn evaluator(&self) -> &Self::Evaluator;
    fn artifact_expander(&self) -> &Self::Expander;
    fn include_scanner(&self) -> &Self::Scanner;
    fn spawn_executor(&self) -> &Self::Executor;
    fn filesystem(&self) -> &Self::Filesystem;
    fn verbose_failures(&self) -> bool;
    fn exec_root(&self) -> PathBuf;
}
