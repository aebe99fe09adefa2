//! In-process reference implementations of the §6 collaborator traits.
//!
//! Not part of the core's scope (the real evaluator, scanner and executor
//! live outside this crate), but a minimal standalone implementation is
//! useful both for the scenario tests in `tests/scenarios.rs` and for
//! callers that want to exercise the crate without wiring up a full build
//! system (§5 implementation note).

pub mod evaluator;
pub mod fakes;

use crate::collab::ExecutionContext;
use crate::modules::ModuleActionValue;
use evaluator::InProcessEvaluator;
use fakes::{IdentityExpander, InMemoryFilesystem, ScriptedIncludeScanner, ScriptedSpawnExecutor};
use std::path::PathBuf;

/// Bundles the scripted collaborators above into one [`ExecutionContext`],
/// the standalone-use wiring mentioned in §5's implementation note.
pub struct FakeExecutionContext {
    pub evaluator: InProcessEvaluator<ModuleActionValue>,
    pub expander: IdentityExpander,
    pub scanner: ScriptedIncludeScanner,
    pub executor: ScriptedSpawnExecutor,
    pub filesystem: InMemoryFilesystem,
    pub exec_root: PathBuf,
}

impl FakeExecutionContext {
    pub fn new(scanner: ScriptedIncludeScanner, executor: ScriptedSpawnExecutor) -> Self {
        Self {
            evaluator: InProcessEvaluator::new(),
            expander: IdentityExpander,
            scanner,
            executor,
            filesystem: InMemoryFilesystem::new(),
            exec_root: PathBuf::from("/exec-root"),
        }
    }
}

impl ExecutionContext for FakeExecutionContext {
    type Evaluator = InProcessEvaluator<ModuleActionValue>;
    type Expander = IdentityExpander;
    type Scanner = ScriptedIncludeScanner;
    type Executor = ScriptedSpawnExecutor;
    type Filesystem = InMemoryFilesystem;

    fn evaluator(&self) -> &Self::Evaluator {
        &self.evaluator
    }
    fn artifact_expander(&self) -> &Self::Expander {
        &self.expander
    }
    fn include_scanner(&self) -> &Self::Scanner {
        &self.scanner
    }
    fn spawn_executor(&self) -> &Self::Executor {
        &self.executor
    }
    fn filesystem(&self) -> &Self::Filesystem {
        &self.filesystem
    }
    fn verbose_failures(&self) -> bool {
        true
    }
    fn exec_root(&self) -> PathBuf {
        self.exec_root.clone()
    }
}
