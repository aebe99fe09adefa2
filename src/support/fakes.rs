//! Scripted collaborator implementations backing `tests/scenarios.rs`.

use crate::artifact::Artifact;
use crate::collab::{
    ActionFilesystem, ArtifactExpander, CommandLineBuilder, DotDFile, IncludeScanner, IncludeScanningHeaderData,
    SpawnExecutor, SpawnResult,
};
use crate::error::{ActionError, Owner, Result};
use crate::path::PathFragment;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// An in-memory filesystem keyed by exec-path.
#[derive(Default)]
pub struct InMemoryFilesystem {
    files: RefCell<BTreeMap<PathFragment, Vec<u8>>>,
}

impl InMemoryFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, path: impl Into<PathFragment>, bytes: impl Into<Vec<u8>>) {
        self.files.borrow_mut().insert(path.into(), bytes.into());
    }
}

impl ActionFilesystem for InMemoryFilesystem {
    fn read(&self, path: &PathFragment) -> Result<Vec<u8>> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| ActionError::DotdParseError(format!("no such file: {path}")))
    }

    fn create_empty_file(&self, path: &PathFragment) -> Result<()> {
        self.files.borrow_mut().insert(path.clone(), Vec::new());
        Ok(())
    }

    fn exists(&self, path: &PathFragment) -> bool {
        self.files.borrow().contains_key(path)
    }
}

/// An include scanner that always returns a fixed result (`None` simulates
/// a disabled scanner per §4.1 step 6).
pub struct ScriptedIncludeScanner {
    pub result: Option<Vec<Artifact>>,
}

impl ScriptedIncludeScanner {
    pub fn returning(result: Option<Vec<Artifact>>) -> Self {
        Self { result }
    }
}

impl IncludeScanner for ScriptedIncludeScanner {
    fn scan(&self, _header_data: &IncludeScanningHeaderData) -> Result<Option<Vec<Artifact>>> {
        Ok(self.result.clone())
    }
}

/// A spawn executor that always succeeds and replies with a fixed `.d` payload.
pub struct ScriptedSpawnExecutor {
    pub exit_code: i32,
    pub dotd_reply: Option<Vec<u8>>,
}

impl ScriptedSpawnExecutor {
    pub fn succeeding_with_dotd(dotd_reply: Vec<u8>) -> Self {
        Self { exit_code: 0, dotd_reply: Some(dotd_reply) }
    }

    pub fn failing(exit_code: i32) -> Self {
        Self { exit_code, dotd_reply: None }
    }
}

impl SpawnExecutor for ScriptedSpawnExecutor {
    fn exec_with_reply(
        &self,
        _argv: &[String],
        _env: &BTreeMap<String, String>,
        _owner: &Owner,
    ) -> Result<(SpawnResult, Option<Vec<u8>>)> {
        Ok((
            SpawnResult { exit_code: self.exit_code, stdout: Vec::new(), stderr: Vec::new(), catastrophic: false },
            self.dotd_reply.clone(),
        ))
    }
}

/// Expands tree artifacts to themselves; scenario tests don't exercise real
/// tree-artifact expansion.
pub struct IdentityExpander;

impl ArtifactExpander for IdentityExpander {
    fn expand(&self, artifact: &Artifact) -> Vec<Artifact> {
        vec![artifact.clone()]
    }
}

/// A [`CommandLineBuilder`] that returns a fixed argv plus whatever
/// `module_files` override it's handed.
pub struct ScriptedCommandLine {
    pub base_argv: Vec<String>,
    pub tool_path: String,
    pub dotd_file: Option<DotDFile>,
    pub source: Artifact,
}

impl CommandLineBuilder for ScriptedCommandLine {
    fn build(&self, overwritten_vars: &BTreeMap<String, String>) -> Result<Vec<String>> {
        let mut argv = self.base_argv.clone();
        if let Some(files) = overwritten_vars.get("module_files") {
            if !files.is_empty() {
                argv.push(format!("-fmodule-file={files}"));
            }
        }
        Ok(argv)
    }

    fn environment(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn tool_path(&self) -> String {
        self.tool_path.clone()
    }

    fn dotd_file(&self) -> Option<DotDFile> {
        self.dotd_file.clone()
    }

    fn source_file(&self) -> Artifact {
        self.source.clone()
    }
}
