//! Compile-Action State Machine (§4.1).
//!
//! `ActionCore` is the immutable, `Clone`-able description of a single
//! compile action; `ExecutionState` is the explicit, evaluator-owned value
//! that used to live as nullable mutable fields on the action (§9 Design
//! Note). `CompileAction` is the thin facade tying the two together with the
//! command-line-builder collaborator.

pub mod argv;

use crate::artifact::Artifact;
use crate::collab::{
    CommandLineBuilder, DotDFile, ExecutionContext, IncludeScanningHeaderData, SpawnResult,
};
use crate::config::FeatureSet;
use crate::context::CcCompilationContext;
use crate::depset::DependencySet;
use crate::discovery::HeaderDiscoveryEngine;
use crate::error::{ActionError, Owner, Result};
use crate::extra_action::ExtraActionInfo;
use crate::fingerprint::{self, FingerprintInputs};
use crate::modules::{self, ModuleResolution};
use crate::path::PathFragment;
use crate::strict_deps::StrictDepsValidator;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Immutable action data, shared across every execution attempt.
#[derive(Debug, Clone)]
pub struct ActionCore {
    pub owner: Owner,
    pub mandatory_inputs: BTreeSet<Artifact>,
    pub inputs_for_invalidation: BTreeSet<Artifact>,
    pub additional_prunable_headers: BTreeSet<Artifact>,
    pub output_file: Artifact,
    pub gcno_file: Option<Artifact>,
    pub dwo_file: Option<Artifact>,
    pub lto_indexing_file: Option<Artifact>,
    pub feature_set: FeatureSet,
    pub action_class_id: Uuid,
    pub built_in_include_directories: Vec<PathFragment>,
    pub cc_compilation_context: CcCompilationContext,
    pub action_environment: BTreeMap<String, String>,
    pub execution_info: BTreeMap<String, String>,
}

impl ActionCore {
    /// The universe of artifacts header-discovery may resolve a `.d`/scanner
    /// path against: everything this action could legally declare as an
    /// input, source or module.
    fn known_artifacts(&self) -> Vec<Artifact> {
        let ctx = &self.cc_compilation_context;
        self.mandatory_inputs
            .iter()
            .chain(ctx.declared_include_srcs.iter())
            .chain(self.additional_prunable_headers.iter())
            .chain(ctx.transitive_modules(false).iter())
            .chain(ctx.transitive_modules(true).iter())
            .chain(ctx.header_module_srcs.iter())
            .cloned()
            .collect()
    }

    fn strict_deps_validator<'a>(
        &'a self,
        boundaries: &'a dyn crate::strict_deps::PackageBoundaries,
        expander: &'a dyn crate::collab::ArtifactExpander,
    ) -> StrictDepsValidator<'a> {
        StrictDepsValidator::new(
            &self.cc_compilation_context,
            &self.mandatory_inputs,
            &self.additional_prunable_headers,
            &self.built_in_include_directories,
            self.feature_set.strict_system_includes,
            self.feature_set.validation_debug_warn,
            boundaries,
            expander,
        )
    }
}

/// Per-execution mutable state, explicit rather than nullable fields on the
/// action (§9 Design Note).
#[derive(Debug, Clone, Default)]
pub struct ExecutionState {
    pub additional_inputs: BTreeSet<Artifact>,
    pub used_modules: BTreeSet<Artifact>,
    pub top_level_modules: BTreeSet<Artifact>,
    pub discovered_modules: BTreeSet<Artifact>,
    pub overwritten_variables: BTreeMap<String, String>,
    pub command_line_key: Option<String>,
}

/// Outcome of a `discover_inputs` attempt (§9: tagged result, not null + flag).
#[derive(Debug, Clone)]
pub enum DiscoverOutcome {
    Ready(ExecutionState),
    /// The evaluator must resolve these module-action keys before discovery
    /// can be retried from the top.
    NeedsMore(Vec<String>),
}

/// The result of running the compiler, before `.d` parsing/validation.
#[derive(Debug, Clone)]
pub struct SpawnOutcome {
    pub result: SpawnResult,
}

const PWD_SENTINEL: &str = "/proc/self/cwd";
const MODULE_FILES_VAR: &str = "module_files";
const REQUIRES_DARWIN_TAG: &str = "requires-darwin";

/// The public `Action` type: immutable core plus the command-line-builder
/// collaborator, driving `discover_inputs`/`execute`/`compute_key`/
/// `update_inputs`/`get_extra_action_info`.
#[derive(Debug, Clone)]
pub struct CompileAction<CB> {
    pub core: ActionCore,
    pub command_line_builder: CB,
}

impl<CB: CommandLineBuilder> CompileAction<CB> {
    pub fn new(core: ActionCore, command_line_builder: CB) -> Self {
        Self { core, command_line_builder }
    }

    fn source_file(&self) -> Artifact {
        self.command_line_builder.source_file()
    }

    /// §4.1 `discover_inputs`.
    #[tracing::instrument(skip_all, fields(owner = %self.core.owner))]
    pub fn discover_inputs<C: ExecutionContext>(&self, ctx: &C) -> Result<DiscoverOutcome> {
        let empty_overrides = BTreeMap::new();
        let argv = self.command_line_builder.build(&empty_overrides)?;
        let command_line_key = fingerprint::command_line_key(&argv);

        let extracted = argv::extract_includes(&argv);

        if self.core.feature_set.include_validation {
            argv::verify_action_include_paths(&argv)?;
        }

        let header_data = IncludeScanningHeaderData {
            declared_include_srcs: self.core.cc_compilation_context.declared_include_srcs.iter().cloned().collect(),
            declared_include_dirs: self
                .core
                .cc_compilation_context
                .declared_include_dirs
                .iter()
                .map(|d| d.prefix().clone())
                .collect(),
            system_include_dirs: extracted.system_include_dirs.iter().map(|d| d.fragment.clone()).collect(),
            cmdline_includes: extracted.cmdline_includes,
        };

        let scanned = ctx
            .include_scanner()
            .scan(&header_data)
            .map_err(|e| match e {
                ActionError::IncludeScanFailure { .. } => e,
                other => ActionError::IncludeScanFailure { owner: self.core.owner.clone(), source: Box::new(other) },
            })?;

        let mut discovered: Vec<Artifact> = match scanned {
            Some(artifacts) => artifacts,
            None => self
                .core
                .cc_compilation_context
                .declared_include_srcs
                .iter()
                .chain(self.core.additional_prunable_headers.iter())
                .cloned()
                .collect(),
        };

        if !self.core.feature_set.dotd_scanning && self.core.feature_set.scan_includes {
            let boundaries = crate::strict_deps::FsPackageBoundaries::new(ctx.exec_root());
            let validator = self.core.strict_deps_validator(&boundaries, ctx.artifact_expander());
            discovered = validator.filter_declared(&discovered);
        }

        let mut used_modules: BTreeSet<Artifact> = BTreeSet::new();
        let mut top_level_modules = BTreeSet::new();
        let mut discovered_modules = BTreeSet::new();

        if self.core.feature_set.header_modules && self.core.feature_set.module_pruning {
            let header_to_module = &self.core.cc_compilation_context.header_to_module;
            for header in &discovered {
                if let Some(module) = header_to_module.get(header.exec_path()) {
                    used_modules.insert(module.clone());
                }
            }

            match modules::resolve_modules(&used_modules, ctx.evaluator(), module_key) {
                ModuleResolution::Suspend { missing } => return Ok(DiscoverOutcome::NeedsMore(missing)),
                ModuleResolution::Ready { top_level_modules: tl, discovered_modules: dm } => {
                    top_level_modules = tl;
                    discovered_modules = dm;
                }
            }
        }

        let mut additional_inputs: BTreeSet<Artifact> = discovered.into_iter().collect();
        additional_inputs.extend(discovered_modules.iter().cloned());

        Ok(DiscoverOutcome::Ready(ExecutionState {
            additional_inputs,
            used_modules: BTreeSet::new(),
            top_level_modules,
            discovered_modules,
            overwritten_variables: BTreeMap::new(),
            command_line_key: Some(command_line_key),
        }))
    }

    /// §4.1 `execute`.
    #[tracing::instrument(skip_all, fields(owner = %self.core.owner))]
    pub fn execute<C: ExecutionContext>(
        &self,
        ctx: &C,
        mut state: ExecutionState,
    ) -> Result<(ExecutionState, SpawnOutcome)> {
        let module_set = if self.core.feature_set.module_pruning {
            &state.top_level_modules
        } else {
            &state.additional_inputs
        };
        let module_files =
            module_set.iter().filter(|a| a.is_module()).map(|a| a.exec_path().as_str()).collect::<Vec<_>>().join(" ");
        state.overwritten_variables.insert(MODULE_FILES_VAR.to_string(), module_files);

        if self.core.feature_set.parse_show_includes {
            tracing::debug!("toolchain emits /showIncludes output; caller is expected to filter stdout accordingly");
        }

        let argv = self.command_line_builder.build(&state.overwritten_variables)?;

        let mut env = self.core.action_environment.clone();
        env.extend(self.command_line_builder.environment());
        if !self.core.execution_info.contains_key(REQUIRES_DARWIN_TAG) {
            env.entry("PWD".to_string()).or_insert_with(|| PWD_SENTINEL.to_string());
        }

        let (spawn_result, dotd_reply) =
            ctx.spawn_executor().exec_with_reply(&argv, &env, &self.core.owner)?;

        if !spawn_result.success() {
            tracing::error!(owner = %self.core.owner, exit_code = spawn_result.exit_code, "compile action failed");
            return Err(ActionError::SpawnExecutionFailure {
                owner: self.core.owner.clone(),
                exit_code: Some(spawn_result.exit_code),
                catastrophic: spawn_result.catastrophic,
                stderr_tail: tail(&spawn_result.stderr),
            });
        }

        if let Some(gcno) = &self.core.gcno_file {
            let path = gcno.exec_path();
            if !ctx.filesystem().exists(path) {
                tracing::warn!(path = %path, "compiler did not emit expected .gcno; writing an empty placeholder");
                ctx.filesystem().create_empty_file(path).map_err(|e| match e {
                    ActionError::Io(source) => {
                        ActionError::CoverageNoteCreationFailure { path: path.as_path(), source }
                    }
                    other => other,
                })?;
            }
        }

        if !self.core.feature_set.dotd_scanning {
            return Ok((state, SpawnOutcome { result: spawn_result }));
        }

        let dotd_bytes = match self.command_line_builder.dotd_file() {
            Some(DotDFile::OnDisk(path)) => ctx.filesystem().read(&path)?,
            Some(DotDFile::Virtual(_)) => dotd_reply.unwrap_or_default(),
            None => Vec::new(),
        };
        let dep_set = DependencySet::parse(&dotd_bytes)?;

        let engine = HeaderDiscoveryEngine::new(
            self.core.known_artifacts(),
            self.core.built_in_include_directories.clone(),
        );
        let post_discovered = engine.resolve(
            dep_set.paths(),
            self.core.feature_set.include_validation,
            &self.core.owner,
            std::path::Path::new(self.source_file().exec_path().as_str()),
        )?;

        let mut persisted: BTreeSet<Artifact> = self.core.mandatory_inputs.clone();
        persisted.extend(self.core.inputs_for_invalidation.iter().cloned());
        persisted.extend(post_discovered.iter().cloned());
        let mut next_state = self.update_inputs(persisted);
        next_state.overwritten_variables = state.overwritten_variables;
        next_state.command_line_key = state.command_line_key.take();

        if self.core.feature_set.include_validation {
            let boundaries = crate::strict_deps::FsPackageBoundaries::new(ctx.exec_root());
            let validator = self.core.strict_deps_validator(&boundaries, ctx.artifact_expander());
            validator.validate_inclusions(
                &post_discovered,
                &self.core.owner,
                std::path::Path::new(self.source_file().exec_path().as_str()),
            )?;
        }

        Ok((next_state, SpawnOutcome { result: spawn_result }))
    }

    /// §4.6, delegated to [`fingerprint::compute_key`].
    pub fn compute_key(&self, state: Option<&ExecutionState>) -> Result<String> {
        let empty = BTreeMap::new();
        let overrides = state.map(|s| &s.overwritten_variables).unwrap_or(&empty);
        let argv = self.command_line_builder.build(overrides)?;
        let command_line_env = self.command_line_builder.environment();

        let inputs = FingerprintInputs {
            action_class_id: self.core.action_class_id,
            action_environment: &self.core.action_environment,
            compile_command_line_environment: &command_line_env,
            execution_info: &self.core.execution_info,
            argv: &argv,
            declared_include_srcs: &self.core.cc_compilation_context.declared_include_srcs,
            mandatory_inputs: &self.core.mandatory_inputs,
            additional_prunable_headers: &self.core.additional_prunable_headers,
            declared_include_dirs: &self.core.cc_compilation_context.declared_include_dirs,
            built_in_include_directories: &self.core.built_in_include_directories,
            inputs_for_invalidation: &self.core.inputs_for_invalidation,
        };
        Ok(fingerprint::compute_key(&inputs))
    }

    /// Restores `discovered_modules` from a persisted input list on a cache
    /// hit (S5): filters to `.pcm` artifacts, discarding everything else.
    pub fn update_inputs(&self, persisted_inputs: BTreeSet<Artifact>) -> ExecutionState {
        let discovered_modules = persisted_inputs.iter().filter(|a| a.is_module()).cloned().collect();
        ExecutionState {
            additional_inputs: persisted_inputs,
            used_modules: BTreeSet::new(),
            top_level_modules: BTreeSet::new(),
            discovered_modules,
            overwritten_variables: BTreeMap::new(),
            command_line_key: None,
        }
    }

    /// §4.7.
    pub fn get_extra_action_info(&self, state: Option<&ExecutionState>) -> Result<ExtraActionInfo> {
        let empty = BTreeMap::new();
        let overrides = state.map(|s| &s.overwritten_variables).unwrap_or(&empty);
        let argv = self.command_line_builder.build(overrides)?;

        let inputs: Vec<Artifact> = match state {
            Some(s) => s.additional_inputs.iter().cloned().collect(),
            None => self
                .core
                .mandatory_inputs
                .iter()
                .chain(self.core.cc_compilation_context.declared_include_srcs.iter())
                .chain(self.core.additional_prunable_headers.iter())
                .cloned()
                .collect(),
        };

        let mut environment_variables = self.core.action_environment.clone();
        environment_variables.extend(self.command_line_builder.environment());

        Ok(ExtraActionInfo::new(
            self.command_line_builder.tool_path(),
            argv,
            &self.core.output_file,
            &self.source_file(),
            inputs,
            environment_variables,
        ))
    }
}

fn module_key(artifact: &Artifact) -> String {
    artifact.owner().map(|o| o.0.clone()).unwrap_or_default()
}

fn tail(bytes: &[u8]) -> String {
    const MAX: usize = 2000;
    let text = String::from_utf8_lossy(bytes);
    if text.len() > MAX {
        text[text.len() - MAX..].to_string()
    } else {
        text.into_owned()
    }
}
