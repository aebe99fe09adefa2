//! Extra-Action Reporter (§4.7).
//!
//! Produces a faithful, serializable description of a compile action for
//! external tooling. Wire format (e.g. protobuf) is explicitly out of scope
//! (§1); this is a plain `serde`-serializable struct, the same division of
//! labor this workspace already uses for `BuildInfo`/cache files — callers
//! pick their own serialization backend.

use crate::artifact::Artifact;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A faithful, post-hoc description of a single compile action.
///
/// Not on the critical path: a best-effort reconstruction is produced even
/// before execution (`overwritten_variables` absent), and a fully accurate
/// one afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraActionInfo {
    pub tool_path: String,
    pub compiler_options: Vec<String>,
    pub output_exec_path: String,
    pub source_exec_path: String,
    /// The full discovered inputs list if execution/discovery has happened,
    /// otherwise the action's declared set.
    pub inputs: Vec<String>,
    pub environment_variables: BTreeMap<String, String>,
}

impl ExtraActionInfo {
    pub fn new(
        tool_path: String,
        compiler_options: Vec<String>,
        output: &Artifact,
        source: &Artifact,
        inputs: impl IntoIterator<Item = Artifact>,
        environment_variables: BTreeMap<String, String>,
    ) -> Self {
        Self {
            tool_path,
            compiler_options,
            output_exec_path: output.exec_path().to_string(),
            source_exec_path: source.exec_path().to_string(),
            inputs: inputs.into_iter().map(|a| a.exec_path().to_string()).collect(),
            environment_variables,
        }
    }
}
