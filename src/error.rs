//! Crate-wide error taxonomy (§7).
//!
//! Every fallible public operation returns [`Result<T>`]. Variants carry
//! structured fields rather than pre-formatted strings; `Display` does the
//! formatting, the same division of labor as this workspace's artifact
//! diagnostics.

use crate::artifact::Artifact;
use std::{fmt, path::PathBuf};

pub type Result<T, E = ActionError> = std::result::Result<T, E>;

/// The label + configuration identity of the action that failed, echoed into
/// every error so a consumer can attribute a failure without unwinding call
/// stacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// A header was used by the compiler but not declared (§4.3, §7).
    #[error("undeclared inclusion(s) in rule '{owner}': {}", format_paths(.offending))]
    UndeclaredInclusion {
        owner: Owner,
        source_file: PathBuf,
        offending: Vec<PathBuf>,
        declared_include_srcs: Vec<PathBuf>,
        declared_include_dirs: Vec<String>,
    },

    /// A system or user include path is absolute or escapes the execution root (§4.1 step 3).
    #[error("include path '{path}' references a path outside of the execution root")]
    InvalidIncludePath { path: String },

    /// The external include scanner raised an execution error.
    #[error("include scanning failed for '{owner}': {source}")]
    IncludeScanFailure {
        owner: Owner,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The compiler process exited non-zero, or the executor reported an error.
    #[error("compile action for '{owner}' failed to execute{}", exit_suffix(*.exit_code))]
    SpawnExecutionFailure { owner: Owner, exit_code: Option<i32>, catastrophic: bool, stderr_tail: String },

    /// IO error reading or parsing the `.d` dependency file.
    #[error("error while parsing .d file: {0}")]
    DotdParseError(String),

    /// IO error creating an empty `.gcno` coverage-note file.
    #[error("failed to create coverage note file '{path}': {source}")]
    CoverageNoteCreationFailure { path: PathBuf, #[source] source: std::io::Error },

    /// Generic IO failure not otherwise classified above.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}

fn exit_suffix(code: Option<i32>) -> String {
    match code {
        Some(c) => format!(" (exit code {c})"),
        None => String::new(),
    }
}

impl ActionError {
    pub fn undeclared_inclusion(
        owner: Owner,
        source_file: PathBuf,
        offending: Vec<Artifact>,
        declared_include_srcs: &[Artifact],
        declared_include_dirs: &[crate::path::PathFragment],
    ) -> Self {
        ActionError::UndeclaredInclusion {
            owner,
            source_file,
            offending: offending.iter().map(|a| a.root_relative_path()).collect(),
            declared_include_srcs: declared_include_srcs.iter().map(|a| a.root_relative_path()).collect(),
            declared_include_dirs: declared_include_dirs.iter().map(|d| d.as_str().to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undeclared_inclusion_message_lists_offending_paths() {
        let err = ActionError::UndeclaredInclusion {
            owner: Owner("//pkg:a".into()),
            source_file: PathBuf::from("a.cc"),
            offending: vec![PathBuf::from("secret.h")],
            declared_include_srcs: vec![],
            declared_include_dirs: vec![],
        };
        assert_eq!(err.to_string(), "undeclared inclusion(s) in rule '//pkg:a': secret.h");
    }
}
