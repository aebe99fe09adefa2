//! Argv inspection helpers used by `discover_inputs` (§4.1 steps 2-3).

use crate::error::{ActionError, Result};
use crate::path::PathFragment;
use std::path::PathBuf;

/// A system-include directory extracted from argv, together with whether its
/// raw spelling was absolute.
///
/// Absoluteness has to be recorded here, before the raw string is normalized
/// into a [`PathFragment`]: `PathFragment::new` strips any leading root
/// separator (it never starts with one, by its own documented invariant), so
/// by the time a `PathFragment` exists the information `verify_action_include_paths`
/// needs is already gone.
#[derive(Debug, Clone)]
pub struct IncludeDir {
    pub fragment: PathFragment,
    pub is_absolute: bool,
}

/// System include directories (`-isystem X`, `-I X`) and `-include` cmdline
/// includes extracted from a built argv.
#[derive(Debug, Default, Clone)]
pub struct ArgvIncludes {
    pub system_include_dirs: Vec<IncludeDir>,
    pub cmdline_includes: Vec<PathBuf>,
}

/// Pulls include-relevant flags out of `argv`. Unrecognized flags are ignored;
/// this is not a full command-line parser, only enough to recover the flags
/// the discovery engine needs (§4.1 step 2).
pub fn extract_includes(argv: &[String]) -> ArgvIncludes {
    let mut result = ArgvIncludes::default();
    let mut iter = argv.iter().peekable();
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix("-isystem") {
            let value = take_flag_value(value, &mut iter);
            if let Some(v) = value {
                result.system_include_dirs.push(IncludeDir { fragment: PathFragment::new(v), is_absolute: is_absolute_raw(v) });
            }
        } else if let Some(value) = arg.strip_prefix("-I") {
            let value = take_flag_value(value, &mut iter);
            if let Some(v) = value {
                result.system_include_dirs.push(IncludeDir { fragment: PathFragment::new(v), is_absolute: is_absolute_raw(v) });
            }
        } else if let Some(value) = arg.strip_prefix("-include") {
            let value = take_flag_value(value, &mut iter);
            if let Some(v) = value {
                result.cmdline_includes.push(PathBuf::from(v));
            }
        }
    }
    result
}

/// `true` if `raw` (the as-written flag value, before `PathFragment`
/// normalization drops any leading separator) is a Unix-absolute or
/// Windows-drive-absolute path.
fn is_absolute_raw(raw: &str) -> bool {
    raw.starts_with('/') || (raw.len() > 1 && raw.as_bytes()[1] == b':')
}

fn take_flag_value<'a>(
    attached: &'a str,
    iter: &mut std::iter::Peekable<std::slice::Iter<'a, String>>,
) -> Option<&'a str> {
    if !attached.is_empty() {
        Some(attached)
    } else {
        iter.next().map(|s| s.as_str())
    }
}

/// Verifies every include path in `argv` is relative and does not escape the
/// execution root, except for exactly one leading `../` (a sibling
/// repository) (§4.1 step 3). Raises [`ActionError::InvalidIncludePath`] on
/// the first offender.
pub fn verify_action_include_paths(argv: &[String]) -> Result<()> {
    let includes = extract_includes(argv);
    for dir in &includes.system_include_dirs {
        let raw = dir.fragment.as_str();
        if dir.is_absolute {
            return Err(ActionError::InvalidIncludePath { path: raw.to_string() });
        }
        if dir.fragment.climbs_out(1) {
            return Err(ActionError::InvalidIncludePath { path: raw.to_string() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_absolute_isystem_path_s3() {
        let argv = vec!["-isystem".to_string(), "/usr/local/include".to_string()];
        let err = verify_action_include_paths(&argv).unwrap_err();
        assert_eq!(
            err.to_string(),
            "include path '/usr/local/include' references a path outside of the execution root"
        );
    }

    #[test]
    fn rejects_attached_absolute_isystem_path() {
        let argv = vec!["-isystem/usr/local/include".to_string()];
        let err = verify_action_include_paths(&argv).unwrap_err();
        assert_eq!(
            err.to_string(),
            "include path '/usr/local/include' references a path outside of the execution root"
        );
    }

    #[test]
    fn allows_one_leading_sibling_repo_parent() {
        let argv = vec!["-I../sibling/include".to_string()];
        assert!(verify_action_include_paths(&argv).is_ok());
    }

    #[test]
    fn rejects_escaping_beyond_one_leading_parent() {
        let argv = vec!["-I../../outside".to_string()];
        assert!(verify_action_include_paths(&argv).is_err());
    }

    #[test]
    fn extracts_attached_and_separate_flag_values() {
        let argv = vec![
            "-isystem/usr/include".to_string(),
            "-include".to_string(),
            "config.h".to_string(),
        ];
        let includes = extract_includes(&argv);
        assert_eq!(includes.system_include_dirs.len(), 1);
        assert_eq!(includes.cmdline_includes, vec![PathBuf::from("config.h")]);
    }
}
