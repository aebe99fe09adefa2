//! Make-style `.d` dependency-file parser (§4.4).
//!
//! Grounded in the tokenization shape real `.d` consumers use (trailing
//! backslash continues onto the next whitespace-delimited token, rejoined
//! with a literal space): the target up to the first unescaped `:` is
//! discarded, and the remaining tokens become the dependency list with
//! first-occurrence de-duplication.

use crate::error::{ActionError, Result};
use std::path::PathBuf;

/// A parsed `.d` file: an ordered, de-duplicated list of paths.
///
/// Paths are interpreted relative to the execution root by the caller; this
/// type stores them exactly as tokenized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencySet {
    paths: Vec<PathBuf>,
}

impl DependencySet {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Parses the bytes of a single Make-style dependency declaration.
    ///
    /// `target: a b c \` (line continuation) `  d` tokenizes to `["a", "b",
    /// "c", "d"]`. A backslash immediately before a space escapes that space
    /// into the token rather than ending it. Duplicates are removed, first
    /// occurrence wins.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ActionError::DotdParseError(format!("invalid utf-8: {e}")))?;

        // Join backslash-newline continuations into one logical line before tokenizing,
        // the compiler-emitted equivalent of a shell line continuation.
        let joined = text.replace("\\\r\n", " ").replace("\\\n", " ");

        let tokens = tokenize(&joined);
        let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();

        // Scan forward for the first token carrying an unescaped `:`; everything
        // up to and including it is the (possibly multi-token) output path and
        // is discarded, except for any dependency text trailing the colon on
        // that same token.
        let mut paths = Vec::new();
        let mut rest = tokens.as_slice();
        while let Some((tok, remainder)) = rest.split_first() {
            rest = remainder;
            if let Some(after_colon) = strip_target_prefix(tok) {
                if !after_colon.is_empty() {
                    push_token(&mut paths, after_colon);
                }
                break;
            }
        }

        for tok in rest {
            push_token(&mut paths, tok);
        }

        dedup_first_occurrence(&mut paths);
        Ok(DependencySet { paths })
    }
}

/// Splits `text` on whitespace, same as `str::split_whitespace`, except a
/// backslash immediately before a space escapes that space into the
/// surrounding token rather than treating it as a delimiter.
///
/// Operating a byte/char at a time (instead of splitting on whitespace
/// first) is required here: once whitespace has split `"foo\\ bar.h"` into
/// `["foo\\", "bar.h"]`, the information needed to rejoin them is gone — the
/// delimiting space was already consumed. A backslash before any other
/// character (e.g. `\:`) is left in the token verbatim for `strip_target_prefix`
/// / `push_token` to unescape afterwards.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&' ') {
            current.push(' ');
            chars.next();
            continue;
        }
        if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(c);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// If `tok` contains an unescaped `:`, returns everything after it (the start
/// of the dependency list, possibly empty). Otherwise `None` (the colon must
/// be a later, separate token).
fn strip_target_prefix(tok: &str) -> Option<&str> {
    let bytes = tok.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b':' && (i == 0 || bytes[i - 1] != b'\\') {
            return Some(&tok[i + 1..]);
        }
    }
    None
}

fn push_token(paths: &mut Vec<PathBuf>, tok: &str) {
    if tok.is_empty() {
        return;
    }
    // `tokenize` already turned any `\ ` into a literal space; the only
    // escape left to resolve here is `\:`, used to keep a colon out of
    // `strip_target_prefix`'s target-separator search.
    let unescaped = tok.replace("\\:", ":");
    paths.push(PathBuf::from(unescaped));
}

fn dedup_first_occurrence(paths: &mut Vec<PathBuf>) {
    let mut seen = std::collections::HashSet::new();
    paths.retain(|p| seen.insert(p.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_target() {
        let set = DependencySet::parse(b"out.o: a.h b.h").unwrap();
        assert_eq!(set.paths(), &[PathBuf::from("a.h"), PathBuf::from("b.h")]);
    }

    #[test]
    fn line_continuation() {
        let set = DependencySet::parse(b"out.o: a.h \\\n  b.h \\\n  c.h").unwrap();
        assert_eq!(set.paths(), &[PathBuf::from("a.h"), PathBuf::from("b.h"), PathBuf::from("c.h")]);
    }

    #[test]
    fn duplicates_removed_first_occurrence_wins() {
        let set = DependencySet::parse(b"out.o: a.h b.h a.h").unwrap();
        assert_eq!(set.paths(), &[PathBuf::from("a.h"), PathBuf::from("b.h")]);
    }

    #[test]
    fn empty_dependency_list() {
        let set = DependencySet::parse(b"out.o:").unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn no_colon_on_first_token_is_tolerated() {
        // Some emitters put the colon as its own whitespace-separated token.
        let set = DependencySet::parse(b"out.o : a.h").unwrap();
        assert_eq!(set.paths(), &[PathBuf::from("a.h")]);
    }

    #[test]
    fn escaped_space_stays_within_one_path() {
        let set = DependencySet::parse(b"out.o: foo\\ bar.h b.h").unwrap();
        assert_eq!(set.paths(), &[PathBuf::from("foo bar.h"), PathBuf::from("b.h")]);
    }

    #[test]
    fn escaped_colon_is_not_mistaken_for_the_target_separator() {
        let set = DependencySet::parse(b"weird\\:name.o: a.h").unwrap();
        assert_eq!(set.paths(), &[PathBuf::from("a.h")]);
    }
}
