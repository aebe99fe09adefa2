//! Normalized relative paths used throughout the compile-action model.

use path_slash::PathExt as _;
use std::{
    fmt,
    path::{Component, Path, PathBuf},
};

/// A normalized, slash-separated relative path.
///
/// `PathFragment` never contains `.` or `..` components and never starts with
/// a root separator; constructing one from a path that does normalizes it
/// away where possible (`.` components are dropped) and rejects `..` that
/// would escape the fragment (callers that need to reason about escaping an
/// execution root use [`PathFragment::climbs_out`] before normalizing).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathFragment(String);

impl PathFragment {
    /// Builds a fragment from a path, normalizing `.` components away.
    ///
    /// `..` components are preserved verbatim; use [`PathFragment::climbs_out`]
    /// to check whether the result would leave a base directory.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut parts: Vec<&str> = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(s) => parts.push(s.to_str().unwrap_or_default()),
                Component::ParentDir => parts.push(".."),
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }
        Self(parts.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_path(&self) -> PathBuf {
        PathBuf::from_slash(&self.0)
    }

    /// Segments of this fragment, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// `true` if `self` is `other`, or a descendant of `other`.
    ///
    /// Comparison is segment-wise (`"foo/barbaz"` is not under `"foo/bar"`) and
    /// runs in O(k) over the k segments of `other`.
    pub fn starts_with(&self, other: &PathFragment) -> bool {
        if other.is_empty() {
            return true;
        }
        let mut mine = self.segments();
        for seg in other.segments() {
            match mine.next() {
                Some(s) if s == seg => continue,
                _ => return false,
            }
        }
        true
    }

    /// `true` if `self` starts with any of `others`.
    pub fn starts_with_any<'a>(&self, others: impl IntoIterator<Item = &'a PathFragment>) -> bool {
        others.into_iter().any(|o| self.starts_with(o))
    }

    /// The parent fragment, or an empty fragment if this one has a single segment.
    pub fn parent(&self) -> PathFragment {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => PathFragment(parent.to_string()),
            None => PathFragment(String::new()),
        }
    }

    /// `true` if normalizing `self` would require leaving its starting directory,
    /// i.e. it contains a `..` component not balanced by a preceding segment,
    /// modulo `allowed_leading_parents` leading `..` segments (used to permit
    /// exactly one `../` denoting a sibling repository, per §4.1 step 3).
    pub fn climbs_out(&self, allowed_leading_parents: usize) -> bool {
        let mut depth: i64 = 0;
        let mut leading_parents = 0usize;
        let mut seen_normal = false;
        for seg in self.segments() {
            if seg == ".." {
                if !seen_normal {
                    leading_parents += 1;
                }
                depth -= 1;
                if depth < 0 && leading_parents > allowed_leading_parents {
                    return true;
                }
            } else {
                seen_normal = true;
                depth += 1;
            }
        }
        false
    }

    pub fn join(&self, segment: &str) -> PathFragment {
        if self.is_empty() {
            PathFragment(segment.to_string())
        } else {
            PathFragment(format!("{}/{}", self.0, segment))
        }
    }
}

impl fmt::Display for PathFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PathFragment {
    fn from(s: &str) -> Self {
        PathFragment::new(s)
    }
}

impl From<PathBuf> for PathFragment {
    fn from(p: PathBuf) -> Self {
        PathFragment::new(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dot_components() {
        assert_eq!(PathFragment::new("a/./b").as_str(), "a/b");
    }

    #[test]
    fn starts_with_is_segment_wise() {
        let dir = PathFragment::new("foo/bar");
        assert!(!PathFragment::new("foo/barbaz").starts_with(&dir));
        assert!(PathFragment::new("foo/bar/baz.h").starts_with(&dir));
        assert!(PathFragment::new("foo/bar").starts_with(&dir));
    }

    #[test]
    fn empty_dir_matches_everything() {
        let root = PathFragment::new("");
        assert!(PathFragment::new("anything/at/all").starts_with(&root));
    }

    #[test]
    fn climbs_out_allows_single_leading_parent() {
        assert!(!PathFragment::new("../sibling/x.h").climbs_out(1));
        assert!(PathFragment::new("../../x.h").climbs_out(1));
        assert!(PathFragment::new("../sibling/x.h").climbs_out(0));
    }

    #[test]
    fn parent_of_single_segment_is_empty() {
        assert!(PathFragment::new("top.h").parent().is_empty());
        assert_eq!(PathFragment::new("a/b/c.h").parent().as_str(), "a/b");
    }
}
