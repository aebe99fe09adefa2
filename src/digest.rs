//! Nested-set flattening with memoization, and the stable-digest helper used
//! by the fingerprint protocol (§4.6, §9).
//!
//! Two distinct needs are served here:
//!
//! - **Flattening to an ordered list** (`NestedSet::to_list`), for collaborators
//!   that need a concrete argv-ordered sequence (e.g. a command-line builder).
//!   Order matters and is one of `stable | link | compile | naive_link`.
//! - **Stable digesting** (`stable_digest`), for the fingerprint protocol. A
//!   digest must depend only on a set's *content*, never on how it was built
//!   or traversed, so digesting always goes through a `BTreeSet` regardless of
//!   the nested set's declared order.

use md5::Digest as _;
use once_cell::sync::OnceCell;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Iteration order for [`NestedSet::to_list`].
///
/// Named after the orders a nested-set DAG may be asked to flatten in: this
/// crate does not need all four to differ in practice (compile actions only
/// ever flatten in `Stable` order today) but the type exists so collaborators
/// that do care about linker-style orders have somewhere to hang that logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Preorder depth-first traversal, first occurrence of a duplicate wins.
    Stable,
    /// Postorder depth-first traversal (children before the node that added them).
    Link,
    /// Like `Link`, but without cross-branch de-duplication collapsing.
    NaiveLink,
    /// Same as `Stable`; kept as a distinct name for API parity with the source model.
    Compile,
}

#[derive(Debug)]
enum Contents<T> {
    Leaf(Vec<T>),
    Node(Vec<NestedSet<T>>),
}

/// A potentially-shared DAG of values, flattened lazily and memoized once.
///
/// The memo is a single [`OnceCell`], which is the "one mutual-exclusion
/// region" required by §5: the first caller to flatten a given node pays the
/// traversal cost, every subsequent caller (possibly on another thread) reads
/// the cached, now-immutable result.
#[derive(Debug)]
pub struct NestedSet<T> {
    order: Order,
    contents: Contents<T>,
    memo: OnceCell<Arc<Vec<T>>>,
}

impl<T: Clone + PartialEq> NestedSet<T> {
    pub fn leaf(order: Order, items: Vec<T>) -> Self {
        Self { order, contents: Contents::Leaf(items), memo: OnceCell::new() }
    }

    pub fn empty(order: Order) -> Self {
        Self::leaf(order, Vec::new())
    }

    pub fn union(order: Order, children: Vec<NestedSet<T>>) -> Self {
        Self { order, contents: Contents::Node(children), memo: OnceCell::new() }
    }

    pub fn order(&self) -> Order {
        self.order
    }

    /// Flattens the DAG into a single ordered, de-duplicated list.
    ///
    /// Computed once per instance; subsequent calls return the memoized
    /// `Arc` clone without re-traversing.
    pub fn to_list(&self) -> Arc<Vec<T>> {
        self.memo.get_or_init(|| Arc::new(self.flatten())).clone()
    }

    fn flatten(&self) -> Vec<T> {
        let mut out = Vec::new();
        match self.order {
            Order::Stable | Order::Compile => self.flatten_preorder(&mut out),
            Order::Link | Order::NaiveLink => self.flatten_postorder(&mut out),
        }
        if matches!(self.order, Order::Stable | Order::Compile | Order::Link) {
            dedup_first_occurrence(&mut out);
        }
        out
    }

    fn flatten_preorder(&self, out: &mut Vec<T>) {
        match &self.contents {
            Contents::Leaf(items) => out.extend(items.iter().cloned()),
            Contents::Node(children) => {
                for child in children {
                    child.flatten_preorder(out);
                }
            }
        }
    }

    fn flatten_postorder(&self, out: &mut Vec<T>) {
        match &self.contents {
            Contents::Leaf(items) => out.extend(items.iter().cloned()),
            Contents::Node(children) => {
                for child in children {
                    child.flatten_postorder(out);
                }
            }
        }
    }
}

fn dedup_first_occurrence<T: PartialEq + Clone>(items: &mut Vec<T>) {
    let mut seen: Vec<T> = Vec::with_capacity(items.len());
    items.retain(|item| {
        if seen.iter().any(|s| s == item) {
            false
        } else {
            seen.push(item.clone());
            true
        }
    });
}

/// Feeds `items` into `hasher` through a `BTreeSet`, so the resulting digest
/// depends only on set content, never on construction or traversal order.
pub fn stable_digest<T: Ord + AsRef<[u8]>>(hasher: &mut md5::Md5, items: impl IntoIterator<Item = T>) {
    let sorted: BTreeSet<T> = items.into_iter().collect();
    for item in &sorted {
        hasher.update(item.as_ref());
    }
}

/// Hex-encodes a finalized digest, matching this workspace's existing
/// `hex::encode` convention for content-addressed ids.
pub fn finalize_hex(hasher: md5::Md5) -> String {
    hex::encode(hasher.finalize())
}
