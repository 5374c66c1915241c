//! The choice-set tree.
//!
//! A choice set is either a flat, ordered list of alternative names or an
//! ordered map of named nests, each holding a subtree.  Order is semantic:
//! the leaf enumeration order fixed here at load time is the order the
//! sampler builds its cumulative distribution in.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A (sub)tree of the choice set.
///
/// The JSON form is an array of strings for `Leaves` and an object for
/// `Nests`; `#[serde(untagged)]` maps both without markup, and `IndexMap`
/// preserves nest declaration order through a load→save round trip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceTree {
    Leaves(Vec<String>),
    Nests(IndexMap<String, ChoiceTree>),
}

impl ChoiceTree {
    /// All leaf names in declaration order.
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect(&mut out, false);
        out
    }

    /// All names — nests and leaves — in declaration order, each nest before
    /// its contents.  This is the resolution order for availability and
    /// scale bindings.
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect(&mut out, true);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a str>, include_nests: bool) {
        match self {
            ChoiceTree::Leaves(leaves) => out.extend(leaves.iter().map(String::as_str)),
            ChoiceTree::Nests(nests) => {
                for (name, subtree) in nests {
                    if include_nests {
                        out.push(name);
                    }
                    subtree.collect(out, include_nests);
                }
            }
        }
    }

    /// Tree depth: 1 for a flat list, 2 for nests of leaves, and so on.
    pub fn depth(&self) -> usize {
        match self {
            ChoiceTree::Leaves(_) => 1,
            ChoiceTree::Nests(nests) => {
                1 + nests.values().map(ChoiceTree::depth).max().unwrap_or(0)
            }
        }
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, ChoiceTree::Nests(_))
    }
}
