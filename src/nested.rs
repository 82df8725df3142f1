//! Structural tree of model/optimizer handles
//!
//! Models and optimizers may be single instances or nested structures of
//! instances. [`Nested`] makes that an explicit tagged tree (leaf, mapping,
//! sequence) with structure-preserving map/zip operations, instead of
//! runtime type inspection. All traversals visit children in a fixed,
//! deterministic order (sorted map keys, sequence order) so serialized
//! checkpoints stay reproducible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A leaf value, a name→subtree mapping, or a sequence of subtrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Nested<T> {
    Leaf(T),
    Map(BTreeMap<String, Nested<T>>),
    Seq(Vec<Nested<T>>),
}

fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

impl<T> Nested<T> {
    /// Apply `f` to every leaf, preserving the tree shape
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Nested<U> {
        self.map_inner(&mut f)
    }

    fn map_inner<U, F: FnMut(T) -> U>(self, f: &mut F) -> Nested<U> {
        match self {
            Nested::Leaf(value) => Nested::Leaf(f(value)),
            Nested::Map(children) => Nested::Map(
                children
                    .into_iter()
                    .map(|(key, child)| (key, child.map_inner(f)))
                    .collect(),
            ),
            Nested::Seq(children) => {
                Nested::Seq(children.into_iter().map(|child| child.map_inner(f)).collect())
            }
        }
    }

    /// Shape-preserving map over borrowed leaves
    pub fn map_ref<U>(&self, mut f: impl FnMut(&T) -> U) -> Nested<U> {
        self.map_ref_inner(&mut f)
    }

    fn map_ref_inner<U, F: FnMut(&T) -> U>(&self, f: &mut F) -> Nested<U> {
        match self {
            Nested::Leaf(value) => Nested::Leaf(f(value)),
            Nested::Map(children) => Nested::Map(
                children
                    .iter()
                    .map(|(key, child)| (key.clone(), child.map_ref_inner(f)))
                    .collect(),
            ),
            Nested::Seq(children) => {
                Nested::Seq(children.iter().map(|child| child.map_ref_inner(f)).collect())
            }
        }
    }

    /// Shape-preserving map over mutably borrowed leaves
    pub fn map_mut<U>(&mut self, mut f: impl FnMut(&mut T) -> U) -> Nested<U> {
        self.map_mut_inner(&mut f)
    }

    fn map_mut_inner<U, F: FnMut(&mut T) -> U>(&mut self, f: &mut F) -> Nested<U> {
        match self {
            Nested::Leaf(value) => Nested::Leaf(f(value)),
            Nested::Map(children) => Nested::Map(
                children
                    .iter_mut()
                    .map(|(key, child)| (key.clone(), child.map_mut_inner(f)))
                    .collect(),
            ),
            Nested::Seq(children) => Nested::Seq(
                children
                    .iter_mut()
                    .map(|child| child.map_mut_inner(f))
                    .collect(),
            ),
        }
    }

    /// Visit every leaf in deterministic order
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        self.map_ref(|leaf| f(leaf));
    }

    /// Visit every leaf mutably in deterministic order
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        self.map_mut(|leaf| f(leaf));
    }

    /// Zip this tree with another of the same shape, applying `f` to each
    /// leaf pair with its `.`-joined path. A shape mismatch (kind, map
    /// keys, or sequence length) is a structure error.
    pub fn try_zip_with<U>(
        &mut self,
        other: &Nested<U>,
        mut f: impl FnMut(&str, &mut T, &U) -> Result<()>,
    ) -> Result<()> {
        Self::zip_walk(self, other, String::new(), &mut f)
    }

    fn zip_walk<U, F>(
        node: &mut Nested<T>,
        other: &Nested<U>,
        path: String,
        f: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&str, &mut T, &U) -> Result<()>,
    {
        match (node, other) {
            (Nested::Leaf(a), Nested::Leaf(b)) => f(&path, a, b),
            (Nested::Map(a), Nested::Map(b)) => {
                if !a.keys().eq(b.keys()) {
                    return Err(Error::Structure(format!(
                        "map keys differ at `{path}`"
                    )));
                }
                for (key, child) in a.iter_mut() {
                    if let Some(other_child) = b.get(key) {
                        Self::zip_walk(child, other_child, join_path(&path, key), f)?;
                    }
                }
                Ok(())
            }
            (Nested::Seq(a), Nested::Seq(b)) => {
                if a.len() != b.len() {
                    return Err(Error::Structure(format!(
                        "sequence lengths differ at `{path}`: {} vs {}",
                        a.len(),
                        b.len()
                    )));
                }
                for (i, (child, other_child)) in a.iter_mut().zip(b).enumerate() {
                    Self::zip_walk(child, other_child, join_path(&path, &i.to_string()), f)?;
                }
                Ok(())
            }
            _ => Err(Error::Structure(format!(
                "node kinds differ at `{path}`"
            ))),
        }
    }

    /// Depth-first path-keyed view of the leaves
    ///
    /// Map keys are visited in sorted order, sequence indices as decimal
    /// segments; the root leaf has the empty path.
    #[must_use]
    pub fn flatten(&self) -> Vec<(String, &T)> {
        let mut out = Vec::new();
        self.flatten_into(String::new(), &mut out);
        out
    }

    fn flatten_into<'a>(&'a self, path: String, out: &mut Vec<(String, &'a T)>) {
        match self {
            Nested::Leaf(value) => out.push((path, value)),
            Nested::Map(children) => {
                for (key, child) in children {
                    child.flatten_into(join_path(&path, key), out);
                }
            }
            Nested::Seq(children) => {
                for (i, child) in children.iter().enumerate() {
                    child.flatten_into(join_path(&path, &i.to_string()), out);
                }
            }
        }
    }

    /// Leaf value when the tree is a single leaf
    #[must_use]
    pub fn as_leaf(&self) -> Option<&T> {
        match self {
            Nested::Leaf(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_leaf_mut(&mut self) -> Option<&mut T> {
        match self {
            Nested::Leaf(value) => Some(value),
            _ => None,
        }
    }

    /// Number of leaves
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Nested::Leaf(_) => 1,
            Nested::Map(children) => children.values().map(Nested::len).sum(),
            Nested::Seq(children) => children.iter().map(Nested::len).sum(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
