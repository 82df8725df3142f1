//! Serialized parameter state
//!
//! [`StateDict`] is the unit of model/optimizer state exchanged across the
//! checkpoint boundary: an ordered name → tensor-state map, iterated in
//! sorted name order so serialization is reproducible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Shape and flat host data of one tensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorState {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl TensorState {
    #[must_use]
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    /// Number of elements implied by the shape
    #[must_use]
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Ordered name → tensor-state map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDict {
    entries: BTreeMap<String, TensorState>,
}

impl StateDict {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, state: TensorState) {
        self.entries.insert(name.into(), state);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TensorState> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in sorted name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &TensorState)> {
        self.entries.iter()
    }
}

impl FromIterator<(String, TensorState)> for StateDict {
    fn from_iter<I: IntoIterator<Item = (String, TensorState)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
