//! Checkpoint persistence
//!
//! A checkpoint is one JSON file per save event, named by iteration
//! (`ckpt_<iteration>`), holding model and optimizer state trees plus the
//! progress counters. Files are never overwritten; retention is the
//! caller's concern.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::nested::Nested;
use crate::state::StateDict;

/// File name for the checkpoint saved at `iteration`
#[must_use]
pub fn checkpoint_file_name(iteration: usize) -> String {
    format!("ckpt_{iteration}")
}

/// Persisted snapshot of model/optimizer state plus progress counters
///
/// Optimizer slots without an optimizer serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub model: Nested<StateDict>,
    pub iteration: usize,
    pub epoch: usize,
    pub optimizer: Nested<Option<StateDict>>,
}

impl Checkpoint {
    /// Serialize to `path`, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a checkpoint from an explicit path
    ///
    /// A missing file is a fatal resource error. Directory-based
    /// latest/best resolution is an external convenience, not part of
    /// this contract.
    pub fn read_from(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::CheckpointNotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TensorState;
    use std::collections::BTreeMap;

    fn sample_checkpoint() -> Checkpoint {
        let mut state = StateDict::new();
        state.insert("weight", TensorState::new(vec![2], vec![1.0, -1.0]));

        let mut model = BTreeMap::new();
        model.insert("encoder".to_string(), Nested::Leaf(state.clone()));
        model.insert("decoder".to_string(), Nested::Leaf(state));

        let mut optimizer = BTreeMap::new();
        optimizer.insert("encoder".to_string(), Nested::Leaf(Some(StateDict::new())));
        optimizer.insert("decoder".to_string(), Nested::Leaf(None));

        Checkpoint {
            model: Nested::Map(model),
            iteration: 7,
            epoch: 2,
            optimizer: Nested::Map(optimizer),
        }
    }

    #[test]
    fn file_name_is_keyed_by_iteration() {
        assert_eq!(checkpoint_file_name(0), "ckpt_0");
        assert_eq!(checkpoint_file_name(1250), "ckpt_1250");
    }

    #[test]
    fn nested_round_trip_preserves_tree_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoints").join(checkpoint_file_name(7));

        let checkpoint = sample_checkpoint();
        checkpoint.write_to(&path).unwrap();
        let back = Checkpoint::read_from(&path).unwrap();
        assert_eq!(back, checkpoint);
        assert_eq!(back.model.len(), 2);
    }

    #[test]
    fn absent_optimizer_entries_serialize_as_null() {
        let json = serde_json::to_string(&sample_checkpoint()).unwrap();
        assert!(json.contains("null"));
    }

    #[test]
    fn missing_file_is_a_resource_error() {
        let result = Checkpoint::read_from(Path::new("/nonexistent/ckpt_0"));
        assert!(matches!(result, Err(Error::CheckpointNotFound(_))));
    }
}
