//! Checkpoint save/load and structural state restore

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::checkpoint::{checkpoint_file_name, Checkpoint};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::model::{Model, Optimizer};
use crate::nested::Nested;
use crate::state::StateDict;

use super::core::Trainer;

impl<M: Model, O: Optimizer> Trainer<M, O> {
    /// Persist model/optimizer state and the progress counters to
    /// `storage_dir/checkpoints/ckpt_<iteration>`
    ///
    /// If the trainer sits on an accelerator, both trees move to the host
    /// for serialization and back afterwards. An existing file for the
    /// same iteration is left untouched; checkpoints accumulate on disk
    /// and retention is the caller's concern.
    pub fn save_checkpoint(&mut self) -> Result<PathBuf> {
        let path = self
            .storage_dir
            .join("checkpoints")
            .join(checkpoint_file_name(self.iteration));
        if path.exists() {
            debug!(path = %path.display(), "checkpoint already exists, leaving it untouched");
            return Ok(path);
        }

        let device = self.device;
        if device.is_accelerator() {
            self.place(Device::Cpu);
        }
        let checkpoint = Checkpoint {
            model: self.model.map_ref(Model::state_dict),
            iteration: self.iteration,
            epoch: self.epoch,
            optimizer: self
                .optimizer
                .map_ref(|slot| slot.as_ref().map(Optimizer::state_dict)),
        };
        let written = checkpoint.write_to(&path);
        if device.is_accelerator() {
            self.place(device);
        }
        written?;

        info!(
            iteration = self.iteration,
            epoch = self.epoch,
            path = %path.display(),
            "saved checkpoint"
        );
        Ok(path)
    }

    /// Restore state from a checkpoint at an explicit path
    ///
    /// Sets `iteration` to the loaded value plus one so training resumes
    /// at the next step, not a repeat, and `epoch` to the loaded value.
    pub fn load_checkpoint(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let checkpoint = Checkpoint::read_from(path)?;
        self.restore_model_state(&checkpoint.model)?;
        self.restore_optimizer_state(&checkpoint.optimizer)?;
        self.iteration = checkpoint.iteration + 1;
        self.epoch = checkpoint.epoch;
        info!(
            path = %path.display(),
            iteration = checkpoint.iteration,
            epoch = checkpoint.epoch,
            "loaded checkpoint, resuming at the next iteration"
        );
        Ok(())
    }

    pub(crate) fn restore_model_state(&mut self, states: &Nested<StateDict>) -> Result<()> {
        self.model
            .try_zip_with(states, |_path, model, state| model.load_state_dict(state))
    }

    /// Structural optimizer restore: live slots need state, absent slots
    /// ignore whatever the checkpoint carries
    pub(crate) fn restore_optimizer_state(
        &mut self,
        states: &Nested<Option<StateDict>>,
    ) -> Result<()> {
        self.optimizer.try_zip_with(states, |path, slot, state| {
            match (slot.as_mut(), state.as_ref()) {
                (Some(optimizer), Some(state)) => optimizer.load_state_dict(state),
                (Some(_), None) => Err(Error::MissingOptimizerState(
                    if path.is_empty() { "<root>" } else { path }.to_string(),
                )),
                (None, _) => Ok(()),
            }
        })
    }
}
