//! Trainer configuration
//!
//! Plain struct with builder methods; the termination condition must be
//! exactly one of `max_iterations`/`max_epochs` and is validated at
//! trainer construction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::error::{Error, Result};
use crate::trigger::{EndTrigger, TriggerSpec, TriggerUnit};

/// Configuration for [`Trainer`](crate::Trainer) construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Root directory for checkpoints and event logs
    pub storage_dir: PathBuf,
    /// Weight per loss name; required when a review carries multiple losses
    #[serde(default)]
    pub loss_weights: Option<BTreeMap<String, f64>>,
    /// How often to flush the training summary
    #[serde(default)]
    pub summary_step: TriggerSpec,
    /// How often to persist a checkpoint
    #[serde(default)]
    pub checkpoint_step: TriggerSpec,
    /// How often to run a full validation pass
    #[serde(default)]
    pub validation_step: TriggerSpec,
    #[serde(default)]
    pub device: Device,
    /// Terminate after this many iterations (exclusive with `max_epochs`)
    #[serde(default)]
    pub max_iterations: Option<usize>,
    /// Terminate after this many epochs (exclusive with `max_iterations`)
    #[serde(default)]
    pub max_epochs: Option<usize>,
    /// Checkpoint to restore at construction, for resuming a run
    #[serde(default)]
    pub init_checkpoint: Option<PathBuf>,
    /// Recorded and logged; consuming it is the external runtime's concern
    #[serde(default)]
    pub seed: u64,
}

impl TrainerConfig {
    #[must_use]
    pub fn new(storage_dir: impl AsRef<Path>) -> Self {
        Self {
            storage_dir: storage_dir.as_ref().to_path_buf(),
            loss_weights: None,
            summary_step: TriggerSpec::default(),
            checkpoint_step: TriggerSpec::default(),
            validation_step: TriggerSpec::default(),
            device: Device::default(),
            max_iterations: None,
            max_epochs: None,
            init_checkpoint: None,
            seed: 0,
        }
    }

    #[must_use]
    pub fn with_loss_weights(mut self, weights: BTreeMap<String, f64>) -> Self {
        self.loss_weights = Some(weights);
        self
    }

    #[must_use]
    pub fn with_summary_step(mut self, spec: impl Into<TriggerSpec>) -> Self {
        self.summary_step = spec.into();
        self
    }

    #[must_use]
    pub fn with_checkpoint_step(mut self, spec: impl Into<TriggerSpec>) -> Self {
        self.checkpoint_step = spec.into();
        self
    }

    #[must_use]
    pub fn with_validation_step(mut self, spec: impl Into<TriggerSpec>) -> Self {
        self.validation_step = spec.into();
        self
    }

    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    #[must_use]
    pub fn with_max_epochs(mut self, epochs: usize) -> Self {
        self.max_epochs = Some(epochs);
        self
    }

    #[must_use]
    pub fn with_init_checkpoint(mut self, path: impl AsRef<Path>) -> Self {
        self.init_checkpoint = Some(path.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Resolve the termination condition into an [`EndTrigger`]
    ///
    /// Exactly one of `max_iterations`/`max_epochs` must be set.
    pub fn end_trigger(&self) -> Result<EndTrigger> {
        match (self.max_iterations, self.max_epochs) {
            (Some(iterations), None) => EndTrigger::new((iterations, TriggerUnit::Iteration)),
            (None, Some(epochs)) => EndTrigger::new((epochs, TriggerUnit::Epoch)),
            (Some(_), Some(_)) => Err(Error::Config(
                "set exactly one of max_iterations and max_epochs, not both".into(),
            )),
            (None, None) => Err(Error::Config(
                "a termination condition is required: set max_iterations or max_epochs".into(),
            )),
        }
    }
}
