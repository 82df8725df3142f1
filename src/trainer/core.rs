//! Core Trainer struct, construction, and placement

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::TrainerConfig;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::events::{EventWriter, JsonlEventWriter};
use crate::model::{Model, Optimizer};
use crate::nested::Nested;
use crate::summary::Summary;
use crate::timer::ContextTimerDict;
use crate::trigger::{EndTrigger, IntervalTrigger};

/// Stateful training-loop controller
///
/// Owns the model/optimizer trees, progress counters, summary buffer,
/// timer, triggers, and the event sink. Model and optimizer may be single
/// instances or [`Nested`] trees; placement, mode switching, and
/// checkpointing operate structurally, while the built-in train step
/// supports the single-instance case only.
pub struct Trainer<M: Model, O: Optimizer> {
    pub(crate) model: Nested<M>,
    /// Optimizer per model slot; `None` marks a frozen submodel
    pub(crate) optimizer: Nested<Option<O>>,
    pub(crate) storage_dir: PathBuf,
    pub(crate) loss_weights: Option<BTreeMap<String, f64>>,
    pub(crate) device: Device,
    pub(crate) seed: u64,
    /// Processed batches, global and non-resetting
    pub(crate) iteration: usize,
    /// Completed passes over the training source
    pub(crate) epoch: usize,
    pub(crate) summary: Summary,
    pub(crate) timer: ContextTimerDict,
    pub(crate) summary_trigger: IntervalTrigger,
    pub(crate) checkpoint_trigger: IntervalTrigger,
    pub(crate) validation_trigger: IntervalTrigger,
    pub(crate) max_iterations: EndTrigger,
    pub(crate) writer: Box<dyn EventWriter>,
    /// Start of the current non-validation phase
    pub(crate) train_phase_start: Option<Instant>,
}

impl<M: Model, O: Optimizer> Trainer<M, O> {
    /// Build a trainer around a single model/optimizer pair
    pub fn new(model: M, optimizer: O, config: TrainerConfig) -> Result<Self> {
        Self::from_parts(Nested::Leaf(model), Nested::Leaf(Some(optimizer)), config)
    }

    /// Build a trainer around model/optimizer trees
    ///
    /// Validates the termination condition, builds the triggers, moves
    /// both trees to the configured device, and applies `init_checkpoint`
    /// when set.
    pub fn from_parts(
        mut model: Nested<M>,
        mut optimizer: Nested<Option<O>>,
        config: TrainerConfig,
    ) -> Result<Self> {
        let max_iterations = config.end_trigger()?;
        let summary_trigger = IntervalTrigger::new(config.summary_step)?;
        let checkpoint_trigger = IntervalTrigger::new(config.checkpoint_step)?;
        let validation_trigger = IntervalTrigger::new(config.validation_step)?;

        let device = config.device;
        model.for_each_mut(|m| m.to_device(device));
        optimizer.for_each_mut(|slot| {
            if let Some(opt) = slot {
                opt.to_device(device);
            }
        });

        let writer: Box<dyn EventWriter> = Box::new(JsonlEventWriter::new(&config.storage_dir));

        let mut trainer = Self {
            model,
            optimizer,
            storage_dir: config.storage_dir,
            loss_weights: config.loss_weights,
            device,
            seed: config.seed,
            iteration: 0,
            epoch: 0,
            summary: Summary::new(),
            timer: ContextTimerDict::new(),
            summary_trigger,
            checkpoint_trigger,
            validation_trigger,
            max_iterations,
            writer,
            train_phase_start: None,
        };
        if let Some(path) = config.init_checkpoint {
            trainer.load_checkpoint(&path)?;
        }
        Ok(trainer)
    }

    /// Replace the default JSONL event writer
    pub fn set_event_writer(&mut self, writer: Box<dyn EventWriter>) {
        self.writer = writer;
    }

    #[must_use]
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    #[must_use]
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    #[must_use]
    pub fn device(&self) -> Device {
        self.device
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    #[must_use]
    pub fn model(&self) -> &Nested<M> {
        &self.model
    }

    #[must_use]
    pub fn model_mut(&mut self) -> &mut Nested<M> {
        &mut self.model
    }

    #[must_use]
    pub fn optimizer(&self) -> &Nested<Option<O>> {
        &self.optimizer
    }

    /// Total parameter count across the model tree
    #[must_use]
    pub fn num_parameters(&self) -> usize {
        let mut total = 0;
        self.model.for_each(|m| total += m.num_parameters());
        total
    }

    /// The built-in step protocol handles the single model/optimizer case
    /// only; model trees need a caller-driven step.
    pub(crate) fn ensure_leaf(&self) -> Result<()> {
        if self.model.as_leaf().is_none() || self.optimizer.as_leaf().is_none() {
            return Err(Error::Config(
                "the built-in train step supports a single model and optimizer; \
                 drive model/optimizer trees with a custom step"
                    .into(),
            ));
        }
        if matches!(self.optimizer.as_leaf(), Some(None)) {
            return Err(Error::Config(
                "the built-in train step requires an optimizer".into(),
            ));
        }
        Ok(())
    }

    /// Move both trees to `device`, preserving their shape
    pub(crate) fn place(&mut self, device: Device) {
        self.model.for_each_mut(|m| m.to_device(device));
        self.optimizer.for_each_mut(|slot| {
            if let Some(opt) = slot {
                opt.to_device(device);
            }
        });
    }
}
