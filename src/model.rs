//! Model and optimizer capabilities consumed by the trainer
//!
//! The trainer drives arbitrary architectures through this narrow
//! contract: a forward pass producing an opaque output, a `review` turning
//! batch and output into a [`Review`], mode toggles, and structural state
//! serialization. Optimizers own their parameter handles (shared with the
//! model by the caller) and expose gradient bookkeeping plus clipping.

use crate::device::{Device, ToDevice};
use crate::error::Result;
use crate::review::Review;
use crate::state::StateDict;

/// Train/eval mode toggle (dropout, batch-norm statistics, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

/// The model capability
///
/// In `Eval` mode implementations should produce detached loss terms; the
/// trainer never backpropagates validation reviews.
pub trait Model {
    /// One training batch; moved structurally to the active device
    type Batch: ToDevice;
    /// Arbitrary structured forward output
    type Output;

    fn forward(&mut self, batch: &Self::Batch) -> Self::Output;

    /// Turn a batch and its forward output into a structured report
    fn review(&mut self, batch: &Self::Batch, output: Self::Output) -> Review;

    fn set_mode(&mut self, mode: Mode);

    /// Structural snapshot of the parameters, for checkpointing
    fn state_dict(&self) -> StateDict;

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()>;

    /// Move the parameters to a device; host-only models may ignore this
    fn to_device(&mut self, device: Device) {
        let _ = device;
    }

    fn num_parameters(&self) -> usize;
}

/// The optimizer capability
pub trait Optimizer {
    /// Clear accumulated gradients before a new step
    fn zero_grad(&mut self);

    /// Apply the accumulated gradients to the parameters
    fn step(&mut self);

    /// Clip gradients, returning the pre-clip norm
    fn clip_grad(&mut self) -> f64;

    fn state_dict(&self) -> StateDict;

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()>;

    /// Move optimizer state to a device; host-only optimizers may ignore this
    fn to_device(&mut self, device: Device) {
        let _ = device;
    }
}
