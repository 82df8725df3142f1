//! The training-loop state machine
//!
//! [`Trainer`] owns the model/optimizer trees, the progress counters, the
//! summary buffer and timer, and the triggers that schedule summaries,
//! checkpoints, and validation. The loop is single-threaded and
//! cooperative: suspension happens only while pulling batches from the
//! external source or during blocking checkpoint/log I/O.

mod checkpoint;
mod core;
mod result;
mod sanity;
mod step;
mod summary;
mod train_loop;


pub use core::Trainer;
pub use result::TrainReport;
