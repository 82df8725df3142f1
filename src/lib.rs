//! Trigger-driven training-loop orchestration
//!
//! This crate provides the reusable control core of a training framework:
//! a stateful [`Trainer`] that coordinates epochs and iterations, fires
//! periodic side effects (summaries, checkpoints, validation) through
//! interval triggers, aggregates weighted losses, and persists/restores
//! checkpoints — while staying agnostic to the concrete model architecture
//! via the narrow [`Model`]/[`Optimizer`] contract.
//!
//! # Architecture
//!
//! - **`trigger`**: [`IntervalTrigger`] (periodic gate) and [`EndTrigger`]
//!   (termination threshold) keyed to iteration/epoch counters
//! - **`timer`**: [`ContextTimerDict`], scoped wall-clock instrumentation
//! - **`nested`**: [`Nested`], an explicit tree of model/optimizer handles
//!   with structural map/zip operations
//! - **`review`**: [`Review`], the per-batch report a model hands back
//!   (losses, scalars, histograms, images, audios)
//! - **`summary`**: [`Summary`], the aggregation buffer flushed to a
//!   pluggable [`EventWriter`]
//! - **`trainer`**: [`Trainer`], the single-threaded loop state machine
//!
//! The tensor/autograd runtime, dataset iteration, and concrete
//! architectures are external collaborators reached only through traits.
//!
//! # Example
//!
//! ```no_run
//! use orquestar::{Trainer, TrainerConfig, TriggerUnit};
//! # use orquestar::{Model, Optimizer, Review, Mode, Device, StateDict};
//! # struct MyModel;
//! # impl Model for MyModel {
//! #     type Batch = (f32, f32);
//! #     type Output = f32;
//! #     fn forward(&mut self, _: &(f32, f32)) -> f32 { 0.0 }
//! #     fn review(&mut self, _: &(f32, f32), _: f32) -> Review { Review::new() }
//! #     fn set_mode(&mut self, _: Mode) {}
//! #     fn state_dict(&self) -> StateDict { StateDict::new() }
//! #     fn load_state_dict(&mut self, _: &StateDict) -> orquestar::Result<()> { Ok(()) }
//! #     fn num_parameters(&self) -> usize { 0 }
//! # }
//! # struct MyOpt;
//! # impl Optimizer for MyOpt {
//! #     fn zero_grad(&mut self) {}
//! #     fn step(&mut self) {}
//! #     fn clip_grad(&mut self) -> f64 { 0.0 }
//! #     fn state_dict(&self) -> StateDict { StateDict::new() }
//! #     fn load_state_dict(&mut self, _: &StateDict) -> orquestar::Result<()> { Ok(()) }
//! # }
//! # fn batches() -> Vec<(f32, f32)> { vec![] }
//! # fn main() -> orquestar::Result<()> {
//! let config = TrainerConfig::new("/tmp/run")
//!     .with_max_iterations(1000)
//!     .with_checkpoint_step((100, TriggerUnit::Iteration));
//!
//! let mut trainer = Trainer::new(MyModel, MyOpt, config)?;
//! trainer.run_sanity_check(batches, batches)?;
//! let report = trainer.train(batches, batches)?;
//! println!("trained {} iterations in {:.1}s", report.iterations, report.elapsed_secs);
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod model;
pub mod nested;
pub mod review;
pub mod state;
pub mod summary;
pub mod timer;
pub mod trainer;
pub mod trigger;

pub use checkpoint::{checkpoint_file_name, Checkpoint};
pub use config::TrainerConfig;
pub use device::{Device, ToDevice};
pub use error::{Error, Result};
pub use events::{Event, EventWriter, InMemoryEventWriter, JsonlEventWriter};
pub use model::{Mode, Model, Optimizer};
pub use nested::Nested;
pub use review::{Audio, Image, LossTerm, Review};
pub use state::{StateDict, TensorState};
pub use summary::{Summary, HISTOGRAM_CAP};
pub use timer::{ContextTimerDict, Stopwatch};
pub use trainer::{TrainReport, Trainer};
pub use trigger::{EndTrigger, IntervalTrigger, TriggerSpec, TriggerUnit};
