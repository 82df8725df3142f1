//! The main training loop

use std::fs;
use std::time::Instant;

use tracing::{info, warn};

use crate::device::ToDevice;
use crate::error::{Error, Result};
use crate::model::{Mode, Model, Optimizer};
use crate::timer::Stopwatch;

use super::core::Trainer;
use super::result::TrainReport;

impl<M: Model, O: Optimizer> Trainer<M, O> {
    /// Run the training loop until the termination condition fires
    ///
    /// Each source is re-invoked at every epoch boundary to obtain a fresh
    /// batch iterator. On any exit — normal termination or a propagating
    /// failure — a final summary flush and checkpoint save are attempted
    /// before the outcome is returned.
    ///
    /// Per-iteration check order (training resumption depends on it):
    /// validation trigger, end trigger, summary trigger, checkpoint
    /// trigger, then the timed batch pull and train step.
    pub fn train<B, V, BI, VI>(
        &mut self,
        train_source: B,
        validation_source: V,
    ) -> Result<TrainReport>
    where
        B: Fn() -> BI,
        BI: IntoIterator<Item = M::Batch>,
        V: Fn() -> VI,
        VI: IntoIterator<Item = M::Batch>,
    {
        self.ensure_leaf()?;
        fs::create_dir_all(self.storage_dir.join("checkpoints"))?;
        info!(
            seed = self.seed,
            iteration = self.iteration,
            epoch = self.epoch,
            device = %self.device,
            "starting training"
        );

        self.model.for_each_mut(|m| m.set_mode(Mode::Train));

        // When resuming, the current counters must not re-trigger.
        self.summary_trigger.set_last(self.iteration, self.epoch);
        self.checkpoint_trigger.set_last(self.iteration, self.epoch);
        self.validation_trigger.set_last(self.iteration, self.epoch);

        let start = Instant::now();
        self.train_phase_start = Some(Instant::now());

        let outcome = self.run_loop(&train_source, &validation_source);

        // Guaranteed cleanup: flush and checkpoint on every exit path.
        let flushed = self.flush_summary("training");
        let saved = self.save_checkpoint().map(|_| ());
        if let Err(error) = outcome {
            if let Err(cleanup) = flushed.and(saved) {
                warn!(%cleanup, "cleanup after failed training run also failed");
            }
            return Err(error);
        }
        flushed?;
        saved?;

        let report = TrainReport {
            iterations: self.iteration,
            epochs: self.epoch,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        info!(
            iterations = report.iterations,
            epochs = report.epochs,
            elapsed_secs = report.elapsed_secs,
            "finished training"
        );
        Ok(report)
    }

    fn run_loop<B, V, BI, VI>(&mut self, train_source: &B, validation_source: &V) -> Result<()>
    where
        B: Fn() -> BI,
        BI: IntoIterator<Item = M::Batch>,
        V: Fn() -> VI,
        VI: IntoIterator<Item = M::Batch>,
    {
        loop {
            let mut batches = train_source().into_iter();
            let mut steps_this_epoch = 0usize;
            loop {
                // Validation must run before the end trigger so the final
                // validation at the boundary still happens.
                if self.validation_trigger.evaluate(self.iteration, self.epoch) {
                    self.flush_summary("training")?;
                    self.validate(validation_source)?;
                    self.model.for_each_mut(|m| m.set_mode(Mode::Train));
                }
                if self.max_iterations.evaluate(self.iteration, self.epoch) {
                    return Ok(());
                }
                if self.summary_trigger.evaluate(self.iteration, self.epoch)
                    || self.iteration == 1
                {
                    self.flush_summary("training")?;
                }
                if self.checkpoint_trigger.evaluate(self.iteration, self.epoch)
                    || self.iteration == 1
                {
                    self.save_checkpoint()?;
                }

                let step_watch = Stopwatch::start();
                let pull_watch = Stopwatch::start();
                let Some(batch) = batches.next() else {
                    // The in-flight step/pull samples are discarded so the
                    // timing series stay aligned.
                    if steps_this_epoch > 0 {
                        break;
                    }
                    return Err(Error::Config(
                        "empty training source: the train iterable yielded no batches".into(),
                    ));
                };
                self.timer
                    .record("time_per_data_loading", pull_watch.elapsed_secs());

                let batch = batch.to_device(self.device);

                let train_watch = Stopwatch::start();
                self.train_step(&batch)?;
                self.timer
                    .record("time_per_train_step", train_watch.elapsed_secs());
                self.timer.record("time_per_step", step_watch.elapsed_secs());

                self.iteration += 1;
                steps_this_epoch += 1;
            }
            self.epoch += 1;
        }
    }

    /// Full validation pass: eval mode, iterate the entire validation
    /// source, then flush with the `validation` prefix
    ///
    /// A failing batch discards the in-flight `validation_time` sample and
    /// propagates.
    pub(crate) fn validate<V, VI>(&mut self, validation_source: &V) -> Result<()>
    where
        V: Fn() -> VI,
        VI: IntoIterator<Item = M::Batch>,
    {
        info!(
            iteration = self.iteration,
            epoch = self.epoch,
            "starting validation"
        );
        if let Some(train_start) = self.train_phase_start.take() {
            self.timer
                .record("non_validation_time", train_start.elapsed().as_secs_f64());
        }

        let watch = Stopwatch::start();
        self.model.for_each_mut(|m| m.set_mode(Mode::Eval));
        for batch in validation_source() {
            let batch = batch.to_device(self.device);
            self.validation_step(&batch)?;
        }
        self.timer.record("validation_time", watch.elapsed_secs());
        self.train_phase_start = Some(Instant::now());

        self.flush_summary("validation")?;
        info!("finished validation");
        Ok(())
    }
}
