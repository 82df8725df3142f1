//! Summary flush: aggregate the buffer and emit it to the event sink

use tracing::warn;

use crate::error::Result;
use crate::model::{Model, Optimizer};

use super::core::Trainer;

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

impl<M: Model, O: Optimizer> Trainer<M, O> {
    /// Flush the summary buffer to the event sink under `prefix`
    ///
    /// Losses and scalars are emitted as arithmetic means of their per-step
    /// lists, histograms as full arrays, images/audios as their latest
    /// snapshot, all tagged `{prefix}/{key}` at the current iteration.
    /// Timer series flush as means, except `time_per_data_loading` and
    /// `time_per_train_step` which become sum/sum ratios against
    /// `time_per_step` (`time_rel_*`); a length mismatch between numerator
    /// and denominator indicates an exception skipped a timing region, so
    /// the ratio is skipped with a warning. Afterwards the summary buffer
    /// and timer are fully reset.
    pub fn flush_summary(&mut self, prefix: &str) -> Result<()> {
        let iteration = self.iteration;

        for (key, values) in self.summary.losses() {
            self.writer
                .add_scalar(&format!("{prefix}/{key}"), mean(values), iteration)?;
        }
        for (key, values) in self.summary.scalars() {
            self.writer
                .add_scalar(&format!("{prefix}/{key}"), mean(values), iteration)?;
        }

        let timings = self.timer.snapshot();
        for (key, samples) in timings {
            let ratio_tag = match key.as_str() {
                "time_per_data_loading" => Some("time_rel_data_loading"),
                "time_per_train_step" => Some("time_rel_train_step"),
                _ => None,
            };
            if let Some(tag) = ratio_tag {
                if let Some(per_step) = timings.get("time_per_step") {
                    if per_step.len() != samples.len() {
                        warn!(
                            key = %key,
                            numerator_len = samples.len(),
                            denominator_len = per_step.len(),
                            "timing series length mismatch, skipping relative time"
                        );
                        continue;
                    }
                    let denominator: f64 = per_step.iter().sum();
                    if denominator > 0.0 {
                        let ratio = samples.iter().sum::<f64>() / denominator;
                        self.writer
                            .add_scalar(&format!("{prefix}/{tag}"), ratio, iteration)?;
                        continue;
                    }
                }
                // No usable denominator: fall back to the plain mean.
            }
            self.writer
                .add_scalar(&format!("{prefix}/{key}"), mean(samples), iteration)?;
        }

        for (key, values) in self.summary.histograms() {
            self.writer
                .add_histogram(&format!("{prefix}/{key}"), values, iteration)?;
        }
        for (key, audio) in self.summary.audios() {
            self.writer
                .add_audio(&format!("{prefix}/{key}"), audio, iteration)?;
        }
        for (key, image) in self.summary.images() {
            self.writer
                .add_image(&format!("{prefix}/{key}"), image, iteration)?;
        }

        self.summary.reset();
        self.timer.reset();
        Ok(())
    }
}
