//! Pre-training sanity check
//!
//! Exercises the model contract on one batch from each source before the
//! real run: eval-mode determinism, parameter-preserving validation, and
//! one real train step with review validation and weight resolution. The
//! trainer is restored to its prior state afterwards.

use tracing::info;

use crate::device::ToDevice;
use crate::error::{Error, Result};
use crate::model::{Mode, Model, Optimizer};
use crate::review::Review;

use super::core::Trainer;

fn reviews_match(a: &Review, b: &Review) -> bool {
    a.losses.len() == b.losses.len()
        && a.losses
            .iter()
            .zip(&b.losses)
            .all(|((key_a, term_a), (key_b, term_b))| {
                key_a == key_b && term_a.value() == term_b.value()
            })
        && a.scalars == b.scalars
}

impl<M: Model, O: Optimizer> Trainer<M, O> {
    /// Check the trainer/model contract on single batches without
    /// touching persistent state
    ///
    /// Fails with a configuration error on: an empty source, a review
    /// without losses, unresolvable loss weights, non-deterministic eval
    /// output, a validation pass that mutates parameters, or a non-finite
    /// total loss.
    pub fn run_sanity_check<B, V, BI, VI>(
        &mut self,
        train_source: B,
        validation_source: V,
    ) -> Result<()>
    where
        M::Batch: Clone,
        B: Fn() -> BI,
        BI: IntoIterator<Item = M::Batch>,
        V: Fn() -> VI,
        VI: IntoIterator<Item = M::Batch>,
    {
        self.ensure_leaf()?;

        let model_snapshot = self.model.map_ref(Model::state_dict);
        let optimizer_snapshot = self
            .optimizer
            .map_ref(|slot| slot.as_ref().map(Optimizer::state_dict));

        let train_batch = train_source()
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::Config("empty training source: the train iterable yielded no batches".into())
            })?
            .to_device(self.device);
        let validation_batch = validation_source()
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::Config(
                    "empty validation source: the validation iterable yielded no batches".into(),
                )
            })?
            .to_device(self.device);

        // Eval mode must be deterministic and must not touch parameters.
        self.model.for_each_mut(|m| m.set_mode(Mode::Eval));
        let first = self.eval_review(&validation_batch)?;
        let second = self.eval_review(&validation_batch)?;
        if !reviews_match(&first, &second) {
            return Err(Error::Config(
                "model output is not deterministic in eval mode".into(),
            ));
        }
        if self.model.map_ref(Model::state_dict) != model_snapshot {
            return Err(Error::Config(
                "validation changed model parameters; review must be observational".into(),
            ));
        }

        // One real train step: review validation, weight resolution,
        // finite aggregate loss.
        self.model.for_each_mut(|m| m.set_mode(Mode::Train));
        let total = self.train_step(&train_batch)?;
        if !total.is_finite() {
            return Err(Error::Config(format!(
                "total loss is not finite after one train step: {total}"
            )));
        }

        // Leave the trainer as it was found.
        self.restore_model_state(&model_snapshot)?;
        self.restore_optimizer_state(&optimizer_snapshot)?;
        self.summary.reset();
        self.timer.reset();

        info!(total_loss = total, "sanity check passed");
        Ok(())
    }

    fn eval_review(&mut self, batch: &M::Batch) -> Result<Review> {
        let model = self.model.as_leaf_mut().ok_or_else(|| {
            Error::Config("the sanity check supports a single model only".into())
        })?;
        let output = model.forward(batch);
        let review = model.review(batch, output);
        review.validate()?;
        Ok(review)
    }
}
