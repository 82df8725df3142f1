//! Train and validation step operations

use crate::error::{Error, Result};
use crate::model::{Model, Optimizer};
use crate::review::Review;

use super::core::Trainer;

fn step_needs_leaf() -> Error {
    Error::Config(
        "the built-in train step supports a single model and optimizer; \
         drive model/optimizer trees with a custom step"
            .into(),
    )
}

impl<M: Model, O: Optimizer> Trainer<M, O> {
    /// One training step: zero grads → forward → review → weighted
    /// backward → clip → optimizer step → merge into the summary
    ///
    /// Returns the aggregated (weighted) total loss.
    pub fn train_step(&mut self, batch: &M::Batch) -> Result<f64> {
        match self.optimizer.as_leaf_mut() {
            Some(Some(optimizer)) => optimizer.zero_grad(),
            _ => return Err(step_needs_leaf()),
        }

        let mut review = {
            let model = self.model.as_leaf_mut().ok_or_else(step_needs_leaf)?;
            let output = model.forward(batch);
            model.review(batch, output)
        };
        review.validate()?;

        let total = self.backward(&mut review)?;
        self.clip_grad();

        match self.optimizer.as_leaf_mut() {
            Some(Some(optimizer)) => optimizer.step(),
            _ => return Err(step_needs_leaf()),
        }

        self.summary.update(&review);
        Ok(total)
    }

    /// One validation step: forward + review + merge, purely observational
    pub fn validation_step(&mut self, batch: &M::Batch) -> Result<()> {
        let review = {
            let model = self.model.as_leaf_mut().ok_or_else(step_needs_leaf)?;
            let output = model.forward(batch);
            model.review(batch, output)
        };
        review.validate()?;
        self.summary.update(&review);
        Ok(())
    }

    /// Aggregate the weighted loss and fire each term's backward hook
    ///
    /// The weight defaults to 1 when `loss_weights` is unset and the
    /// review carries exactly one loss; multiple losses without
    /// `loss_weights`, or a loss name missing from the mapping, is a
    /// fatal configuration error.
    pub(crate) fn backward(&mut self, review: &mut Review) -> Result<f64> {
        if self.loss_weights.is_none() && review.losses.len() != 1 {
            let names: Vec<&str> = review.losses.keys().map(String::as_str).collect();
            return Err(Error::Config(format!(
                "cannot aggregate multiple losses without loss_weights; losses: {names:?}"
            )));
        }
        let mut total = 0.0;
        for (name, term) in review.losses.iter_mut() {
            let weight = match &self.loss_weights {
                Some(weights) => *weights.get(name).ok_or_else(|| {
                    Error::Config(format!("no loss weight configured for `{name}`"))
                })?,
                None => 1.0,
            };
            total += weight * term.value();
            term.run_backward(weight);
        }
        Ok(total)
    }

    /// Clip gradients across the optimizer tree, recording the norms
    ///
    /// Absent optimizer slots contribute a norm of 0.0. A leaf records
    /// under `grad_norm`; tree slots flatten to `grad_norm_<path>`. Each
    /// norm lands in both the scalar and histogram sections.
    pub fn clip_grad(&mut self) {
        let norms = self
            .optimizer
            .map_mut(|slot| slot.as_mut().map_or(0.0, Optimizer::clip_grad));
        for (path, norm) in norms.flatten() {
            let key = if path.is_empty() {
                "grad_norm".to_string()
            } else {
                format!("grad_norm_{path}")
            };
            self.summary.record_scalar(&key, *norm);
            self.summary.record_histogram(&key, &[*norm]);
        }
    }
}
