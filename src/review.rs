//! The per-batch report a model hands back to the trainer
//!
//! [`Review`] is an explicit tagged structure validated at the trainer
//! boundary: named loss terms (required), plus scalar metrics, histogram
//! samples, and image/audio artifacts for logging.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array1, Array3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One named loss: its scalar value plus an optional backward hook
///
/// The hook receives the resolved loss weight; gradients accumulate across
/// hook invocations between `zero_grad` and `step`, so weighted term-wise
/// backward equals backward of the weighted sum.
pub struct LossTerm {
    value: f64,
    backward: Option<Box<dyn FnOnce(f64) + Send>>,
}

impl LossTerm {
    /// A loss with no backward hook, for validation-mode reviews
    #[must_use]
    pub fn detached(value: f64) -> Self {
        Self {
            value,
            backward: None,
        }
    }

    /// A loss whose hook backpropagates `weight * value` when invoked
    #[must_use]
    pub fn with_backward(value: f64, hook: impl FnOnce(f64) + Send + 'static) -> Self {
        Self {
            value,
            backward: Some(Box::new(hook)),
        }
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Invoke the backward hook with the resolved weight, at most once
    pub(crate) fn run_backward(&mut self, weight: f64) {
        if let Some(hook) = self.backward.take() {
            hook(weight);
        }
    }
}

impl fmt::Debug for LossTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LossTerm")
            .field("value", &self.value)
            .field("backward", &self.backward.is_some())
            .finish()
    }
}

/// Channel-height-width image tensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image(pub Array3<f32>);

/// Audio samples with their sample rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audio {
    pub samples: Array1<f32>,
    pub sample_rate: u32,
}

impl Audio {
    pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

    #[must_use]
    pub fn new(samples: Array1<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }
}

impl From<Array1<f32>> for Audio {
    /// Bare sample tensors default to 16 kHz
    fn from(samples: Array1<f32>) -> Self {
        Self::new(samples, Self::DEFAULT_SAMPLE_RATE)
    }
}

/// Structured per-batch output consumed by the trainer
///
/// # Example
///
/// ```
/// use orquestar::{LossTerm, Review};
///
/// let review = Review::new()
///     .with_loss("mse", LossTerm::detached(0.25))
///     .with_scalar("accuracy", 0.9);
/// assert!(review.validate().is_ok());
/// assert_eq!(review.losses["mse"].value(), 0.25);
/// ```
#[derive(Debug, Default)]
pub struct Review {
    /// Named loss terms; must be non-empty
    pub losses: BTreeMap<String, LossTerm>,
    /// Scalar metrics, already reduced to plain numbers
    pub scalars: BTreeMap<String, f64>,
    /// Histogram samples, concatenated across steps
    pub histograms: BTreeMap<String, Vec<f64>>,
    /// Image snapshots, last-write-wins
    pub images: BTreeMap<String, Image>,
    /// Audio snapshots, last-write-wins
    pub audios: BTreeMap<String, Audio>,
}

impl Review {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_loss(mut self, name: impl Into<String>, term: LossTerm) -> Self {
        self.losses.insert(name.into(), term);
        self
    }

    #[must_use]
    pub fn with_scalar(mut self, name: impl Into<String>, value: f64) -> Self {
        self.scalars.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_histogram(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.histograms.insert(name.into(), values);
        self
    }

    #[must_use]
    pub fn with_image(mut self, name: impl Into<String>, image: Image) -> Self {
        self.images.insert(name.into(), image);
        self
    }

    #[must_use]
    pub fn with_audio(mut self, name: impl Into<String>, audio: impl Into<Audio>) -> Self {
        self.audios.insert(name.into(), audio.into());
        self
    }

    /// Boundary validation: a review must carry at least one loss
    pub fn validate(&self) -> Result<()> {
        if self.losses.is_empty() {
            return Err(Error::Config(
                "review has no losses; a model must report at least one loss term".into(),
            ));
        }
        Ok(())
    }
}
