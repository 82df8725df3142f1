//! Summary aggregation buffer
//!
//! Accumulates reviews between flushes: losses and scalars as growing
//! per-key lists, histograms as a rolling window capped to the most recent
//! [`HISTOGRAM_CAP`] values, images and audios as last-write-wins
//! snapshots. The trainer flushes and resets it on every summary trigger.

use std::collections::BTreeMap;

use crate::review::{Audio, Image, Review};

/// Upper bound on stored histogram samples per key; oldest values are
/// trimmed first.
pub const HISTOGRAM_CAP: usize = 10_000;

/// Mutable aggregation buffer between summary flushes
#[derive(Debug, Default)]
pub struct Summary {
    losses: BTreeMap<String, Vec<f64>>,
    scalars: BTreeMap<String, Vec<f64>>,
    histograms: BTreeMap<String, Vec<f64>>,
    images: BTreeMap<String, Image>,
    audios: BTreeMap<String, Audio>,
}

impl Summary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one review into the buffer
    pub fn update(&mut self, review: &Review) {
        for (key, term) in &review.losses {
            self.losses.entry(key.clone()).or_default().push(term.value());
        }
        for (key, value) in &review.scalars {
            self.scalars.entry(key.clone()).or_default().push(*value);
        }
        for (key, values) in &review.histograms {
            self.record_histogram(key, values);
        }
        for (key, image) in &review.images {
            self.images.insert(key.clone(), image.clone());
        }
        for (key, audio) in &review.audios {
            self.audios.insert(key.clone(), audio.clone());
        }
    }

    /// Append a trainer-side scalar sample (e.g. gradient norms)
    pub fn record_scalar(&mut self, key: &str, value: f64) {
        self.scalars.entry(key.to_string()).or_default().push(value);
    }

    /// Concatenate into the rolling histogram window for `key`
    pub fn record_histogram(&mut self, key: &str, values: &[f64]) {
        let entry = self.histograms.entry(key.to_string()).or_default();
        entry.extend_from_slice(values);
        if entry.len() > HISTOGRAM_CAP {
            let excess = entry.len() - HISTOGRAM_CAP;
            entry.drain(..excess);
        }
    }

    #[must_use]
    pub fn losses(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.losses
    }

    #[must_use]
    pub fn scalars(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.scalars
    }

    #[must_use]
    pub fn histograms(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.histograms
    }

    #[must_use]
    pub fn images(&self) -> &BTreeMap<String, Image> {
        &self.images
    }

    #[must_use]
    pub fn audios(&self) -> &BTreeMap<String, Audio> {
        &self.audios
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
            && self.scalars.is_empty()
            && self.histograms.is_empty()
            && self.images.is_empty()
            && self.audios.is_empty()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
