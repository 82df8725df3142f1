//! Interval and end triggers for periodic loop actions
//!
//! An [`IntervalTrigger`] answers "should this action fire now?" for
//! monotonically increasing (iteration, epoch) counters; an [`EndTrigger`]
//! answers "has training reached its configured end?". Both select the
//! counter named by their [`TriggerUnit`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The counter a trigger is keyed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerUnit {
    /// Full passes over the training source
    Epoch,
    /// Processed batches (global, non-resetting)
    Iteration,
}

impl fmt::Display for TriggerUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerUnit::Epoch => write!(f, "epoch"),
            TriggerUnit::Iteration => write!(f, "iteration"),
        }
    }
}

impl FromStr for TriggerUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "epoch" => Ok(TriggerUnit::Epoch),
            "iteration" => Ok(TriggerUnit::Iteration),
            other => Err(Error::Config(format!(
                "invalid trigger unit `{other}`, expected `epoch` or `iteration`"
            ))),
        }
    }
}

/// Period/unit pair describing a trigger schedule
///
/// Construction helper shape: built from a `(period, unit)` pair or copied
/// from an existing [`IntervalTrigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub period: usize,
    pub unit: TriggerUnit,
}

impl TriggerSpec {
    #[must_use]
    pub fn new(period: usize, unit: TriggerUnit) -> Self {
        Self { period, unit }
    }
}

impl Default for TriggerSpec {
    fn default() -> Self {
        Self::new(1, TriggerUnit::Epoch)
    }
}

impl From<(usize, TriggerUnit)> for TriggerSpec {
    fn from((period, unit): (usize, TriggerUnit)) -> Self {
        Self::new(period, unit)
    }
}

impl From<&IntervalTrigger> for TriggerSpec {
    fn from(trigger: &IntervalTrigger) -> Self {
        Self::new(trigger.period, trigger.unit)
    }
}

/// Periodic boolean gate keyed to iteration/epoch counters
///
/// Fires when the selected counter is a multiple of `period` and differs
/// from the previously observed value for that unit, so repeated
/// evaluations within the same iteration/epoch do not re-fire.
///
/// # Example
///
/// ```
/// use orquestar::{IntervalTrigger, TriggerUnit};
///
/// let mut trigger = IntervalTrigger::new((2, TriggerUnit::Iteration)).unwrap();
/// assert!(!trigger.evaluate(1, 0));
/// assert!(trigger.evaluate(2, 0));
/// assert!(!trigger.evaluate(2, 0)); // unchanged counter: no re-fire
/// assert!(!trigger.evaluate(3, 1));
/// assert!(trigger.evaluate(4, 1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalTrigger {
    period: usize,
    unit: TriggerUnit,
    /// Monotonic watermark: the last counter value seen for `unit`
    last: usize,
}

impl IntervalTrigger {
    /// Build a trigger from a spec, rejecting a zero period
    pub fn new(spec: impl Into<TriggerSpec>) -> Result<Self> {
        let spec = spec.into();
        if spec.period == 0 {
            return Err(Error::Config(format!(
                "trigger period must be positive, got 0 for unit `{}`",
                spec.unit
            )));
        }
        Ok(Self {
            period: spec.period,
            unit: spec.unit,
            last: 0,
        })
    }

    #[must_use]
    pub fn period(&self) -> usize {
        self.period
    }

    #[must_use]
    pub fn unit(&self) -> TriggerUnit {
        self.unit
    }

    fn index(&self, iteration: usize, epoch: usize) -> usize {
        match self.unit {
            TriggerUnit::Epoch => epoch,
            TriggerUnit::Iteration => iteration,
        }
    }

    /// Should the action fire at these counters?
    ///
    /// A call with an unchanged index for the relevant unit returns `false`
    /// without side effects; otherwise the watermark advances and the
    /// trigger fires iff the index is a multiple of the period.
    pub fn evaluate(&mut self, iteration: usize, epoch: usize) -> bool {
        let index = self.index(iteration, epoch);
        if self.last == index {
            return false;
        }
        self.last = index;
        index % self.period == 0
    }

    /// Seed the watermark when resuming a run
    ///
    /// The seeded counter value itself will not re-trigger.
    pub fn set_last(&mut self, iteration: usize, epoch: usize) {
        self.last = self.index(iteration, epoch);
    }
}

/// Termination threshold: fires once the relevant counter reaches `period`
/// and keeps firing thereafter
///
/// Retains the period/unit shape of [`IntervalTrigger`] for symmetry but
/// needs no watermark.
///
/// # Example
///
/// ```
/// use orquestar::{EndTrigger, TriggerUnit};
///
/// let trigger = EndTrigger::new((5, TriggerUnit::Iteration)).unwrap();
/// assert!(!trigger.evaluate(4, 9));
/// assert!(trigger.evaluate(5, 0));
/// assert!(trigger.evaluate(6, 0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndTrigger {
    period: usize,
    unit: TriggerUnit,
}

impl EndTrigger {
    /// Build an end trigger from a spec, rejecting a zero period
    pub fn new(spec: impl Into<TriggerSpec>) -> Result<Self> {
        let spec = spec.into();
        if spec.period == 0 {
            return Err(Error::Config(format!(
                "termination threshold must be positive, got 0 for unit `{}`",
                spec.unit
            )));
        }
        Ok(Self {
            period: spec.period,
            unit: spec.unit,
        })
    }

    #[must_use]
    pub fn period(&self) -> usize {
        self.period
    }

    #[must_use]
    pub fn unit(&self) -> TriggerUnit {
        self.unit
    }

    /// Has the relevant counter reached or passed the threshold?
    #[must_use]
    pub fn evaluate(&self, iteration: usize, epoch: usize) -> bool {
        match self.unit {
            TriggerUnit::Epoch => epoch >= self.period,
            TriggerUnit::Iteration => iteration >= self.period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_from_str() {
        assert_eq!("epoch".parse::<TriggerUnit>().unwrap(), TriggerUnit::Epoch);
        assert_eq!(
            "iteration".parse::<TriggerUnit>().unwrap(),
            TriggerUnit::Iteration
        );
        assert!("batch".parse::<TriggerUnit>().is_err());
    }

    #[test]
    fn zero_period_rejected() {
        assert!(IntervalTrigger::new((0, TriggerUnit::Epoch)).is_err());
        assert!(EndTrigger::new((0, TriggerUnit::Iteration)).is_err());
    }

    #[test]
    fn spec_copies_existing_trigger() {
        let trigger = IntervalTrigger::new((3, TriggerUnit::Iteration)).unwrap();
        let copy = IntervalTrigger::new(&trigger).unwrap();
        assert_eq!(copy.period(), 3);
        assert_eq!(copy.unit(), TriggerUnit::Iteration);
    }

    #[test]
    fn epoch_trigger_fires_once_per_matching_epoch() {
        // Mirrors a 3-batch epoch: epoch = i / 3
        let mut trigger = IntervalTrigger::new((2, TriggerUnit::Epoch)).unwrap();
        let expected = [
            false, false, false, false, false, false, true, false, false, false,
        ];
        for (i, &want) in expected.iter().enumerate() {
            assert_eq!(trigger.evaluate(i, i / 3), want, "at i={i}");
        }
    }

    #[test]
    fn iteration_trigger_fires_on_multiples() {
        let mut trigger = IntervalTrigger::new((2, TriggerUnit::Iteration)).unwrap();
        let expected = [
            false, false, true, false, true, false, true, false, true, false,
        ];
        for (i, &want) in expected.iter().enumerate() {
            assert_eq!(trigger.evaluate(i, i / 3), want, "at i={i}");
        }
    }

    #[test]
    fn unchanged_counter_is_idempotent_no_op() {
        let mut trigger = IntervalTrigger::new((2, TriggerUnit::Iteration)).unwrap();
        assert!(trigger.evaluate(2, 0));
        assert!(!trigger.evaluate(2, 0));
        assert!(!trigger.evaluate(2, 0));
    }

    #[test]
    fn set_last_suppresses_refire_on_resume() {
        // A trigger live since iteration 0 and a freshly seeded one must
        // agree from the resume point on.
        let mut live = IntervalTrigger::new((2, TriggerUnit::Iteration)).unwrap();
        for i in 0..=4 {
            live.evaluate(i, i / 3);
        }
        let mut resumed = IntervalTrigger::new((2, TriggerUnit::Iteration)).unwrap();
        resumed.set_last(4, 0);

        for i in 4..10 {
            assert_eq!(
                live.evaluate(i, i / 3),
                resumed.evaluate(i, i / 3),
                "diverged at i={i}"
            );
        }
    }

    #[test]
    fn end_trigger_threshold_is_monotone() {
        let trigger = EndTrigger::new((5, TriggerUnit::Iteration)).unwrap();
        for i in 0..5 {
            assert!(!trigger.evaluate(i, 99));
        }
        for i in 5..20 {
            assert!(trigger.evaluate(i, 0));
        }
    }

    #[test]
    fn end_trigger_on_epochs() {
        let trigger = EndTrigger::new((2, TriggerUnit::Epoch)).unwrap();
        assert!(!trigger.evaluate(100, 1));
        assert!(trigger.evaluate(0, 2));
        assert!(trigger.evaluate(0, 3));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// A fresh trigger fires exactly when the counter is a multiple of
        /// the period and differs from the previously observed value.
        #[test]
        fn fires_only_on_new_multiples(period in 1usize..50, steps in 1usize..200) {
            let mut trigger = IntervalTrigger::new((period, TriggerUnit::Iteration)).unwrap();
            for i in 0..steps {
                let fired = trigger.evaluate(i, 0);
                let expected = i % period == 0 && i != 0;
                prop_assert_eq!(fired, expected, "period={}, i={}", period, i);
            }
        }

        /// Repeated evaluation at an unchanged counter is false after the
        /// first call, for either unit.
        #[test]
        fn repeated_calls_do_not_refire(period in 1usize..20, index in 0usize..100) {
            for unit in [TriggerUnit::Iteration, TriggerUnit::Epoch] {
                let mut trigger = IntervalTrigger::new((period, unit)).unwrap();
                let _ = trigger.evaluate(index, index);
                for _ in 0..5 {
                    prop_assert!(!trigger.evaluate(index, index));
                }
            }
        }

        /// EndTrigger is a pure threshold: independent of call history.
        #[test]
        fn end_trigger_is_stateless(period in 1usize..50, i in 0usize..200) {
            let trigger = EndTrigger::new((period, TriggerUnit::Iteration)).unwrap();
            prop_assert_eq!(trigger.evaluate(i, 0), i >= period);
            prop_assert_eq!(trigger.evaluate(i, 0), i >= period);
        }
    }
}
