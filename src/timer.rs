//! Scoped wall-clock instrumentation
//!
//! [`ContextTimerDict`] accumulates named duration samples on a monotonic
//! clock. A region that fails contributes nothing to its series, so
//! failures do not pollute throughput statistics.

use std::collections::BTreeMap;
use std::time::Instant;

/// Monotonic start/elapsed helper for regions whose commit point is
/// conditional (the sample is recorded only on success).
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Named duration samples, in seconds
///
/// # Example
///
/// ```
/// use orquestar::ContextTimerDict;
///
/// let mut timer = ContextTimerDict::new();
/// timer.measure("load", || std::thread::sleep(std::time::Duration::from_millis(1)));
/// timer.measure("load", || ());
/// assert_eq!(timer.snapshot()["load"].len(), 2);
///
/// // A failing region is discarded:
/// let _ = timer.try_measure("step", || Err::<(), &str>("boom"));
/// assert!(!timer.snapshot().contains_key("step"));
/// ```
#[derive(Debug, Default)]
pub struct ContextTimerDict {
    timings: BTreeMap<String, Vec<f64>>,
}

impl ContextTimerDict {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure an infallible region; always records the sample.
    pub fn measure<T>(&mut self, key: &str, f: impl FnOnce() -> T) -> T {
        let watch = Stopwatch::start();
        let value = f();
        self.record(key, watch.elapsed_secs());
        value
    }

    /// Measure a fallible region; the sample is recorded only on `Ok`,
    /// an `Err` discards the in-flight measurement and still propagates.
    pub fn try_measure<T, E>(
        &mut self,
        key: &str,
        f: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        let watch = Stopwatch::start();
        let value = f()?;
        self.record(key, watch.elapsed_secs());
        Ok(value)
    }

    /// Append a pre-measured sample (used with [`Stopwatch`] for regions
    /// that span multiple borrows).
    pub fn record(&mut self, key: &str, seconds: f64) {
        self.timings.entry(key.to_string()).or_default().push(seconds);
    }

    /// Raw samples per key, for mean/aggregate computation by the caller
    #[must_use]
    pub fn snapshot(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.timings
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }

    pub fn reset(&mut self) {
        self.timings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_regions_accumulate_two_samples() {
        let mut timer = ContextTimerDict::new();
        timer.measure("test", || {});
        timer.measure("test", || {});
        timer.measure("test_2", || {});
        assert_eq!(timer.snapshot()["test"].len(), 2);
        assert_eq!(timer.snapshot()["test_2"].len(), 1);
    }

    #[test]
    fn failing_region_contributes_nothing() {
        let mut timer = ContextTimerDict::new();
        timer.measure("test_2", || {});
        let result: Result<(), &str> = timer.try_measure("test_2", || Err("boom"));
        assert!(result.is_err());
        assert_eq!(timer.snapshot()["test_2"].len(), 1);
    }

    #[test]
    fn try_measure_records_on_ok() {
        let mut timer = ContextTimerDict::new();
        let value: Result<u32, &str> = timer.try_measure("ok", || Ok(42));
        assert_eq!(value.unwrap(), 42);
        assert_eq!(timer.snapshot()["ok"].len(), 1);
    }

    #[test]
    fn measure_returns_closure_value() {
        let mut timer = ContextTimerDict::new();
        let value = timer.measure("v", || 7);
        assert_eq!(value, 7);
    }

    #[test]
    fn record_appends_raw_sample() {
        let mut timer = ContextTimerDict::new();
        timer.record("step", 0.5);
        timer.record("step", 0.25);
        assert_eq!(timer.snapshot()["step"], vec![0.5, 0.25]);
    }

    #[test]
    fn reset_clears_all_series() {
        let mut timer = ContextTimerDict::new();
        timer.record("a", 1.0);
        assert!(!timer.is_empty());
        timer.reset();
        assert!(timer.is_empty());
    }

    #[test]
    fn samples_are_non_negative_durations() {
        let mut timer = ContextTimerDict::new();
        timer.measure("sleep", || {
            std::thread::sleep(std::time::Duration::from_millis(2));
        });
        assert!(timer.snapshot()["sleep"][0] >= 0.002);
    }
}
