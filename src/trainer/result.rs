//! Training report types

/// Outcome of a completed training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// Iterations completed when the loop terminated
    pub iterations: usize,
    /// Epochs completed when the loop terminated
    pub epochs: usize,
    /// Total wall-clock training time in seconds
    pub elapsed_secs: f64,
}
