//! Crate-wide error taxonomy
//!
//! Configuration errors are fatal and never retried. Transient per-batch
//! errors propagate to the caller after the timer discards the in-flight
//! measurement; batch-level fault isolation is the data source's concern.

use std::path::PathBuf;

/// Errors from trainer, trigger, and checkpoint operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration (trigger unit/period, termination condition,
    /// loss weights, empty training source, ...)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Checkpoint path does not exist
    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(PathBuf),

    /// Model/optimizer tree shape does not match the checkpoint
    #[error("Structure mismatch: {0}")]
    Structure(String),

    /// Checkpoint has no optimizer state for a live optimizer slot
    #[error("Missing optimizer state in checkpoint at `{0}`")]
    MissingOptimizerState(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Event sink error: {0}")]
    Sink(#[from] crate::events::SinkError),
}

/// Result alias for trainer operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = Error::Config("trigger period must be positive".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: trigger period must be positive"
        );
    }

    #[test]
    fn checkpoint_not_found_carries_path() {
        let err = Error::CheckpointNotFound(PathBuf::from("/tmp/ckpt_7"));
        assert!(err.to_string().contains("/tmp/ckpt_7"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
