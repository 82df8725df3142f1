//! Pluggable event sink for training summaries
//!
//! The trainer emits named scalar time series, histogram arrays, and
//! image/audio snapshots tagged by iteration. Persistence is behind the
//! [`EventWriter`] trait: a JSONL file writer for real runs and an
//! in-memory writer for tests.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::review::{Audio, Image};

/// File name of the JSONL event log under the storage directory
pub const EVENTS_FILE: &str = "events.jsonl";

/// Errors from event sinks
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for event-sink operations
pub type Result<T> = std::result::Result<T, SinkError>;

/// One logged record, tagged with the iteration it was flushed at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Scalar {
        tag: String,
        value: f64,
        iteration: usize,
    },
    Histogram {
        tag: String,
        values: Vec<f64>,
        iteration: usize,
    },
    Image {
        tag: String,
        image: Image,
        iteration: usize,
    },
    Audio {
        tag: String,
        audio: Audio,
        iteration: usize,
    },
}

impl Event {
    /// The `prefix/key` tag of this event
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Event::Scalar { tag, .. }
            | Event::Histogram { tag, .. }
            | Event::Image { tag, .. }
            | Event::Audio { tag, .. } => tag,
        }
    }

    #[must_use]
    pub fn iteration(&self) -> usize {
        match self {
            Event::Scalar { iteration, .. }
            | Event::Histogram { iteration, .. }
            | Event::Image { iteration, .. }
            | Event::Audio { iteration, .. } => *iteration,
        }
    }
}

/// Log sink consumed by the trainer's summary flush
pub trait EventWriter {
    fn add_scalar(&mut self, tag: &str, value: f64, iteration: usize) -> Result<()>;

    fn add_histogram(&mut self, tag: &str, values: &[f64], iteration: usize) -> Result<()>;

    fn add_image(&mut self, tag: &str, image: &Image, iteration: usize) -> Result<()>;

    fn add_audio(&mut self, tag: &str, audio: &Audio, iteration: usize) -> Result<()>;
}

/// JSONL event writer: one JSON object per line under
/// `storage_dir/events.jsonl`, directory created lazily
#[derive(Debug)]
pub struct JsonlEventWriter {
    dir: PathBuf,
}

impl JsonlEventWriter {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(EVENTS_FILE)
    }

    fn append(&mut self, event: &Event) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let line = serde_json::to_string(event)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path())?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

impl EventWriter for JsonlEventWriter {
    fn add_scalar(&mut self, tag: &str, value: f64, iteration: usize) -> Result<()> {
        self.append(&Event::Scalar {
            tag: tag.to_string(),
            value,
            iteration,
        })
    }

    fn add_histogram(&mut self, tag: &str, values: &[f64], iteration: usize) -> Result<()> {
        self.append(&Event::Histogram {
            tag: tag.to_string(),
            values: values.to_vec(),
            iteration,
        })
    }

    fn add_image(&mut self, tag: &str, image: &Image, iteration: usize) -> Result<()> {
        self.append(&Event::Image {
            tag: tag.to_string(),
            image: image.clone(),
            iteration,
        })
    }

    fn add_audio(&mut self, tag: &str, audio: &Audio, iteration: usize) -> Result<()> {
        self.append(&Event::Audio {
            tag: tag.to_string(),
            audio: audio.clone(),
            iteration,
        })
    }
}

/// In-memory event writer for tests
///
/// Clones share the same buffer, so a test can keep a handle while the
/// trainer owns the writer.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventWriter {
    events: Arc<Mutex<Vec<Event>>>,
}

impl InMemoryEventWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl EventWriter for InMemoryEventWriter {
    fn add_scalar(&mut self, tag: &str, value: f64, iteration: usize) -> Result<()> {
        self.push(Event::Scalar {
            tag: tag.to_string(),
            value,
            iteration,
        });
        Ok(())
    }

    fn add_histogram(&mut self, tag: &str, values: &[f64], iteration: usize) -> Result<()> {
        self.push(Event::Histogram {
            tag: tag.to_string(),
            values: values.to_vec(),
            iteration,
        });
        Ok(())
    }

    fn add_image(&mut self, tag: &str, image: &Image, iteration: usize) -> Result<()> {
        self.push(Event::Image {
            tag: tag.to_string(),
            image: image.clone(),
            iteration,
        });
        Ok(())
    }

    fn add_audio(&mut self, tag: &str, audio: &Audio, iteration: usize) -> Result<()> {
        self.push(Event::Audio {
            tag: tag.to_string(),
            audio: audio.clone(),
            iteration,
        });
        Ok(())
    }
}
