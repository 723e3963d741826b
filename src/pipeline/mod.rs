//! The analyze → move pipeline: message types, shared state and the
//! workers that pass them along.

pub mod aggregator;
pub mod analyzer;
pub mod error_sink;
pub mod monitor;
pub mod mover;
pub mod template;

pub use template::PathTemplate;

use dashmap::DashSet;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;

/// Bucket for files the decoder rejects.
pub const NON_DICOM_DIR: &str = "non-dicoms";
/// Bucket for decodable files whose path template does not resolve.
pub const UNCATEGORIZED_DIR: &str = "uncategorized_dicoms";

/// A classified file waiting to be relocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// A recoverable, per-file failure. Its `Display` is the error log line.
#[derive(Error, Debug)]
pub enum Issue {
    #[error("Invalid dicom: {}", .path.display())]
    InvalidFile { path: PathBuf, reason: String },

    #[error("Did not find all required tags in {}", .path.display())]
    MissingTags { path: PathBuf, attribute: String },

    #[error("Duplicate detected...Skipping {}", .path.display())]
    Duplicate { path: PathBuf },

    #[error("No series information...Skipping {}", .path.display())]
    NoSeries { path: PathBuf },

    #[error("Error {source} in moving {}", .path.display())]
    MoveFailed { path: PathBuf, source: io::Error },

    #[error("Error {source} in cleaning up {}", .dir.display())]
    PruneFailed { dir: PathBuf, source: io::Error },
}

/// Identifiers already claimed by some worker.
#[derive(Debug, Default)]
pub struct SeenSet(DashSet<String>);

impl SeenSet {
    /// Atomically records `id`, returning `true` only for the first caller.
    pub fn first_sighting(&self, id: &str) -> bool {
        self.0.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    processed: AtomicUsize,
    moved: AtomicUsize,
}

impl Counters {
    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_moved(&self) {
        self.moved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn moved(&self) -> usize {
        self.moved.load(Ordering::Relaxed)
    }
}

/// State shared by every worker of one run. Allocated before any worker starts.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub instances: SeenSet,
    pub series: SeenSet,
    pub counters: Counters,
    analysis_complete: AtomicBool,
    move_complete: AtomicBool,
}

impl PipelineState {
    pub fn mark_analysis_complete(&self) {
        self.analysis_complete.store(true, Ordering::Release);
    }

    pub fn mark_move_complete(&self) {
        self.move_complete.store(true, Ordering::Release);
    }

    pub fn is_analysis_complete(&self) -> bool {
        self.analysis_complete.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.is_analysis_complete() && self.move_complete.load(Ordering::Acquire)
    }
}
