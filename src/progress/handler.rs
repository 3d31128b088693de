//! Progress handler trait and events

use std::path::PathBuf;
use std::time::Duration;

/// Events emitted while a build runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Build started
    BuildStarted {
        context_dir: PathBuf,
        dockerfile: String,
    },

    /// An instruction is about to execute; `index` is 1-based
    StepStarted {
        index: usize,
        total: usize,
        instruction: String,
    },

    /// Status line reported by the engine while pulling a base image
    PullStatus { image: String, status: String },

    /// An instruction finished and `image_id` became the current image
    StepCompleted {
        index: usize,
        image_id: String,
        duration: Duration,
    },

    /// The final container was committed
    Committed { image_id: String },

    /// The final image was tagged
    Tagged { image_id: String, tag: String },

    /// Build completed successfully
    BuildCompleted {
        image_id: String,
        steps: usize,
        duration: Duration,
    },

    /// Build failed
    BuildFailed { error: String },
}

/// Trait for handling progress events during a build
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
