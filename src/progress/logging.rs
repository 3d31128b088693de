//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, error, info};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::BuildStarted {
                context_dir,
                dockerfile,
            } => {
                info!(
                    context = %context_dir.display(),
                    dockerfile = %dockerfile,
                    "Starting build"
                );
            }
            ProgressEvent::StepStarted {
                index,
                total,
                instruction,
            } => {
                info!(step = format!("{}/{}", index, total), "{}", instruction);
            }
            ProgressEvent::PullStatus { image, status } => {
                info!(image = %image, "{}", status);
            }
            ProgressEvent::StepCompleted {
                index,
                image_id,
                duration,
            } => {
                debug!(
                    step = index,
                    image = %image_id,
                    duration_ms = duration.as_millis(),
                    "Step complete"
                );
            }
            ProgressEvent::Committed { image_id } => {
                info!(image = %image_id, "Committed final image");
            }
            ProgressEvent::Tagged { image_id, tag } => {
                info!(image = %image_id, tag = %tag, "Tagged image");
            }
            ProgressEvent::BuildCompleted {
                image_id,
                steps,
                duration,
            } => {
                info!(
                    image = %image_id,
                    steps,
                    duration_ms = duration.as_millis(),
                    "Build complete"
                );
            }
            ProgressEvent::BuildFailed { error } => {
                error!(error = %error, "Build failed");
            }
        }
    }
}
