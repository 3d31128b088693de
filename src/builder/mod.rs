//! Build orchestration
//!
//! [`Builder::build`] parses the build file, creates a fresh [`BuildContext`],
//! executes the instructions strictly in order and finally commits a container
//! created from the current image with the accumulated metadata. Each
//! instruction appends exactly one id to the image chain: metadata
//! instructions re-append the current id, RUN and ADD/COPY append the id of a
//! newly committed layer.

mod context;
mod step;

pub use context::BuildContext;

use crate::dockerfile::{Command, Parser};
use crate::engine::ContainerEngine;
use crate::error::BuildError;
use crate::progress::{LoggingHandler, ProgressEvent, ProgressHandler};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use step::StepExecutor;
use tracing::{debug, info};

/// Per-build settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Build file name, relative to the context directory
    pub dockerfile: String,
    /// `repo[:tag]` applied to the final image
    pub tag: Option<String>,
    /// Fail the build when a RUN container exits with a non-zero status
    pub enforce_exit_code: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            dockerfile: "Dockerfile".to_string(),
            tag: None,
            enforce_exit_code: false,
        }
    }
}

impl BuildOptions {
    pub fn with_dockerfile(mut self, dockerfile: impl Into<String>) -> Self {
        self.dockerfile = dockerfile.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_enforce_exit_code(mut self, enforce: bool) -> Self {
        self.enforce_exit_code = enforce;
        self
    }
}

/// Result of a successful build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOutcome {
    pub image_id: String,
    /// Every id the build appended, base image first and final commit last
    pub chain: Vec<String>,
    pub tag: Option<String>,
}

/// Drives builds against a container engine
///
/// The builder keeps no per-build state, so one instance can run any number
/// of builds; the engine handle is shared between them.
pub struct Builder {
    engine: Arc<dyn ContainerEngine>,
    parser: Parser,
    progress: Arc<dyn ProgressHandler>,
}

impl Builder {
    /// Creates a builder that reports progress through tracing
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self {
            engine,
            parser: Parser::new(),
            progress: Arc::new(LoggingHandler),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub fn engine(&self) -> &Arc<dyn ContainerEngine> {
        &self.engine
    }

    /// Builds `Dockerfile` from `context_dir` without tagging
    pub async fn build_default(
        &self,
        context_dir: impl AsRef<Path>,
    ) -> Result<BuildOutcome, BuildError> {
        self.build(context_dir, &BuildOptions::default()).await
    }

    pub async fn build(
        &self,
        context_dir: impl AsRef<Path>,
        options: &BuildOptions,
    ) -> Result<BuildOutcome, BuildError> {
        let result = self.run(context_dir.as_ref(), options).await;
        if let Err(err) = &result {
            self.progress.on_progress(&ProgressEvent::BuildFailed {
                error: err.to_string(),
            });
        }
        result
    }

    async fn run(
        &self,
        context_dir: &Path,
        options: &BuildOptions,
    ) -> Result<BuildOutcome, BuildError> {
        let started = Instant::now();
        if !context_dir.is_dir() {
            return Err(BuildError::ContextNotFound(context_dir.to_path_buf()));
        }
        // glob output and the context prefix must share one absolute form
        let context_dir = context_dir
            .canonicalize()
            .map_err(|_| BuildError::ContextNotFound(context_dir.to_path_buf()))?;
        let context_dir = context_dir.as_path();

        self.progress.on_progress(&ProgressEvent::BuildStarted {
            context_dir: context_dir.to_path_buf(),
            dockerfile: options.dockerfile.clone(),
        });

        let dockerfile = context_dir.join(&options.dockerfile);
        let instructions = self.parser.parse_from(&dockerfile)?;
        if instructions.is_empty() {
            return Err(BuildError::EmptyBuildFile(dockerfile));
        }

        let mut context = BuildContext::new(context_dir);
        let executor = StepExecutor::new(
            self.engine.as_ref(),
            self.progress.as_ref(),
            options.enforce_exit_code,
        );

        let total = instructions.len();
        for (i, instruction) in instructions.iter().enumerate() {
            let index = i + 1;
            let step_started = Instant::now();
            self.progress.on_progress(&ProgressEvent::StepStarted {
                index,
                total,
                instruction: instruction.to_string(),
            });

            let image_id = executor.execute(&mut context, instruction).await?;
            context.push_image(image_id.clone());

            self.progress.on_progress(&ProgressEvent::StepCompleted {
                index,
                image_id,
                duration: step_started.elapsed(),
            });
        }

        let image_id = self.finalize(&mut context).await?;

        if let Some(tag) = &options.tag {
            self.engine.tag_image(&image_id, tag).await?;
            self.progress.on_progress(&ProgressEvent::Tagged {
                image_id: image_id.clone(),
                tag: tag.clone(),
            });
        }

        self.progress.on_progress(&ProgressEvent::BuildCompleted {
            image_id: image_id.clone(),
            steps: total,
            duration: started.elapsed(),
        });
        info!(image = %image_id, chain = context.chain().len(), "Build finished");

        Ok(BuildOutcome {
            image_id,
            chain: context.into_chain(),
            tag: options.tag.clone(),
        })
    }

    /// Commits a container created from the current image with the accumulated metadata
    async fn finalize(&self, context: &mut BuildContext) -> Result<String, BuildError> {
        let current = context.current_image().unwrap_or_default().to_string();
        let command = context.default_command.as_ref().map(Command::argv);
        let spec = context.container_spec(&current, command);

        let container = self.engine.create_container(&spec).await?;
        debug!(container = %container, image = %current, "Created final container");

        let image_id = self
            .engine
            .commit_container(&container, context.maintainer.as_deref(), None)
            .await?;
        context.push_image(image_id.clone());

        self.progress.on_progress(&ProgressEvent::Committed {
            image_id: image_id.clone(),
        });
        Ok(image_id)
    }
}
