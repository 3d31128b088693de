//! Container engine interface
//!
//! The builder only decides which engine operations run, with which
//! arguments, in which order. Transport and authentication live behind
//! [`ContainerEngine`]; [`DockerEngine`] talks to a Docker daemon and
//! [`RecordingEngine`] keeps everything in memory.

mod docker;
mod mock;

pub use docker::DockerEngine;
pub use mock::{EngineCall, Operation, RecordingEngine};

use crate::error::EngineError;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::collections::{BTreeMap, BTreeSet};

/// Everything needed to create a container from an image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub command: Option<Vec<String>>,
    pub env: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub user: Option<String>,
    pub working_dir: Option<String>,
    pub ports: BTreeSet<u16>,
    pub stop_signal: Option<String>,
    pub entrypoint: Option<Vec<String>>,
}

impl ContainerSpec {
    /// `KEY=VALUE` strings in key order
    pub fn env_list(&self) -> Vec<String> {
        self.env
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect()
    }
}

/// One entry of an image pull progress stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullProgress {
    pub status: Option<String>,
    pub error: Option<String>,
}

impl PullProgress {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            status: None,
            error: Some(error.into()),
        }
    }
}

pub type PullStream<'a> = BoxStream<'a, Result<PullProgress, EngineError>>;

/// Operations the builder needs from a container engine
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Whether the image is available locally
    async fn image_exists(&self, image: &str) -> Result<bool, EngineError>;

    /// Pulls an image, streaming progress entries
    fn pull_image<'a>(&'a self, image: &'a str) -> PullStream<'a>;

    /// Creates (but does not start) a container and returns its id
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError>;

    async fn start_container(&self, id: &str) -> Result<(), EngineError>;

    /// Blocks until the container exits and returns its exit code
    async fn wait_container(&self, id: &str) -> Result<i64, EngineError>;

    /// Extracts a tar archive into the container at `path`
    async fn put_archive(&self, id: &str, path: &str, archive: Vec<u8>)
        -> Result<(), EngineError>;

    /// Commits the container's filesystem to a new image and returns the image id
    async fn commit_container(
        &self,
        id: &str,
        author: Option<&str>,
        message: Option<&str>,
    ) -> Result<String, EngineError>;

    /// Tags an image with `repo[:tag]`
    async fn tag_image(&self, image: &str, tag: &str) -> Result<(), EngineError>;
}

/// Splits `repo[:tag]` into repository and tag, defaulting the tag to `latest`
///
/// A colon before the last `/` belongs to a registry port, not a tag.
pub fn split_reference(reference: &str) -> (&str, &str) {
    let name_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
    match reference[name_start..].rfind(':') {
        Some(i) => {
            let colon = name_start + i;
            (&reference[..colon], &reference[colon + 1..])
        }
        None => (reference, "latest"),
    }
}
