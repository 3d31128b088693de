//! Per-build mutable state

use crate::dockerfile::Command;
use crate::engine::ContainerSpec;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// State accumulated while the instructions of one build execute
///
/// A context is created by [`crate::Builder::build`] and dropped when the
/// build returns; it is never shared between builds.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    base_dir: PathBuf,
    chain: Vec<String>,
    pub maintainer: Option<String>,
    pub workdir: Option<String>,
    pub user: Option<String>,
    pub stop_signal: Option<String>,
    pub entrypoint: Option<Command>,
    pub default_command: Option<Command>,
    pub env: BTreeMap<String, String>,
    pub args: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub ports: BTreeSet<u16>,
    pub volumes: BTreeSet<String>,
}

impl BuildContext {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    /// Directory ADD/COPY sources are resolved against
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Image ids produced so far, oldest first
    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    pub fn current_image(&self) -> Option<&str> {
        self.chain.last().map(String::as_str)
    }

    pub fn push_image(&mut self, image: impl Into<String>) {
        self.chain.push(image.into());
    }

    pub fn into_chain(self) -> Vec<String> {
        self.chain
    }

    /// Placeholder resolution map: build arguments overlaid by the environment
    pub fn variables(&self) -> HashMap<String, String> {
        self.args
            .iter()
            .chain(self.env.iter())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Container settings for a container created from `image`
    pub fn container_spec(&self, image: &str, command: Option<Vec<String>>) -> ContainerSpec {
        ContainerSpec {
            image: image.to_string(),
            command,
            env: self.env.clone(),
            labels: self.labels.clone(),
            user: self.user.clone(),
            working_dir: self.workdir.clone(),
            ports: self.ports.clone(),
            stop_signal: self.stop_signal.clone(),
            entrypoint: self.entrypoint.as_ref().map(Command::argv),
        }
    }
}
