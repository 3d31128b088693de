use super::{ContainerEngine, ContainerSpec, PullProgress, PullStream};
use crate::error::EngineError;
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// A call received by [`RecordingEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    ImageExists(String),
    PullImage(String),
    CreateContainer(ContainerSpec),
    StartContainer(String),
    WaitContainer(String),
    /// Archive upload; `entries` are the tar entry paths in archive order
    PutArchive {
        container: String,
        path: String,
        entries: Vec<String>,
    },
    CommitContainer {
        container: String,
        author: Option<String>,
        message: Option<String>,
    },
    TagImage {
        image: String,
        tag: String,
    },
}

/// Engine operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ImageExists,
    Create,
    Start,
    Wait,
    PutArchive,
    Commit,
    Tag,
}

#[derive(Default)]
struct MockState {
    calls: Vec<EngineCall>,
    local_images: HashSet<String>,
    pull_progress: Vec<PullProgress>,
    exit_code: i64,
    failing: HashSet<Operation>,
    containers: HashMap<String, String>,
    next_container: usize,
    next_layer: usize,
}

/// In-memory engine that records every call and mints deterministic ids
///
/// Containers are named `container-N` and committed images `sha256:layer-N`.
pub struct RecordingEngine {
    state: Mutex<MockState>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    /// Marks an image as already present locally
    pub fn with_local_image(self, image: impl Into<String>) -> Self {
        self.state.lock().unwrap().local_images.insert(image.into());
        self
    }

    /// Entries streamed back by the next pulls
    pub fn with_pull_progress(self, progress: Vec<PullProgress>) -> Self {
        self.state.lock().unwrap().pull_progress = progress;
        self
    }

    /// Exit code reported for every waited container
    pub fn with_exit_code(self, code: i64) -> Self {
        self.state.lock().unwrap().exit_code = code;
        self
    }

    pub fn fail_on(self, operation: Operation) -> Self {
        self.state.lock().unwrap().failing.insert(operation);
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Specs of every created container, in creation order
    pub fn created_containers(&self) -> Vec<ContainerSpec> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::CreateContainer(spec) => Some(spec),
                _ => None,
            })
            .collect()
    }

    /// Image a recorded container was created from
    pub fn image_of(&self, container: &str) -> Option<String> {
        self.state.lock().unwrap().containers.get(container).cloned()
    }

    fn record(&self, call: EngineCall, operation: Option<Operation>) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match operation {
            Some(op) if state.failing.contains(&op) => {
                Err(EngineError::Other(format!("{:?} failed", op)))
            }
            _ => Ok(()),
        }
    }
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn entry_names(archive: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    if let Ok(entries) = tar::Archive::new(archive).entries() {
        for entry in entries.flatten() {
            if let Ok(path) = entry.path() {
                names.push(path.to_string_lossy().trim_end_matches('/').to_string());
            }
        }
    }
    names
}

#[async_trait]
impl ContainerEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    async fn image_exists(&self, image: &str) -> Result<bool, EngineError> {
        self.record(
            EngineCall::ImageExists(image.to_string()),
            Some(Operation::ImageExists),
        )?;
        Ok(self.state.lock().unwrap().local_images.contains(image))
    }

    fn pull_image<'a>(&'a self, image: &'a str) -> PullStream<'a> {
        let progress = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(EngineCall::PullImage(image.to_string()));
            state.local_images.insert(image.to_string());
            state.pull_progress.clone()
        };
        stream::iter(progress.into_iter().map(Ok)).boxed()
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        self.record(
            EngineCall::CreateContainer(spec.clone()),
            Some(Operation::Create),
        )?;
        let mut state = self.state.lock().unwrap();
        state.next_container += 1;
        let id = format!("container-{}", state.next_container);
        state.containers.insert(id.clone(), spec.image.clone());
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(
            EngineCall::StartContainer(id.to_string()),
            Some(Operation::Start),
        )
    }

    async fn wait_container(&self, id: &str) -> Result<i64, EngineError> {
        self.record(EngineCall::WaitContainer(id.to_string()), Some(Operation::Wait))?;
        Ok(self.state.lock().unwrap().exit_code)
    }

    async fn put_archive(
        &self,
        id: &str,
        path: &str,
        archive: Vec<u8>,
    ) -> Result<(), EngineError> {
        self.record(
            EngineCall::PutArchive {
                container: id.to_string(),
                path: path.to_string(),
                entries: entry_names(&archive),
            },
            Some(Operation::PutArchive),
        )
    }

    async fn commit_container(
        &self,
        id: &str,
        author: Option<&str>,
        message: Option<&str>,
    ) -> Result<String, EngineError> {
        self.record(
            EngineCall::CommitContainer {
                container: id.to_string(),
                author: author.map(str::to_string),
                message: message.map(str::to_string),
            },
            Some(Operation::Commit),
        )?;
        let mut state = self.state.lock().unwrap();
        state.next_layer += 1;
        let image = format!("sha256:layer-{}", state.next_layer);
        state.local_images.insert(image.clone());
        Ok(image)
    }

    async fn tag_image(&self, image: &str, tag: &str) -> Result<(), EngineError> {
        self.record(
            EngineCall::TagImage {
                image: image.to_string(),
                tag: tag.to_string(),
            },
            Some(Operation::Tag),
        )
    }
}

impl std::fmt::Debug for RecordingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingEngine")
            .field("calls", &self.calls().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_deterministic() {
        let engine = RecordingEngine::new();
        let spec = ContainerSpec {
            image: "busybox".to_string(),
            ..Default::default()
        };

        let first = engine.create_container(&spec).await.unwrap();
        let second = engine.create_container(&spec).await.unwrap();
        assert_eq!(first, "container-1");
        assert_eq!(second, "container-2");
        assert_eq!(engine.image_of(&first).as_deref(), Some("busybox"));

        let image = engine.commit_container(&first, None, None).await.unwrap();
        assert_eq!(image, "sha256:layer-1");
        assert!(engine.image_exists(&image).await.unwrap());
    }

    #[tokio::test]
    async fn test_pull_makes_image_local() {
        let engine = RecordingEngine::new()
            .with_pull_progress(vec![PullProgress::status("Pulling fs layer")]);
        assert!(!engine.image_exists("alpine").await.unwrap());

        let progress: Vec<_> = engine.pull_image("alpine").collect().await;
        assert_eq!(progress.len(), 1);
        assert!(engine.image_exists("alpine").await.unwrap());
    }

    #[tokio::test]
    async fn test_fail_on_records_then_fails() {
        let engine = RecordingEngine::new().fail_on(Operation::Start);
        assert!(engine.start_container("container-1").await.is_err());
        assert_eq!(
            engine.calls(),
            vec![EngineCall::StartContainer("container-1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_exit_code_is_scripted() {
        let engine = RecordingEngine::new().with_exit_code(3);
        assert_eq!(engine.wait_container("container-1").await.unwrap(), 3);
    }
}
