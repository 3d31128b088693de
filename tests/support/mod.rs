//! Shared helpers for integration tests
#![allow(dead_code)]

use dockbuild::engine::EngineCall;
use dockbuild::{Builder, ProgressEvent, ProgressHandler, RecordingEngine};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A temporary build context containing a Dockerfile and optional source files
pub struct BuildFixture {
    dir: TempDir,
}

impl BuildFixture {
    pub fn new(dockerfile: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(dir.path().join("Dockerfile"), dockerfile).expect("Failed to write Dockerfile");
        Self { dir }
    }

    pub fn with_file(self, relative: &str, contents: &str) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(path, contents).expect("Failed to write fixture file");
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Collects every progress event for later inspection
#[derive(Default)]
pub struct CollectingHandler {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingHandler {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressHandler for CollectingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Builder over a recording engine whose base image `busybox` is already local
pub fn recording_builder() -> (Builder, Arc<RecordingEngine>) {
    builder_for(RecordingEngine::new().with_local_image("busybox"))
}

pub fn builder_for(engine: RecordingEngine) -> (Builder, Arc<RecordingEngine>) {
    let engine = Arc::new(engine);
    let builder = Builder::new(engine.clone()).with_progress(Arc::new(dockbuild::NoOpHandler));
    (builder, engine)
}

/// Short names of the recorded calls, in order
pub fn call_kinds(calls: &[EngineCall]) -> Vec<&'static str> {
    calls
        .iter()
        .map(|call| match call {
            EngineCall::ImageExists(_) => "exists",
            EngineCall::PullImage(_) => "pull",
            EngineCall::CreateContainer(_) => "create",
            EngineCall::StartContainer(_) => "start",
            EngineCall::WaitContainer(_) => "wait",
            EngineCall::PutArchive { .. } => "put_archive",
            EngineCall::CommitContainer { .. } => "commit",
            EngineCall::TagImage { .. } => "tag",
        })
        .collect()
}
