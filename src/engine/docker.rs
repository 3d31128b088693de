//! Docker daemon backend

use super::{split_reference, ContainerEngine, ContainerSpec, PullProgress, PullStream};
use crate::error::EngineError;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, StartContainerOptions, UploadToContainerOptions,
    WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::{CommitContainerOptions, CreateImageOptions, TagImageOptions};
use bollard::Docker;
use bytes::Bytes;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// [`ContainerEngine`] backed by the Docker Engine API
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connects using the platform's local defaults (`DOCKER_HOST` or the default socket)
    pub fn connect_local(timeout: Duration) -> Result<Self, EngineError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| EngineError::Connection(e.to_string()))?
            .with_timeout(timeout);
        Ok(Self { docker })
    }

    /// Connects to a Docker daemon listening on a unix socket
    #[cfg(unix)]
    pub fn connect_socket(path: &Path, timeout: Duration) -> Result<Self, EngineError> {
        let socket = path.to_str().ok_or_else(|| {
            EngineError::Connection(format!("socket path is not UTF-8: {}", path.display()))
        })?;
        let docker = Docker::connect_with_unix(socket, timeout.as_secs(), bollard::API_DEFAULT_VERSION)
            .map_err(|e| EngineError::Connection(e.to_string()))?;
        Ok(Self { docker })
    }

    #[cfg(not(unix))]
    pub fn connect_socket(path: &Path, _timeout: Duration) -> Result<Self, EngineError> {
        Err(EngineError::Connection(format!(
            "unix sockets are not supported on this platform: {}",
            path.display()
        )))
    }

    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }

    /// Checks that the daemon answers and logs its API version
    pub async fn ping(&self) -> Result<(), EngineError> {
        let version = self.docker.version().await?;
        debug!(
            api_version = version.api_version.as_deref().unwrap_or("unknown"),
            "Connected to Docker"
        );
        Ok(())
    }
}

fn container_config(spec: &ContainerSpec) -> Config<String> {
    let exposed_ports = if spec.ports.is_empty() {
        None
    } else {
        Some(
            spec.ports
                .iter()
                .map(|port| (format!("{}/tcp", port), HashMap::new()))
                .collect(),
        )
    };

    Config {
        image: Some(spec.image.clone()),
        cmd: spec.command.clone(),
        env: Some(spec.env_list()),
        labels: Some(spec.labels.clone().into_iter().collect()),
        user: spec.user.clone(),
        working_dir: spec.working_dir.clone(),
        exposed_ports,
        stop_signal: spec.stop_signal.clone(),
        entrypoint: spec.entrypoint.clone(),
        ..Default::default()
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    fn name(&self) -> &str {
        "docker"
    }

    async fn image_exists(&self, image: &str) -> Result<bool, EngineError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn pull_image<'a>(&'a self, image: &'a str) -> PullStream<'a> {
        let options = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };
        self.docker
            .create_image(Some(options), None, None)
            .map(|item| {
                item.map(|info| PullProgress {
                    status: info.status,
                    error: info.error,
                })
                .map_err(EngineError::from)
            })
            .boxed()
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        let response = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, container_config(spec))
            .await?;
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn wait_container(&self, id: &str) -> Result<i64, EngineError> {
        let mut responses =
            Box::pin(self.docker.wait_container(id, None::<WaitContainerOptions<String>>));
        let mut status = 0;
        while let Some(item) = responses.next().await {
            match item {
                Ok(response) => status = response.status_code,
                // bollard reports a non-zero exit as an error; it is still just an exit code here
                Err(DockerError::DockerContainerWaitError { code, .. }) => status = code,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(status)
    }

    async fn put_archive(
        &self,
        id: &str,
        path: &str,
        archive: Vec<u8>,
    ) -> Result<(), EngineError> {
        let options = UploadToContainerOptions {
            path: path.to_string(),
            ..Default::default()
        };
        self.docker
            .upload_to_container(id, Some(options), Bytes::from(archive))
            .await?;
        Ok(())
    }

    async fn commit_container(
        &self,
        id: &str,
        author: Option<&str>,
        message: Option<&str>,
    ) -> Result<String, EngineError> {
        let options = CommitContainerOptions {
            container: id.to_string(),
            author: author.unwrap_or_default().to_string(),
            comment: message.unwrap_or_default().to_string(),
            ..Default::default()
        };
        let response = self
            .docker
            .commit_container(options, Config::<String>::default())
            .await?;
        committed_image_id(response.id)
    }

    async fn tag_image(&self, image: &str, tag: &str) -> Result<(), EngineError> {
        let (repo, tag) = split_reference(tag);
        let options = TagImageOptions {
            repo: repo.to_string(),
            tag: tag.to_string(),
        };
        self.docker.tag_image(image, Some(options)).await?;
        Ok(())
    }
}

fn committed_image_id(id: Option<String>) -> Result<String, EngineError> {
    id.filter(|id| !id.is_empty())
        .ok_or_else(|| EngineError::Other("commit returned no image id".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_without_image_id_is_an_error() {
        assert_eq!(
            committed_image_id(Some("sha256:abc".to_string())).unwrap(),
            "sha256:abc"
        );
        assert!(matches!(
            committed_image_id(None),
            Err(EngineError::Other(message)) if message.contains("no image id")
        ));
        assert!(committed_image_id(Some(String::new())).is_err());
    }

    #[test]
    fn test_container_config_maps_spec() {
        let mut spec = ContainerSpec {
            image: "busybox".to_string(),
            command: Some(vec!["true".to_string()]),
            user: Some("nobody".to_string()),
            working_dir: Some("/app".to_string()),
            stop_signal: Some("SIGTERM".to_string()),
            ..Default::default()
        };
        spec.env.insert("A".to_string(), "1".to_string());
        spec.labels.insert("team".to_string(), "core".to_string());
        spec.ports.insert(8080);

        let config = container_config(&spec);
        assert_eq!(config.image.as_deref(), Some("busybox"));
        assert_eq!(config.cmd, Some(vec!["true".to_string()]));
        assert_eq!(config.env, Some(vec!["A=1".to_string()]));
        assert_eq!(
            config.labels.unwrap().get("team").map(String::as_str),
            Some("core")
        );
        assert!(config.exposed_ports.unwrap().contains_key("8080/tcp"));
        assert_eq!(config.user.as_deref(), Some("nobody"));
        assert_eq!(config.working_dir.as_deref(), Some("/app"));
        assert_eq!(config.stop_signal.as_deref(), Some("SIGTERM"));
        assert!(config.entrypoint.is_none());
    }

    #[test]
    fn test_no_ports_means_no_exposed_ports() {
        let spec = ContainerSpec {
            image: "busybox".to_string(),
            ..Default::default()
        };
        assert!(container_config(&spec).exposed_ports.is_none());
    }

    #[tokio::test]
    #[ignore = "requires a running Docker daemon"]
    async fn test_ping_local_daemon() {
        let engine = DockerEngine::connect_local(Duration::from_secs(30)).unwrap();
        engine.ping().await.unwrap();
    }
}
