//! Configuration management for dockbuild
//!
//! Settings are loaded from environment variables with sensible defaults.
//! Command-line flags override them per invocation.
//!
//! # Environment Variables
//!
//! - `DOCKBUILD_DOCKERFILE`: build file name inside the context - default: "Dockerfile"
//! - `DOCKBUILD_DOCKER_SOCKET`: unix socket of the Docker daemon - default: local defaults
//!   (`DOCKER_HOST` or the platform socket)
//! - `DOCKBUILD_ENGINE_TIMEOUT`: engine client timeout in seconds - default: "3600"
//! - `DOCKBUILD_ENFORCE_EXIT_CODE`: fail on non-zero RUN exit (true|false) - default: "false"
//! - `DOCKBUILD_LOG_LEVEL`: logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use dockbuild::{Builder, DockbuildConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DockbuildConfig::from_env()?;
//! config.validate()?;
//!
//! let builder = Builder::new(Arc::new(config.connect_engine()?));
//! let outcome = builder.build(".", &config.build_options()).await?;
//! println!("{}", outcome.image_id);
//! # Ok(())
//! # }
//! ```

use crate::builder::BuildOptions;
use crate::engine::DockerEngine;
use crate::error::EngineError;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_DOCKERFILE: &str = "Dockerfile";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 3600;
const MAX_ENGINE_TIMEOUT_SECS: u64 = 86_400;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    /// The configured engine could not be reached
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Runtime configuration
///
/// `Default::default()` reads the environment and silently falls back to
/// defaults for unparsable values; [`DockbuildConfig::from_env`] reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockbuildConfig {
    /// Build file name, relative to the context directory
    pub dockerfile: String,

    /// Unix socket of the Docker daemon; `None` uses the local defaults
    pub docker_socket: Option<PathBuf>,

    /// Engine client timeout in seconds
    pub engine_timeout_secs: u64,

    /// Fail the build when a RUN container exits non-zero
    pub enforce_exit_code: bool,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn parse_var<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::ParseError {
                field: key.to_string(),
                error: format!("\"{}\": {}", raw, e),
            }),
        Err(_) => Ok(None),
    }
}

impl Default for DockbuildConfig {
    fn default() -> Self {
        let engine_timeout_secs = env::var("DOCKBUILD_ENGINE_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_ENGINE_TIMEOUT_SECS);

        let enforce_exit_code = env::var("DOCKBUILD_ENFORCE_EXIT_CODE")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            engine_timeout_secs,
            enforce_exit_code,
            ..Self::from_strings()
        }
    }
}

impl DockbuildConfig {
    fn from_strings() -> Self {
        let dockerfile =
            env::var("DOCKBUILD_DOCKERFILE").unwrap_or_else(|_| DEFAULT_DOCKERFILE.to_string());

        let docker_socket = env::var("DOCKBUILD_DOCKER_SOCKET")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let log_level = env::var("DOCKBUILD_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            dockerfile,
            docker_socket,
            engine_timeout_secs: DEFAULT_ENGINE_TIMEOUT_SECS,
            enforce_exit_code: false,
            log_level,
        }
    }

    /// Loads the configuration, failing on values that do not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_strings();
        if let Some(timeout) = parse_var::<u64>("DOCKBUILD_ENGINE_TIMEOUT")? {
            config.engine_timeout_secs = timeout;
        }
        if let Some(enforce) = parse_var::<bool>("DOCKBUILD_ENFORCE_EXIT_CODE")? {
            config.enforce_exit_code = enforce;
        }
        Ok(config)
    }

    /// Validates the configuration
    ///
    /// Checks that the timeout lies between one second and one day, that a
    /// build file name is set and that the log level is known.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Engine timeout must be at least 1 second".to_string(),
            ));
        }
        if self.engine_timeout_secs > MAX_ENGINE_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(
                "Engine timeout cannot exceed 24 hours".to_string(),
            ));
        }

        if self.dockerfile.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Build file name cannot be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    /// Build options derived from this configuration (no tag)
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions::default()
            .with_dockerfile(self.dockerfile.clone())
            .with_enforce_exit_code(self.enforce_exit_code)
    }

    /// Connects to the configured Docker daemon
    pub fn connect_engine(&self) -> Result<DockerEngine, ConfigError> {
        let engine = match &self.docker_socket {
            Some(socket) => DockerEngine::connect_socket(socket, self.engine_timeout())?,
            None => DockerEngine::connect_local(self.engine_timeout())?,
        };
        Ok(engine)
    }

    /// Key/value view for JSON/YAML output
    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();

        map.insert("dockerfile".to_string(), self.dockerfile.clone());
        map.insert(
            "docker_socket".to_string(),
            self.docker_socket
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "local defaults".to_string()),
        );
        map.insert(
            "engine_timeout_secs".to_string(),
            self.engine_timeout_secs.to_string(),
        );
        map.insert(
            "enforce_exit_code".to_string(),
            self.enforce_exit_code.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for DockbuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dockbuild Configuration:")?;
        writeln!(f, "  Dockerfile: {}", self.dockerfile)?;
        match &self.docker_socket {
            Some(socket) => writeln!(f, "  Docker Socket: {}", socket.display())?,
            None => writeln!(f, "  Docker Socket: local defaults")?,
        }
        writeln!(f, "  Engine Timeout: {}s", self.engine_timeout_secs)?;
        writeln!(f, "  Enforce Exit Code: {}", self.enforce_exit_code)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
