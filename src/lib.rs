//! dockbuild - build container images from Dockerfiles by driving the engine directly
//!
//! The crate interprets a build file itself instead of handing it to the
//! engine's built-in builder. It lexes and parses the file into typed
//! instructions, resolves `$NAME` / `${NAME:-default}` placeholders at
//! execution time and walks the instructions in order, issuing container
//! create/start/wait/commit calls through a [`ContainerEngine`].
//!
//! # Core Concepts
//!
//! - **Instruction**: a verb plus its raw argument string and source line;
//!   never modified after parsing
//! - **Build context**: the metadata accumulated by a single build (env,
//!   labels, ports, user, ...), created fresh for every build
//! - **Image chain**: every image id the build appended; RUN and ADD/COPY
//!   append newly committed layers, everything else re-appends the current id
//!
//! # Example Usage
//!
//! ```no_run
//! use dockbuild::{BuildOptions, Builder, DockerEngine};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DockerEngine::connect_local(Duration::from_secs(3600))?;
//! let builder = Builder::new(Arc::new(engine));
//!
//! let options = BuildOptions::default().with_tag("myapp:1.0");
//! let outcome = builder.build("./app", &options).await?;
//! println!("Built {}", outcome.image_id);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`dockerfile`]: lexer, parser, instruction set and placeholder substitution
//! - [`builder`]: build orchestration and per-instruction execution
//! - [`archive`]: ADD/COPY source expansion and tar packaging
//! - [`engine`]: the container engine interface and its implementations

pub mod archive;
pub mod builder;
pub mod cli;
pub mod config;
pub mod dockerfile;
pub mod engine;
pub mod error;
pub mod progress;
pub mod util;

pub use builder::{BuildContext, BuildOptions, BuildOutcome, Builder};
pub use config::{ConfigError, DockbuildConfig};
pub use dockerfile::{Command, Instruction, Parser, Verb};
pub use engine::{ContainerEngine, ContainerSpec, DockerEngine, PullProgress, RecordingEngine};
pub use error::{ArchiveError, BuildError, EngineError, ParseError};
pub use progress::{LoggingHandler, NoOpHandler, ProgressEvent, ProgressHandler};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "dockbuild");
    }
}
