//! Error types for parsing and building
//!
//! Parsing failures ([`ParseError`]) are raised by the lexer, the parser and
//! the per-instruction argument grammars. Everything that can abort a build is
//! folded into [`BuildError`], which is what [`crate::Builder::build`] returns.

use crate::dockerfile::Verb;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning build-file text into instructions
#[derive(Debug, Error)]
pub enum ParseError {
    /// Malformed argument text, such as a key/value token without `=`
    #[error("Parse error at line {line}: \"{snippet}\" is invalid syntax")]
    Syntax { line: usize, snippet: String },

    /// The build file ended while a continued instruction was still buffered
    #[error("Parse error at line {line}: build file ends inside a continued instruction \"{snippet}\"")]
    UnterminatedContinuation { line: usize, snippet: String },

    /// The verb token is not part of the instruction set
    #[error("Invalid command name at line {line}: \"{command}\" is not a recognized command")]
    UnrecognizedCommand { line: usize, command: String },

    /// An instruction's own grammar rejected its argument string
    #[error("Command {verb} at line {line} argument string is invalid. {explanation}")]
    InvalidArguments {
        verb: Verb,
        line: usize,
        explanation: String,
    },

    /// The build file could not be read
    #[error("Failed to read build file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    /// Line the error refers to, when it refers to one
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Syntax { line, .. }
            | ParseError::UnterminatedContinuation { line, .. }
            | ParseError::UnrecognizedCommand { line, .. }
            | ParseError::InvalidArguments { line, .. } => Some(*line),
            ParseError::Read { .. } => None,
        }
    }
}

/// Errors reported by a container engine implementation
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Docker engine error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Failed to connect to container engine: {0}")]
    Connection(String),

    #[error("Engine error: {0}")]
    Other(String),
}

/// Errors raised while packaging files for ADD/COPY
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to archive {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid source pattern \"{pattern}\": {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Failed to expand source pattern: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("Source {0} is outside the build context")]
    OutsideContext(PathBuf),
}

/// Errors that abort a build
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The engine reported an error while pulling the base image
    #[error("Failed to pull image {image}: {message}")]
    Pull { image: String, message: String },

    /// An instruction other than FROM ran before any base image was set
    #[error("{verb} at line {line} requires a base image; the build file must start with FROM")]
    NoBaseImage { verb: Verb, line: usize },

    /// The build file has no instructions, so there is nothing to commit
    #[error("Build file {0} contains no instructions")]
    EmptyBuildFile(PathBuf),

    /// The build context directory does not exist or is not a directory
    #[error("Build context not found: {0}")]
    ContextNotFound(PathBuf),

    /// A RUN container exited with a non-zero status (only with exit code enforcement)
    #[error("RUN at line {line} exited with status {code}")]
    NonZeroExit { line: usize, code: i64 },
}

impl BuildError {
    /// Returns a user-friendly error message with troubleshooting hints
    pub fn help_message(&self) -> String {
        match self {
            BuildError::Parse(ParseError::UnrecognizedCommand { command, line }) => format!(
                "Error: unknown instruction \"{}\" at line {}\n\n\
                Help: supported instructions are FROM, MAINTAINER, RUN, CMD, LABEL, EXPOSE,\n\
                ENV, ADD, COPY, ENTRYPOINT, VOLUME, USER, WORKDIR, ARG, STOPSIGNAL and ONBUILD.",
                command, line
            ),
            BuildError::Parse(err) => format!("Error: {}", err),
            BuildError::Engine(err) => format!(
                "Error: {}\n\n\
                Help: Cannot talk to the container engine. Check that:\n\
                - the Docker daemon is running\n\
                - DOCKBUILD_DOCKER_SOCKET (or DOCKER_HOST) points at it\n\
                - your user may access the socket",
                err
            ),
            BuildError::Pull { image, message } => format!(
                "Error: could not pull base image {}\nDetails: {}\n\n\
                Help: check the image name and your registry credentials.",
                image, message
            ),
            BuildError::ContextNotFound(path) => format!(
                "Error: build context not found\nPath: {}\n\n\
                Help: pass the directory that contains the build file.",
                path.display()
            ),
            other => format!("Error: {}", other),
        }
    }

    /// True for errors caused by the build file rather than the engine
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            BuildError::Parse(_) | BuildError::NoBaseImage { .. } | BuildError::EmptyBuildFile(_)
        )
    }
}
