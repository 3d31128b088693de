use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Builds container images from Dockerfiles by driving the engine directly
#[derive(Parser, Debug)]
#[command(
    name = "dockbuild",
    about = "Build container images from Dockerfiles without the engine's built-in builder",
    version,
    author,
    long_about = "dockbuild interprets a Dockerfile itself and drives a Docker daemon through \
                  container create/start/commit calls, producing one layer per RUN, ADD and \
                  COPY instruction and a final committed (and optionally tagged) image."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only errors are logged"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Build an image from a context directory",
        long_about = "Parses the build file in the context directory, executes every \
                      instruction against the Docker daemon and prints the final image id.\n\n\
                      Examples:\n  \
                      dockbuild build\n  \
                      dockbuild build ./app -t myapp:1.0\n  \
                      dockbuild build . -f Dockerfile.ci --enforce-exit-code"
    )]
    Build(BuildArgs),

    #[command(
        about = "Parse a build file and print its instructions",
        long_about = "Lexes and parses the build file without contacting the engine.\n\n\
                      Examples:\n  \
                      dockbuild parse\n  \
                      dockbuild parse ./app --format json"
    )]
    Parse(ParseArgs),

    #[command(about = "Show the effective configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[arg(
        value_name = "CONTEXT",
        help = "Build context directory (defaults to current directory)"
    )]
    pub context: Option<PathBuf>,

    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help = "Build file name inside the context (defaults to DOCKBUILD_DOCKERFILE or 'Dockerfile')"
    )]
    pub dockerfile: Option<String>,

    #[arg(short = 't', long, value_name = "NAME[:TAG]", help = "Tag for the final image")]
    pub tag: Option<String>,

    #[arg(long, help = "Fail the build when a RUN command exits with a non-zero status")]
    pub enforce_exit_code: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ParseArgs {
    #[arg(
        value_name = "CONTEXT",
        help = "Build context directory (defaults to current directory)"
    )]
    pub context: Option<PathBuf>,

    #[arg(short = 'f', long = "file", value_name = "FILE", help = "Build file name inside the context")]
    pub dockerfile: Option<String>,

    #[arg(long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
