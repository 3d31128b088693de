pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{BuildArgs, CliArgs, Commands, ConfigArgs, ParseArgs};
pub use output::{OutputFormat, OutputFormatter};
