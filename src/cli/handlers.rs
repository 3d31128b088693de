//! Subcommand handlers; each returns the process exit code

use super::commands::{BuildArgs, ConfigArgs, ParseArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::builder::Builder;
use crate::config::DockbuildConfig;
use crate::dockerfile::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

fn context_dir(context: &Option<PathBuf>) -> PathBuf {
    context.clone().unwrap_or_else(|| PathBuf::from("."))
}

pub async fn handle_build(args: &BuildArgs) -> i32 {
    let config = match DockbuildConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_USAGE;
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return EXIT_USAGE;
    }

    let mut options = config.build_options();
    if let Some(dockerfile) = &args.dockerfile {
        options.dockerfile = dockerfile.clone();
    }
    options.tag = args.tag.clone();
    options.enforce_exit_code |= args.enforce_exit_code;
    debug!(?options, "Resolved build options");

    let engine = match config.connect_engine() {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "Failed to create engine client");
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    };
    if let Err(e) = engine.ping().await {
        eprintln!("Error: {}\n\nHelp: is the Docker daemon running?", e);
        return EXIT_FAILURE;
    }

    let builder = Builder::new(Arc::new(engine));
    match builder.build(context_dir(&args.context), &options).await {
        Ok(outcome) => match OutputFormatter::new(OutputFormat::Human).format_outcome(&outcome) {
            Ok(output) => {
                print!("{}", output);
                EXIT_SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {:#}", e);
                EXIT_FAILURE
            }
        },
        Err(err) => {
            eprintln!("{}", err.help_message());
            if err.is_parse_error() {
                EXIT_USAGE
            } else {
                EXIT_FAILURE
            }
        }
    }
}

pub fn handle_parse(args: &ParseArgs) -> i32 {
    let dockerfile = args
        .dockerfile
        .clone()
        .unwrap_or_else(|| DockbuildConfig::default().dockerfile);
    let path = context_dir(&args.context).join(dockerfile);

    let instructions = match Parser::new().parse_from(&path) {
        Ok(instructions) => instructions,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_USAGE;
        }
    };

    match OutputFormatter::new(args.format.into()).format_instructions(&instructions) {
        Ok(output) => {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_FAILURE
        }
    }
}

pub fn handle_config(args: &ConfigArgs) -> i32 {
    let config = DockbuildConfig::default();
    match OutputFormatter::new(args.format.into()).format_config(&config) {
        Ok(output) => {
            println!("{}", output.trim_end());
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_FAILURE
        }
    }
}
