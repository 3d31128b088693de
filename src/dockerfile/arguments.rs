//! Argument grammars shared by the instructions
//!
//! Every function here works on an already-resolved argument string and
//! reports failures as [`ArgumentError`]; the caller attaches the verb and
//! line via [`super::Instruction::reject`].

use serde::Serialize;

/// Why an argument string was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    /// Malformed text; carries the offending snippet
    Syntax(String),
    /// Well-formed text the grammar does not accept; carries an explanation
    Invalid(String),
}

/// A command in shell form or exec form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// `RUN apt-get update`
    Shell(String),
    /// `RUN ["apt-get", "update"]`
    Exec(Vec<String>),
}

impl Command {
    /// Argument vector handed to the engine; shell form runs under `/bin/sh -c`
    pub fn argv(&self) -> Vec<String> {
        match self {
            Command::Shell(script) => vec!["/bin/sh".to_string(), "-c".to_string(), script.clone()],
            Command::Exec(argv) => argv.clone(),
        }
    }
}

fn is_json_array(args: &str) -> bool {
    args.trim_start().starts_with('[')
}

fn json_array(args: &str) -> Result<Vec<String>, ArgumentError> {
    serde_json::from_str::<Vec<String>>(args.trim()).map_err(|e| {
        ArgumentError::Invalid(format!("Expected a JSON array of strings: {}", e))
    })
}

/// Splits shell-style words, honoring quotes and backslash escapes
pub fn words(args: &str) -> Result<Vec<String>, ArgumentError> {
    shell_words::split(args).map_err(|_| ArgumentError::Syntax(args.to_string()))
}

/// `key=value` tokens, as used by LABEL and ARG
pub fn key_values(args: &str) -> Result<Vec<(String, String)>, ArgumentError> {
    words(args)?
        .into_iter()
        .map(|token| match token.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(ArgumentError::Syntax(token)),
        })
        .collect()
}

/// ENV grammar: `KEY VALUE`, or one or more `KEY=VALUE` tokens
pub fn env_pairs(args: &str) -> Result<Vec<(String, String)>, ArgumentError> {
    let tokens = words(args)?;
    if tokens.len() == 2 && !tokens[0].contains('=') {
        let mut tokens = tokens.into_iter();
        let key = tokens.next().unwrap_or_default();
        let value = tokens.next().unwrap_or_default();
        return Ok(vec![(key, value)]);
    }
    if tokens.is_empty() {
        return Err(ArgumentError::Invalid(
            "Expected KEY VALUE or KEY=VALUE pairs".to_string(),
        ));
    }
    key_values(args)
}

/// Whitespace-separated port numbers
pub fn ports(args: &str) -> Result<Vec<u16>, ArgumentError> {
    args.split_whitespace()
        .map(|token| {
            token.parse::<u16>().map_err(|_| {
                ArgumentError::Invalid(format!("\"{}\" is not a valid port number", token))
            })
        })
        .collect()
}

/// A JSON array or a shell-word list
pub fn string_list(args: &str) -> Result<Vec<String>, ArgumentError> {
    if is_json_array(args) {
        json_array(args)
    } else {
        words(args)
    }
}

/// Shell-form or exec-form command
pub fn command(args: &str) -> Result<Command, ArgumentError> {
    if is_json_array(args) {
        let argv = json_array(args)?;
        if argv.is_empty() {
            return Err(ArgumentError::Invalid(
                "Exec form needs at least one element".to_string(),
            ));
        }
        Ok(Command::Exec(argv))
    } else {
        Ok(Command::Shell(args.trim().to_string()))
    }
}

/// ADD/COPY arguments: every element but the last is a source, the last is the destination
pub fn sources_and_destination(args: &str) -> Result<(Vec<String>, String), ArgumentError> {
    let mut paths = string_list(args)?;
    if paths.len() < 2 {
        return Err(ArgumentError::Invalid(
            "Expected at least one source and a destination".to_string(),
        ));
    }
    let destination = paths.pop().unwrap_or_default();
    Ok((paths, destination))
}
