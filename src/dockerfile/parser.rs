//! Build-file parser

use super::instruction::{Instruction, Verb};
use super::lexer::{Lexer, LogicalLine};
use crate::error::ParseError;
use std::path::Path;
use tracing::debug;

/// Turns build-file text into an ordered list of instructions
#[derive(Debug, Default, Clone, Copy)]
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Parses build-file content
    ///
    /// Stops at the first lexing or construction error.
    pub fn parse(&self, content: &str) -> Result<Vec<Instruction>, ParseError> {
        Lexer::new(content)
            .map(|line| line.and_then(Self::instruction))
            .collect()
    }

    /// Reads and parses the build file at `path`
    pub fn parse_from(&self, path: &Path) -> Result<Vec<Instruction>, ParseError> {
        let content = std::fs::read_to_string(path).map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let instructions = self.parse(&content)?;
        debug!(
            path = %path.display(),
            instructions = instructions.len(),
            "Parsed build file"
        );
        Ok(instructions)
    }

    fn instruction(logical: LogicalLine) -> Result<Instruction, ParseError> {
        let (token, args) = match logical.text.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim_start()),
            None => (logical.text.as_str(), ""),
        };

        let verb = Verb::lookup(token).ok_or_else(|| ParseError::UnrecognizedCommand {
            line: logical.line,
            command: token.to_string(),
        })?;

        Instruction::new(verb, args, logical.line)
    }
}
