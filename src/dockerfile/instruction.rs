//! Instruction set

use super::arguments::{self, ArgumentError};
use super::substitution;
use crate::error::ParseError;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Build-file verbs
///
/// The set is closed: every consumer matches on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    From,
    Maintainer,
    Run,
    Cmd,
    Label,
    Expose,
    Env,
    Add,
    Copy,
    Entrypoint,
    Volume,
    User,
    Workdir,
    Arg,
    Stopsignal,
    Onbuild,
}

impl Verb {
    pub const ALL: [Verb; 16] = [
        Verb::From,
        Verb::Maintainer,
        Verb::Run,
        Verb::Cmd,
        Verb::Label,
        Verb::Expose,
        Verb::Env,
        Verb::Add,
        Verb::Copy,
        Verb::Entrypoint,
        Verb::Volume,
        Verb::User,
        Verb::Workdir,
        Verb::Arg,
        Verb::Stopsignal,
        Verb::Onbuild,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::From => "FROM",
            Verb::Maintainer => "MAINTAINER",
            Verb::Run => "RUN",
            Verb::Cmd => "CMD",
            Verb::Label => "LABEL",
            Verb::Expose => "EXPOSE",
            Verb::Env => "ENV",
            Verb::Add => "ADD",
            Verb::Copy => "COPY",
            Verb::Entrypoint => "ENTRYPOINT",
            Verb::Volume => "VOLUME",
            Verb::User => "USER",
            Verb::Workdir => "WORKDIR",
            Verb::Arg => "ARG",
            Verb::Stopsignal => "STOPSIGNAL",
            Verb::Onbuild => "ONBUILD",
        }
    }

    /// Case-insensitive lookup of a verb token
    pub fn lookup(token: &str) -> Option<Verb> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(token))
    }

    /// Whether executing this verb commits a new layer
    pub fn produces_layer(&self) -> bool {
        matches!(self, Verb::Run | Verb::Add | Verb::Copy)
    }

    /// Whether the argument string goes through placeholder substitution
    ///
    /// ARG feeds its pairs straight into the build-argument map.
    pub fn substitutes(&self) -> bool {
        !matches!(self, Verb::Arg)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed instruction: its verb, the raw argument string and where it came from
///
/// The raw argument string is never modified. Execution resolves it through
/// [`Instruction::resolve_args`] against the variables in scope at that point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    verb: Verb,
    args: String,
    line: usize,
}

impl Instruction {
    /// Creates an instruction, applying the verb's construction-time checks
    pub fn new(verb: Verb, args: impl Into<String>, line: usize) -> Result<Self, ParseError> {
        let instruction = Self {
            verb,
            args: args.into(),
            line,
        };
        instruction.validate()?;
        Ok(instruction)
    }

    fn validate(&self) -> Result<(), ParseError> {
        if self.args.trim().is_empty() {
            return Err(self.invalid("This command requires at least one argument"));
        }

        match self.verb {
            Verb::From => {
                if self.args.split_whitespace().count() != 1 {
                    return Err(self.invalid("This command takes exactly one argument"));
                }
            }
            Verb::Run | Verb::Cmd | Verb::Entrypoint => {
                arguments::command(&self.args).map_err(|err| self.reject(err))?;
            }
            Verb::Maintainer
            | Verb::Label
            | Verb::Expose
            | Verb::Env
            | Verb::Add
            | Verb::Copy
            | Verb::Volume
            | Verb::User
            | Verb::Workdir
            | Verb::Arg
            | Verb::Stopsignal
            | Verb::Onbuild => {}
        }
        Ok(())
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// The argument string as written in the build file
    pub fn args(&self) -> &str {
        &self.args
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Argument string with placeholders resolved against `vars`
    pub fn resolve_args(&self, vars: &HashMap<String, String>) -> String {
        if self.verb.substitutes() {
            substitution::substitute(&self.args, vars)
        } else {
            self.args.clone()
        }
    }

    /// An invalid-arguments error for this instruction
    pub fn invalid(&self, explanation: impl Into<String>) -> ParseError {
        ParseError::InvalidArguments {
            verb: self.verb,
            line: self.line,
            explanation: explanation.into(),
        }
    }

    /// Converts an argument grammar failure into a located parse error
    pub fn reject(&self, err: ArgumentError) -> ParseError {
        match err {
            ArgumentError::Syntax(snippet) => ParseError::Syntax {
                line: self.line,
                snippet,
            },
            ArgumentError::Invalid(explanation) => self.invalid(explanation),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(Verb::lookup("from"), Some(Verb::From));
        assert_eq!(Verb::lookup("WorkDir"), Some(Verb::Workdir));
        assert_eq!(Verb::lookup("STOPSIGNAL"), Some(Verb::Stopsignal));
        assert_eq!(Verb::lookup("BOGUS"), None);
        assert_eq!(Verb::lookup("HEALTHCHECK"), None);
    }

    #[test]
    fn test_every_verb_round_trips_through_lookup() {
        for verb in Verb::ALL {
            assert_eq!(Verb::lookup(verb.as_str()), Some(verb));
        }
    }

    #[test]
    fn test_only_run_add_copy_produce_layers() {
        let layered: Vec<_> = Verb::ALL
            .into_iter()
            .filter(Verb::produces_layer)
            .collect();
        assert_eq!(layered, vec![Verb::Run, Verb::Add, Verb::Copy]);
    }

    #[test]
    fn test_from_requires_exactly_one_token() {
        assert!(Instruction::new(Verb::From, "busybox:latest", 1).is_ok());

        match Instruction::new(Verb::From, "busybox AS base", 4) {
            Err(ParseError::InvalidArguments { verb, line, .. }) => {
                assert_eq!(verb, Verb::From);
                assert_eq!(line, 4);
            }
            other => panic!("Expected InvalidArguments, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_arguments_are_rejected() {
        assert!(matches!(
            Instruction::new(Verb::Run, "", 1),
            Err(ParseError::InvalidArguments { .. })
        ));
        assert!(matches!(
            Instruction::new(Verb::From, "   ", 1),
            Err(ParseError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn test_malformed_exec_form_is_rejected() {
        assert!(matches!(
            Instruction::new(Verb::Cmd, "[\"echo\", ", 2),
            Err(ParseError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn test_resolve_args_leaves_raw_text_untouched() {
        let instruction = Instruction::new(Verb::Label, "version=${V:-dev}", 1).unwrap();
        let mut vars = HashMap::new();
        vars.insert("V".to_string(), "1.2".to_string());

        assert_eq!(instruction.resolve_args(&vars), "version=1.2");
        assert_eq!(instruction.resolve_args(&HashMap::new()), "version=dev");
        assert_eq!(instruction.args(), "version=${V:-dev}");
    }

    #[test]
    fn test_arg_is_not_substituted() {
        let instruction = Instruction::new(Verb::Arg, "A=$B", 1).unwrap();
        let mut vars = HashMap::new();
        vars.insert("B".to_string(), "x".to_string());
        assert_eq!(instruction.resolve_args(&vars), "A=$B");
    }

    #[test]
    fn test_display_renders_verb_and_args() {
        let instruction = Instruction::new(Verb::Run, "echo hi", 1).unwrap();
        assert_eq!(instruction.to_string(), "RUN echo hi");
    }
}
