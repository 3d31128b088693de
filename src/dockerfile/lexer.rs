//! Splits build-file text into logical lines

use crate::error::ParseError;
use std::iter::Enumerate;
use std::str::Lines;

/// One instruction's worth of text, after continuation joining
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// 1-based number of the first physical line
    pub line: usize,
    pub text: String,
}

/// Lazy, non-restartable iterator over the logical lines of a build file
///
/// Physical lines are trimmed; blank lines and lines starting with `#` are
/// skipped. A line ending in an unescaped `\` is buffered (marker stripped) and
/// joined with the following line. Reaching end of input with a buffered
/// fragment yields [`ParseError::UnterminatedContinuation`] and then ends.
pub struct Lexer<'a> {
    lines: Enumerate<Lines<'a>>,
    buffer: String,
    buffer_line: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            lines: content.lines().enumerate(),
            buffer: String::new(),
            buffer_line: 0,
            finished: false,
        }
    }
}

/// A trailing backslash continues the line unless it is itself escaped
fn continues(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

impl Iterator for Lexer<'_> {
    type Item = Result<LogicalLine, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        for (index, raw) in self.lines.by_ref() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if self.buffer.is_empty() {
                self.buffer_line = index + 1;
            }

            if continues(line) {
                self.buffer.push_str(&line[..line.len() - 1]);
                continue;
            }

            self.buffer.push_str(line);
            let text = std::mem::take(&mut self.buffer);
            return Some(Ok(LogicalLine {
                line: self.buffer_line,
                text,
            }));
        }

        self.finished = true;
        if self.buffer.is_empty() {
            None
        } else {
            Some(Err(ParseError::UnterminatedContinuation {
                line: self.buffer_line,
                snippet: std::mem::take(&mut self.buffer),
            }))
        }
    }
}
