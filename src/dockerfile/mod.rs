//! Build-file interpretation: lexing, parsing, placeholder substitution

pub mod arguments;
pub mod instruction;
pub mod lexer;
pub mod parser;
pub mod substitution;

pub use arguments::Command;
pub use instruction::{Instruction, Verb};
pub use lexer::{Lexer, LogicalLine};
pub use parser::Parser;
pub use substitution::{substitute, DefaultMode, Placeholder};
