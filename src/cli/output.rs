//! Output formatting for JSON, YAML and human-readable text

use anyhow::{Context, Result};
use serde::Serialize;

use crate::builder::BuildOutcome;
use crate::config::DockbuildConfig;
use crate::dockerfile::Instruction;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn structured<T: Serialize>(&self, value: &T, what: &str) -> Result<String> {
        match self.format {
            OutputFormat::Yaml => {
                serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
            }
            _ => serde_json::to_string_pretty(value)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
        }
    }

    /// Formats a parsed instruction list
    pub fn format_instructions(&self, instructions: &[Instruction]) -> Result<String> {
        if self.format != OutputFormat::Human {
            return self.structured(&instructions, "instructions");
        }

        let width = instructions
            .iter()
            .map(|i| i.line().to_string().len())
            .max()
            .unwrap_or(1);
        let mut output = String::new();
        for instruction in instructions {
            output.push_str(&format!(
                "{:>width$}  {}\n",
                instruction.line(),
                instruction,
                width = width
            ));
        }
        output.push_str(&format!("\n{} instruction(s)\n", instructions.len()));
        Ok(output)
    }

    /// Formats the result of a build
    pub fn format_outcome(&self, outcome: &BuildOutcome) -> Result<String> {
        if self.format != OutputFormat::Human {
            return self.structured(outcome, "build outcome");
        }

        let mut output = format!("{}\n", outcome.image_id);
        if let Some(tag) = &outcome.tag {
            output.push_str(&format!("Tagged {}\n", tag));
        }
        Ok(output)
    }

    /// Formats configuration display
    pub fn format_config(&self, config: &DockbuildConfig) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(config.to_string()),
            _ => self.structured(&config.to_display_map(), "config"),
        }
    }
}
