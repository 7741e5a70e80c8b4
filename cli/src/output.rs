//! Result output for opusctl commands.

use std::{fs::File, io::Write};

use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// YAML format (default).
    #[default]
    Yaml,
    /// JSON format.
    Json,
}

/// Output configuration.
pub struct Output {
    pub format: OutputFormat,
    pub file: Option<String>,
}

impl Output {
    /// Creates a new output configuration.
    pub fn new(format: OutputFormat, file: Option<String>) -> Self {
        Self { format, file }
    }

    /// Outputs the result.
    pub fn write<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let output = match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
        };

        match &self.file {
            Some(path) => {
                let mut file = File::create(path)?;
                file.write_all(output.as_bytes())?;
            }
            None => {
                println!("{}", output);
            }
        }

        Ok(())
    }
}
