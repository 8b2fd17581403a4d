//! Rendering results for the terminal and for files.
//!
//! Three formats are supported: an aligned plain-text table, CSV and a JSON
//! array of row objects. Multi-section views render each section in turn.

mod csv;
mod json;
mod text;

use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::error::{DashError, Result};
use crate::table::TabularResult;

pub use self::csv::to_csv;
pub use json::{sections_to_json, to_json};
pub use text::render_table;

/// Output format for rendered results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned plain-text table.
    #[default]
    Table,
    /// Comma-separated values with a header row.
    Csv,
    /// Pretty-printed JSON array of row objects.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "text" => Ok(Self::Table),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid output format: {s}. Expected: table, csv, or json"
            )),
        }
    }
}

impl OutputFormat {
    /// Renders a result in this format.
    pub fn render(&self, result: &TabularResult) -> Result<String> {
        match self {
            Self::Table => Ok(render_table(result)),
            Self::Csv => to_csv(result),
            Self::Json => to_json(result),
        }
    }

    /// Renders titled sections: headed tables, CSV blocks each preceded by a
    /// `# name` line, or one JSON object keyed by section name.
    pub fn render_sections(&self, sections: &[(String, TabularResult)]) -> Result<String> {
        match self {
            Self::Table => Ok(sections
                .iter()
                .map(|(name, result)| format!("== {name} ==\n{}", render_table(result)))
                .collect::<Vec<_>>()
                .join("\n\n")),
            Self::Csv => sections
                .iter()
                .map(|(name, result)| Ok(format!("# {name}\n{}", to_csv(result)?)))
                .collect::<Result<Vec<_>>>()
                .map(|blocks| blocks.join("\n")),
            Self::Json => sections_to_json(sections),
        }
    }
}

/// Writes rendered output to `path`, or to stdout when no path is given.
pub fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| {
                    DashError::io(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
            fs::write(path, content)
                .map_err(|e| DashError::io(format!("Failed to write {}: {e}", path.display())))?;
            info!("Wrote {} bytes to {}", content.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{content}")
                .map_err(|e| DashError::io(format!("Failed to write to stdout: {e}")))?;
        }
    }
    Ok(())
}
