use std::path::Path;

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `CommandFileEntry` used across dcon components.
pub struct CommandFileEntry {
    pub line_number: usize,
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Public struct `CommandFileReport` used across dcon components.
pub struct CommandFileReport {
    pub total: usize,
    pub executed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub halted_early: bool,
}

pub fn parse_command_file(path: &Path) -> Result<Vec<CommandFileEntry>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read command file {}", path.display()))?;
    let mut entries = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        entries.push(CommandFileEntry {
            line_number: index + 1,
            command: trimmed.to_string(),
        });
    }
    Ok(entries)
}
