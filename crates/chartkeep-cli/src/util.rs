//! Shared utility functions for CLI commands

use chartkeep_core::{Values, parse_set_values};
use std::path::PathBuf;

use crate::error::{CliError, Result};

/// Merge `-f` values files in order, then `--set` assignments on top
pub fn load_overrides(files: &[PathBuf], set: &[String]) -> Result<Values> {
    let mut values = Values::new();

    for file in files {
        let content = std::fs::read_to_string(file)?;
        let file_values = Values::from_yaml(&content).map_err(|e| {
            CliError::usage(format!("invalid values file {}: {}", file.display(), e))
        })?;
        values.merge(&file_values);
    }

    if !set.is_empty() {
        let set_values = parse_set_values(set).map_err(|e| CliError::usage(e.to_string()))?;
        values.merge(&set_values);
    }

    Ok(values)
}

/// Format a byte size as a human-readable string
#[must_use]
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
