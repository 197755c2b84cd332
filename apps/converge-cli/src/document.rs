//! Desired-state document loading.
//!
//! Documents are YAML; JSON is accepted as the YAML subset it is.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{CliError, CliResult};

pub fn load_document<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    if !path.exists() {
        return Err(CliError::Validation(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("Failed to read file {}: {e}", path.display())))?;

    parse_document(&content)
}

pub fn parse_document<T: DeserializeOwned>(content: &str) -> CliResult<T> {
    serde_yaml::from_str(content).map_err(|e| {
        let location = if let Some(loc) = e.location() {
            format!(" at line {}, column {}", loc.line(), loc.column())
        } else {
            String::new()
        };
        CliError::Validation(format!("Invalid document{location}: {e}"))
    })
}
