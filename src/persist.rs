//! Artifact persistence
//!
//! Models are stored as pretty-printed JSON. Writes go through a temp file
//! in the target directory followed by a rename, so a crash mid-write never
//! leaves a truncated artifact behind.

use crate::error::{ChurnError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Serialize `value` as JSON at `path`, creating parent directories.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ChurnError::Serialization(e.to_string()))?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;

    info!(path = %path.display(), "saved artifact");
    Ok(())
}

/// Deserialize a JSON artifact written by [`save_json`].
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| ChurnError::Serialization(e.to_string()))
}

/// Write a plain-text report, creating parent directories.
pub fn write_text_report(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    info!(path = %path.display(), "wrote report");
    Ok(())
}
