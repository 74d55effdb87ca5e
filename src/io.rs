//! JSON I/O for hits, parameters and reports.
//!
//! - `load_hits`: one event as a JSON array of [`RawHit`]s.
//! - `load_events`: several events as a JSON array of hit arrays.
//! - `load_params`: [`FinderParams`] with defaults for missing keys.
//! - `write_json_file`: pretty-print a serializable value to disk.

use crate::error::{FinderError, Result};
use crate::finder::FinderParams;
use crate::hits::RawHit;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path).map_err(|source| FinderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| FinderError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_hits(path: &Path) -> Result<Vec<RawHit>> {
    read_json(path)
}

pub fn load_events(path: &Path) -> Result<Vec<Vec<RawHit>>> {
    read_json(path)
}

/// Loads and validates finder parameters.
pub fn load_params(path: &Path) -> Result<FinderParams> {
    let params: FinderParams = read_json(path)?;
    params.validate()?;
    Ok(params)
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> std::result::Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> std::result::Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
