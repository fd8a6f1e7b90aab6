//! Slice configuration loading
//!
//! Slice definitions are read from JSON files in a config directory,
//! one file per slice. A missing directory or file is a warning, not
//! fatal; the affected slice is simply unavailable. Duplicate names or
//! classification keys surface later as fatal registry errors.

use crate::error::SliceResult;
use crate::slice::SliceDefinition;
use std::path::Path;
use tracing::{info, warn};

/// Load every `*.json` slice definition under `dir`.
///
/// Unreadable or unparseable files are skipped with a warning so one
/// bad slice file never takes down the others.
pub fn load_dir(dir: &Path) -> SliceResult<Vec<SliceDefinition>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "slice config directory missing, no slices loaded");
        return Ok(Vec::new());
    }

    let mut definitions = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match load_file(&path) {
            Ok(def) => {
                info!(slice = %def.name, path = %path.display(), "slice definition loaded");
                definitions.push(def);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable slice definition");
            }
        }
    }
    Ok(definitions)
}

/// Load slice definitions from `dir`, falling back to the built-in
/// URLLC/eMBB/mMTC defaults when the directory yields none.
pub fn load_or_default(dir: &Path) -> SliceResult<Vec<SliceDefinition>> {
    let definitions = load_dir(dir)?;
    if definitions.is_empty() {
        info!("using built-in default slices");
        return Ok(SliceDefinition::default_slices());
    }
    Ok(definitions)
}

fn load_file(path: &Path) -> SliceResult<SliceDefinition> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
