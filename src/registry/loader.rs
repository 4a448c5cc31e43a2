//! Source dataset loading.
//!
//! A missing or malformed source file is not fatal: it is reported and the
//! caller gets `None`, then decides how to degrade.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use super::types::RegistryError;

/// Read a JSON array of `T` from `path`.
///
/// Returns `None` when the file does not exist or does not deserialize.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Option<Vec<T>> {
    match read_records(path) {
        Ok(Some(records)) => {
            info!("Loaded {} records from {}", records.len(), path.display());
            Some(records)
        }
        Ok(None) => {
            warn!("Dataset file not found: {}", path.display());
            None
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>, RegistryError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path).map_err(|e| RegistryError::io(path, e))?;
    let records = serde_json::from_str(&data).map_err(|e| RegistryError::json(path, e))?;
    Ok(Some(records))
}
