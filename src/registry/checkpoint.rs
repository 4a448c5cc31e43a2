//! The registry file, which doubles as the build checkpoint.
//!
//! No file means the registry has never been built. Once it exists it is the
//! only source of truth; later runs read it, enrich it and write it back.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::types::{Country, RegistryError};

/// Where a registry stands between runs.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckpointState {
    Unbuilt,
    Built(Country),
}

pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current state. A file that exists but does not parse is an
    /// error, never silently treated as unbuilt.
    pub fn load(&self) -> Result<CheckpointState, RegistryError> {
        if !self.path.exists() {
            return Ok(CheckpointState::Unbuilt);
        }
        let data = fs::read_to_string(&self.path).map_err(|e| RegistryError::io(&self.path, e))?;
        let country = serde_json::from_str(&data).map_err(|e| RegistryError::json(&self.path, e))?;
        Ok(CheckpointState::Built(country))
    }

    /// Write the registry through a sibling temp file and rename it into
    /// place, so a failed write leaves the previous checkpoint intact.
    pub fn save(&self, country: &Country) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| RegistryError::io(parent, e))?;
        }

        let json = to_registry_json(country).map_err(|e| RegistryError::json(&self.path, e))?;

        let tmp = self.temp_path();
        fs::write(&tmp, json).map_err(|e| RegistryError::io(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(RegistryError::io(&self.path, e));
        }

        info!("Registry written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "registry.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Indented JSON with every character outside Basic Latin and Cyrillic
/// written as a `\u` escape.
pub fn to_registry_json(country: &Country) -> Result<String, serde_json::Error> {
    let pretty = serde_json::to_string_pretty(country)?;
    Ok(escape_outside_cyrillic(&pretty))
}

/// Non-ASCII text only ever appears inside JSON string literals, so escaping
/// it in the finished document is equivalent to escaping it per string.
fn escape_outside_cyrillic(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() || ('\u{0400}'..='\u{04FF}').contains(&c) {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04X}", unit));
            }
        }
    }
    out
}
