//! Run settings: defaults, then settings files, then command-line/env.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::registry::{EnrichLimits, RegistryError, Sources};

/// hh.ru area id of Russia.
pub const DEFAULT_COUNTRY_ID: &str = "113";
pub const DEFAULT_REQUEST_QUOTA: usize = 30;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;
pub const DEFAULT_DATA_DIR: &str = "Data";

/// Settings files read from the working directory when `--config` is not
/// given. Both are optional; later ones win.
pub const DEFAULT_SETTINGS_FILES: &[&str] = &["appsettings.json", "appsettings.Development.json"];

pub const ADDRESS_RECORDS_FILE: &str = "Fias.json";
pub const JOB_BOARD_FILE: &str = "AllCities.json";
pub const REGISTRY_FILE: &str = "Cities.json";

/// One layer of optional values, from a settings file or the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SettingsLayer {
    pub api_key: Option<String>,
    pub country_id: Option<String>,
    pub request_quota: Option<usize>,
    pub request_delay_ms: Option<u64>,
    pub data_dir: Option<PathBuf>,
}

impl SettingsLayer {
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let data = fs::read_to_string(path).map_err(|e| RegistryError::io(path, e))?;
        serde_json::from_str(&data).map_err(|e| RegistryError::json(path, e))
    }

    /// Values set in `other` replace ours.
    pub fn merge(self, other: SettingsLayer) -> SettingsLayer {
        SettingsLayer {
            api_key: other.api_key.or(self.api_key),
            country_id: other.country_id.or(self.country_id),
            request_quota: other.request_quota.or(self.request_quota),
            request_delay_ms: other.request_delay_ms.or(self.request_delay_ms),
            data_dir: other.data_dir.or(self.data_dir),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub country_id: String,
    pub request_quota: usize,
    pub request_delay: Duration,
    pub data_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_layer(SettingsLayer::default())
    }
}

impl Settings {
    /// Resolve settings. An explicit `config` path must exist; the default
    /// files are skipped when absent.
    pub fn load(config: Option<&Path>, overrides: SettingsLayer) -> Result<Self, RegistryError> {
        let mut layer = SettingsLayer::default();
        match config {
            Some(path) => layer = layer.merge(SettingsLayer::from_file(path)?),
            None => {
                for name in DEFAULT_SETTINGS_FILES {
                    let path = Path::new(name);
                    if path.exists() {
                        layer = layer.merge(SettingsLayer::from_file(path)?);
                    }
                }
            }
        }
        let settings = Self::from_layer(layer.merge(overrides));
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_layer(layer: SettingsLayer) -> Self {
        Self {
            api_key: layer.api_key.filter(|k| !k.trim().is_empty()),
            country_id: layer.country_id.unwrap_or_else(|| DEFAULT_COUNTRY_ID.to_string()),
            request_quota: layer.request_quota.unwrap_or(DEFAULT_REQUEST_QUOTA),
            request_delay: Duration::from_millis(layer.request_delay_ms.unwrap_or(DEFAULT_REQUEST_DELAY_MS)),
            data_dir: layer.data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        }
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.country_id.trim().is_empty() {
            return Err(RegistryError::Config("CountryId must not be empty".into()));
        }
        Ok(())
    }

    pub fn sources(&self) -> Sources {
        Sources {
            address_records: self.data_dir.join(ADDRESS_RECORDS_FILE),
            job_board: self.data_dir.join(JOB_BOARD_FILE),
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join(REGISTRY_FILE)
    }

    pub fn limits(&self) -> EnrichLimits {
        EnrichLimits {
            quota: self.request_quota,
            delay: self.request_delay,
        }
    }
}
