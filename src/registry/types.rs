//! Core types for the registry subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Time zone written for a city whose coordinates are still unknown.
pub const UNKNOWN_TIME_ZONE: &str = "UTC";

// ─── Output hierarchy ───────────────────────────────────────────

/// Root of the persisted hierarchy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Country {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Region {
    pub id: u32,
    pub country_id: u32,
    pub name: String,
    #[serde(default)]
    pub cities: Vec<City>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct City {
    pub id: u32,
    pub region_id: u32,
    pub name_city: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

fn default_time_zone() -> String {
    UNKNOWN_TIME_ZONE.to_string()
}

impl City {
    /// Both coordinates strictly positive. Nothing in Russia sits on either
    /// zero line, so 0 doubles as "unknown".
    pub fn has_coordinates(&self) -> bool {
        self.latitude > 0.0 && self.longitude > 0.0
    }
}

impl Country {
    pub fn cities(&self) -> impl Iterator<Item = &City> {
        self.regions.iter().flat_map(|r| r.cities.iter())
    }

    pub fn city_count(&self) -> usize {
        self.regions.iter().map(|r| r.cities.len()).sum()
    }

    /// Cities still waiting for a geocoder answer.
    pub fn pending_count(&self) -> usize {
        self.cities().filter(|c| !c.has_coordinates()).count()
    }
}

// ─── FIAS classification dataset ────────────────────────────────

/// One row of the FIAS address classification export.
///
/// Only `region`, `city`, `latitude`, `longitude`, `time_zone` and
/// `level_fias` feed the registry; the rest ride along so the record
/// serializes back unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AddressRecord {
    pub id: String,
    pub post_index: String,
    pub type_region: String,
    pub type_region_num: i16,
    pub region: String,
    pub region_normal: String,
    pub type_district: String,
    pub district: String,
    pub type_city: String,
    pub city: String,
    pub city_normal: String,
    pub locality_type: String,
    pub locality: String,
    #[serde(rename = "CodeKLADR")]
    pub code_kladr: String,
    #[serde(rename = "CodeFIAS")]
    pub code_fias: String,
    /// 0 country, 1 region, 3 district, 4 city, 6 settlement, ...
    #[serde(rename = "LevelFIAS")]
    pub level_fias: String,
    pub sign_district: String,
    #[serde(rename = "CodeOKATO")]
    pub code_okato: String,
    #[serde(rename = "CodeOKTMO")]
    pub code_oktmo: String,
    #[serde(rename = "CodeIFNS")]
    pub code_ifns: String,
    pub time_zone: String,
    /// Decimal text; the separator may be `,` or `.`.
    pub latitude: String,
    pub longitude: String,
    pub federal_district: String,
    pub population: String,
}

// ─── hh.ru areas dataset ────────────────────────────────────────

/// A node of the hh.ru area tree: country → regions → cities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobBoardNode {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub areas: Vec<JobBoardNode>,
}

// ─── Geocoder payload ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GeocoderEnvelope {
    pub response: GeocoderResponse,
}

#[derive(Debug, Deserialize)]
pub struct GeocoderResponse {
    #[serde(rename = "GeoObjectCollection")]
    pub collection: GeoObjectCollection,
}

#[derive(Debug, Deserialize)]
pub struct GeoObjectCollection {
    #[serde(rename = "featureMember", default)]
    pub feature_member: Vec<FeatureMember>,
}

#[derive(Debug, Deserialize)]
pub struct FeatureMember {
    #[serde(rename = "GeoObject")]
    pub geo_object: GeoObject,
}

#[derive(Debug, Deserialize)]
pub struct GeoObject {
    #[serde(rename = "Point")]
    pub point: GeoPoint,
}

#[derive(Debug, Deserialize)]
pub struct GeoPoint {
    /// "longitude latitude", space separated.
    pub pos: String,
}

/// Coordinates extracted from a geocoder answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

// ─── Reports ────────────────────────────────────────────────────

/// What one enrichment pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichReport {
    /// Geocoder calls issued (never above the quota).
    pub requests: usize,
    /// Cities that received coordinates.
    pub updated: usize,
    pub zones_refreshed: usize,
    /// Cities whose zone could not be resolved and kept the old value.
    pub zones_kept: usize,
    pub quota_reached: bool,
}

impl fmt::Display for EnrichReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests, {} cities geocoded, {} zones refreshed, {} zones kept",
            self.requests, self.updated, self.zones_refreshed, self.zones_kept
        )?;
        if self.quota_reached {
            write!(f, " (quota reached)")?;
        }
        Ok(())
    }
}

// ─── Errors ─────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid geocoder response: {0}")]
    InvalidResponse(String),
    #[error("Invalid decimal value '{0}'")]
    InvalidDecimal(String),
    #[error("Unknown time zone '{0}'")]
    UnknownTimeZone(String),
    #[error("Country '{0}' not found in the job-board dataset")]
    CountryNotFound(String),
    #[error("Geocoder API key is not configured (use --api-key, CITIES_API_KEY or ApiKey in the settings file)")]
    MissingApiKey,
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RegistryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }
}
