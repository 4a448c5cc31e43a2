//! Run orchestration.
//!
//! Unbuilt: load both datasets → match → build → persist.
//! Built:   load the registry → enrich within quota → persist.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

use super::builder::build_country;
use super::checkpoint::{Checkpoint, CheckpointState};
use super::enricher::{EnrichLimits, Enricher};
use super::loader::load_records;
use super::providers::{zone_display, Geocoder, ZoneLookup};
use super::types::{AddressRecord, Country, EnrichReport, JobBoardNode, RegistryError};

/// Raw dataset locations, consulted only for the first build.
#[derive(Debug, Clone)]
pub struct Sources {
    pub address_records: PathBuf,
    pub job_board: PathBuf,
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Built(Country),
    Enriched(Country, EnrichReport),
}

impl RunOutcome {
    pub fn country(&self) -> &Country {
        match self {
            Self::Built(country) | Self::Enriched(country, _) => country,
        }
    }
}

pub struct Pipeline<'a> {
    sources: Sources,
    country_id: String,
    limits: EnrichLimits,
    zones: &'a dyn ZoneLookup,
}

impl<'a> Pipeline<'a> {
    pub fn new(sources: Sources, country_id: impl Into<String>, limits: EnrichLimits, zones: &'a dyn ZoneLookup) -> Self {
        Self {
            sources,
            country_id: country_id.into(),
            limits,
            zones,
        }
    }

    /// Load the checkpoint, move it one step forward and write it back.
    ///
    /// Nothing is written if the step fails.
    pub fn run(&self, checkpoint: &Checkpoint, geocoder: Option<&dyn Geocoder>) -> Result<RunOutcome, RegistryError> {
        let state = checkpoint.load()?;
        let outcome = self.advance(state, geocoder)?;
        checkpoint.save(outcome.country())?;
        Ok(outcome)
    }

    /// One state transition, without touching the checkpoint file.
    ///
    /// The geocoder is only needed for a built registry; `None` there is a
    /// `MissingApiKey` error.
    pub fn advance(&self, state: CheckpointState, geocoder: Option<&dyn Geocoder>) -> Result<RunOutcome, RegistryError> {
        match state {
            CheckpointState::Unbuilt => {
                info!("No registry yet, building from source datasets");
                self.build().map(RunOutcome::Built)
            }
            CheckpointState::Built(mut country) => {
                let geocoder = geocoder.ok_or(RegistryError::MissingApiKey)?;
                info!(
                    "Registry found, enriching ({} of {} cities pending)",
                    country.pending_count(),
                    country.city_count()
                );
                let report = Enricher::new(geocoder, self.zones, self.limits).enrich(&mut country)?;
                Ok(RunOutcome::Enriched(country, report))
            }
        }
    }

    fn build(&self) -> Result<Country, RegistryError> {
        let records: Vec<AddressRecord> = load_records(&self.sources.address_records).unwrap_or_else(|| {
            warn!("Building without FIAS data; every city will need geocoding");
            Vec::new()
        });
        let nodes: Vec<JobBoardNode> = load_records(&self.sources.job_board).unwrap_or_default();
        build_country(&nodes, &records, &self.country_id)
    }
}

// ─── Status ─────────────────────────────────────────────────────

/// Progress snapshot of a registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySummary {
    pub country: String,
    pub regions: usize,
    pub cities: usize,
    pub resolved: usize,
    pub pending: usize,
    /// Most common zones, most frequent first.
    pub top_zones: Vec<(String, usize)>,
}

pub fn summarize(country: &Country, top: usize) -> RegistrySummary {
    let mut zones: HashMap<&str, usize> = HashMap::new();
    for city in country.cities() {
        *zones.entry(city.time_zone.as_str()).or_default() += 1;
    }
    let mut top_zones: Vec<(String, usize)> = zones.into_iter().map(|(z, n)| (z.to_string(), n)).collect();
    top_zones.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_zones.truncate(top);

    let cities = country.city_count();
    let pending = country.pending_count();
    RegistrySummary {
        country: country.name.clone(),
        regions: country.regions.len(),
        cities,
        resolved: cities - pending,
        pending,
        top_zones,
    }
}

impl fmt::Display for RegistrySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {} regions, {} cities", self.country, self.regions, self.cities)?;
        writeln!(f, "  resolved: {}", self.resolved)?;
        writeln!(f, "  pending:  {}", self.pending)?;
        if !self.top_zones.is_empty() {
            writeln!(f, "  time zones:")?;
            for (zone, count) in &self.top_zones {
                writeln!(f, "    {:>6}  {}", count, zone_display(zone))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::types::Coordinates;
    use approx::assert_abs_diff_eq;
    use std::cell::Cell;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    struct CountingGeocoder {
        calls: Cell<usize>,
    }

    impl Geocoder for CountingGeocoder {
        fn geocode(&self, _query: &str) -> Result<Option<Coordinates>, RegistryError> {
            self.calls.set(self.calls.get() + 1);
            Ok(Some(Coordinates { lat: 56.6, lon: 84.88 }))
        }
    }

    struct SiberiaOnly;

    impl ZoneLookup for SiberiaOnly {
        fn zone_at(&self, _lat: f64, _lon: f64) -> Option<String> {
            Some("Asia/Tomsk".into())
        }
    }

    const FIAS: &str = r#"[
        { "Region": "Томская", "City": "Томск", "Latitude": "56,500", "Longitude": "84,973", "TimeZone": "UTC+7", "LevelFIAS": "4" }
    ]"#;

    const HH: &str = r#"[
        { "id": "113", "name": "Россия", "areas": [
            { "id": "1255", "parent_id": "113", "name": "Томская область", "areas": [
                { "id": "90", "parent_id": "1255", "name": "Томск", "areas": [] },
                { "id": "91", "parent_id": "1255", "name": "Северск", "areas": [] }
            ]}
        ]},
        { "id": "16", "name": "Беларусь", "areas": [] }
    ]"#;

    fn setup() -> (TempDir, Sources, Checkpoint) {
        let dir = TempDir::new().unwrap();
        let sources = Sources {
            address_records: dir.path().join("Fias.json"),
            job_board: dir.path().join("AllCities.json"),
        };
        fs::write(&sources.address_records, FIAS).unwrap();
        fs::write(&sources.job_board, HH).unwrap();
        let checkpoint = Checkpoint::new(dir.path().join("Cities.json"));
        (dir, sources, checkpoint)
    }

    fn limits() -> EnrichLimits {
        EnrichLimits { quota: 30, delay: Duration::ZERO }
    }

    #[test]
    fn test_first_run_builds_without_network() {
        let (_dir, sources, checkpoint) = setup();
        let geocoder = CountingGeocoder { calls: Cell::new(0) };
        let pipeline = Pipeline::new(sources, "113", limits(), &SiberiaOnly);

        let outcome = pipeline.run(&checkpoint, Some(&geocoder)).unwrap();

        assert!(matches!(outcome, RunOutcome::Built(_)));
        assert_eq!(geocoder.calls.get(), 0);
        let CheckpointState::Built(saved) = checkpoint.load().unwrap() else {
            panic!("checkpoint not written");
        };
        assert_eq!(saved.city_count(), 2);
        let tomsk = &saved.regions[0].cities[0];
        assert_eq!((tomsk.id, tomsk.region_id), (1, 1));
        assert_abs_diff_eq!(tomsk.latitude, 56.5, epsilon = 1e-9);
        assert_abs_diff_eq!(tomsk.longitude, 84.973, epsilon = 1e-9);
        assert_eq!(saved.regions[0].cities[1].time_zone, "UTC");
    }

    #[test]
    fn test_second_run_enriches_and_keeps_ids() {
        let (_dir, sources, checkpoint) = setup();
        let geocoder = CountingGeocoder { calls: Cell::new(0) };
        let pipeline = Pipeline::new(sources.clone(), "113", limits(), &SiberiaOnly);

        pipeline.run(&checkpoint, None).unwrap();
        // Sources are not read again once the registry exists.
        fs::remove_file(&sources.address_records).unwrap();
        fs::remove_file(&sources.job_board).unwrap();

        let outcome = pipeline.run(&checkpoint, Some(&geocoder)).unwrap();

        let RunOutcome::Enriched(country, report) = outcome else {
            panic!("expected enrichment");
        };
        assert_eq!(report.requests, 1);
        assert_eq!(geocoder.calls.get(), 1);
        let ids: Vec<u32> = country.cities().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(country.cities().all(|c| c.time_zone == "Asia/Tomsk"));
        assert_eq!(checkpoint.load().unwrap(), CheckpointState::Built(country));
    }

    #[test]
    fn test_enrichment_needs_geocoder() {
        let pipeline = Pipeline::new(
            Sources { address_records: "none".into(), job_board: "none".into() },
            "113",
            limits(),
            &SiberiaOnly,
        );
        let err = pipeline.advance(CheckpointState::Built(Country::default()), None).unwrap_err();
        assert!(matches!(err, RegistryError::MissingApiKey));
    }

    #[test]
    fn test_missing_fias_still_builds() {
        let (_dir, sources, checkpoint) = setup();
        fs::remove_file(&sources.address_records).unwrap();
        let pipeline = Pipeline::new(sources, "113", limits(), &SiberiaOnly);

        let outcome = pipeline.run(&checkpoint, None).unwrap();
        assert_eq!(outcome.country().pending_count(), 2);
    }

    #[test]
    fn test_missing_job_board_writes_nothing() {
        let (_dir, sources, checkpoint) = setup();
        fs::remove_file(&sources.job_board).unwrap();
        let pipeline = Pipeline::new(sources, "113", limits(), &SiberiaOnly);

        assert!(matches!(pipeline.run(&checkpoint, None), Err(RegistryError::CountryNotFound(_))));
        assert!(!checkpoint.path().exists());
    }

    #[test]
    fn test_other_country_id() {
        let (_dir, sources, checkpoint) = setup();
        let pipeline = Pipeline::new(sources, "16", limits(), &SiberiaOnly);

        let outcome = pipeline.run(&checkpoint, None).unwrap();
        assert_eq!(outcome.country().name, "Беларусь");
        assert!(outcome.country().regions.is_empty());
    }

    #[test]
    fn test_summary() {
        let (_dir, sources, checkpoint) = setup();
        let pipeline = Pipeline::new(sources, "113", limits(), &SiberiaOnly);
        let outcome = pipeline.run(&checkpoint, None).unwrap();

        let summary = summarize(outcome.country(), 5);
        assert_eq!(summary.regions, 1);
        assert_eq!(summary.cities, 2);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.top_zones, vec![("UTC".to_string(), 1), ("UTC+7".to_string(), 1)]);

        let text = summary.to_string();
        assert!(text.starts_with("Россия: 1 regions, 2 cities"));
    }
}
