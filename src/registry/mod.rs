//! City registry subsystem.
//!
//! Merges the FIAS address classification with the hh.ru area tree into a
//! Country → Region → City hierarchy, then fills missing coordinates from
//! the Yandex geocoder over as many runs as the request quota requires.

pub mod builder;
pub mod checkpoint;
pub mod decimal;
pub mod enricher;
pub mod loader;
pub mod matcher;
pub mod pipeline;
pub mod providers;
pub mod types;

pub use checkpoint::{Checkpoint, CheckpointState};
pub use enricher::{EnrichLimits, Enricher};
pub use pipeline::{summarize, Pipeline, RegistrySummary, RunOutcome, Sources};
pub use providers::{Geocoder, TzfLookup, YandexGeocoder, ZoneLookup};
pub use types::{AddressRecord, City, Coordinates, Country, EnrichReport, JobBoardNode, Region, RegistryError};
