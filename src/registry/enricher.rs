//! Coordinate enrichment pass over a built registry.
//!
//! Cities with coordinates only get their zone recomputed. Cities without
//! them get one geocoder attempt each, paced by a fixed delay, until the
//! run-wide request quota is spent. Ids are never touched.

use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::providers::{resolve_time_zone, Geocoder, ZoneLookup};
use super::types::{City, Country, EnrichReport, RegistryError};

/// Limits applied to a single enrichment run.
#[derive(Debug, Clone, Copy)]
pub struct EnrichLimits {
    /// Geocoder calls allowed per run.
    pub quota: usize,
    /// Pause before every geocoder call.
    pub delay: Duration,
}

impl Default for EnrichLimits {
    fn default() -> Self {
        Self {
            quota: 30,
            delay: Duration::from_millis(500),
        }
    }
}

pub struct Enricher<'a> {
    geocoder: &'a dyn Geocoder,
    zones: &'a dyn ZoneLookup,
    limits: EnrichLimits,
}

impl<'a> Enricher<'a> {
    pub fn new(geocoder: &'a dyn Geocoder, zones: &'a dyn ZoneLookup, limits: EnrichLimits) -> Self {
        Self { geocoder, zones, limits }
    }

    /// Run one pass over every city in region order.
    ///
    /// Stops outright once `quota` requests have been made; the rest of the
    /// country is left for the next run. A geocoder network failure aborts
    /// the pass with an error.
    pub fn enrich(&self, country: &mut Country) -> Result<EnrichReport, RegistryError> {
        let mut report = EnrichReport::default();

        'regions: for region in &mut country.regions {
            for city in &mut region.cities {
                if report.requests >= self.limits.quota {
                    report.quota_reached = true;
                    info!("Request quota of {} reached, stopping", self.limits.quota);
                    break 'regions;
                }

                if city.has_coordinates() {
                    self.refresh_zone(city, &mut report);
                    continue;
                }

                if !self.limits.delay.is_zero() {
                    thread::sleep(self.limits.delay);
                }

                let query = format!("{} {}", region.name, city.name_city);
                let answer = self.geocoder.geocode(&query);
                report.requests += 1;

                match answer {
                    Ok(Some(coords)) => {
                        city.latitude = coords.lat;
                        city.longitude = coords.lon;
                        report.updated += 1;
                        info!("{}: coordinates updated ({:.6}, {:.6})", city.name_city, coords.lat, coords.lon);
                        self.refresh_zone(city, &mut report);
                    }
                    Ok(None) => debug!("{}: geocoder returned nothing", query),
                    Err(e @ RegistryError::Network(_)) => return Err(e),
                    Err(e) => warn!("{}: {}", query, e),
                }
            }
        }

        info!("Enrichment finished: {}", report);
        Ok(report)
    }

    fn refresh_zone(&self, city: &mut City, report: &mut EnrichReport) {
        match resolve_time_zone(self.zones, city.latitude, city.longitude) {
            Ok(tz) => {
                city.time_zone = tz;
                report.zones_refreshed += 1;
            }
            Err(e) => {
                warn!("{}: {}; keeping '{}'", city.name_city, e, city.time_zone);
                report.zones_kept += 1;
            }
        }
    }
}
