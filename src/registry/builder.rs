//! One-time assembly of the Country → Region → City hierarchy.

use tracing::{debug, info, warn};

use super::decimal::parse_decimal;
use super::matcher::find_match;
use super::types::{AddressRecord, City, Country, JobBoardNode, Region, RegistryError, UNKNOWN_TIME_ZONE};

/// Identifier given to the root country in the registry.
pub const COUNTRY_ID: u32 = 1;

/// Build the hierarchy from the hh.ru subtree rooted at `country_id`,
/// pulling coordinates and zones from `records` where a match exists.
///
/// Region and city ids both start at 1; the city counter runs across the
/// whole country and is never reset per region.
pub fn build_country(
    nodes: &[JobBoardNode],
    records: &[AddressRecord],
    country_id: &str,
) -> Result<Country, RegistryError> {
    let root = nodes
        .iter()
        .find(|n| n.id == country_id)
        .ok_or_else(|| RegistryError::CountryNotFound(country_id.to_string()))?;

    let mut country = Country {
        id: COUNTRY_ID,
        name: root.name.clone(),
        regions: Vec::with_capacity(root.areas.len()),
    };

    let mut next_region = 1u32;
    let mut next_city = 1u32;
    let mut matched = 0usize;

    for area in &root.areas {
        let mut region = Region {
            id: next_region,
            country_id: COUNTRY_ID,
            name: area.name.clone(),
            cities: Vec::with_capacity(area.areas.len()),
        };

        for place in &area.areas {
            let mut city = City {
                id: next_city,
                region_id: region.id,
                name_city: place.name.clone(),
                latitude: 0.0,
                longitude: 0.0,
                time_zone: UNKNOWN_TIME_ZONE.to_string(),
            };

            if let Some(record) = find_match(records, &region.name, &place.name) {
                match record_coordinates(record) {
                    Ok((lat, lon)) => {
                        city.latitude = lat;
                        city.longitude = lon;
                        city.time_zone = record.time_zone.clone();
                        matched += 1;
                    }
                    Err(e) => warn!("{} ({}): {}; left for geocoding", place.name, region.name, e),
                }
            } else {
                debug!("No FIAS match for {} ({})", place.name, region.name);
            }

            region.cities.push(city);
            next_city += 1;
        }

        country.regions.push(region);
        next_region += 1;
    }

    info!(
        "Built {}: {} regions, {} cities ({} matched in FIAS)",
        country.name,
        country.regions.len(),
        country.city_count(),
        matched,
    );

    Ok(country)
}

fn record_coordinates(record: &AddressRecord) -> Result<(f64, f64), RegistryError> {
    Ok((parse_decimal(&record.latitude)?, parse_decimal(&record.longitude)?))
}
