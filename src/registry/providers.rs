//! External lookups: Yandex geocoder and coordinate → time zone.

use chrono::{Offset, TimeZone, Utc};
use chrono_tz::Tz;
use tzf_rs::DefaultFinder;
use ureq::Agent;

use super::decimal::parse_decimal;
use super::types::{Coordinates, GeocoderEnvelope, RegistryError};

// ─── Geocoder ───────────────────────────────────────────────────

const GEOCODER_URL: &str = "https://geocode-maps.yandex.ru/1.x/";
const USER_AGENT: &str = "CityRegistry";

/// Free-text geocoding.
///
/// `Ok(None)` means the provider answered but had nothing usable; `Err`
/// with `Network` means the call itself failed.
pub trait Geocoder {
    fn geocode(&self, query: &str) -> Result<Option<Coordinates>, RegistryError>;
}

/// Yandex Maps HTTP geocoder.
pub struct YandexGeocoder {
    agent: Agent,
    api_key: String,
}

impl YandexGeocoder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().user_agent(USER_AGENT).build(),
            api_key: api_key.into(),
        }
    }
}

impl Geocoder for YandexGeocoder {
    fn geocode(&self, query: &str) -> Result<Option<Coordinates>, RegistryError> {
        let response = self
            .agent
            .get(GEOCODER_URL)
            .query("apikey", &self.api_key)
            .query("geocode", query)
            .query("format", "json")
            .call()
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        let body = response
            .into_string()
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        parse_geocoder_response(&body)
    }
}

/// Pull the first feature's position out of a geocoder answer.
///
/// Empty bodies, bodies that are not the expected JSON, and answers with no
/// features all give `Ok(None)`. A position that is present but cannot be
/// read is an `InvalidResponse`.
pub fn parse_geocoder_response(body: &str) -> Result<Option<Coordinates>, RegistryError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let envelope: GeocoderEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) => return Ok(None),
    };
    let Some(feature) = envelope.response.collection.feature_member.first() else {
        return Ok(None);
    };
    parse_position(&feature.geo_object.point.pos).map(Some)
}

/// Parse a "lon lat" position string.
fn parse_position(pos: &str) -> Result<Coordinates, RegistryError> {
    let mut parts = pos.split_whitespace();
    let (Some(lon), Some(lat), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(RegistryError::InvalidResponse(format!("bad position '{}'", pos)));
    };
    let invalid = |_| RegistryError::InvalidResponse(format!("bad position '{}'", pos));
    Ok(Coordinates {
        lat: parse_decimal(lat).map_err(invalid)?,
        lon: parse_decimal(lon).map_err(invalid)?,
    })
}

// ─── Time zones ─────────────────────────────────────────────────

/// Raw coordinate → zone identifier lookup.
pub trait ZoneLookup {
    /// Zone identifier at the point, or `None` if the point is outside every
    /// known zone polygon.
    fn zone_at(&self, lat: f64, lon: f64) -> Option<String>;
}

/// Offline polygon lookup backed by the tzf dataset.
pub struct TzfLookup {
    finder: DefaultFinder,
}

impl TzfLookup {
    pub fn new() -> Self {
        Self { finder: DefaultFinder::new() }
    }
}

impl Default for TzfLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneLookup for TzfLookup {
    fn zone_at(&self, lat: f64, lon: f64) -> Option<String> {
        let name = self.finder.get_tz_name(lon, lat);
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}

/// Resolve coordinates to a canonical IANA zone name.
///
/// The identifier from `lookup` is checked against the compiled tz database;
/// anything it does not know is an `UnknownTimeZone` error.
pub fn resolve_time_zone(lookup: &dyn ZoneLookup, lat: f64, lon: f64) -> Result<String, RegistryError> {
    let id = lookup
        .zone_at(lat, lon)
        .ok_or_else(|| RegistryError::UnknownTimeZone(format!("{:.4}, {:.4}", lat, lon)))?;
    let tz: Tz = id
        .parse()
        .map_err(|_| RegistryError::UnknownTimeZone(id.clone()))?;
    Ok(tz.name().to_string())
}

/// "Asia/Tomsk (UTC+07:00)" for IANA names, the raw value otherwise.
pub fn zone_display(name: &str) -> String {
    match name.parse::<Tz>() {
        Ok(tz) => {
            let offset = tz.offset_from_utc_datetime(&Utc::now().naive_utc()).fix();
            format!("{} (UTC{})", tz.name(), offset)
        }
        Err(_) => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    struct FixedZone(Option<&'static str>);

    impl ZoneLookup for FixedZone {
        fn zone_at(&self, _lat: f64, _lon: f64) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    const TOMSK_RESPONSE: &str = r#"{
        "response": {
            "GeoObjectCollection": {
                "metaDataProperty": { "GeocoderResponseMetaData": { "found": "1" } },
                "featureMember": [
                    { "GeoObject": { "name": "Томск", "Point": { "pos": "84.947649 56.484645" } } },
                    { "GeoObject": { "name": "Томский район", "Point": { "pos": "85.0 56.0" } } }
                ]
            }
        }
    }"#;

    #[test]
    fn test_parse_first_feature() {
        let coords = parse_geocoder_response(TOMSK_RESPONSE).unwrap().unwrap();
        assert_abs_diff_eq!(coords.lat, 56.484645, epsilon = 1e-9);
        assert_abs_diff_eq!(coords.lon, 84.947649, epsilon = 1e-9);
    }

    #[test]
    fn test_parse_comma_position() {
        let body = r#"{"response":{"GeoObjectCollection":{"featureMember":[
            {"GeoObject":{"Point":{"pos":"37,617635 55,755814"}}}]}}}"#;
        let coords = parse_geocoder_response(body).unwrap().unwrap();
        assert_abs_diff_eq!(coords.lat, 55.755814, epsilon = 1e-9);
        assert_abs_diff_eq!(coords.lon, 37.617635, epsilon = 1e-9);
    }

    #[test]
    fn test_parse_no_features() {
        let body = r#"{"response":{"GeoObjectCollection":{"featureMember":[]}}}"#;
        assert!(parse_geocoder_response(body).unwrap().is_none());
    }

    #[test]
    fn test_parse_empty_or_foreign_body() {
        assert!(parse_geocoder_response("").unwrap().is_none());
        assert!(parse_geocoder_response("<html>503</html>").unwrap().is_none());
        assert!(parse_geocoder_response(r#"{"statusCode":403,"error":"Forbidden"}"#).unwrap().is_none());
    }

    #[test]
    fn test_parse_bad_position() {
        let body = r#"{"response":{"GeoObjectCollection":{"featureMember":[
            {"GeoObject":{"Point":{"pos":"84.94"}}}]}}}"#;
        assert!(matches!(
            parse_geocoder_response(body),
            Err(RegistryError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_resolve_canonical_name() {
        let tz = resolve_time_zone(&FixedZone(Some("Asia/Tomsk")), 56.5, 84.97).unwrap();
        assert_eq!(tz, "Asia/Tomsk");
    }

    #[test]
    fn test_resolve_unknown_identifier() {
        let err = resolve_time_zone(&FixedZone(Some("Mars/Olympus")), 1.0, 1.0).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTimeZone(id) if id == "Mars/Olympus"));
    }

    #[test]
    fn test_resolve_outside_polygons() {
        assert!(resolve_time_zone(&FixedZone(None), 1.0, 1.0).is_err());
    }

    #[test]
    fn test_tzf_moscow() {
        let lookup = TzfLookup::new();
        assert_eq!(resolve_time_zone(&lookup, 55.7558, 37.6173).unwrap(), "Europe/Moscow");
    }

    #[test]
    fn test_zone_display() {
        assert_eq!(zone_display("Europe/Moscow"), "Europe/Moscow (UTC+03:00)");
        assert_eq!(zone_display("UTC+7"), "UTC+7");
    }
}
