//! Matching hh.ru cities against FIAS records.
//!
//! hh.ru spells regions out ("Томская область", "Республика Коми") while
//! FIAS keeps the bare name plus an abbreviated type ("Томская обл",
//! "Коми"). Stripping the type words and testing containment bridges most
//! of the gap. First hit in dataset order wins; there is no scoring.

use super::types::AddressRecord;

const PREFIX_TOKENS: &[&str] = &["Республика "];
const SUFFIX_TOKENS: &[&str] = &[" область", " край", " Республика"];

/// Strip region-type words so the name can be searched for in FIAS.
///
/// Used only for matching; the display name written to the registry is
/// left as hh.ru has it.
pub fn normalize_region_name(name: &str) -> &str {
    let mut normalized = name.trim();
    for token in PREFIX_TOKENS {
        if let Some(rest) = normalized.strip_prefix(token) {
            normalized = rest;
        }
    }
    for token in SUFFIX_TOKENS {
        if let Some(rest) = normalized.strip_suffix(token) {
            normalized = rest;
        }
    }
    normalized
}

/// Find the first record whose city equals `city` exactly and whose region
/// contains the normalized `region`.
pub fn find_match<'a>(
    records: &'a [AddressRecord],
    region: &str,
    city: &str,
) -> Option<&'a AddressRecord> {
    let region_key = normalize_region_name(region);
    records
        .iter()
        .find(|r| r.city == city && r.region.contains(region_key))
}
