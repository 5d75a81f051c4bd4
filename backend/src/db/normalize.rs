//! Normalization of stored venue documents into the canonical [`Venue`].
//!
//! Venue documents were written by several generations of harvesting tools,
//! so the same fact may live under different keys or in different shapes:
//!
//! | Canonical field      | Accepted keys (first present wins)                                  |
//! |----------------------|---------------------------------------------------------------------|
//! | `id`                 | `id`, `placeId`, `place_id`                                         |
//! | `locationName`       | `locationName`, `location_name`, `displayName`                      |
//! | `address`            | `address`, `formattedAddress`, `formatted_address`                  |
//! | `businessStatus`     | `businessStatus`, `business_status`                                 |
//! | `primaryType`        | `primaryType`, `primary_type`, `primaryTypeDisplayName`, `genre`    |
//! | `url`                | `url`, `googleMapsUri`                                              |
//! | `openingHours`       | `openingHours`, `currentOpeningHours`, `regularOpeningHours`, `opening_hours` |
//! | `openingHoursStatus` | `openingHoursStatus`, `opening_hours_status`                        |
//!
//! Localized text may be a plain string or `{text, languageCode}`. A key whose
//! value is `null` counts as absent.

use log::{debug, warn};
use serde_json::{Map, Value};
use std::path::Path;

use crate::models::{LatLng, LocalizedText, OpeningHours, OpeningHoursStatus, Venue};

const ID_KEYS: &[&str] = &["id", "placeId", "place_id"];
const NAME_KEYS: &[&str] = &["locationName", "location_name", "displayName"];
const ADDRESS_KEYS: &[&str] = &["address", "formattedAddress", "formatted_address"];
const STATUS_KEYS: &[&str] = &["businessStatus", "business_status"];
const TYPE_KEYS: &[&str] = &["primaryType", "primary_type", "primaryTypeDisplayName", "genre"];
const URL_KEYS: &[&str] = &["url", "googleMapsUri"];
const LOCATION_KEYS: &[&str] = &["location"];
const HOURS_KEYS: &[&str] = &[
    "openingHours",
    "currentOpeningHours",
    "regularOpeningHours",
    "opening_hours",
];
const HOURS_STATUS_KEYS: &[&str] = &["openingHoursStatus", "opening_hours_status"];
const CATEGORY_KEYS: &[&str] = &["category"];
const ALIAS_KEYS: &[&str] = &["alias"];

/// Reasons a stored document cannot become a venue.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("venue document is not a JSON object")]
    NotAnObject,

    #[error("venue document has no usable id")]
    MissingId,

    #[error("venue seed must be a JSON array of documents")]
    NotAnArray,

    #[error("failed to read venue documents: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse venue documents: {0}")]
    Json(#[from] serde_json::Error),
}

/// Map one raw document onto the canonical venue shape.
pub fn normalize_venue_document(document: Value) -> Result<Venue, NormalizeError> {
    let Value::Object(doc) = document else {
        return Err(NormalizeError::NotAnObject);
    };

    let id = pick(&doc, ID_KEYS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(NormalizeError::MissingId)?
        .to_string();

    let mut venue = Venue::new(id);
    venue.location_name = pick(&doc, NAME_KEYS).and_then(localized_text);
    venue.address = pick_string(&doc, ADDRESS_KEYS);
    venue.business_status = pick_string(&doc, STATUS_KEYS);
    venue.primary_type = pick(&doc, TYPE_KEYS).and_then(localized_text);
    venue.url = pick_string(&doc, URL_KEYS);
    venue.location = pick(&doc, LOCATION_KEYS).and_then(lat_lng);
    venue.opening_hours = pick(&doc, HOURS_KEYS).and_then(|v| opening_hours(&venue.id, v));
    venue.opening_hours_status = pick(&doc, HOURS_STATUS_KEYS).and_then(hours_status);
    venue.category = pick(&doc, CATEGORY_KEYS).and_then(|v| category(&venue.id, v));
    venue.alias = pick_string(&doc, ALIAS_KEYS);

    Ok(venue)
}

/// Normalize a batch of documents, skipping those that cannot be used.
pub fn normalize_many(documents: Vec<Value>) -> Vec<Venue> {
    let total = documents.len();
    let venues: Vec<Venue> = documents
        .into_iter()
        .enumerate()
        .filter_map(|(index, doc)| match normalize_venue_document(doc) {
            Ok(venue) => Some(venue),
            Err(e) => {
                warn!("Skipping venue document #{}: {}", index, e);
                None
            }
        })
        .collect();

    if venues.len() != total {
        warn!("Normalized {} of {} venue documents", venues.len(), total);
    }
    venues
}

/// Read a JSON array of raw venue documents from disk and normalize it.
pub fn load_venue_documents(path: impl AsRef<Path>) -> Result<Vec<Venue>, NormalizeError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    match serde_json::from_str::<Value>(&contents)? {
        Value::Array(documents) => Ok(normalize_many(documents)),
        _ => Err(NormalizeError::NotAnArray),
    }
}

fn pick<'a>(doc: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| doc.get(*key))
        .find(|value| !value.is_null())
}

fn pick_string(doc: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    pick(doc, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn localized_text(value: &Value) -> Option<LocalizedText> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(LocalizedText::new(text.trim())),
        Value::Object(fields) => {
            let text = fields.get("text").and_then(Value::as_str)?.trim();
            if text.is_empty() {
                return None;
            }
            let mut localized = LocalizedText::new(text);
            if let Some(code) = fields.get("languageCode").and_then(Value::as_str) {
                localized = localized.with_language(code);
            }
            Some(localized)
        }
        _ => None,
    }
}

fn lat_lng(value: &Value) -> Option<LatLng> {
    let fields = value.as_object()?;
    let latitude = fields
        .get("latitude")
        .or_else(|| fields.get("lat"))
        .and_then(Value::as_f64)?;
    let longitude = fields
        .get("longitude")
        .or_else(|| fields.get("lng"))
        .and_then(Value::as_f64)?;
    Some(LatLng {
        latitude,
        longitude,
    })
}

fn opening_hours(id: &str, value: &Value) -> Option<OpeningHours> {
    if !value.is_object() {
        debug!("Venue {} has non-object opening hours; treating as absent", id);
        return None;
    }
    serde_json::from_value(value.clone())
        .map_err(|e| warn!("Venue {} has unreadable opening hours: {}", id, e))
        .ok()
}

fn hours_status(value: &Value) -> Option<OpeningHoursStatus> {
    let status = value.as_str()?.trim();
    if status.is_empty() {
        return None;
    }
    // Older tooling marked failed lookups with free-form labels.
    if status.eq_ignore_ascii_case("available") {
        Some(OpeningHoursStatus::Available)
    } else {
        Some(OpeningHoursStatus::Unknown)
    }
}

fn category(id: &str, value: &Value) -> Option<i32> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        warn!("Venue {} has unusable category {}", id, value);
    }
    parsed
}
