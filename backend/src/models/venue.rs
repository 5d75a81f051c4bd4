//! Venue model in its canonical shape.
//!
//! Stored documents may use older field names; those are mapped onto this
//! shape by [`crate::db::normalize`] before any venue reaches the services.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::opening_hours::OpeningHours;

/// Business status reported for venues that no longer exist.
pub const CLOSED_PERMANENTLY: &str = "CLOSED_PERMANENTLY";

/// Text with an optional BCP-47 language code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedText {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl LocalizedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language_code: None,
        }
    }

    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = Some(language_code.into());
        self
    }
}

/// Geographic coordinates in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

/// Outcome of the last attempt to fetch opening hours for a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpeningHoursStatus {
    /// Hours were fetched and stored.
    Available,
    /// A lookup was made but the provider had no hours for this venue.
    Unknown,
}

/// Curated venue categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VenueCategory {
    IndoorSeatingAllowed = 1,
    TerraceSeatingAllowed = 2,
    FavouriteNotAllowed = 3,
}

impl VenueCategory {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for VenueCategory {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::IndoorSeatingAllowed),
            2 => Ok(Self::TerraceSeatingAllowed),
            3 => Ok(Self::FavouriteNotAllowed),
            other => Err(format!("Unknown venue category: {}", other)),
        }
    }
}

impl fmt::Display for VenueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::IndoorSeatingAllowed => "indoor seating allowed",
            Self::TerraceSeatingAllowed => "terrace seating allowed",
            Self::FavouriteNotAllowed => "favourite, not allowed",
        };
        f.write_str(label)
    }
}

/// A physical venue shown on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    /// Provider place identifier
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_type: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LatLng>,
    /// Absent when no schedule is known; distinct from "known and closed".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<OpeningHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours_status: Option<OpeningHoursStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<i32>,
    /// Name the curators used for the venue in their own lists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Venue {
    /// Create a venue with only an identifier set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location_name: None,
            address: None,
            business_status: None,
            primary_type: None,
            url: None,
            location: None,
            opening_hours: None,
            opening_hours_status: None,
            category: None,
            alias: None,
        }
    }

    pub fn primary_type_text(&self) -> Option<&str> {
        self.primary_type.as_ref().map(|t| t.text.as_str())
    }

    pub fn is_permanently_closed(&self) -> bool {
        self.business_status.as_deref() == Some(CLOSED_PERMANENTLY)
    }

    pub fn has_schedule(&self) -> bool {
        self.opening_hours.is_some()
    }

    /// Best human-readable label: location name, then alias, then id.
    pub fn display_name(&self) -> &str {
        self.location_name
            .as_ref()
            .map(|n| n.text.as_str())
            .or(self.alias.as_deref())
            .unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_codes() {
        assert_eq!(VenueCategory::try_from(2), Ok(VenueCategory::TerraceSeatingAllowed));
        assert_eq!(VenueCategory::FavouriteNotAllowed.code(), 3);
        assert!(VenueCategory::try_from(0).is_err());
        assert!(VenueCategory::try_from(4).is_err());
    }

    #[test]
    fn test_canonical_json_shape() {
        let mut venue = Venue::new("place-1");
        venue.primary_type = Some(LocalizedText::new("Cafe").with_language("en"));
        venue.category = Some(1);
        venue.opening_hours_status = Some(OpeningHoursStatus::Unknown);

        let value = serde_json::to_value(&venue).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "place-1",
                "primaryType": {"text": "Cafe", "languageCode": "en"},
                "openingHoursStatus": "unknown",
                "category": 1
            })
        );

        let back: Venue = serde_json::from_value(value).unwrap();
        assert_eq!(back, venue);
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut venue = Venue::new("abc");
        assert_eq!(venue.display_name(), "abc");
        venue.alias = Some("corner cafe".to_string());
        assert_eq!(venue.display_name(), "corner cafe");
        venue.location_name = Some(LocalizedText::new("Corner Cafe"));
        assert_eq!(venue.display_name(), "Corner Cafe");
    }

    #[test]
    fn test_permanently_closed() {
        let mut venue = Venue::new("x");
        assert!(!venue.is_permanently_closed());
        venue.business_status = Some("OPERATIONAL".to_string());
        assert!(!venue.is_permanently_closed());
        venue.business_status = Some(CLOSED_PERMANENTLY.to_string());
        assert!(venue.is_permanently_closed());
    }
}
