use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use super::schema::venues;
use crate::models::{LatLng, LocalizedText, OpeningHours, OpeningHoursStatus, Venue};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = venues)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // Timestamps are only read by operators
pub struct VenueRow {
    pub venue_pk: i64,
    pub place_id: String,
    pub location_name: Option<String>,
    pub location_name_lang: Option<String>,
    pub address: Option<String>,
    pub business_status: Option<String>,
    pub primary_type: Option<String>,
    pub primary_type_lang: Option<String>,
    pub url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub opening_hours: Option<Value>,
    pub opening_hours_status: Option<String>,
    pub category: Option<i32>,
    pub alias: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column values written on insert and on update.
///
/// `None` fields overwrite stored values with NULL so an update fully
/// replaces the venue.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = venues)]
#[diesel(treat_none_as_null = true)]
pub struct NewVenueRow {
    pub place_id: String,
    pub location_name: Option<String>,
    pub location_name_lang: Option<String>,
    pub address: Option<String>,
    pub business_status: Option<String>,
    pub primary_type: Option<String>,
    pub primary_type_lang: Option<String>,
    pub url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub opening_hours: Option<Value>,
    pub opening_hours_status: Option<String>,
    pub category: Option<i32>,
    pub alias: Option<String>,
}

fn status_to_column(status: OpeningHoursStatus) -> &'static str {
    match status {
        OpeningHoursStatus::Available => "available",
        OpeningHoursStatus::Unknown => "unknown",
    }
}

fn status_from_column(status: &str) -> OpeningHoursStatus {
    if status == "available" {
        OpeningHoursStatus::Available
    } else {
        OpeningHoursStatus::Unknown
    }
}

impl NewVenueRow {
    pub fn from_venue(venue: &Venue) -> Result<Self, serde_json::Error> {
        let opening_hours = venue
            .opening_hours
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        Ok(Self {
            place_id: venue.id.clone(),
            location_name: venue.location_name.as_ref().map(|n| n.text.clone()),
            location_name_lang: venue
                .location_name
                .as_ref()
                .and_then(|n| n.language_code.clone()),
            address: venue.address.clone(),
            business_status: venue.business_status.clone(),
            primary_type: venue.primary_type.as_ref().map(|t| t.text.clone()),
            primary_type_lang: venue
                .primary_type
                .as_ref()
                .and_then(|t| t.language_code.clone()),
            url: venue.url.clone(),
            latitude: venue.location.map(|l| l.latitude),
            longitude: venue.location.map(|l| l.longitude),
            opening_hours,
            opening_hours_status: venue
                .opening_hours_status
                .map(|s| status_to_column(s).to_string()),
            category: venue.category,
            alias: venue.alias.clone(),
        })
    }
}

fn localized(text: Option<String>, language_code: Option<String>) -> Option<LocalizedText> {
    text.map(|text| LocalizedText {
        text,
        language_code,
    })
}

impl VenueRow {
    /// Rebuild the canonical venue. Unreadable stored hours become absent.
    pub fn into_venue(self) -> Venue {
        let opening_hours = self.opening_hours.and_then(|value| {
            serde_json::from_value::<OpeningHours>(value)
                .map_err(|e| {
                    log::warn!(
                        "Stored opening hours for venue {} are unreadable: {}",
                        self.place_id,
                        e
                    )
                })
                .ok()
        });

        let location = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(LatLng {
                latitude,
                longitude,
            }),
            _ => None,
        };

        Venue {
            id: self.place_id,
            location_name: localized(self.location_name, self.location_name_lang),
            address: self.address,
            business_status: self.business_status,
            primary_type: localized(self.primary_type, self.primary_type_lang),
            url: self.url,
            location,
            opening_hours,
            opening_hours_status: self.opening_hours_status.as_deref().map(status_from_column),
            category: self.category,
            alias: self.alias,
        }
    }
}
