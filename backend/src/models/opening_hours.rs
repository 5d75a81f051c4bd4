//! Opening-hours model.
//!
//! The shape follows the Google Places `openingHours` object that venue
//! documents were harvested from. Deserialization is deliberately lenient:
//! stored documents have drifted over time, and a venue whose schedule is
//! partially broken must still load (it then evaluates as closed).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Highest valid `day` value (0 = Sunday .. 6 = Saturday).
pub const LAST_DAY_OF_WEEK: u8 = 6;

/// Calendar date attached to special days and current-hours time points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// A fully specified weekly instant, produced from a complete [`TimePoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WeeklyTime {
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    /// Minutes since local midnight, 0..1440
    pub minute_of_day: u32,
}

/// A recurring weekly instant as stored on a period boundary.
///
/// Every numeric field is optional because stored data may omit any of them.
/// Use [`TimePoint::weekly`] to obtain a checked value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePoint {
    #[serde(
        default,
        alias = "dayOfWeek",
        deserialize_with = "lenient_u8",
        skip_serializing_if = "Option::is_none"
    )]
    pub day: Option<u8>,
    #[serde(
        default,
        deserialize_with = "lenient_u8",
        skip_serializing_if = "Option::is_none"
    )]
    pub hour: Option<u8>,
    #[serde(
        default,
        deserialize_with = "lenient_u8",
        skip_serializing_if = "Option::is_none"
    )]
    pub minute: Option<u8>,
    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<CalendarDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
}

impl TimePoint {
    /// Build a complete time point.
    pub fn new(day: u8, hour: u8, minute: u8) -> Self {
        Self {
            day: Some(day),
            hour: Some(hour),
            minute: Some(minute),
            ..Default::default()
        }
    }

    /// Checked weekly instant; `None` when a field is missing or out of range.
    pub fn weekly(&self) -> Option<WeeklyTime> {
        let day = self.day.filter(|d| *d <= LAST_DAY_OF_WEEK)?;
        let hour = self.hour.filter(|h| *h < 24)?;
        let minute = self.minute.filter(|m| *m < 60)?;
        Some(WeeklyTime {
            day_of_week: day,
            minute_of_day: u32::from(hour) * 60 + u32::from(minute),
        })
    }
}

/// One contiguous open interval within a week.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<TimePoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<TimePoint>,
}

impl Period {
    pub fn new(open: TimePoint, close: TimePoint) -> Self {
        Self {
            open: Some(open),
            close: Some(close),
        }
    }

    /// Both boundaries as checked weekly instants, if the period is complete.
    pub fn bounds(&self) -> Option<(WeeklyTime, WeeklyTime)> {
        let open = self.open.as_ref()?.weekly()?;
        let close = self.close.as_ref()?.weekly()?;
        Some((open, close))
    }
}

/// Exceptional calendar date. Parsed and preserved but not evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialDay {
    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<CalendarDate>,
}

/// A venue's structured opening hours.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningHours {
    /// Snapshot taken when the document was harvested; never used for evaluation.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub open_now: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_open_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_close_time: Option<String>,
    /// `None` when the source field is missing or is not an array.
    #[serde(
        default,
        deserialize_with = "lenient_periods",
        skip_serializing_if = "Option::is_none"
    )]
    pub periods: Option<Vec<Period>>,
    #[serde(default, deserialize_with = "lenient_special_days")]
    pub special_days: Vec<SpecialDay>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub weekday_descriptions: Vec<String>,
}

impl OpeningHours {
    /// Opening hours consisting only of the given periods.
    pub fn with_periods(periods: Vec<Period>) -> Self {
        Self {
            periods: Some(periods),
            ..Default::default()
        }
    }
}

fn lenient_u8<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_u64)
        .and_then(|v| u8::try_from(v).ok()))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_bool).unwrap_or(false))
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<CalendarDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_periods<'de, D>(deserializer: D) -> Result<Option<Vec<Period>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        Some(Value::Array(items)) => Ok(Some(
            items
                .into_iter()
                // A malformed element becomes an empty period, which never matches.
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
        )),
        _ => Ok(None),
    }
}

fn lenient_special_days<'de, D>(deserializer: D) -> Result<Vec<SpecialDay>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_owned))
            .collect()),
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_places_shape() {
        let hours: OpeningHours = serde_json::from_value(json!({
            "openNow": true,
            "periods": [
                {
                    "open": {"day": 1, "hour": 9, "minute": 0, "date": {"year": 2024, "month": 6, "day": 3}},
                    "close": {"day": 1, "hour": 17, "minute": 30}
                }
            ],
            "weekdayDescriptions": ["Monday: 9:00 AM – 5:30 PM"],
            "specialDays": [{"date": {"year": 2024, "month": 12, "day": 31}}],
            "nextCloseTime": "2024-06-03T08:30:00Z"
        }))
        .unwrap();

        assert!(hours.open_now);
        let periods = hours.periods.as_ref().unwrap();
        assert_eq!(periods.len(), 1);
        let (open, close) = periods[0].bounds().unwrap();
        assert_eq!(open.day_of_week, 1);
        assert_eq!(open.minute_of_day, 9 * 60);
        assert_eq!(close.minute_of_day, 17 * 60 + 30);
        assert_eq!(hours.special_days.len(), 1);
        assert_eq!(hours.weekday_descriptions.len(), 1);
        assert_eq!(hours.next_close_time.as_deref(), Some("2024-06-03T08:30:00Z"));
    }

    #[test]
    fn test_day_of_week_alias() {
        let point: TimePoint =
            serde_json::from_value(json!({"dayOfWeek": 3, "hour": 10, "minute": 15})).unwrap();
        assert_eq!(point.weekly().unwrap().day_of_week, 3);
    }

    #[test]
    fn test_missing_minute_is_incomplete() {
        let point: TimePoint = serde_json::from_value(json!({"day": 2, "hour": 10})).unwrap();
        assert_eq!(point.minute, None);
        assert!(point.weekly().is_none());
    }

    #[test]
    fn test_out_of_range_fields_are_incomplete() {
        assert!(TimePoint::new(7, 10, 0).weekly().is_none());
        assert!(TimePoint::new(1, 24, 0).weekly().is_none());
        assert!(TimePoint::new(1, 10, 60).weekly().is_none());
        assert!(TimePoint::new(6, 23, 59).weekly().is_some());
    }

    #[test]
    fn test_wrong_field_types_do_not_fail_the_document() {
        let hours: OpeningHours = serde_json::from_value(json!({
            "openNow": "yes",
            "periods": [
                {"open": {"day": "monday", "hour": 9, "minute": 0}, "close": {"day": 1, "hour": 17, "minute": 0}},
                "garbage",
                {"open": {"day": 1, "hour": -3, "minute": 0}}
            ],
            "weekdayDescriptions": "Monday: closed"
        }))
        .unwrap();

        assert!(!hours.open_now);
        let periods = hours.periods.unwrap();
        assert_eq!(periods.len(), 3);
        assert!(periods.iter().all(|p| p.bounds().is_none()));
        assert!(hours.weekday_descriptions.is_empty());
    }

    #[test]
    fn test_periods_not_an_array() {
        let hours: OpeningHours =
            serde_json::from_value(json!({"openNow": false, "periods": {"day": 1}})).unwrap();
        assert!(hours.periods.is_none());

        let hours: OpeningHours = serde_json::from_value(json!({"openNow": false})).unwrap();
        assert!(hours.periods.is_none());
    }

    #[test]
    fn test_serialize_skips_missing_fields() {
        let hours = OpeningHours::with_periods(vec![Period::new(
            TimePoint::new(0, 8, 0),
            TimePoint::new(0, 12, 0),
        )]);
        let value = serde_json::to_value(&hours).unwrap();
        assert_eq!(value["periods"][0]["open"], json!({"day": 0, "hour": 8, "minute": 0}));
        assert!(value.get("nextOpenTime").is_none());
    }
}
