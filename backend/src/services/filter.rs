//! Filter compilation and application.
//!
//! Raw filter inputs arrive either as a JSON object or as URL query pairs, and
//! every multi-valued field may be a scalar or a list. [`build_filter`] folds
//! them into a [`FilterSpec`]; [`FilterSpec::to_query`] derives the constraints
//! a repository applies natively, and [`apply_filter`] enforces the same
//! constraints in process, drops venues that are closed at the requested
//! instant and annotates every survivor with its open state.
//!
//! Bad input never fails a request: unparseable values are logged and ignored.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::db::repository::VenueQuery;
use crate::models::{Venue, CLOSED_PERMANENTLY};
use crate::services::schedule::is_open_at;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Category as sent by a client: JSON numbers or query-string text.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCategory {
    Int(i64),
    Text(String),
}

/// Boolean flag as sent by a client.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFlag {
    Bool(bool),
    Text(String),
}

impl RawFlag {
    fn is_set(&self) -> bool {
        match self {
            RawFlag::Bool(value) => *value,
            RawFlag::Text(text) => matches!(
                text.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes"
            ),
        }
    }
}

/// Filter parameters exactly as received, before any normalization.
///
/// Built from URL query pairs ([`RawFilterParams::from_query_pairs`]) or
/// from a JSON object through [`Deserialize`]. Both forms share one key
/// table, so `type`, `types`, `primaryType` and their `[]` variants all
/// feed the same list. Values of an unexpected shape are logged and dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFilterParams {
    pub types: Vec<String>,
    pub categories: Vec<RawCategory>,
    pub open_at: Option<String>,
    pub open_now: Option<RawFlag>,
    pub exclude_business_status: Vec<String>,
}

impl RawFilterParams {
    /// Collect parameters from URL query pairs.
    ///
    /// Keys may repeat (`type=a&type=b`), use the bracket form (`type[]=a`)
    /// or the plural form (`types=a`). Empty values are ignored.
    pub fn from_query_pairs<K, V>(pairs: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = RawFilterParams::default();
        for (key, value) in pairs {
            params.accept(key.as_ref(), &Value::String(value.as_ref().to_string()));
        }
        params
    }

    /// Collect parameters from a JSON object.
    ///
    /// Any field may hold a scalar or a list. A body that is not an object
    /// carries no constraint.
    pub fn from_json(value: Value) -> Self {
        let mut params = RawFilterParams::default();
        match value {
            Value::Object(fields) => {
                for (key, value) in fields {
                    match value {
                        Value::Array(items) => {
                            for item in &items {
                                params.accept(&key, item);
                            }
                        }
                        other => params.accept(&key, &other),
                    }
                }
            }
            Value::Null => {}
            other => warn!("Ignoring filter body that is not an object: {}", other),
        }
        params
    }

    fn accept(&mut self, key: &str, value: &Value) {
        let key = key.trim_end_matches("[]");
        if value.is_null() || value.as_str().is_some_and(|s| s.trim().is_empty()) {
            return;
        }

        match key {
            "type" | "types" | "primaryType" => push_text(&mut self.types, key, value),
            "category" | "categories" => match value {
                Value::Number(n) => match n.as_i64() {
                    Some(code) => self.categories.push(RawCategory::Int(code)),
                    None => warn!("Ignoring non-integer category filter value {}", n),
                },
                Value::String(text) => self.categories.push(RawCategory::Text(text.trim().to_string())),
                other => warn!("Ignoring category filter value {}", other),
            },
            "openAt" => match value {
                Value::String(text) => self.open_at = Some(text.trim().to_string()),
                other => warn!("Ignoring openAt value {}; expected a datetime string", other),
            },
            "openNow" => match value {
                Value::Bool(flag) => self.open_now = Some(RawFlag::Bool(*flag)),
                Value::String(text) => self.open_now = Some(RawFlag::Text(text.clone())),
                Value::Number(n) => self.open_now = Some(RawFlag::Text(n.to_string())),
                other => warn!("Ignoring openNow value {}", other),
            },
            "excludeBusinessStatus" => push_text(&mut self.exclude_business_status, key, value),
            other => debug!("Ignoring unknown filter parameter '{}'", other),
        }
    }
}

fn push_text(target: &mut Vec<String>, key: &str, value: &Value) {
    match value.as_str() {
        Some(text) => target.push(text.trim().to_string()),
        None => warn!("Ignoring non-string {} filter value {}", key, value),
    }
}

impl<'de> Deserialize<'de> for RawFilterParams {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from_json)
    }
}

/// The instant against which venues are checked for being open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetInstant {
    /// Evaluate at the request's current time.
    Now,
    /// Evaluate at an explicit local wall-clock datetime.
    At(NaiveDateTime),
}

impl TargetInstant {
    /// Parse `now`, an RFC 3339 timestamp or a naive local datetime.
    ///
    /// For RFC 3339 input the wall-clock time in the given offset is used.
    /// A space in place of a `+` offset sign is accepted, since an unencoded
    /// `+` in a query string decodes to a space.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("now") {
            return Some(TargetInstant::Now);
        }

        if let Some(datetime) = parse_rfc3339(input) {
            return Some(TargetInstant::At(datetime.naive_local()));
        }

        NAIVE_DATETIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
            .map(TargetInstant::At)
    }

    pub fn resolve(self, now: NaiveDateTime) -> NaiveDateTime {
        match self {
            TargetInstant::Now => now,
            TargetInstant::At(instant) => instant,
        }
    }
}

fn parse_rfc3339(input: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(input) {
        return Some(datetime);
    }

    let (head, offset) = input.rsplit_once(' ')?;
    let is_offset = offset.len() == 5
        && offset
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 2 { b == b':' } else { b.is_ascii_digit() });
    if !is_offset || !head.contains('T') {
        return None;
    }
    DateTime::parse_from_rfc3339(&format!("{}+{}", head, offset)).ok()
}

/// Normalized, request-scoped filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    /// Accepted `primaryType.text` values; empty means unconstrained.
    pub types: BTreeSet<String>,
    /// Accepted category codes; empty means unconstrained.
    pub categories: BTreeSet<i32>,
    /// Always contains [`CLOSED_PERMANENTLY`].
    pub exclude_business_status: BTreeSet<String>,
    pub target_instant: Option<TargetInstant>,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            types: BTreeSet::new(),
            categories: BTreeSet::new(),
            exclude_business_status: BTreeSet::from([CLOSED_PERMANENTLY.to_string()]),
            target_instant: None,
        }
    }
}

impl FilterSpec {
    /// Constraints for the repository. The time filter is never pushed down.
    pub fn to_query(&self) -> VenueQuery {
        VenueQuery {
            business_status_not_in: self.exclude_business_status.clone(),
            primary_type_in: (!self.types.is_empty()).then(|| self.types.clone()),
            category_in: (!self.categories.is_empty()).then(|| self.categories.clone()),
        }
    }
}

/// Normalize raw filter inputs into a [`FilterSpec`].
pub fn build_filter(raw: RawFilterParams) -> FilterSpec {
    let types = raw
        .types
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let categories = raw.categories.into_iter().filter_map(parse_category).collect();

    let mut exclude_business_status = BTreeSet::from([CLOSED_PERMANENTLY.to_string()]);
    exclude_business_status.extend(
        raw.exclude_business_status
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    );

    let explicit = raw
        .open_at
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| {
            let parsed = TargetInstant::parse(s);
            if parsed.is_none() {
                warn!("Ignoring malformed openAt value '{}'", s);
            }
            parsed
        });

    let target_instant = explicit.or_else(|| {
        raw.open_now
            .filter(RawFlag::is_set)
            .map(|_| TargetInstant::Now)
    });

    FilterSpec {
        types,
        categories,
        exclude_business_status,
        target_instant,
    }
}

fn parse_category(raw: RawCategory) -> Option<i32> {
    match raw {
        RawCategory::Int(value) => i32::try_from(value)
            .map_err(|_| warn!("Ignoring out-of-range category filter value {}", value))
            .ok(),
        RawCategory::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            text.parse::<i32>()
                .map_err(|_| warn!("Ignoring malformed category filter value '{}'", text))
                .ok()
        }
    }
}

/// A venue together with its open state at the evaluated instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedVenue {
    #[serde(flatten)]
    pub venue: Venue,
    pub is_open_now: bool,
    pub has_schedule: bool,
}

impl AnnotatedVenue {
    /// Annotate `venue` with its open state at `instant`.
    pub fn evaluate(venue: Venue, instant: NaiveDateTime) -> Self {
        let is_open_now = is_open_at(venue.opening_hours.as_ref(), Some(instant));
        let has_schedule = venue.has_schedule();
        Self {
            venue,
            is_open_now,
            has_schedule,
        }
    }
}

/// Apply `spec` to `venues`, keeping their relative order.
///
/// `now` is the request's clock reading. With a target instant only venues
/// open at that instant survive; without one nothing is dropped for being
/// closed and the annotation is computed at `now`.
pub fn apply_filter(venues: Vec<Venue>, spec: &FilterSpec, now: NaiveDateTime) -> Vec<AnnotatedVenue> {
    let query = spec.to_query();
    let target = spec.target_instant.map(|t| t.resolve(now));
    let evaluate_at = target.unwrap_or(now);

    venues
        .into_iter()
        .filter(|venue| query.matches(venue))
        .map(|venue| AnnotatedVenue::evaluate(venue, evaluate_at))
        .filter(|annotated| target.is_none() || annotated.is_open_now)
        .collect()
}
