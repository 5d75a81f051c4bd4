//! Opening-hours evaluation.
//!
//! Decides whether a venue is open at a wall-clock instant from its weekly
//! periods. The evaluation is pure: no I/O, no shared state, and the result
//! only depends on the arguments (and on the process clock when no instant
//! is given).
//!
//! Rules:
//! - No schedule, or a schedule whose `periods` is missing, means closed.
//! - A period only matches on the day of its `open` boundary; a period whose
//!   close falls on a later day is not extended past midnight.
//! - The interval is half-open: the closing minute itself is closed.
//! - Incomplete periods are skipped rather than treated as errors.

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use log::debug;

use crate::models::{OpeningHours, Period, WeeklyTime};

/// Returns `true` when `hours` has a period covering `instant`.
///
/// `instant` is a local wall-clock datetime; `None` evaluates at the current
/// local time of the process.
pub fn is_open_at(hours: Option<&OpeningHours>, instant: Option<NaiveDateTime>) -> bool {
    let Some(periods) = hours.and_then(|h| h.periods.as_deref()) else {
        return false;
    };

    let instant = instant.unwrap_or_else(|| Local::now().naive_local());
    let now = weekly_time(instant);

    periods.iter().any(|period| period_covers(period, now))
}

/// Weekly position of a calendar datetime (0 = Sunday).
pub fn weekly_time(instant: NaiveDateTime) -> WeeklyTime {
    WeeklyTime {
        day_of_week: instant.weekday().num_days_from_sunday() as u8,
        minute_of_day: instant.hour() * 60 + instant.minute(),
    }
}

fn period_covers(period: &Period, now: WeeklyTime) -> bool {
    let Some((open, close)) = period.bounds() else {
        debug!("Skipping incomplete opening period: {:?}", period);
        return false;
    };

    open.day_of_week == now.day_of_week
        && open.minute_of_day <= now.minute_of_day
        && now.minute_of_day < close.minute_of_day
}
