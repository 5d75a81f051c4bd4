#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Variables are restored on unwind, and access is serialized because the
/// process environment is shared by tests running in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// 2024-06-03 is a Monday.
pub fn monday_at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// A raw venue document open on Mondays between `open` and `close` hours.
pub fn monday_venue(id: &str, primary_type: &str, status: &str, open: u8, close: u8) -> Value {
    json!({
        "id": id,
        "displayName": {"text": format!("Venue {}", id), "languageCode": "en"},
        "primaryType": primary_type,
        "businessStatus": status,
        "category": 1,
        "openingHours": {
            "periods": [{
                "open": {"day": 1, "hour": open, "minute": 0},
                "close": {"day": 1, "hour": close, "minute": 0}
            }]
        }
    })
}

/// Venues A, B and C: two cafes with different Monday hours and a
/// permanently closed bar.
pub fn abc_documents() -> Vec<Value> {
    vec![
        monday_venue("A", "cafe", "OPERATIONAL", 9, 17),
        monday_venue("B", "cafe", "OPERATIONAL", 18, 22),
        monday_venue("C", "bar", "CLOSED_PERMANENTLY", 9, 17),
    ]
}
