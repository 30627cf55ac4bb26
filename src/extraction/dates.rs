//! Delivery-date normalization to ISO `YYYY-MM-DD`.
//!
//! Customers write dates day-first (European/Indonesian order), so
//! `03.04.26` is the 3rd of April 2026, never March 4th.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T ].*)?$").expect("valid regex"));

static DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[./-](\d{1,2})[./-](\d{2}|\d{4})$").expect("valid regex")
});

/// Normalize a delivery date, or `None` when it is not a real calendar date.
pub fn normalize_delivery_date(raw: &str) -> Option<String> {
    let raw = raw.trim();

    let (year, month, day): (i32, u32, u32) = if let Some(caps) = ISO_DATE.captures(raw) {
        (caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
    } else if let Some(caps) = DAY_FIRST.captures(raw) {
        let year_str = &caps[3];
        let mut year: i32 = year_str.parse().ok()?;
        if year_str.len() == 2 {
            year += 2000;
        }
        (year, caps[2].parse().ok()?, caps[1].parse().ok()?)
    } else {
        return None;
    };

    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}
