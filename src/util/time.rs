//! Time and date parsing utilities.

use crate::error::{BurrowError, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};

/// Parse a flexible time specification into a `DateTime<Utc>`.
///
/// Supports:
/// - RFC3339: `2026-01-15T12:00:00Z`
/// - Simple date: `2026-01-15` (defaults to 9:00 AM local time)
/// - Relative duration: `+1h`, `+2d`, `+1w`, `+30m`
/// - Keywords: `tomorrow`, `next-week`
///
/// # Errors
///
/// Returns a validation error for unrecognized formats, unknown duration
/// units, or ambiguous local times (DST transitions).
pub fn parse_flexible_timestamp(s: &str, field_name: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return morning_of(date, field_name);
    }

    // Relative duration (+1h, +2d, +1w, +30m)
    if let Some(rest) = s.strip_prefix('+') {
        if let Some(unit_char) = rest.chars().last() {
            let amount_str = &rest[..rest.len() - 1];
            if let Ok(amount) = amount_str.parse::<i64>() {
                let duration = match unit_char {
                    'm' => Duration::minutes(amount),
                    'h' => Duration::hours(amount),
                    'd' => Duration::days(amount),
                    'w' => Duration::weeks(amount),
                    _ => {
                        return Err(BurrowError::validation(
                            field_name,
                            "invalid unit (use m, h, d, w)",
                        ));
                    }
                };
                return Ok(Utc::now() + duration);
            }
        }
    }

    let today = Local::now().date_naive();
    match s.to_lowercase().as_str() {
        "tomorrow" => morning_of(today + Duration::days(1), field_name),
        "next-week" | "nextweek" => morning_of(today + Duration::weeks(1), field_name),
        _ => Err(BurrowError::validation(
            field_name,
            "invalid time format (try: +1h, +2d, tomorrow, next-week, or 2026-01-15)",
        )),
    }
}

fn morning_of(date: NaiveDate, field_name: &str) -> Result<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(9, 0, 0)
        .ok_or_else(|| BurrowError::validation(field_name, "invalid time"))?;
    Local
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| BurrowError::validation(field_name, "ambiguous local time"))
}
