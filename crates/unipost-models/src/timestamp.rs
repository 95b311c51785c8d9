//! Scheduling-time conventions.
//!
//! Publish times are agreed with callers in Moscow time (UTC+3, no DST).
//! A naive timestamp is interpreted as MSK; an offset-carrying timestamp
//! is converted.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

use crate::error::ValidationError;

/// Moscow standard time offset (UTC+3, fixed).
pub fn msk() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600).unwrap()
}

/// Parse a caller-supplied publish time into UTC.
///
/// Accepts RFC 3339 (offset respected), or a naive `YYYY-MM-DDTHH:MM:SS`
/// / `YYYY-MM-DD HH:MM:SS`, which is read as MSK.
pub fn parse_scheduled_at(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map_err(|_| ValidationError::InvalidScheduledAt(raw.to_string()))?;
    naive
        .and_local_timezone(msk())
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| ValidationError::InvalidScheduledAt(raw.to_string()))
}

/// Convert a UTC instant into the caller-facing MSK representation.
pub fn to_msk(dt: DateTime<Utc>) -> DateTime<FixedOffset> {
    dt.with_timezone(&msk())
}
