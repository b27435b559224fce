//! Canonical textual form of a link's expiration time.
//!
//! Stored records keep `expire` as `day.month.year hour:minute:second`
//! in UTC with no zero padding, e.g. `10.1.2380 1:0:0`. The same format
//! is accepted from clients when a link is created.

use crate::error::StorageError;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use jiff::Timestamp;

pub const EXPIRE_FORMAT: &str = "%-d.%-m.%Y %-H:%-M:%-S";

/// Formats a timestamp in the canonical expire format.
///
/// Sub-second precision is dropped.
pub fn format_expire(at: Timestamp) -> String {
    at.to_zoned(TimeZone::UTC).strftime(EXPIRE_FORMAT).to_string()
}

/// Parses the canonical expire format as a UTC instant.
pub fn parse_expire(value: &str) -> Result<Timestamp, StorageError> {
    let invalid = |e: jiff::Error| {
        StorageError::InvalidData(format!("invalid expire timestamp '{value}': {e}"))
    };

    let datetime = DateTime::strptime(EXPIRE_FORMAT, value).map_err(invalid)?;
    let zoned = datetime.to_zoned(TimeZone::UTC).map_err(invalid)?;
    Ok(zoned.timestamp())
}

/// Drops the sub-second part so the value survives a trip through
/// [`format_expire`] and [`parse_expire`] unchanged.
pub fn truncate_to_second(at: Timestamp) -> Timestamp {
    Timestamp::from_second(at.as_second()).unwrap_or(at)
}
