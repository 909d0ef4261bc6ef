//! Highlight identifiers.
//!
//! Ids are UUIDv7 strings: the first 48 bits carry a millisecond timestamp and
//! the rest is random, so ids are unique per highlight and sort by creation.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Generate a new highlight id.
#[inline]
pub fn new_highlight_id() -> String {
    Uuid::now_v7().to_string()
}

/// True when `id` has the shape of an id produced by [`new_highlight_id`].
pub fn is_highlight_id(id: &str) -> bool {
    Uuid::parse_str(id)
        .map(|uuid| uuid.get_version_num() == 7)
        .unwrap_or(false)
}

/// Creation time embedded in a highlight id, if it is a UUIDv7.
pub fn id_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let uuid = Uuid::parse_str(id).ok()?;
    if uuid.get_version_num() != 7 {
        return None;
    }
    let bytes = uuid.as_bytes();
    let millis = bytes[..6]
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    Utc.timestamp_millis_opt(millis as i64).single()
}
