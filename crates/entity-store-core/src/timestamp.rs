// crates/entity-store-core/src/timestamp.rs
// ============================================================================
// Module: Entity Store Timestamps
// Description: Second-precision UTC timestamps and their text forms.
// Purpose: Give every dialect one timestamp layout to write and read back.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Timestamps are stored as text literals in dialect-specific column types.
//! The store normalizes every value to UTC and truncates it to whole seconds
//! so a value written and read back compares equal. A timestamp equal to the
//! Unix epoch counts as "unset" and is replaced with the current time before
//! insert.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::UtcOffset;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Layout of the date-time prefix shared by every accepted timestamp text.
const DATETIME_LAYOUT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
/// Length of the `YYYY-MM-DD HH:MM:SS` prefix.
const DATETIME_PREFIX_LEN: usize = 19;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current UTC time truncated to whole seconds.
#[must_use]
pub fn now() -> OffsetDateTime {
    truncate(OffsetDateTime::now_utc())
}

/// Normalizes a timestamp to UTC and drops sub-second precision.
#[must_use]
pub fn truncate(value: OffsetDateTime) -> OffsetDateTime {
    let value = value.to_offset(UtcOffset::UTC);
    value.replace_nanosecond(0).unwrap_or(value)
}

/// Returns true when the timestamp has never been assigned.
#[must_use]
pub fn is_unset(value: OffsetDateTime) -> bool {
    value == OffsetDateTime::UNIX_EPOCH
}

/// Returns `value`, or the current time when it is unset.
#[must_use]
pub fn or_now(value: OffsetDateTime) -> OffsetDateTime {
    if is_unset(value) { now() } else { truncate(value) }
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS` in UTC.
#[must_use]
pub fn format_datetime(value: OffsetDateTime) -> String {
    let value = truncate(value);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        value.year(),
        u8::from(value.month()),
        value.day(),
        value.hour(),
        value.minute(),
        value.second()
    )
}

/// Parses the timestamp text returned by a backend.
///
/// Accepts `YYYY-MM-DD[ T]HH:MM:SS`, optional fractional seconds (dropped) and
/// an optional `Z` or `±HH[:MM]` offset. Text without an offset is UTC.
///
/// # Errors
///
/// Returns a description of the problem when the text is not a timestamp.
pub fn parse_datetime(text: &str) -> Result<OffsetDateTime, String> {
    let text = text.trim();
    let head = text
        .get(.. DATETIME_PREFIX_LEN)
        .ok_or_else(|| format!("timestamp too short: {text}"))?;
    let tail = text.get(DATETIME_PREFIX_LEN ..).unwrap_or_default();
    let head = head.replacen('T', " ", 1);
    let primitive = PrimitiveDateTime::parse(&head, DATETIME_LAYOUT)
        .map_err(|err| format!("invalid timestamp {text}: {err}"))?;
    let mut rest = tail;
    if let Some(fraction) = rest.strip_prefix('.') {
        rest = fraction.trim_start_matches(|c: char| c.is_ascii_digit());
    }
    let offset = parse_offset(rest.trim())
        .ok_or_else(|| format!("invalid timestamp offset: {text}"))?;
    Ok(primitive.assume_offset(offset).to_offset(UtcOffset::UTC))
}

/// Parses an `Z`, `+HH`, `+HH:MM` or `+HHMM` suffix.
fn parse_offset(text: &str) -> Option<UtcOffset> {
    if text.is_empty() || text == "Z" || text.eq_ignore_ascii_case("utc") {
        return Some(UtcOffset::UTC);
    }
    let (sign, digits) = match text.split_at_checked(1)? {
        ("+", digits) => (1_i8, digits),
        ("-", digits) => (-1_i8, digits),
        _ => return None,
    };
    let digits: String = digits.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i8>().ok()?, 0),
        4 => (digits.get(.. 2)?.parse::<i8>().ok()?, digits.get(2 ..)?.parse::<i8>().ok()?),
        _ => return None,
    };
    UtcOffset::from_hms(sign * hours, sign * minutes, 0).ok()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
