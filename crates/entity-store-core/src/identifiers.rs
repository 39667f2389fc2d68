// crates/entity-store-core/src/identifiers.rs
// ============================================================================
// Module: Entity Store Identifiers
// Description: Generator for opaque, time-ordered record identifiers.
// Purpose: Assign ids to entities and attributes that arrive without one.
// Dependencies: rand, time
// ============================================================================

//! ## Overview
//! Generated identifiers are 32 ASCII digits: the UTC creation instant
//! (`YYYYMMDDHHMMSS` followed by six microsecond digits) and twelve random
//! digits. Lexical order therefore tracks creation order, which keeps the
//! default `id ASC` listing close to insertion order.

use rand::Rng;
use time::OffsetDateTime;

/// Length of every generated identifier.
pub const GENERATED_ID_LENGTH: usize = 32;
/// Number of random digits appended to the time prefix.
const RANDOM_DIGITS: usize = 12;

/// Generates a new opaque identifier.
#[must_use]
pub fn generate_id() -> String {
    let now = OffsetDateTime::now_utc();
    let mut id = format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}{:06}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.microsecond()
    );
    let mut rng = rand::thread_rng();
    for _ in 0 .. RANDOM_DIGITS {
        id.push(char::from(b'0' + rng.gen_range(0 .. 10_u8)));
    }
    id
}
