// crates/entity-store-core/src/codec.rs
// ============================================================================
// Module: Attribute Value Codec
// Description: Deterministic text encodings for typed attribute values.
// Purpose: Keep numeric semantics above a storage layer that only sees text.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Attribute values are always persisted as text. This module owns the one
//! encoding for each logical type:
//! - `int64`: base-10 with an optional leading `-`.
//! - `float64`: fixed-point with [`FLOAT_FRACTION_DIGITS`] fractional digits,
//!   which round-trips every value whose decimal expansion fits in that many
//!   fractional digits.
//! - strings: passed through unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fractional digits written for `float64` values.
pub const FLOAT_FRACTION_DIGITS: usize = 30;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Value codec errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Stored text is not a number of the requested type.
    #[error("attribute value {value:?} is not a valid {target}")]
    NotNumeric {
        /// Text that failed to decode.
        value: String,
        /// Requested numeric type label.
        target: &'static str,
    },
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Encodes an `int64` attribute value.
#[must_use]
pub fn encode_int(value: i64) -> String {
    value.to_string()
}

/// Decodes an `int64` attribute value.
///
/// # Errors
///
/// Returns [`CodecError::NotNumeric`] when the text is not a base-10 `int64`.
pub fn decode_int(text: &str) -> Result<i64, CodecError> {
    text.parse::<i64>().map_err(|_| CodecError::NotNumeric {
        value: text.to_string(),
        target: "int64",
    })
}

/// Encodes a `float64` attribute value in fixed-point notation.
#[must_use]
pub fn encode_float(value: f64) -> String {
    format!("{value:.precision$}", precision = FLOAT_FRACTION_DIGITS)
}

/// Decodes a `float64` attribute value.
///
/// # Errors
///
/// Returns [`CodecError::NotNumeric`] when the text is not a float.
pub fn decode_float(text: &str) -> Result<f64, CodecError> {
    text.parse::<f64>().map_err(|_| CodecError::NotNumeric {
        value: text.to_string(),
        target: "float64",
    })
}

// ============================================================================
// SECTION: Tagged Values
// ============================================================================

/// Typed attribute value prior to encoding.
///
/// # Invariants
/// - [`AttributeValue::encode`] is the only path from a typed value to stored text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// Raw string value.
    String(String),
    /// Signed 64-bit integer value.
    Int(i64),
    /// 64-bit float value.
    Float(f64),
}

impl AttributeValue {
    /// Returns the stored text form of the value.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::String(value) => value.clone(),
            Self::Int(value) => encode_int(*value),
            Self::Float(value) => encode_float(*value),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::float_cmp,
        clippy::excessive_precision,
        reason = "Exact round trips are asserted."
    )]

    use proptest::prelude::*;

    use super::AttributeValue;
    use super::CodecError;
    use super::decode_float;
    use super::decode_int;
    use super::encode_float;
    use super::encode_int;

    #[test]
    fn float_with_long_fraction_round_trips_exactly() {
        let value = 12.123_456_789_123_456_789_123_456_789_f64;
        assert_eq!(decode_float(&encode_float(value)).unwrap(), value);
    }

    #[test]
    fn float_encoding_is_fixed_point() {
        assert_eq!(encode_float(1.5), "1.500000000000000000000000000000");
        assert_eq!(encode_float(-2.0), "-2.000000000000000000000000000000");
    }

    #[test]
    fn int_extremes_round_trip() {
        for value in [i64::MIN, -1, 0, 1, i64::MAX] {
            assert_eq!(decode_int(&encode_int(value)).unwrap(), value);
        }
    }

    #[test]
    fn non_numeric_text_is_rejected() {
        assert_eq!(
            decode_int("12.5"),
            Err(CodecError::NotNumeric {
                value: "12.5".to_string(),
                target: "int64",
            })
        );
        assert!(decode_float("twelve").is_err());
        assert!(decode_int("").is_err());
    }

    #[test]
    fn tagged_values_encode_through_codec() {
        assert_eq!(AttributeValue::from("abc").encode(), "abc");
        assert_eq!(AttributeValue::from(-42_i64).encode(), "-42");
        assert_eq!(AttributeValue::from(0.25_f64).encode(), encode_float(0.25));
    }

    proptest! {
        #[test]
        fn int_round_trip(value in any::<i64>()) {
            prop_assert_eq!(decode_int(&encode_int(value)).unwrap(), value);
        }

        #[test]
        fn float_round_trip(value in -1.0e15_f64 .. 1.0e15_f64) {
            prop_assume!(value == 0.0 || value.abs() >= 1.0e-12);
            prop_assert_eq!(decode_float(&encode_float(value)).unwrap(), value);
        }
    }
}
