// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Field codec for the sensitive numeric attributes of a water right.
//!
//! Volumes and prices are stored as opaque tagged strings:
//!
//! ```text
//! FHE-<base64 of the decimal text>
//! ```
//!
//! ## Security Note
//!
//! This is **at-rest obfuscation, not encryption**. Anyone holding the stored
//! value can decode it with the rule below. Confidentiality would need a real
//! key-management layer; the reveal protocol only gates *this application's*
//! decoding step behind a signed attestation.

use base64ct::{Base64, Encoding};

/// Marker prefixed to every encoded value.
pub const ENCODED_PREFIX: &str = "FHE-";

/// Error returned when an opaque field cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(String),

    #[error("payload is not valid UTF-8")]
    Utf8,

    #[error("not a number: {0:?}")]
    NotANumber(String),
}

/// Encode a numeric value into its tagged opaque form.
pub fn encode(value: f64) -> String {
    let text = value.to_string();
    format!("{ENCODED_PREFIX}{}", Base64::encode_string(text.as_bytes()))
}

/// Decode an opaque field.
///
/// Values without the marker are parsed as plain numbers so that legacy or
/// externally written records still decode.
pub fn decode(data: &str) -> Result<f64, DecodeError> {
    match data.strip_prefix(ENCODED_PREFIX) {
        Some(payload) => {
            let bytes =
                Base64::decode_vec(payload).map_err(|e| DecodeError::Base64(e.to_string()))?;
            let text = std::str::from_utf8(&bytes).map_err(|_| DecodeError::Utf8)?;
            parse_number(text)
        }
        None => parse_number(data),
    }
}

/// Returns true if the value carries the encoded marker.
pub fn is_encoded(data: &str) -> bool {
    data.starts_with(ENCODED_PREFIX)
}

fn parse_number(text: &str) -> Result<f64, DecodeError> {
    let trimmed = text.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| !v.is_nan())
        .ok_or_else(|| DecodeError::NotANumber(trimmed.to_string()))
}
