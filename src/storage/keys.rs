// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key naming for the remote substrate.
//!
//! These literals are shared with every other client of the same contract and
//! must not change.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Key holding the JSON array of every known record id.
pub const INDEX_KEY: &str = "water_rights_keys";

/// Prefix of every record key.
pub const RECORD_PREFIX: &str = "water_right_";

/// Prefix of every generated record id.
pub const ID_PREFIX: &str = "water-";

/// Substrate key for a record.
pub fn record_key(id: &str) -> String {
    format!("{RECORD_PREFIX}{id}")
}

/// Generate a fresh record id: `water-<unix millis>-<4 random chars>`.
pub fn new_record_id(now: DateTime<Utc>) -> String {
    let entropy = Uuid::new_v4().simple().to_string();
    format!("{ID_PREFIX}{}-{}", now.timestamp_millis(), &entropy[..4])
}
