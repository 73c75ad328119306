// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Indexed Record Storage
//!
//! Records and the id index live on the remote substrate as independent
//! values:
//!
//! ```text
//! water_rights_keys          # JSON array of ids (the index)
//! water_right_{id}           # JSON record per id
//! ```
//!
//! ## Consistency
//!
//! The two values are written separately and there is no transaction tying
//! them together. A failure between the writes leaves either an orphan record
//! (stored, not indexed) or a dangling id (indexed, not stored). Readers
//! tolerate both: orphans are invisible, dangling ids are skipped and logged.

pub mod index;
pub mod keys;
pub mod records;

pub use index::{KeyIndex, SubstrateKeyIndex};
pub use keys::{new_record_id, record_key, INDEX_KEY, RECORD_PREFIX};
pub use records::{RecordStore, Right, RightStatus, StoredRight, TransientReadError};
