// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Water Rights Ledger - Indexed Record Store for a Water Rights Marketplace
//!
//! Listings are stored as JSON records on a remote key-value substrate, found
//! through a separately stored id index, and carry their volume and price in
//! an encoded form that is only decoded behind a signed attestation.
//!
//! ## Modules
//!
//! - `codec` - Encoding of sensitive numeric fields
//! - `substrate` - Key-value backends (memory, redb, EVM contract)
//! - `storage` - Record index and typed record access
//! - `marketplace` - Create and trade actions
//! - `view` - Shared view state with change notifications
//! - `aggregate` - Search and statistics
//! - `reveal` - Attested reveal protocol and signer
//! - `api` - HTTP API handlers (Axum)

pub mod aggregate;
pub mod api;
pub mod codec;
pub mod config;
pub mod error;
pub mod marketplace;
pub mod models;
pub mod reveal;
pub mod state;
pub mod storage;
pub mod substrate;
pub mod view;
