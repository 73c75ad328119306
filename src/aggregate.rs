// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Marketplace statistics and search over a loaded record set.
//!
//! Everything here is pure: no substrate access. A record whose volume does
//! not decode is left out of the sums and aggregation carries on.

use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::storage::{Right, RightStatus};

/// Status filter applied by [`search`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Available,
    Traded,
}

impl StatusFilter {
    pub fn matches(&self, status: RightStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Available => status == RightStatus::Available,
            StatusFilter::Traded => status == RightStatus::Traded,
        }
    }
}

/// Number of listings per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Counts {
    pub available: usize,
    pub traded: usize,
}

/// Decoded volume summed over one location.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LocationTotal {
    pub location: String,
    pub total: f64,
}

/// All dashboard statistics in one value.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MarketSummary {
    pub counts: Counts,
    pub total_available_volume: f64,
    pub by_location: Vec<LocationTotal>,
}

pub fn counts(rights: &[Right]) -> Counts {
    rights.iter().fold(Counts::default(), |mut acc, right| {
        match right.status {
            RightStatus::Available => acc.available += 1,
            RightStatus::Traded => acc.traded += 1,
        }
        acc
    })
}

fn decoded_volume(right: &Right) -> Option<f64> {
    match right.volume() {
        Ok(volume) => Some(volume),
        Err(e) => {
            warn!(id = %right.id, error = %e, "Excluding water right with undecodable volume");
            None
        }
    }
}

/// Sum of decoded volume over available listings. Traded listings never
/// count, even when their volume decodes.
pub fn total_available_volume(rights: &[Right]) -> f64 {
    rights
        .iter()
        .filter(|right| right.is_available())
        .filter_map(decoded_volume)
        .sum()
}

/// Decoded volume per location, locations in first-seen order.
pub fn by_location(rights: &[Right]) -> Vec<LocationTotal> {
    let mut totals: Vec<LocationTotal> = Vec::new();
    for right in rights {
        let slot = match totals.iter().position(|t| t.location == right.location) {
            Some(pos) => pos,
            None => {
                totals.push(LocationTotal {
                    location: right.location.clone(),
                    total: 0.0,
                });
                totals.len() - 1
            }
        };
        if let Some(volume) = decoded_volume(right) {
            totals[slot].total += volume;
        }
    }
    totals
}

/// Case-insensitive substring match on location or id, ANDed with a status
/// filter. An empty term matches everything.
pub fn search(rights: &[Right], term: &str, filter: StatusFilter) -> Vec<Right> {
    let needle = term.to_lowercase();
    rights
        .iter()
        .filter(|right| {
            let matches_term = right.location.to_lowercase().contains(&needle)
                || right.id.to_lowercase().contains(&needle);
            matches_term && filter.matches(right.status)
        })
        .cloned()
        .collect()
}

pub fn summarize(rights: &[Right]) -> MarketSummary {
    MarketSummary {
        counts: counts(rights),
        total_available_volume: total_available_volume(rights),
        by_location: by_location(rights),
    }
}
