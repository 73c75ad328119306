// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared marketplace view.
//!
//! One [`MarketView`] holds what readers display: the last record set loaded
//! from the substrate, the search/filter inputs, the selected listing and any
//! values revealed for it. Mutations go through typed methods and every change
//! is published on a `watch` channel, so subscribers always see a consistent
//! snapshot.
//!
//! The view is a cache. It is only updated from confirmed substrate reads and
//! can be rebuilt at any time with a refresh.

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::aggregate::{self, MarketSummary, StatusFilter};
use crate::marketplace::ActionOutcome;
use crate::reveal::RevealedValues;
use crate::storage::Right;

/// Point-in-time copy of the view.
#[derive(Debug, Clone, Default)]
pub struct ViewSnapshot {
    /// Records, newest first
    pub rights: Vec<Right>,
    pub search: String,
    pub filter: StatusFilter,
    /// Id of the listing open in a detail view
    pub selected: Option<String>,
    /// Values revealed for the selected listing; never persisted
    pub revealed: Option<RevealedValues>,
    pub loaded_at: Option<DateTime<Utc>>,
    /// Progress or result of the last create/trade action
    pub action: Option<ActionOutcome>,
    /// Incremented on every change
    pub version: u64,
}

impl ViewSnapshot {
    pub fn filtered(&self) -> Vec<Right> {
        aggregate::search(&self.rights, &self.search, self.filter)
    }

    pub fn selected_right(&self) -> Option<&Right> {
        let id = self.selected.as_deref()?;
        self.rights.iter().find(|right| right.id == id)
    }
}

pub struct MarketView {
    tx: watch::Sender<ViewSnapshot>,
}

impl Default for MarketView {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketView {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ViewSnapshot::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.tx.borrow().clone()
    }

    /// Receiver notified after every change.
    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.tx.subscribe()
    }

    fn update(&self, change: impl FnOnce(&mut ViewSnapshot)) {
        self.tx.send_modify(|view| {
            change(view);
            view.version += 1;
        });
    }

    /// Replace the record set with a fresh load. A selection whose record is
    /// gone is dropped together with its revealed values.
    pub fn replace_rights(&self, rights: Vec<Right>) {
        self.update(|view| {
            view.rights = rights;
            view.loaded_at = Some(Utc::now());
            let still_present = view
                .selected
                .as_deref()
                .is_some_and(|id| view.rights.iter().any(|r| r.id == id));
            if !still_present {
                view.selected = None;
                view.revealed = None;
            }
        });
    }

    pub fn set_search(&self, term: impl Into<String>) {
        let term = term.into();
        self.update(|view| view.search = term);
    }

    pub fn set_filter(&self, filter: StatusFilter) {
        self.update(|view| view.filter = filter);
    }

    pub fn filtered(&self) -> Vec<Right> {
        self.tx.borrow().filtered()
    }

    pub fn summary(&self) -> MarketSummary {
        aggregate::summarize(&self.tx.borrow().rights)
    }

    /// Open a listing. Returns false if it is not in the current record set.
    pub fn select(&self, id: &str) -> bool {
        let known = self.tx.borrow().rights.iter().any(|r| r.id == id);
        if known {
            self.update(|view| {
                view.selected = Some(id.to_string());
                view.revealed = None;
            });
        }
        known
    }

    pub fn selected(&self) -> Option<Right> {
        self.tx.borrow().selected_right().cloned()
    }

    /// Attach revealed values to the selected listing. Ignored when `id` is
    /// not the current selection.
    pub fn set_revealed(&self, id: &str, values: RevealedValues) -> bool {
        let is_selected = self.tx.borrow().selected.as_deref() == Some(id);
        if is_selected {
            self.update(|view| view.revealed = Some(values));
        }
        is_selected
    }

    pub fn set_action(&self, outcome: ActionOutcome) {
        self.update(|view| view.action = Some(outcome));
    }

    /// Hide revealed values but keep the listing open.
    pub fn clear_revealed(&self) {
        self.update(|view| view.revealed = None);
    }

    /// Close the detail view, dropping revealed values.
    pub fn clear_selection(&self) {
        self.update(|view| {
            view.selected = None;
            view.revealed = None;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RightStatus;

    fn right(id: &str, location: &str, status: RightStatus) -> Right {
        Right {
            id: id.into(),
            encoded_volume: "10".into(),
            encoded_price: "1".into(),
            timestamp: 0,
            owner: "0xowner".into(),
            location: location.into(),
            status,
            new_owner: None,
        }
    }

    fn values() -> RevealedValues {
        RevealedValues {
            volume: 10.0,
            price: 1.0,
            signature: "0xsig".into(),
        }
    }

    #[test]
    fn filters_apply_to_snapshot() {
        let view = MarketView::new();
        view.replace_rights(vec![
            right("a", "Colorado River Basin", RightStatus::Available),
            right("b", "Basin A", RightStatus::Traded),
        ]);

        view.set_search("RIVER");
        assert_eq!(view.filtered().len(), 1);

        view.set_search("");
        view.set_filter(StatusFilter::Traded);
        let filtered = view.filtered();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "b");
    }

    #[test]
    fn selection_and_reveal_lifecycle() {
        let view = MarketView::new();
        view.replace_rights(vec![right("a", "Basin A", RightStatus::Available)]);

        assert!(!view.select("missing"));
        assert!(!view.set_revealed("a", values()));

        assert!(view.select("a"));
        assert!(view.set_revealed("a", values()));
        assert_eq!(view.snapshot().revealed, Some(values()));

        view.clear_revealed();
        let snapshot = view.snapshot();
        assert_eq!(snapshot.selected.as_deref(), Some("a"));
        assert!(snapshot.revealed.is_none());

        assert!(view.set_revealed("a", values()));
        view.clear_selection();
        let snapshot = view.snapshot();
        assert!(snapshot.selected.is_none());
        assert!(snapshot.revealed.is_none());
    }

    #[test]
    fn reload_drops_vanished_selection() {
        let view = MarketView::new();
        view.replace_rights(vec![right("a", "Basin A", RightStatus::Available)]);
        view.select("a");
        view.set_revealed("a", values());

        view.replace_rights(vec![right("a", "Basin A", RightStatus::Traded)]);
        assert_eq!(view.selected().unwrap().status, RightStatus::Traded);
        assert!(view.snapshot().revealed.is_some());

        view.replace_rights(Vec::new());
        assert!(view.selected().is_none());
        assert!(view.snapshot().revealed.is_none());
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let view = MarketView::new();
        let mut rx = view.subscribe();
        let before = rx.borrow().version;

        view.replace_rights(vec![right("a", "Basin A", RightStatus::Available)]);
        rx.changed().await.unwrap();

        let seen = rx.borrow_and_update();
        assert!(seen.version > before);
        assert_eq!(seen.rights.len(), 1);
        assert!(seen.loaded_at.is_some());
    }
}
