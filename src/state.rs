// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::marketplace::Marketplace;
use crate::reveal::{AttestationParams, LocalKeySigner, RevealProtocol};
use crate::substrate::Backend;
use crate::view::MarketView;

/// Settings shared by every reveal request.
#[derive(Debug, Clone)]
pub struct RevealSettings {
    pub contract_address: String,
    pub chain_id: u64,
    pub duration_days: u32,
    pub signer_timeout: Duration,
    pub processing_delay: Duration,
}

#[derive(Clone)]
pub struct AppState {
    pub market: Arc<Marketplace<Backend>>,
    pub signer: Arc<LocalKeySigner>,
    pub reveal: RevealSettings,
}

impl AppState {
    pub fn new(
        backend: Backend,
        substrate_timeout: Duration,
        signer: LocalKeySigner,
        reveal: RevealSettings,
    ) -> Self {
        let market = Marketplace::new(
            Arc::new(backend),
            substrate_timeout,
            Arc::new(MarketView::new()),
        );
        Self {
            market: Arc::new(market),
            signer: Arc::new(signer),
            reveal,
        }
    }

    pub fn view(&self) -> &Arc<MarketView> {
        self.market.view()
    }

    /// Attestation for a session starting now.
    pub fn attestation(&self) -> AttestationParams {
        AttestationParams::new(
            self.signer.public_key_hex(),
            self.reveal.contract_address.clone(),
            self.reveal.chain_id,
            Utc::now().timestamp(),
            self.reveal.duration_days,
        )
    }

    /// Reveal protocol bound to a fresh attestation.
    pub fn reveal_protocol(&self) -> RevealProtocol<Arc<LocalKeySigner>> {
        RevealProtocol::new(self.signer.clone(), self.attestation())
            .with_signer_timeout(self.reveal.signer_timeout)
            .with_processing_delay(self.reveal.processing_delay)
    }
}
