// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Reveal Protocol
//!
//! Decoding a listing's volume and price is gated behind a signed
//! attestation. Each reveal request runs through:
//!
//! ```text
//! Idle → AwaitingSignature → Decrypting → Revealed
//!               │
//!               └──────────→ Failed (rejected / timed out / signer error)
//! ```
//!
//! The attestation message binds the session's public key material to the
//! marketplace contract, its chain and a validity window. Its layout is what
//! the signer signs, so every client reading the same contract must produce
//! it byte for byte:
//!
//! ```text
//! publickey:<key>
//! contractAddresses:<address>
//! contractsChainId:<id>
//! startTimestamp:<ts>
//! durationDays:<days>
//! ```
//!
//! Revealed values are never persisted. They live in the returned
//! [`RevealSession`] until the caller clears it.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::codec::{self, DecodeError};

pub mod signer;

pub use signer::{LocalKeySigner, MessageSigner, SignerError};

/// Default attestation validity.
pub const DEFAULT_DURATION_DAYS: u32 = 30;

/// Default bound on the signer wait.
pub const DEFAULT_SIGNER_TIMEOUT: Duration = Duration::from_secs(60);

const SECONDS_PER_DAY: i64 = 86_400;

/// Inputs of the attestation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AttestationParams {
    pub public_key: String,
    pub contract_address: String,
    pub chain_id: u64,
    /// Window start, seconds since epoch
    pub start_timestamp: i64,
    pub duration_days: u32,
}

impl AttestationParams {
    /// Parameters for a session starting at `start_timestamp`.
    pub fn new(
        public_key: impl Into<String>,
        contract_address: impl Into<String>,
        chain_id: u64,
        start_timestamp: i64,
        duration_days: u32,
    ) -> Self {
        Self {
            public_key: public_key.into(),
            contract_address: contract_address.into(),
            chain_id,
            start_timestamp,
            duration_days,
        }
    }

    /// The exact text handed to the signer.
    pub fn message(&self) -> String {
        format!(
            "publickey:{}\ncontractAddresses:{}\ncontractsChainId:{}\nstartTimestamp:{}\ndurationDays:{}",
            self.public_key,
            self.contract_address,
            self.chain_id,
            self.start_timestamp,
            self.duration_days
        )
    }

    /// Inverse of [`message`](Self::message). Fields must appear in order.
    pub fn parse(message: &str) -> Option<Self> {
        let mut lines = message.split('\n');
        let mut field = |name: &str| -> Option<String> {
            lines
                .next()?
                .strip_prefix(name)?
                .strip_prefix(':')
                .map(str::to_string)
        };

        let public_key = field("publickey")?;
        let contract_address = field("contractAddresses")?;
        let chain_id = field("contractsChainId")?.parse().ok()?;
        let start_timestamp = field("startTimestamp")?.parse().ok()?;
        let duration_days = field("durationDays")?.parse().ok()?;

        if lines.next().is_some() {
            return None;
        }

        Some(Self {
            public_key,
            contract_address,
            chain_id,
            start_timestamp,
            duration_days,
        })
    }

    /// End of the validity window, seconds since epoch.
    pub fn expires_at(&self) -> i64 {
        self.start_timestamp
            .saturating_add(i64::from(self.duration_days) * SECONDS_PER_DAY)
    }

    pub fn is_active(&self, now: i64) -> bool {
        now >= self.start_timestamp && now < self.expires_at()
    }
}

/// Phase of a reveal request, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RevealPhase {
    Idle,
    AwaitingSignature,
    Decrypting,
    Revealed,
    Failed,
}

/// Why a reveal request failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RevealFailure {
    #[error("Signature rejected by user: {0}")]
    SignerRejected(String),

    #[error("Signer error: {0}")]
    SignerError(String),

    #[error("Signer did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Could not decode {field}: {source}")]
    Decode {
        field: &'static str,
        source: DecodeError,
    },
}

impl RevealFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            RevealFailure::SignerRejected(_) => "signer_rejected",
            RevealFailure::SignerError(_) => "signer_error",
            RevealFailure::Timeout(_) => "timeout",
            RevealFailure::Decode { .. } => "decode_error",
        }
    }
}

/// Decoded sensitive fields.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RevealedValues {
    pub volume: f64,
    pub price: f64,
    /// Signature that authorized the reveal
    pub signature: String,
}

/// State of one reveal request.
#[derive(Debug, Clone, PartialEq)]
pub enum RevealState {
    Idle,
    AwaitingSignature,
    Decrypting,
    Revealed(RevealedValues),
    Failed(RevealFailure),
}

impl RevealState {
    pub fn phase(&self) -> RevealPhase {
        match self {
            RevealState::Idle => RevealPhase::Idle,
            RevealState::AwaitingSignature => RevealPhase::AwaitingSignature,
            RevealState::Decrypting => RevealPhase::Decrypting,
            RevealState::Revealed(_) => RevealPhase::Revealed,
            RevealState::Failed(_) => RevealPhase::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RevealState::Revealed(_) | RevealState::Failed(_))
    }
}

/// Transient holder of one reveal request's state.
#[derive(Debug, Clone)]
pub struct RevealSession {
    state: RevealState,
    history: Vec<RevealPhase>,
}

impl Default for RevealSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RevealSession {
    pub fn new() -> Self {
        Self {
            state: RevealState::Idle,
            history: vec![RevealPhase::Idle],
        }
    }

    pub fn state(&self) -> &RevealState {
        &self.state
    }

    /// Every phase entered, in order.
    pub fn history(&self) -> &[RevealPhase] {
        &self.history
    }

    pub fn values(&self) -> Option<&RevealedValues> {
        match &self.state {
            RevealState::Revealed(values) => Some(values),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&RevealFailure> {
        match &self.state {
            RevealState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Drop any revealed values and return to `Idle`.
    pub fn clear(&mut self) {
        self.enter(RevealState::Idle);
    }

    fn enter(&mut self, state: RevealState) {
        self.history.push(state.phase());
        self.state = state;
    }
}

/// Runs reveal requests against a signer.
pub struct RevealProtocol<G> {
    signer: G,
    params: AttestationParams,
    signer_timeout: Duration,
    processing_delay: Duration,
    decoder: fn(&str) -> Result<f64, DecodeError>,
}

impl<G: MessageSigner> RevealProtocol<G> {
    pub fn new(signer: G, params: AttestationParams) -> Self {
        Self {
            signer,
            params,
            signer_timeout: DEFAULT_SIGNER_TIMEOUT,
            processing_delay: Duration::ZERO,
            decoder: codec::decode,
        }
    }

    pub fn with_signer_timeout(mut self, timeout: Duration) -> Self {
        self.signer_timeout = timeout;
        self
    }

    /// Pause between signature and completion, modelling decode latency.
    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }

    /// Replace the field decoder.
    pub fn with_decoder(mut self, decoder: fn(&str) -> Result<f64, DecodeError>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn params(&self) -> &AttestationParams {
        &self.params
    }

    pub fn message(&self) -> String {
        self.params.message()
    }

    /// Run one reveal request over a pair of encoded fields.
    pub async fn reveal(&self, encoded_volume: &str, encoded_price: &str) -> RevealSession {
        let mut session = RevealSession::new();
        let message = self.message();

        session.enter(RevealState::AwaitingSignature);
        debug!(chain_id = self.params.chain_id, "Awaiting attestation signature");

        let signed =
            tokio::time::timeout(self.signer_timeout, self.signer.sign_message(&message)).await;
        let signature = match signed {
            Ok(Ok(signature)) => signature,
            Ok(Err(SignerError::Rejected(reason))) => {
                info!(reason = %reason, "Attestation signature rejected");
                session.enter(RevealState::Failed(RevealFailure::SignerRejected(reason)));
                return session;
            }
            Ok(Err(SignerError::Failed(reason))) => {
                warn!(reason = %reason, "Attestation signer failed");
                session.enter(RevealState::Failed(RevealFailure::SignerError(reason)));
                return session;
            }
            Err(_) => {
                warn!(timeout = ?self.signer_timeout, "Attestation signer timed out");
                session.enter(RevealState::Failed(RevealFailure::Timeout(
                    self.signer_timeout,
                )));
                return session;
            }
        };

        session.enter(RevealState::Decrypting);
        if !self.processing_delay.is_zero() {
            tokio::time::sleep(self.processing_delay).await;
        }

        let decoded = (self.decoder)(encoded_volume)
            .map_err(|source| RevealFailure::Decode {
                field: "volume",
                source,
            })
            .and_then(|volume| {
                (self.decoder)(encoded_price)
                    .map(|price| (volume, price))
                    .map_err(|source| RevealFailure::Decode {
                        field: "price",
                        source,
                    })
            });

        match decoded {
            Ok((volume, price)) => {
                debug!("Reveal completed");
                session.enter(RevealState::Revealed(RevealedValues {
                    volume,
                    price,
                    signature,
                }));
            }
            Err(failure) => {
                warn!(error = %failure, "Reveal decode failed");
                session.enter(RevealState::Failed(failure));
            }
        }
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn params() -> AttestationParams {
        AttestationParams::new(
            "0xpub",
            "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            31337,
            1_700_000_000,
            30,
        )
    }

    struct ScriptedSigner(Result<String, SignerError>);

    impl MessageSigner for ScriptedSigner {
        async fn sign_message(&self, _message: &str) -> Result<String, SignerError> {
            self.0.clone()
        }
    }

    struct SlowSigner;

    impl MessageSigner for SlowSigner {
        async fn sign_message(&self, _message: &str) -> Result<String, SignerError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("0xlate".into())
        }
    }

    #[test]
    fn message_layout_is_exact() {
        assert_eq!(
            params().message(),
            "publickey:0xpub\n\
             contractAddresses:0x5FbDB2315678afecb367f032d93F642f64180aa3\n\
             contractsChainId:31337\n\
             startTimestamp:1700000000\n\
             durationDays:30"
        );
    }

    #[test]
    fn parse_inverts_message_and_rejects_reordering() {
        let p = params();
        assert_eq!(AttestationParams::parse(&p.message()), Some(p));

        let reordered = "contractAddresses:0x1\npublickey:0x2\ncontractsChainId:1\nstartTimestamp:1\ndurationDays:1";
        assert_eq!(AttestationParams::parse(reordered), None);
        assert_eq!(AttestationParams::parse("publickey:0x1"), None);
    }

    #[test]
    fn window_bounds() {
        let p = params();
        assert_eq!(p.expires_at(), 1_700_000_000 + 30 * 86_400);
        assert!(p.is_active(1_700_000_000));
        assert!(!p.is_active(1_699_999_999));
        assert!(!p.is_active(p.expires_at()));
    }

    #[tokio::test]
    async fn successful_signature_reveals_values() {
        let protocol = RevealProtocol::new(ScriptedSigner(Ok("0xsig".into())), params());
        let session = protocol
            .reveal(&codec::encode(100.0), &codec::encode(0.01))
            .await;

        assert_eq!(
            session.history(),
            &[
                RevealPhase::Idle,
                RevealPhase::AwaitingSignature,
                RevealPhase::Decrypting,
                RevealPhase::Revealed
            ]
        );
        let values = session.values().unwrap();
        assert_eq!(values.volume, 100.0);
        assert_eq!(values.price, 0.01);
        assert_eq!(values.signature, "0xsig");
    }

    static DECODE_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting_decode(data: &str) -> Result<f64, DecodeError> {
        DECODE_CALLS.fetch_add(1, Ordering::SeqCst);
        codec::decode(data)
    }

    #[tokio::test]
    async fn rejection_fails_without_decoding() {
        let protocol = RevealProtocol::new(
            ScriptedSigner(Err(SignerError::Rejected("user rejected".into()))),
            params(),
        )
        .with_decoder(counting_decode);

        let before = DECODE_CALLS.load(Ordering::SeqCst);
        let session = protocol.reveal("FHE-MTAw", "FHE-MC4wMQ==").await;

        assert_eq!(DECODE_CALLS.load(Ordering::SeqCst), before);
        assert_eq!(session.state().phase(), RevealPhase::Failed);
        assert_eq!(session.failure().unwrap().kind(), "signer_rejected");
        assert!(!session.history().contains(&RevealPhase::Decrypting));
        assert!(session.values().is_none());
    }

    #[tokio::test]
    async fn signer_errors_are_classified_separately() {
        let protocol = RevealProtocol::new(
            ScriptedSigner(Err(SignerError::Failed("device unplugged".into()))),
            params(),
        );
        let session = protocol.reveal("1", "2").await;
        assert_eq!(session.failure().unwrap().kind(), "signer_error");
    }

    #[tokio::test]
    async fn signer_wait_is_bounded() {
        let protocol = RevealProtocol::new(SlowSigner, params())
            .with_signer_timeout(Duration::from_millis(10));
        let session = protocol.reveal("1", "2").await;
        assert!(matches!(
            session.failure(),
            Some(RevealFailure::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn undecodable_field_fails_after_signature() {
        let protocol = RevealProtocol::new(ScriptedSigner(Ok("0xsig".into())), params());
        let session = protocol.reveal("FHE-MTAw", "FHE-???").await;
        assert!(matches!(
            session.failure(),
            Some(RevealFailure::Decode { field: "price", .. })
        ));
        assert!(session.history().contains(&RevealPhase::Decrypting));
    }

    #[tokio::test]
    async fn processing_delay_is_applied() {
        let protocol = RevealProtocol::new(ScriptedSigner(Ok("0xsig".into())), params())
            .with_processing_delay(Duration::from_millis(20));
        let started = std::time::Instant::now();
        let session = protocol.reveal("1", "2").await;
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert!(session.values().is_some());
    }

    #[tokio::test]
    async fn clear_drops_revealed_values() {
        let protocol = RevealProtocol::new(ScriptedSigner(Ok("0xsig".into())), params());
        let mut session = protocol.reveal("1", "2").await;
        assert!(session.state().is_terminal());

        session.clear();
        assert_eq!(session.state(), &RevealState::Idle);
        assert!(session.values().is_none());
    }
}
