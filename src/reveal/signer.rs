// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Message signers for reveal attestations.
//!
//! The service signs attestations with a custodial secp256k1 key loaded from
//! PEM. The signer enforces its own policy and declines messages it should not
//! sign; a declined message is a rejection, not an error.

use std::future::Future;

use chrono::Utc;
use k256::{
    ecdsa::{signature::Signer, Signature, SigningKey},
    SecretKey,
};

use super::AttestationParams;

/// Why a signature was not produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    /// The signer (or the user behind it) declined to sign.
    #[error("signature rejected: {0}")]
    Rejected(String),

    #[error("signer failure: {0}")]
    Failed(String),
}

/// External party that signs attestation messages.
pub trait MessageSigner: Send + Sync {
    /// Sign `message` exactly as given, returning a hex signature.
    fn sign_message(&self, message: &str)
        -> impl Future<Output = Result<String, SignerError>> + Send;
}

impl<G: MessageSigner> MessageSigner for std::sync::Arc<G> {
    fn sign_message(&self, message: &str)
        -> impl Future<Output = Result<String, SignerError>> + Send {
        (**self).sign_message(message)
    }
}

/// Parse a PEM-encoded secp256k1 private key (SEC1 or PKCS#8).
pub fn secret_key_from_pem(pem_bytes: &[u8]) -> Result<SecretKey, SignerError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| SignerError::Failed(format!("Invalid UTF-8: {e}")))?;

    let pem = pem::parse(pem_str).map_err(|e| SignerError::Failed(format!("Invalid PEM: {e}")))?;

    SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| {
            use k256::pkcs8::DecodePrivateKey;
            SecretKey::from_pkcs8_der(pem.contents())
        })
        .map_err(|e| SignerError::Failed(format!("Invalid key format: {e}")))
}

/// Custodial signer holding a secp256k1 key.
///
/// Policy: only well-formed attestations for the configured chain whose
/// window has not yet closed are signed.
pub struct LocalKeySigner {
    signing_key: SigningKey,
    chain_id: u64,
}

impl LocalKeySigner {
    pub fn new(secret_key: &SecretKey, chain_id: u64) -> Self {
        Self {
            signing_key: SigningKey::from(secret_key),
            chain_id,
        }
    }

    /// Load the key from PEM bytes.
    pub fn from_pem(pem_bytes: &[u8], chain_id: u64) -> Result<Self, SignerError> {
        Ok(Self::new(&secret_key_from_pem(pem_bytes)?, chain_id))
    }

    /// Build from raw 32-byte scalar.
    pub fn from_bytes(bytes: &[u8], chain_id: u64) -> Result<Self, SignerError> {
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| SignerError::Failed(format!("Invalid private key: {e}")))?;
        Ok(Self {
            signing_key,
            chain_id,
        })
    }

    /// Fresh random key, for deployments that configure none. Signatures from
    /// it cannot be attributed once the process exits.
    pub fn ephemeral(chain_id: u64) -> Result<Self, SignerError> {
        let mut bytes = [0u8; 32];
        bytes[..16].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
        bytes[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
        Self::from_bytes(&bytes, chain_id)
    }

    /// Raw scalar as hex (no `0x`), the form the contract wallet expects.
    pub fn private_key_hex(&self) -> String {
        alloy::hex::encode(self.signing_key.to_bytes())
    }

    /// Compressed SEC1 public key, `0x`-prefixed hex. Used as the key
    /// material in attestations.
    pub fn public_key_hex(&self) -> String {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        format!("0x{}", alloy::hex::encode(point.as_bytes()))
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn check_policy(&self, message: &str) -> Result<(), SignerError> {
        let params = AttestationParams::parse(message)
            .ok_or_else(|| SignerError::Rejected("message is not an attestation".to_string()))?;

        if params.chain_id != self.chain_id {
            return Err(SignerError::Rejected(format!(
                "attestation for chain {} but signer is bound to chain {}",
                params.chain_id, self.chain_id
            )));
        }

        if !params.is_active(Utc::now().timestamp()) {
            return Err(SignerError::Rejected(
                "attestation window has closed".to_string(),
            ));
        }

        Ok(())
    }
}

impl MessageSigner for LocalKeySigner {
    async fn sign_message(&self, message: &str) -> Result<String, SignerError> {
        self.check_policy(message)?;
        let signature: Signature = self.signing_key.sign(message.as_bytes());
        Ok(format!("0x{}", alloy::hex::encode(signature.to_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{signature::Verifier, VerifyingKey};

    const KEY: [u8; 32] = [7u8; 32];

    fn params(chain_id: u64, start: i64, days: u32) -> AttestationParams {
        AttestationParams {
            public_key: "0xabc".into(),
            contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".into(),
            chain_id,
            start_timestamp: start,
            duration_days: days,
        }
    }

    #[tokio::test]
    async fn signs_active_attestation_verifiably() {
        let signer = LocalKeySigner::from_bytes(&KEY, 11155111).unwrap();
        let message = params(11155111, Utc::now().timestamp(), 30).message();

        let sig_hex = signer.sign_message(&message).await.unwrap();
        assert!(sig_hex.starts_with("0x"));

        let sig_bytes = alloy::hex::decode(&sig_hex[2..]).unwrap();
        let signature = Signature::from_slice(&sig_bytes).unwrap();
        let verifying_key = VerifyingKey::from(&signer.signing_key);
        assert!(verifying_key.verify(message.as_bytes(), &signature).is_ok());
    }

    #[tokio::test]
    async fn rejects_wrong_chain_expired_window_and_non_attestations() {
        let signer = LocalKeySigner::from_bytes(&KEY, 1).unwrap();
        let now = Utc::now().timestamp();

        let wrong_chain = params(5, now, 30).message();
        assert!(matches!(
            signer.sign_message(&wrong_chain).await,
            Err(SignerError::Rejected(_))
        ));

        let expired = params(1, now - 40 * 86_400, 30).message();
        assert!(matches!(
            signer.sign_message(&expired).await,
            Err(SignerError::Rejected(_))
        ));

        assert!(matches!(
            signer.sign_message("transfer everything").await,
            Err(SignerError::Rejected(_))
        ));
    }

    #[test]
    fn public_key_is_compressed_sec1_hex() {
        let signer = LocalKeySigner::from_bytes(&KEY, 1).unwrap();
        let pk = signer.public_key_hex();
        assert_eq!(pk.len(), 2 + 66);
        assert!(pk.starts_with("0x02") || pk.starts_with("0x03"));
    }

    #[test]
    fn ephemeral_keys_are_distinct_and_exportable() {
        let a = LocalKeySigner::ephemeral(1).unwrap();
        let b = LocalKeySigner::ephemeral(1).unwrap();
        assert_ne!(a.public_key_hex(), b.public_key_hex());

        let hex = a.private_key_hex();
        assert_eq!(hex.len(), 64);
        let restored = LocalKeySigner::from_bytes(&alloy::hex::decode(&hex).unwrap(), 1).unwrap();
        assert_eq!(restored.public_key_hex(), a.public_key_hex());
    }

    #[test]
    fn invalid_key_material_is_reported() {
        assert!(LocalKeySigner::from_bytes(&[0u8; 32], 1).is_err());
        assert!(LocalKeySigner::from_pem(b"not a pem", 1).is_err());
    }
}
