// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Substrate backed by an EVM key-value contract.
//!
//! Reads are `eth_call`s; writes are signed transactions sent with a local
//! wallet and considered confirmed once their receipt reports success.

use std::str::FromStr;

use alloy::{
    network::EthereumWallet,
    primitives::{Address, Bytes},
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    sol,
};

use super::{KvSubstrate, SubstrateError, SubstrateResult};

// Key-value store interface using alloy's sol! macro
sol! {
    #[sol(rpc)]
    interface IKeyValueStore {
        function isAvailable() external view returns (bool);
        function getData(string key) external view returns (bytes);
        function setData(string key, bytes value) external;
    }
}

/// Substrate reached through a deployed key-value contract.
pub struct ContractSubstrate {
    contract: IKeyValueStore::IKeyValueStoreInstance<DynProvider>,
    address: Address,
}

impl ContractSubstrate {
    /// Connect to the contract at `contract_address`, signing writes with
    /// `private_key_hex` (64 hex characters, no 0x prefix).
    pub fn connect(
        rpc_url: &str,
        contract_address: &str,
        private_key_hex: &str,
    ) -> Result<Self, SubstrateError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| SubstrateError::Unavailable(format!("Invalid RPC URL: {e}")))?;
        let address = Address::from_str(contract_address)
            .map_err(|e| SubstrateError::Unavailable(format!("Invalid contract address: {e}")))?;

        let key_bytes = alloy::hex::decode(private_key_hex)
            .map_err(|e| SubstrateError::Unavailable(format!("Invalid private key: {e}")))?;
        let signer = PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| SubstrateError::Unavailable(format!("Invalid private key: {e}")))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self {
            contract: IKeyValueStore::new(address, provider),
            address,
        })
    }

    /// Contract address as a checksummed string.
    pub fn address(&self) -> String {
        self.address.to_checksum(None)
    }
}

/// Wallets report a declined signature in their error text.
fn classify_write_error(message: String) -> SubstrateError {
    let lower = message.to_lowercase();
    if lower.contains("user rejected") || lower.contains("user denied") {
        SubstrateError::Rejected(message)
    } else {
        SubstrateError::WriteFailed(message)
    }
}

impl KvSubstrate for ContractSubstrate {
    async fn is_available(&self) -> bool {
        match self.contract.isAvailable().call().await {
            Ok(available) => available,
            Err(e) => {
                tracing::warn!(contract = %self.address, error = %e, "isAvailable probe failed");
                false
            }
        }
    }

    async fn get_data(&self, key: &str) -> SubstrateResult<Vec<u8>> {
        let value: Bytes = self
            .contract
            .getData(key.to_string())
            .call()
            .await
            .map_err(|e| SubstrateError::ReadFailed(e.to_string()))?;
        Ok(value.to_vec())
    }

    async fn set_data(&self, key: &str, value: Vec<u8>) -> SubstrateResult<()> {
        let pending = self
            .contract
            .setData(key.to_string(), Bytes::from(value))
            .send()
            .await
            .map_err(|e| classify_write_error(e.to_string()))?;

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| SubstrateError::WriteFailed(e.to_string()))?;

        if !receipt.status() {
            return Err(SubstrateError::WriteFailed(format!(
                "setData({key}) reverted in tx {}",
                receipt.transaction_hash
            )));
        }

        tracing::debug!(
            key,
            tx_hash = %receipt.transaction_hash,
            "setData confirmed"
        );
        Ok(())
    }
}
