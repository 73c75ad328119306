// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, their defaults, and [`LedgerConfig`], which is
//! read from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `SUBSTRATE` | Backend: `memory`, `redb` or `contract` | `memory` |
//! | `DATA_DIR` | Directory for the redb file | `./data` |
//! | `RPC_URL` | EVM JSON-RPC endpoint | Required for `contract` |
//! | `CONTRACT_ADDRESS` | Key-value contract address | Required for `contract`, else zero address |
//! | `CHAIN_ID` | Chain the contract and attestations belong to | `11155111` |
//! | `SIGNER_KEY_PATH` | PEM secp256k1 key for signing | Ephemeral key |
//! | `ATTESTATION_DURATION_DAYS` | Attestation validity window | `30` |
//! | `SUBSTRATE_TIMEOUT_SECS` | Limit per substrate call | `15` |
//! | `SIGNER_TIMEOUT_SECS` | Limit on the signer wait | `60` |
//! | `REVEAL_DELAY_MS` | Pause between signature and decode | `0` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SUBSTRATE_ENV: &str = "SUBSTRATE";

/// Directory holding `ledger.redb` when the embedded backend is selected.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const RPC_URL_ENV: &str = "RPC_URL";
pub const CONTRACT_ADDRESS_ENV: &str = "CONTRACT_ADDRESS";
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";

/// PEM file with the secp256k1 key used both to send contract writes and to
/// sign reveal attestations.
pub const SIGNER_KEY_PATH_ENV: &str = "SIGNER_KEY_PATH";

pub const ATTESTATION_DURATION_DAYS_ENV: &str = "ATTESTATION_DURATION_DAYS";
pub const SUBSTRATE_TIMEOUT_SECS_ENV: &str = "SUBSTRATE_TIMEOUT_SECS";
pub const SIGNER_TIMEOUT_SECS_ENV: &str = "SIGNER_TIMEOUT_SECS";
pub const REVEAL_DELAY_MS_ENV: &str = "REVEAL_DELAY_MS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
/// Named in attestations when no contract is configured.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
/// Sepolia
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;
pub const DEFAULT_SUBSTRATE_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// File name of the embedded database inside `DATA_DIR`.
pub const REDB_FILE_NAME: &str = "ledger.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} is required for the contract substrate")]
    Missing(&'static str),
}

/// Which key-value substrate backs the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstrateConfig {
    Memory,
    Redb {
        data_dir: PathBuf,
    },
    Contract {
        rpc_url: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub bind_addr: SocketAddr,
    pub substrate: SubstrateConfig,
    /// Contract named in attestations; required for the contract substrate
    pub contract_address: String,
    pub chain_id: u64,
    pub signer_key_path: Option<PathBuf>,
    pub attestation_duration_days: u32,
    pub substrate_timeout: Duration,
    pub signer_timeout: Duration,
    pub reveal_delay: Duration,
    pub log_format: LogFormat,
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Build from an explicit variable map. Unset and blank values take their
    /// defaults.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            vars.get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port: u16 = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;
        let bind_addr = format!("{host}:{port}")
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: HOST_ENV,
                value: host.clone(),
                reason: e.to_string(),
            })?;

        let substrate = match get(SUBSTRATE_ENV).as_deref().unwrap_or("memory") {
            "memory" => SubstrateConfig::Memory,
            "redb" => SubstrateConfig::Redb {
                data_dir: PathBuf::from(
                    get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
                ),
            },
            "contract" => {
                if get(CONTRACT_ADDRESS_ENV).is_none() {
                    return Err(ConfigError::Missing(CONTRACT_ADDRESS_ENV));
                }
                SubstrateConfig::Contract {
                    rpc_url: get(RPC_URL_ENV).ok_or(ConfigError::Missing(RPC_URL_ENV))?,
                }
            }
            other => {
                return Err(ConfigError::Invalid {
                    name: SUBSTRATE_ENV,
                    value: other.to_string(),
                    reason: "expected memory, redb or contract".to_string(),
                })
            }
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            bind_addr,
            substrate,
            contract_address: get(CONTRACT_ADDRESS_ENV)
                .unwrap_or_else(|| DEFAULT_CONTRACT_ADDRESS.to_string()),
            chain_id: parse_or(get(CHAIN_ID_ENV), CHAIN_ID_ENV, DEFAULT_CHAIN_ID)?,
            signer_key_path: get(SIGNER_KEY_PATH_ENV).map(PathBuf::from),
            attestation_duration_days: parse_or(
                get(ATTESTATION_DURATION_DAYS_ENV),
                ATTESTATION_DURATION_DAYS_ENV,
                crate::reveal::DEFAULT_DURATION_DAYS,
            )?,
            substrate_timeout: Duration::from_secs(parse_or(
                get(SUBSTRATE_TIMEOUT_SECS_ENV),
                SUBSTRATE_TIMEOUT_SECS_ENV,
                DEFAULT_SUBSTRATE_TIMEOUT.as_secs(),
            )?),
            signer_timeout: Duration::from_secs(parse_or(
                get(SIGNER_TIMEOUT_SECS_ENV),
                SIGNER_TIMEOUT_SECS_ENV,
                crate::reveal::DEFAULT_SIGNER_TIMEOUT.as_secs(),
            )?),
            reveal_delay: Duration::from_millis(parse_or(
                get(REVEAL_DELAY_MS_ENV),
                REVEAL_DELAY_MS_ENV,
                0,
            )?),
            log_format,
        })
    }
}

fn parse_or<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = LedgerConfig::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.substrate, SubstrateConfig::Memory);
        assert_eq!(config.chain_id, DEFAULT_CHAIN_ID);
        assert_eq!(config.attestation_duration_days, 30);
        assert_eq!(config.substrate_timeout, Duration::from_secs(15));
        assert_eq!(config.signer_timeout, Duration::from_secs(60));
        assert_eq!(config.reveal_delay, Duration::ZERO);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.signer_key_path.is_none());
        assert_eq!(config.contract_address, DEFAULT_CONTRACT_ADDRESS);
    }

    #[test]
    fn reads_backend_specific_settings() {
        let config = LedgerConfig::from_vars(&vars(&[
            (SUBSTRATE_ENV, "redb"),
            (DATA_DIR_ENV, "/var/lib/ledger"),
            (PORT_ENV, "9000"),
            (LOG_FORMAT_ENV, "json"),
        ]))
        .unwrap();
        assert_eq!(
            config.substrate,
            SubstrateConfig::Redb {
                data_dir: PathBuf::from("/var/lib/ledger")
            }
        );
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn contract_backend_requires_rpc_and_address() {
        let err = LedgerConfig::from_vars(&vars(&[(SUBSTRATE_ENV, "contract")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(CONTRACT_ADDRESS_ENV)));

        let err = LedgerConfig::from_vars(&vars(&[
            (SUBSTRATE_ENV, "contract"),
            (CONTRACT_ADDRESS_ENV, "0x5FbDB2315678afecb367f032d93F642f64180aa3"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(RPC_URL_ENV)));

        let config = LedgerConfig::from_vars(&vars(&[
            (SUBSTRATE_ENV, "contract"),
            (RPC_URL_ENV, "http://localhost:8545"),
            (CONTRACT_ADDRESS_ENV, "0x5FbDB2315678afecb367f032d93F642f64180aa3"),
        ]))
        .unwrap();
        assert!(matches!(config.substrate, SubstrateConfig::Contract { .. }));
        assert_eq!(
            config.contract_address,
            "0x5FbDB2315678afecb367f032d93F642f64180aa3"
        );
    }

    #[test]
    fn malformed_values_are_reported() {
        assert!(matches!(
            LedgerConfig::from_vars(&vars(&[(PORT_ENV, "eighty")])),
            Err(ConfigError::Invalid { name: PORT_ENV, .. })
        ));
        assert!(LedgerConfig::from_vars(&vars(&[(SUBSTRATE_ENV, "sqlite")])).is_err());
        assert!(LedgerConfig::from_vars(&vars(&[(SIGNER_TIMEOUT_SECS_ENV, "-1")])).is_err());
    }
}
