// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use water_rights_ledger::{
    api::router,
    config::{
        LedgerConfig, LogFormat, SubstrateConfig, DEFAULT_LOG_FILTER, REDB_FILE_NAME,
    },
    reveal::{LocalKeySigner, SignerError},
    state::{AppState, RevealSettings},
    substrate::{
        embedded::RedbSubstrateError, Backend, ContractSubstrate, MemorySubstrate,
        RedbSubstrate, SubstrateError,
    },
};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] water_rights_ledger::config::ConfigError),

    #[error("failed to read signer key: {0}")]
    KeyFile(std::io::Error),

    #[error("failed to load signer: {0}")]
    Signer(#[from] SignerError),

    #[error("failed to open embedded database: {0}")]
    Redb(#[from] RedbSubstrateError),

    #[error("failed to connect to contract: {0}")]
    Contract(#[from] SubstrateError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn load_signer(config: &LedgerConfig) -> Result<LocalKeySigner, StartupError> {
    match &config.signer_key_path {
        Some(path) => {
            let pem = std::fs::read(path).map_err(StartupError::KeyFile)?;
            let signer = LocalKeySigner::from_pem(&pem, config.chain_id)?;
            info!(path = %path.display(), public_key = %signer.public_key_hex(), "Signer key loaded");
            Ok(signer)
        }
        None => {
            let signer = LocalKeySigner::ephemeral(config.chain_id)?;
            warn!(
                public_key = %signer.public_key_hex(),
                "No signer key configured, using an ephemeral key"
            );
            Ok(signer)
        }
    }
}

fn open_backend(config: &LedgerConfig, signer: &LocalKeySigner) -> Result<Backend, StartupError> {
    let backend = match &config.substrate {
        SubstrateConfig::Memory => Backend::Memory(Arc::new(MemorySubstrate::new())),
        SubstrateConfig::Redb { data_dir } => {
            Backend::Redb(RedbSubstrate::open(&data_dir.join(REDB_FILE_NAME))?)
        }
        SubstrateConfig::Contract { rpc_url } => Backend::Contract(ContractSubstrate::connect(
            rpc_url,
            &config.contract_address,
            &signer.private_key_hex(),
        )?),
    };
    info!(backend = backend.name(), "Substrate configured");
    Ok(backend)
}

async fn run(config: LedgerConfig) -> Result<(), StartupError> {
    let signer = load_signer(&config)?;
    let backend = open_backend(&config, &signer)?;

    let state = AppState::new(
        backend,
        config.substrate_timeout,
        signer,
        RevealSettings {
            contract_address: config.contract_address.clone(),
            chain_id: config.chain_id,
            duration_days: config.attestation_duration_days,
            signer_timeout: config.signer_timeout,
            processing_delay: config.reveal_delay,
        },
    );

    let loaded = state.market.refresh().await;
    info!(count = loaded.len(), "Initial water rights loaded");

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Water rights ledger listening (docs at /docs)");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    let config = LedgerConfig::from_env();
    init_tracing(
        config
            .as_ref()
            .map(|c| c.log_format)
            .unwrap_or_default(),
    );

    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        error!(error = %e, "Water rights ledger failed");
        std::process::exit(1);
    }
}
