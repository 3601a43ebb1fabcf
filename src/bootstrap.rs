// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Command line balance watcher.
//!
//! Reads its settings from the environment (a `.env` file is honored):
//!
//! - `ADDRESS`: account to watch (required)
//! - `CHAIN`: chain id from the presets, or a new one when `RPC_URLS` is set
//!   (default `mainnet`)
//! - `RPC_URLS`: comma separated endpoints, replacing the preset list
//! - `REFRESH_SECS`: how long a balance stays fresh (default 12)

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use anyhow::Context;
use dotenvy::dotenv;
use tracing::{info, warn};
use url::Url;

use crate::cache::CellOptions;
use crate::config::{ChainCacheConfig, ChainConfig};
use crate::local::LocalSubscriber;
use crate::network::ChainId;
use crate::readers;
use crate::registry::ChainRegistry;

const DEFAULT_REFRESH_SECS: u64 = 12;

/// Main entry point for the application.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();

    let chain = ChainId::new(dotenvy::var("CHAIN").unwrap_or_else(|_| "mainnet".to_string()));
    let address: Address = dotenvy::var("ADDRESS")
        .context("ADDRESS must be set")?
        .parse()
        .context("Invalid ADDRESS")?;
    let refresh = match dotenvy::var("REFRESH_SECS") {
        Ok(secs) => secs.parse().context("Invalid REFRESH_SECS")?,
        Err(_) => DEFAULT_REFRESH_SECS,
    };

    let mut config = ChainCacheConfig::default();
    if let Ok(urls) = dotenvy::var("RPC_URLS") {
        let endpoints = parse_endpoints(&urls)?;
        match config.chains.get_mut(&chain) {
            Some(preset) => preset.endpoints = endpoints,
            None => config.set_chain(ChainConfig::evm(chain.clone(), endpoints)),
        }
    }

    let registry = Arc::new(ChainRegistry::new(config));
    let local = LocalSubscriber::with_options(
        Arc::clone(&registry),
        CellOptions::default().validity(Duration::from_secs(refresh)),
    );
    let balance = readers::native_balance(&local, &chain, address)?;
    let block = readers::block_number(&local, &chain)?;
    info!(chain = %chain, address = %address, refresh_secs = refresh, "Watching balance");

    let mut updates = balance.subscribe();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                match balance.get() {
                    Some(Ok(wei)) => info!(
                        chain = %chain,
                        address = %address,
                        balance = %wei,
                        block = ?block.get().and_then(Result::ok),
                        batches = registry.counter(&chain)?,
                        "Balance updated"
                    ),
                    Some(Err(e)) => warn!(chain = %chain, error = %e, "Balance unavailable"),
                    None => {}
                }
            }
        }
    }
    Ok(())
}

/// Parses a comma separated endpoint list, skipping empty entries.
fn parse_endpoints(urls: &str) -> anyhow::Result<Vec<Url>> {
    let endpoints = urls
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(|url| Url::parse(url).with_context(|| format!("Invalid RPC URL: {url}")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    anyhow::ensure!(!endpoints.is_empty(), "RPC_URLS contains no endpoints");
    Ok(endpoints)
}
