// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Cached, batched blockchain reads for EVM and StarkNet chains.
//!
//! Every read is a [`RawQuery`]. Queries are hashed into a [`QueryKey`] that
//! ignores block selectors, so asking for the same state twice shares one
//! cache entry. Each chain runs a polling loop that gathers every due entry
//! into one JSON-RPC batch per tick, folds contract calls into a single
//! multicall where possible, and fails over between endpoints.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use alloy_primitives::address;
//! use chaincache::{CellOptions, ChainCacheConfig, ChainRegistry, RawQuery};
//!
//! # async fn example() -> Result<(), chaincache::ChainCacheError> {
//! let registry = Arc::new(ChainRegistry::new(ChainCacheConfig::default()));
//! let holder = address!("d8da6bf26964af9d7eed9e03e53415d37aa96045");
//!
//! let mut balance = registry.cell(&"mainnet".into(), RawQuery::balance(holder), CellOptions::default())?;
//! println!("{:?}", balance.resolved().await?);
//! # Ok(())
//! # }
//! ```
//!
//! Long-lived consumers should go through a [`LocalSubscriber`], which keeps
//! its queries fresh until it is dropped, and the typed [`readers`].

pub mod cache;
pub mod caller;
pub mod config;
pub mod errors;
pub mod local;
pub mod multicall;
pub mod network;
pub mod query;
pub mod reactive;
pub mod readers;
pub mod registry;
pub mod rpc;
pub mod transport;

#[cfg(feature = "cli")]
pub mod bootstrap;

mod spans;
#[cfg(test)]
mod testing;

pub use cache::{CellOptions, ChainCache, QueryCell};
pub use config::{ChainCacheConfig, ChainCacheConfigBuilder, ChainConfig};
pub use errors::{
    CallerError, CellError, ChainCacheError, DecodeError, ReadError, RegistryError, RpcFailure,
};
pub use local::LocalSubscriber;
pub use network::{ChainId, MulticallContract, NetworkFamily};
pub use query::{QueryKey, RawQuery};
pub use registry::ChainRegistry;
pub use rpc::QueryResult;
pub use transport::{BatchTransport, HttpTransport};
