// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for the chaincache library.
//!
//! This module follows a hybrid approach:
//!
//! - **Module-specific errors** for fine-grained handling ([`CallerError`],
//!   [`DecodeError`], [`RegistryError`], [`CellError`], [`ReadError`])
//! - **Unified error type** ([`ChainCacheError`]) for convenience when you don't
//!   need to distinguish between error sources
//!
//! [`RpcFailure`] is different from the others: it is not a failure of this
//! library but a JSON-RPC error object returned by a node. It is stored as the
//! value of a cache entry and surfaced to observers.
//!
//! # Examples
//!
//! ```rust,ignore
//! use chaincache::{ChainCacheError, ChainRegistry, RawQuery};
//!
//! async fn example(registry: &ChainRegistry) -> Result<(), ChainCacheError> {
//!     let mut cell = registry.cell(&"mainnet".into(), RawQuery::block_number(), Default::default())?;
//!     let value = cell.resolved().await?;
//!     println!("{value:?}");
//!     Ok(())
//! }
//! ```

mod caller;
mod read;
mod registry;
mod rpc;

pub use caller::{CallerError, DecodeError};
pub use read::ReadError;
pub use registry::{CellError, RegistryError};
pub use rpc::RpcFailure;

/// Unified error type for all chaincache operations.
///
/// All module-specific error types convert to `ChainCacheError` via `From`,
/// so `?` propagates them naturally.
#[derive(Debug, thiserror::Error)]
pub enum ChainCacheError {
    /// Error from the batching caller.
    #[error("Caller error: {0}")]
    Caller(#[from] CallerError),

    /// Error decoding a batch or multicall payload.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error from the chain registry.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Error awaiting a cache cell.
    #[error("Cell error: {0}")]
    Cell(#[from] CellError),

    /// Error reading a typed value.
    #[error("Read error: {0}")]
    Read(#[from] ReadError),
}
