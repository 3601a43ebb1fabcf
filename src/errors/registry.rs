// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Errors from the chain registry and cache cell handles.

use crate::network::ChainId;

/// Programmer and lifecycle errors from the chain registry.
///
/// These are returned synchronously from the call that caused them.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The chain id is not in the configured chain table.
    #[error("Unknown chain: {chain}")]
    UnknownChain {
        /// The chain id that was requested
        chain: ChainId,
    },

    /// A chain cache had to be started outside of a Tokio runtime.
    #[error("Chain {chain} cannot start its polling loop outside a Tokio runtime")]
    NoRuntime {
        /// The chain whose cache could not start
        chain: ChainId,
    },
}

impl RegistryError {
    /// Helper to create an `UnknownChain` error.
    pub fn unknown_chain(chain: &ChainId) -> Self {
        RegistryError::UnknownChain {
            chain: chain.clone(),
        }
    }
}

/// Errors awaiting a value from a cache cell.
#[derive(Debug, thiserror::Error)]
pub enum CellError {
    /// The chain cache shut down before the entry resolved.
    #[error("Cache for chain {chain} closed before the entry resolved")]
    Closed {
        /// Chain of the closed cache
        chain: ChainId,
    },
}
