// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Chain identity and network families.

use std::fmt;

use alloy_chains::NamedChain;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;

use crate::config::constants::{starknet_multicall_address, EVM_MULTICALL3_ADDRESS};

/// Identifier of a chain in the registry, e.g. `"mainnet"` or `"starknet"`.
///
/// EVM chains known to `alloy-chains` convert from [`NamedChain`] using its
/// canonical name; other networks use any string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    /// Creates a chain id from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ChainId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<NamedChain> for ChainId {
    fn from(chain: NamedChain) -> Self {
        Self(chain.to_string())
    }
}

/// The wire and call conventions a chain follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkFamily {
    /// Ethereum JSON-RPC (`eth_*` methods, ABI encoded calls)
    Evm,
    /// StarkNet JSON-RPC (`starknet_*` methods, felt encoded calls)
    StarkNet,
}

impl NetworkFamily {
    /// The well-known multicall deployment for this family.
    pub fn default_multicall(self) -> MulticallContract {
        match self {
            NetworkFamily::Evm => MulticallContract::Evm(EVM_MULTICALL3_ADDRESS),
            NetworkFamily::StarkNet => MulticallContract::StarkNet(starknet_multicall_address()),
        }
    }
}

impl fmt::Display for NetworkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkFamily::Evm => f.write_str("evm"),
            NetworkFamily::StarkNet => f.write_str("starknet"),
        }
    }
}

/// Address of the aggregator contract used to fold calls into one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MulticallContract {
    /// A Multicall3 deployment
    Evm(Address),
    /// A composable multicall deployment
    StarkNet(Felt),
}

impl MulticallContract {
    /// The family this contract can aggregate calls for.
    pub fn family(&self) -> NetworkFamily {
        match self {
            MulticallContract::Evm(_) => NetworkFamily::Evm,
            MulticallContract::StarkNet(_) => NetworkFamily::StarkNet,
        }
    }
}
