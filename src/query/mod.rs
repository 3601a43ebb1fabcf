// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Read queries and their canonical form.
//!
//! [`RawQuery`] is the closed set of read requests the cache understands. Each
//! variant knows its JSON-RPC method, its wire params, and which of those
//! params are volatile (block selectors) and therefore excluded from its
//! [`QueryKey`].
//!
//! ```rust
//! use alloy_eips::BlockNumberOrTag;
//! use alloy_primitives::address;
//! use chaincache::RawQuery;
//!
//! let owner = address!("d8da6bf26964af9d7eed9e03e53415d37aa96045");
//! let latest = RawQuery::balance(owner);
//! let pinned = RawQuery::balance_at(owner, BlockNumberOrTag::Number(19_000_000));
//! assert_eq!(latest.key(), pinned.key());
//! ```

use std::time::Duration;

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::SolCall;
use serde_json::{json, Value};
use starknet_types_core::felt::Felt;

use crate::network::NetworkFamily;

mod hash;
pub mod stark;

pub use hash::{CanonicalQuery, QueryKey};
pub use stark::StarkBlockId;

/// `eth_getBalance` of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceQuery {
    /// Account whose native balance is read
    pub address: Address,
    /// Block to read at
    pub block: BlockNumberOrTag,
    /// Validity hint used when the caller gives none
    pub expiry: Option<Duration>,
}

/// `eth_call` against a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallQuery {
    /// Contract address
    pub to: Address,
    /// ABI-encoded call data
    pub data: Bytes,
    /// Block to read at
    pub block: BlockNumberOrTag,
    /// Validity hint used when the caller gives none
    pub expiry: Option<Duration>,
}

impl CallQuery {
    /// Creates a call at the latest block.
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
            block: BlockNumberOrTag::Latest,
            expiry: None,
        }
    }

    /// Encodes a typed Solidity call.
    pub fn sol<C: SolCall>(to: Address, call: &C) -> Self {
        Self::new(to, call.abi_encode())
    }
}

/// `starknet_call` against a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarkCallQuery {
    /// Contract address
    pub contract_address: Felt,
    /// Entry point selector
    pub entry_point_selector: Felt,
    /// Serialized arguments
    pub calldata: Vec<Felt>,
    /// Block to read at
    pub block: StarkBlockId,
    /// Validity hint used when the caller gives none
    pub expiry: Option<Duration>,
}

impl StarkCallQuery {
    /// Creates a call to a named entry point at the latest block.
    pub fn new(contract_address: Felt, entry_point: &str, calldata: Vec<Felt>) -> Self {
        Self {
            contract_address,
            entry_point_selector: stark::selector_from_name(entry_point),
            calldata,
            block: StarkBlockId::Latest,
            expiry: None,
        }
    }

    fn request_value(&self) -> Value {
        json!({
            "contract_address": self.contract_address.to_hex_string(),
            "entry_point_selector": self.entry_point_selector.to_hex_string(),
            "calldata": stark::felts_to_value(&self.calldata),
        })
    }
}

/// A read request the cache can serve.
#[derive(Debug, Clone, PartialEq)]
pub enum RawQuery {
    /// `eth_getBalance`
    Balance(BalanceQuery),
    /// `eth_call`
    Call(CallQuery),
    /// `eth_estimateGas`
    EstimateGas(Box<TransactionRequest>),
    /// `eth_getTransactionReceipt`
    TransactionReceipt(TxHash),
    /// `eth_getTransactionByHash`
    TransactionByHash(TxHash),
    /// `eth_blockNumber`
    BlockNumber,
    /// `starknet_call`
    StarkCall(StarkCallQuery),
}

impl RawQuery {
    /// Native balance at the latest block.
    pub fn balance(address: Address) -> Self {
        Self::balance_at(address, BlockNumberOrTag::Latest)
    }

    /// Native balance at a given block.
    pub fn balance_at(address: Address, block: BlockNumberOrTag) -> Self {
        RawQuery::Balance(BalanceQuery {
            address,
            block,
            expiry: None,
        })
    }

    /// Raw `eth_call` at the latest block.
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        RawQuery::Call(CallQuery::new(to, data))
    }

    /// Typed Solidity call at the latest block.
    pub fn sol_call<C: SolCall>(to: Address, call: &C) -> Self {
        RawQuery::Call(CallQuery::sol(to, call))
    }

    /// Gas estimate for a transaction.
    pub fn estimate_gas(tx: TransactionRequest) -> Self {
        RawQuery::EstimateGas(Box::new(tx))
    }

    /// Receipt of a transaction.
    pub fn transaction_receipt(hash: TxHash) -> Self {
        RawQuery::TransactionReceipt(hash)
    }

    /// Transaction by hash.
    pub fn transaction_by_hash(hash: TxHash) -> Self {
        RawQuery::TransactionByHash(hash)
    }

    /// Current block number.
    pub fn block_number() -> Self {
        RawQuery::BlockNumber
    }

    /// StarkNet call to a named entry point at the latest block.
    pub fn stark_call(contract_address: Felt, entry_point: &str, calldata: Vec<Felt>) -> Self {
        RawQuery::StarkCall(StarkCallQuery::new(contract_address, entry_point, calldata))
    }

    /// Attaches an expiry hint, for variants that carry one.
    #[must_use]
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        match &mut self {
            RawQuery::Balance(q) => q.expiry = Some(expiry),
            RawQuery::Call(q) => q.expiry = Some(expiry),
            RawQuery::StarkCall(q) => q.expiry = Some(expiry),
            _ => {}
        }
        self
    }

    /// The JSON-RPC method name.
    pub const fn method(&self) -> &'static str {
        match self {
            RawQuery::Balance(_) => "eth_getBalance",
            RawQuery::Call(_) => "eth_call",
            RawQuery::EstimateGas(_) => "eth_estimateGas",
            RawQuery::TransactionReceipt(_) => "eth_getTransactionReceipt",
            RawQuery::TransactionByHash(_) => "eth_getTransactionByHash",
            RawQuery::BlockNumber => "eth_blockNumber",
            RawQuery::StarkCall(_) => "starknet_call",
        }
    }

    /// The family whose nodes understand this method.
    pub const fn family(&self) -> NetworkFamily {
        match self {
            RawQuery::StarkCall(_) => NetworkFamily::StarkNet,
            _ => NetworkFamily::Evm,
        }
    }

    /// Validity hint carried by the query itself.
    pub fn expiry_hint(&self) -> Option<Duration> {
        match self {
            RawQuery::Balance(q) => q.expiry,
            RawQuery::Call(q) => q.expiry,
            RawQuery::StarkCall(q) => q.expiry,
            _ => None,
        }
    }

    /// Whether this query can be folded into an aggregate call on a chain of
    /// `family`.
    pub fn is_multicall_eligible(&self, family: NetworkFamily) -> bool {
        match self {
            RawQuery::Call(_) => family == NetworkFamily::Evm,
            RawQuery::StarkCall(_) => family == NetworkFamily::StarkNet,
            _ => false,
        }
    }

    /// Wire params, as sent in the JSON-RPC request.
    pub fn params(&self) -> Value {
        match self {
            RawQuery::Balance(q) => json!([q.address, q.block]),
            RawQuery::Call(q) => json!([{ "to": q.to, "data": q.data }, q.block]),
            RawQuery::EstimateGas(tx) => json!([tx]),
            RawQuery::TransactionReceipt(hash) | RawQuery::TransactionByHash(hash) => {
                json!([hash])
            }
            RawQuery::BlockNumber => json!([]),
            RawQuery::StarkCall(q) => json!({
                "request": q.request_value(),
                "block_id": q.block.to_value(),
            }),
        }
    }

    /// The canonical form of this query.
    ///
    /// With `strip_volatile`, block selectors are dropped for balance and call
    /// queries. Expiry hints are never part of the canonical form.
    pub fn canonical(&self, strip_volatile: bool) -> CanonicalQuery {
        let params = if !strip_volatile {
            self.params()
        } else {
            match self {
                RawQuery::Balance(q) => json!([q.address]),
                RawQuery::Call(q) => json!([{ "to": q.to, "data": q.data }]),
                RawQuery::StarkCall(q) => json!({ "request": q.request_value() }),
                _ => self.params(),
            }
        };
        CanonicalQuery {
            method: self.method(),
            params,
        }
    }

    /// The cache key: hash of the canonical form with volatile params removed.
    pub fn key(&self) -> QueryKey {
        self.canonical(true).key()
    }
}
