// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Errors raised while building, sending, and decoding JSON-RPC batches.

use alloy_transport::TransportError;

use super::RpcFailure;
use crate::network::ChainId;

/// Errors from the per-chain batching caller.
///
/// These never reach cell observers. The polling loop logs them and leaves the
/// affected keys pending for the next tick.
#[derive(Debug, thiserror::Error)]
pub enum CallerError {
    /// Every configured endpoint failed at the transport level for one batch.
    #[error("All {attempts} endpoint(s) failed for chain {chain}")]
    EndpointsExhausted {
        /// Chain whose endpoints were tried
        chain: ChainId,
        /// Number of endpoints tried
        attempts: usize,
        /// The last transport error
        #[source]
        source: TransportError,
    },

    /// A transport error that rotating endpoints would not fix.
    #[error("Non-retryable transport failure on chain {chain}")]
    Transport {
        /// Chain the batch was sent to
        chain: ChainId,
        /// The underlying transport error
        #[source]
        source: TransportError,
    },

    /// A request could not be serialized.
    #[error("Failed to serialize request {id} ({method})")]
    Serialize {
        /// Request id within the batch
        id: u64,
        /// JSON-RPC method
        method: &'static str,
        /// The underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// The chain has no endpoints to send to.
    #[error("No endpoints configured for chain {chain}")]
    NoEndpoints {
        /// Chain with an empty endpoint list
        chain: ChainId,
    },

    /// The response packet could not be flattened.
    #[error("Failed to decode batch response")]
    Decode(#[from] DecodeError),
}

impl CallerError {
    /// Helper to create an `EndpointsExhausted` error.
    pub fn endpoints_exhausted(chain: ChainId, attempts: usize, source: TransportError) -> Self {
        CallerError::EndpointsExhausted {
            chain,
            attempts,
            source,
        }
    }

    /// Helper to create a `Transport` error.
    pub fn transport(chain: ChainId, source: TransportError) -> Self {
        CallerError::Transport { chain, source }
    }
}

/// Errors decoding a batch response or a multicall payload.
///
/// A decode error fails the whole batch without partial application.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The aggregate returned a different number of results than calls sent.
    #[error("Multicall returned {actual} results for {expected} calls")]
    LengthMismatch {
        /// Number of calls folded into the aggregate
        expected: usize,
        /// Number of results decoded
        actual: usize,
    },

    /// A hex string in the response could not be parsed.
    #[error("Invalid hex value: {value}")]
    InvalidHex {
        /// The offending value
        value: String,
    },

    /// ABI decoding of an EVM aggregate result failed.
    #[error("ABI decoding failed")]
    Abi(#[from] alloy_sol_types::Error),

    /// A StarkNet field element was malformed or out of range.
    #[error("Invalid felt: {reason}")]
    Felt {
        /// Description of what went wrong
        reason: String,
    },

    /// The response value did not have the expected JSON shape.
    #[error("Unexpected response shape: expected {expected}")]
    UnexpectedShape {
        /// Description of the expected shape
        expected: &'static str,
    },

    /// A response payload was not valid JSON.
    #[error("Invalid response payload")]
    InvalidPayload(#[from] serde_json::Error),

    /// A response id matched no outstanding request.
    #[error("Response id {id:?} matches no request in the batch")]
    UnmatchedResponse {
        /// Id echoed by the node, if numeric
        id: Option<u64>,
    },

    /// The aggregate call itself returned an RPC error.
    #[error("Multicall aggregate failed")]
    AggregateFailed(#[source] RpcFailure),
}

impl DecodeError {
    /// Helper to create an `InvalidHex` error.
    pub fn invalid_hex(value: impl Into<String>) -> Self {
        DecodeError::InvalidHex {
            value: value.into(),
        }
    }

    /// Helper to create a `Felt` error.
    pub fn felt(reason: impl Into<String>) -> Self {
        DecodeError::Felt {
            reason: reason.into(),
        }
    }
}
