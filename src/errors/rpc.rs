// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! JSON-RPC error objects returned by nodes.

use alloy_json_rpc::ErrorPayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::constants::MULTICALL_CALL_FAILED_CODE;

/// A structured JSON-RPC error as returned by a node for one request.
///
/// Terminal failures are written into the cache entry and observers see them
/// as the entry's value. Failures whose `code` is configured as retryable keep
/// the previous value and trigger a re-fetch instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("RPC error {code}: {message}")]
pub struct RpcFailure {
    /// JSON-RPC error code
    pub code: i64,
    /// Human readable message from the node
    pub message: String,
    /// Optional revert data or provider-specific detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcFailure {
    /// Creates a failure without attached data.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// The failure recorded for a sub-call that reverted inside an aggregate.
    pub fn multicall_call_failed() -> Self {
        Self::new(MULTICALL_CALL_FAILED_CODE, "call failed")
    }

    /// Whether this failure's code is one of `retryable_codes`.
    pub fn is_retryable(&self, retryable_codes: &[i64]) -> bool {
        retryable_codes.contains(&self.code)
    }
}

impl From<ErrorPayload> for RpcFailure {
    fn from(payload: ErrorPayload) -> Self {
        let data = payload
            .data
            .and_then(|raw| serde_json::from_str(raw.get()).ok());
        Self {
            code: payload.code,
            message: payload.message.into_owned(),
            data,
        }
    }
}
