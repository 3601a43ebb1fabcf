// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Multicall3 `aggregate3` codec.

use alloy_primitives::{hex, Address};
use alloy_sol_types::{sol, SolCall};
use serde_json::Value;

use crate::errors::{DecodeError, RpcFailure};
use crate::query::CallQuery;
use crate::rpc::QueryResult;

sol! {
    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    struct Result3 {
        bool success;
        bytes returnData;
    }

    function aggregate3(Call3[] calldata calls) external payable returns (Result3[] memory returnData);
}

/// Folds calls into one allow-failure `aggregate3` call against `multicall`.
pub fn encode(multicall: Address, calls: &[&CallQuery]) -> CallQuery {
    let calls = calls
        .iter()
        .map(|call| Call3 {
            target: call.to,
            allowFailure: true,
            callData: call.data.clone(),
        })
        .collect();
    CallQuery::sol(multicall, &aggregate3Call { calls })
}

/// Splits an `aggregate3` result into one result per call.
///
/// Reverted sub-calls become [`RpcFailure::multicall_call_failed`].
pub fn decode(result: &Value, expected: usize) -> Result<Vec<QueryResult>, DecodeError> {
    let text = result.as_str().ok_or(DecodeError::UnexpectedShape {
        expected: "hex encoded aggregate3 result",
    })?;
    let bytes = hex::decode(text).map_err(|_| DecodeError::invalid_hex(text))?;
    let returned = aggregate3Call::abi_decode_returns(&bytes)?;
    if returned.len() != expected {
        return Err(DecodeError::LengthMismatch {
            expected,
            actual: returned.len(),
        });
    }
    Ok(returned
        .into_iter()
        .map(|r| {
            if r.success {
                Ok(Value::String(r.returnData.to_string()))
            } else {
                Err(RpcFailure::multicall_call_failed())
            }
        })
        .collect())
}
