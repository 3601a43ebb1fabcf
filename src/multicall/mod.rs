// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Call aggregation for each network family.

use serde_json::Value;

use crate::errors::DecodeError;
use crate::network::MulticallContract;
use crate::query::RawQuery;
use crate::rpc::QueryResult;

pub mod evm;
pub mod starknet;

/// Builds the aggregate query for `calls`.
///
/// Calls that do not belong to the contract's family are skipped; the caller
/// only passes eligible calls.
pub fn aggregate(contract: MulticallContract, calls: &[&RawQuery]) -> RawQuery {
    match contract {
        MulticallContract::Evm(address) => {
            let calls: Vec<_> = calls
                .iter()
                .filter_map(|query| match query {
                    RawQuery::Call(call) => Some(call),
                    _ => None,
                })
                .collect();
            RawQuery::Call(evm::encode(address, &calls))
        }
        MulticallContract::StarkNet(address) => {
            let calls: Vec<_> = calls
                .iter()
                .filter_map(|query| match query {
                    RawQuery::StarkCall(call) => Some(call),
                    _ => None,
                })
                .collect();
            RawQuery::StarkCall(starknet::encode(address, &calls))
        }
    }
}

/// Splits an aggregate result into `expected` per-call results, in call order.
pub fn decode(
    contract: MulticallContract,
    result: &Value,
    expected: usize,
) -> Result<Vec<QueryResult>, DecodeError> {
    match contract {
        MulticallContract::Evm(_) => evm::decode(result, expected),
        MulticallContract::StarkNet(_) => starknet::decode(result, expected),
    }
}
