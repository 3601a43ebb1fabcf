// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Composable multicall `aggregate` codec.
//!
//! Calls are serialized as `Array<DynamicCall>` where every call executes
//! unconditionally and every address, selector and argument is hardcoded:
//!
//! ```text
//! len, ( Static=0, Hardcoded=0, to, Hardcoded=0, selector, calldata_len, (Hardcoded=0, felt)* )*
//! ```
//!
//! The result is an `Array<Span<felt252>>`: `n, (len, felt*)*`.

use serde_json::Value;
use starknet_types_core::felt::Felt;

use crate::errors::DecodeError;
use crate::query::stark::{felts_to_value, parse_felts};
use crate::query::StarkCallQuery;
use crate::rpc::QueryResult;

/// Entry point of the composable multicall contract.
pub const AGGREGATE_ENTRY_POINT: &str = "aggregate";

const EXECUTION_STATIC: Felt = Felt::ZERO;
const HARDCODED: Felt = Felt::ZERO;

/// Folds calls into one `aggregate` call against `multicall`.
pub fn encode(multicall: Felt, calls: &[&StarkCallQuery]) -> StarkCallQuery {
    let mut calldata = vec![Felt::from(calls.len() as u64)];
    for call in calls {
        calldata.extend([
            EXECUTION_STATIC,
            HARDCODED,
            call.contract_address,
            HARDCODED,
            call.entry_point_selector,
            Felt::from(call.calldata.len() as u64),
        ]);
        for arg in &call.calldata {
            calldata.extend([HARDCODED, *arg]);
        }
    }
    StarkCallQuery::new(multicall, AGGREGATE_ENTRY_POINT, calldata)
}

/// Splits an `aggregate` result into one felt array per call.
pub fn decode(result: &Value, expected: usize) -> Result<Vec<QueryResult>, DecodeError> {
    let felts = parse_felts(result)?;
    let mut cursor = felts.iter();
    let count = next_len(&mut cursor)?;
    if count != expected {
        return Err(DecodeError::LengthMismatch {
            expected,
            actual: count,
        });
    }
    let mut results = Vec::with_capacity(count);
    for _ in 0..count {
        let len = next_len(&mut cursor)?;
        let span: Vec<Felt> = cursor.by_ref().take(len).copied().collect();
        if span.len() != len {
            return Err(DecodeError::felt("span runs past the end of the result"));
        }
        results.push(Ok(felts_to_value(&span)));
    }
    Ok(results)
}

fn next_len<'a>(cursor: &mut impl Iterator<Item = &'a Felt>) -> Result<usize, DecodeError> {
    let felt = cursor
        .next()
        .ok_or_else(|| DecodeError::felt("missing length prefix"))?;
    felt_to_usize(felt)
}

fn felt_to_usize(felt: &Felt) -> Result<usize, DecodeError> {
    let bytes = felt.to_bytes_be();
    let (high, low) = bytes.split_at(24);
    if high.iter().any(|b| *b != 0) {
        return Err(DecodeError::felt(format!(
            "length {} does not fit in u64",
            felt.to_hex_string()
        )));
    }
    let mut word = [0u8; 8];
    word.copy_from_slice(low);
    usize::try_from(u64::from_be_bytes(word))
        .map_err(|_| DecodeError::felt("length does not fit in usize"))
}
