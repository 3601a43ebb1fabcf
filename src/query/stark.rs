// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! StarkNet call helpers: block ids, selectors, felt formatting.

use alloy_primitives::keccak256;
use serde_json::{json, Value};
use starknet_types_core::felt::Felt;

use crate::errors::DecodeError;

/// Block selector for `starknet_call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StarkBlockId {
    /// Latest accepted block
    #[default]
    Latest,
    /// Pending block
    Pending,
    /// Block by number
    Number(u64),
    /// Block by hash
    Hash(Felt),
}

impl StarkBlockId {
    /// The JSON form expected by `starknet_call`.
    pub fn to_value(&self) -> Value {
        match self {
            StarkBlockId::Latest => Value::from("latest"),
            StarkBlockId::Pending => Value::from("pending"),
            StarkBlockId::Number(number) => json!({ "block_number": number }),
            StarkBlockId::Hash(hash) => json!({ "block_hash": hash.to_hex_string() }),
        }
    }
}

/// The entry point selector for a Cairo function name: keccak-256 truncated
/// to 250 bits.
pub fn selector_from_name(name: &str) -> Felt {
    let mut digest = keccak256(name.as_bytes()).0;
    digest[0] &= 0x03;
    Felt::from_bytes_be(&digest)
}

/// Parses a `0x`-prefixed felt as returned by a node.
pub fn parse_felt(value: &Value) -> Result<Felt, DecodeError> {
    let text = value.as_str().ok_or(DecodeError::UnexpectedShape {
        expected: "felt hex string",
    })?;
    Felt::from_hex(text).map_err(|_| DecodeError::felt(format!("not a felt: {text}")))
}

/// Parses an array of felts.
pub fn parse_felts(value: &Value) -> Result<Vec<Felt>, DecodeError> {
    value
        .as_array()
        .ok_or(DecodeError::UnexpectedShape {
            expected: "array of felts",
        })?
        .iter()
        .map(parse_felt)
        .collect()
}

/// Formats felts the way nodes return them.
pub fn felts_to_value(felts: &[Felt]) -> Value {
    Value::Array(
        felts
            .iter()
            .map(|felt| Value::String(felt.to_hex_string()))
            .collect(),
    )
}
