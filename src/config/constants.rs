// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Well-known addresses and constants
//!
//! This module centralizes magic constants and well-known contract addresses
//! used throughout the chaincache crate.

use std::time::Duration;

use alloy_primitives::{address, Address};
use starknet_types_core::felt::Felt;

/// Multicall3, deployed at the same address on every major EVM chain.
///
/// Contract: 0xcA11bde05977b3631167028862bE2a173976CA11
pub const EVM_MULTICALL3_ADDRESS: Address = address!("ca11bde05977b3631167028862be2a173976ca11");

/// Composable multicall contract on StarkNet mainnet and testnets.
pub const STARKNET_MULTICALL_HEX: &str =
    "0x034ffb8f4452df7a613a0210824d6414dbadcddce6c6e19bf4ddc9e22ce5f970";

/// Composable multicall contract as a field element.
pub fn starknet_multicall_address() -> Felt {
    Felt::from_hex_unchecked(STARKNET_MULTICALL_HEX)
}

/// Error code recorded for a sub-call that failed inside an aggregate.
pub const MULTICALL_CALL_FAILED_CODE: i64 = 400;

/// JSON-RPC codes treated as transient by default.
///
/// - `-32005`: limit exceeded
/// - `-32603`: internal error
/// - `-32002`: resource unavailable
/// - `429`: too many requests, as reported by some gateways
pub const DEFAULT_RETRYABLE_CODES: [i64; 4] = [-32005, -32603, -32002, 429];

/// Interval between polling ticks.
pub const DEFAULT_LOOP_DELAY: Duration = Duration::from_millis(1000);

/// Minimum interval between two batches sent to the same endpoint.
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(1000);

/// Re-fetch interval after a retryable failure.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Retry interval for lookups that return `null` until the chain catches up
/// (receipts and transactions of pending hashes).
pub const PENDING_LOOKUP_RETRY: Duration = Duration::from_secs(5);
