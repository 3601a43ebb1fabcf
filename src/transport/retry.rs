// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Classification of transport failures for endpoint rotation.

use alloy_json_rpc::RpcError;
use alloy_transport::TransportError;

/// Determines if a failed batch should be re-sent to the next endpoint.
///
/// Anything that points at the endpoint (connection failures, non-2xx
/// statuses, unparseable bodies, empty responses) rotates. A request that
/// could not be serialized would fail the same way everywhere.
pub fn should_rotate(error: &TransportError) -> bool {
    match error {
        // Includes HTTP status errors and connection failures
        RpcError::Transport(_) => true,

        // Serialization errors indicate a malformed request
        RpcError::SerError(_) => false,

        // The endpoint answered with something that is not JSON-RPC
        RpcError::DeserError { .. } => true,

        RpcError::NullResp => true,

        // Packet-level error responses do not occur for batches
        RpcError::ErrorResp(_) => false,

        _ => false,
    }
}
