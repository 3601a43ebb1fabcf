// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Errors carried by typed reader cells.

use super::{DecodeError, RpcFailure};

/// Why a typed reader has no value.
///
/// Reader values live in reactive cells and are cloned to every observer, so
/// decode failures are kept as their message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReadError {
    /// The node answered with a JSON-RPC error.
    #[error(transparent)]
    Rpc(#[from] RpcFailure),

    /// The node's answer did not have the expected shape.
    #[error("Failed to decode {what}: {reason}")]
    Decode {
        /// What was being decoded
        what: &'static str,
        /// Decoder message
        reason: String,
    },
}

impl ReadError {
    /// Helper to create a `Decode` error.
    pub fn decode(what: &'static str, error: impl std::fmt::Display) -> Self {
        ReadError::Decode {
            what,
            reason: error.to_string(),
        }
    }
}

impl From<DecodeError> for ReadError {
    fn from(error: DecodeError) -> Self {
        ReadError::decode("payload", error)
    }
}
