// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Content hashing of canonical queries.
//!
//! A [`QueryKey`] identifies the data a query reads, not the exact request that
//! reads it: block selectors and expiry hints are stripped before hashing, so
//! requests for the same contract state at different blocks share one cache
//! entry.

use std::fmt;

use alloy_primitives::hex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of a [`CanonicalQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(String);

impl QueryKey {
    /// The key as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The part of a query that identifies what it reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalQuery {
    /// JSON-RPC method
    pub method: &'static str,
    /// Params with volatile fields removed
    pub params: Value,
}

impl CanonicalQuery {
    /// Hashes the canonical form.
    ///
    /// `serde_json::Value` keeps object keys sorted, so the serialization is
    /// independent of the order fields were inserted in.
    pub fn key(&self) -> QueryKey {
        let encoded = json!({ "method": self.method, "params": self.params }).to_string();
        QueryKey(hex::encode(Sha256::digest(encoded.as_bytes())))
    }
}
