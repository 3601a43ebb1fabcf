// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Test helpers for chaincache integration tests
//!
//! Provides an in-memory [`BatchTransport`] so that registries and caches can
//! be exercised without real RPC endpoints.

#![allow(dead_code)]

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_json_rpc::{RequestPacket, ResponsePacket};
use alloy_primitives::{hex, Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use alloy_transport::{TransportErrorKind, TransportResult};
use async_trait::async_trait;
use chaincache::config::constants::EVM_MULTICALL3_ADDRESS;
use chaincache::multicall::evm::{aggregate3Call, Result3};
use chaincache::{BatchTransport, ChainCacheConfig, ChainCacheConfigBuilder, ChainConfig};
use serde_json::{json, Value};
use url::Url;

type Responder = dyn Fn(&Value) -> Value + Send + Sync;

/// One batch as seen by the mock.
#[derive(Debug, Clone)]
pub struct SentBatch {
    pub host: String,
    pub requests: Vec<Value>,
}

impl SentBatch {
    pub fn methods(&self) -> Vec<String> {
        self.requests
            .iter()
            .map(|request| request["method"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

/// In-memory transport answering every request of a batch.
///
/// By default it answers like a small healthy node:
///
/// - `eth_getBalance` → `0x64`
/// - `eth_blockNumber` → `0x10`
/// - `eth_call` to Multicall3 → one successful `uint256` per folded call,
///   holding the call's position
/// - `eth_call` elsewhere → `uint256(7)`
/// - anything else → `null`
///
/// # Example
///
/// ```rust,ignore
/// let mock = MockTransport::new()
///     .with_failing_host("bad")
///     .with_responder(|request| json!({ "result": request["id"] }));
/// ```
pub struct MockTransport {
    responder: Box<Responder>,
    failing: Mutex<HashSet<String>>,
    batches: Mutex<Vec<SentBatch>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            responder: Box::new(default_response),
            failing: Mutex::new(HashSet::new()),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Replace the responder. It returns the body merged into each response
    /// object: `{"result": ...}` or `{"error": {...}}`.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.responder = Box::new(responder);
        self
    }

    /// Fail every batch sent to `host` with an HTTP 503.
    pub fn with_failing_host(self, host: &str) -> Self {
        self.fail_host(host);
        self
    }

    pub fn fail_host(&self, host: &str) {
        self.failing.lock().unwrap().insert(host.to_string());
    }

    pub fn heal_host(&self, host: &str) {
        self.failing.lock().unwrap().remove(host);
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn batches(&self) -> Vec<SentBatch> {
        self.batches.lock().unwrap().clone()
    }

    /// Hosts contacted, in order.
    pub fn hosts(&self) -> Vec<String> {
        self.batches().into_iter().map(|batch| batch.host).collect()
    }
}

#[async_trait]
impl BatchTransport for MockTransport {
    async fn send(&self, endpoint: &Url, batch: RequestPacket) -> TransportResult<ResponsePacket> {
        let host = endpoint.host_str().unwrap_or_default().to_string();
        let requests: Vec<Value> =
            serde_json::from_value(serde_json::to_value(&batch).unwrap()).unwrap();
        self.batches.lock().unwrap().push(SentBatch {
            host: host.clone(),
            requests: requests.clone(),
        });
        if self.failing.lock().unwrap().contains(&host) {
            return Err(TransportErrorKind::http_error(503, "service unavailable".into()));
        }

        let responses: Vec<Value> = requests
            .iter()
            .map(|request| {
                let mut response = json!({ "jsonrpc": "2.0", "id": request["id"] });
                if let (Some(fields), Value::Object(body)) =
                    (response.as_object_mut(), (self.responder)(request))
                {
                    fields.extend(body);
                }
                response
            })
            .collect();
        // Payloads are raw JSON values, so go through text.
        Ok(serde_json::from_str(&Value::Array(responses).to_string()).unwrap())
    }
}

fn default_response(request: &Value) -> Value {
    match request["method"].as_str() {
        Some("eth_getBalance") => json!({ "result": "0x64" }),
        Some("eth_blockNumber") => json!({ "result": "0x10" }),
        Some("eth_call") => json!({ "result": answer_call(&request["params"][0]) }),
        _ => json!({ "result": null }),
    }
}

/// Hex result for an `eth_call` request object.
pub fn answer_call(call: &Value) -> String {
    let to = call["to"]
        .as_str()
        .and_then(|to| Address::from_str(to).ok())
        .unwrap_or_default();
    if to != EVM_MULTICALL3_ADDRESS {
        return word(U256::from(7));
    }
    let data = call["input"]
        .as_str()
        .or_else(|| call["data"].as_str())
        .and_then(|data| Bytes::from_str(data).ok())
        .unwrap_or_default();
    let calls = aggregate3Call::abi_decode(&data).map(|c| c.calls).unwrap_or_default();
    let results: Vec<Result3> = (0..calls.len())
        .map(|i| Result3 {
            success: true,
            returnData: U256::from(i).abi_encode().into(),
        })
        .collect();
    hex::encode_prefixed(results.abi_encode())
}

/// ABI-encoded `uint256` as a hex string.
pub fn word(value: U256) -> String {
    hex::encode_prefixed(value.abi_encode())
}

pub fn endpoints(hosts: &[&str]) -> Vec<Url> {
    hosts
        .iter()
        .map(|host| Url::parse(&format!("http://{host}")).unwrap())
        .collect()
}

/// Config with one EVM chain `test` over `hosts` and default timings.
pub fn test_config(hosts: &[&str]) -> ChainCacheConfig {
    ChainCacheConfigBuilder::new()
        .chain(ChainConfig::evm("test", endpoints(hosts)))
        .build()
}

/// Same as [`test_config`] with a rate limit short enough to never drop a
/// batch on a one second loop.
pub fn unthrottled_config(hosts: &[&str]) -> ChainCacheConfig {
    ChainCacheConfigBuilder::new()
        .rate_limit(Duration::ZERO)
        .chain(ChainConfig::evm("test", endpoints(hosts)))
        .build()
}
