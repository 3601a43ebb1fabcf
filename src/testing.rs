// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Scripted transport shared by unit tests.

use std::sync::{Arc, Mutex};

use alloy_json_rpc::{RequestPacket, ResponsePacket};
use alloy_transport::{TransportErrorKind, TransportResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use crate::config::ChainConfig;
use crate::transport::BatchTransport;

type Responder = dyn Fn(&Value) -> Value + Send + Sync;

/// Answers each request with the body `respond` returns for it.
///
/// The body is merged into the response object, so it is either
/// `{"result": ...}` or `{"error": {...}}`.
pub(crate) struct ScriptedTransport {
    respond: Box<Responder>,
    failing: Mutex<Vec<String>>,
    batches: Mutex<Vec<(String, Vec<Value>)>>,
}

impl ScriptedTransport {
    pub(crate) fn new(respond: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            failing: Mutex::default(),
            batches: Mutex::default(),
        })
    }

    /// Answers every request with `result`.
    pub(crate) fn constant(result: Value) -> Arc<Self> {
        Self::new(move |_| json!({ "result": result }))
    }

    pub(crate) fn fail_host(&self, host: &str) {
        self.failing.lock().unwrap().push(host.to_string());
    }

    /// Every batch sent so far, with the host it went to.
    pub(crate) fn batches(&self) -> Vec<(String, Vec<Value>)> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchTransport for ScriptedTransport {
    async fn send(&self, endpoint: &Url, batch: RequestPacket) -> TransportResult<ResponsePacket> {
        let host = endpoint.host_str().unwrap_or_default().to_string();
        let requests: Vec<Value> = serde_json::from_value(serde_json::to_value(&batch).unwrap()).unwrap();
        self.batches.lock().unwrap().push((host.clone(), requests.clone()));
        if self.failing.lock().unwrap().contains(&host) {
            return Err(TransportErrorKind::http_error(503, "unavailable".into()));
        }
        let body: Vec<Value> = requests
            .iter()
            .map(|request| {
                let mut response = json!({ "jsonrpc": "2.0", "id": request["id"] });
                if let (Some(target), Value::Object(fields)) =
                    (response.as_object_mut(), (self.respond)(request))
                {
                    target.extend(fields);
                }
                response
            })
            .collect();
        Ok(serde_json::from_str(&Value::Array(body).to_string()).unwrap())
    }
}

pub(crate) fn evm_chain(hosts: &[&str]) -> ChainConfig {
    ChainConfig::evm(
        "test",
        hosts
            .iter()
            .map(|host| Url::parse(&format!("http://{host}")).unwrap())
            .collect(),
    )
}
