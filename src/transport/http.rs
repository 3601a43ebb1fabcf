// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP batch transport.

use alloy_json_rpc::{RequestPacket, ResponsePacket};
use alloy_transport::TransportResult;
use alloy_transport_http::{reqwest, Http};
use async_trait::async_trait;
use tower::{Layer, Service};
use url::Url;

use super::{BatchTransport, LoggingLayer};

/// Sends batches as HTTP POSTs through a shared `reqwest` client.
///
/// Non-2xx statuses surface as transport errors so the caller rotates away
/// from the endpoint.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
    log_payloads: bool,
}

impl HttpTransport {
    /// Creates a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport from a preconfigured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            log_payloads: false,
        }
    }

    /// Logs full request and response packets at trace level.
    pub fn with_payload_logging(mut self, enabled: bool) -> Self {
        self.log_payloads = enabled;
        self
    }
}

#[async_trait]
impl BatchTransport for HttpTransport {
    async fn send(&self, endpoint: &Url, batch: RequestPacket) -> TransportResult<ResponsePacket> {
        let label = endpoint.host_str().unwrap_or_else(|| endpoint.as_str());
        let mut service = LoggingLayer::new(label)
            .with_payload_logging(self.log_payloads)
            .layer(Http::with_client(self.client.clone(), endpoint.clone()));
        service.call(batch).await
    }
}
