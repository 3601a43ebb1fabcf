// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Tower logging layer for JSON-RPC batch transports.
//!
//! Wraps any service from [`RequestPacket`] to [`ResponsePacket`] and records
//! one span per round trip with the endpoint, batch size and latency.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use alloy_json_rpc::{RequestPacket, ResponsePacket};
use alloy_transport::TransportError;
use tokio::time::Instant;
use tower::Layer;
use tracing::{debug, trace, warn, Instrument};

/// A Tower layer that logs each batch sent to an endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use chaincache::transport::LoggingLayer;
/// use alloy_transport_http::Http;
/// use tower::Layer;
///
/// let service = LoggingLayer::new("eth.llamarpc.com").layer(Http::new(url));
/// ```
#[derive(Clone, Debug, Default)]
pub struct LoggingLayer {
    endpoint: String,
    /// Whether to log full packets (can be verbose)
    log_payloads: bool,
}

impl LoggingLayer {
    /// Creates a layer labelling its spans with `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            log_payloads: false,
        }
    }

    /// Enables trace-level logging of request and response packets.
    pub fn with_payload_logging(mut self, enabled: bool) -> Self {
        self.log_payloads = enabled;
        self
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        LoggingService {
            service,
            endpoint: self.endpoint.clone(),
            log_payloads: self.log_payloads,
        }
    }
}

/// A Tower service that logs JSON-RPC batches.
#[derive(Clone, Debug)]
pub struct LoggingService<S> {
    service: S,
    endpoint: String,
    log_payloads: bool,
}

impl<S> tower::Service<RequestPacket> for LoggingService<S>
where
    S: tower::Service<RequestPacket, Response = ResponsePacket, Error = TransportError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: RequestPacket) -> Self::Future {
        let log_payloads = self.log_payloads;
        let mut service = self.service.clone();
        let summary = describe(&request);
        let span = tracing::debug_span!(
            "chaincache.rpc_batch",
            endpoint = %self.endpoint,
            batch = %summary,
            duration_ms = tracing::field::Empty,
        );

        Box::pin(
            async move {
                let start = Instant::now();
                if log_payloads {
                    trace!(request = ?request, "RPC request");
                }

                let result = service.call(request).await;
                let duration_ms = start.elapsed().as_millis() as u64;
                tracing::Span::current().record("duration_ms", duration_ms);

                match &result {
                    Ok(response) => {
                        if log_payloads {
                            trace!(response = ?response, "RPC response");
                        }
                        debug!(duration_ms, responses = response_count(response), "RPC batch answered");
                    }
                    Err(e) => warn!(error = %e, duration_ms, "RPC batch failed"),
                }
                result
            }
            .instrument(span),
        )
    }
}

/// Short description of a packet for span fields.
fn describe(request: &RequestPacket) -> String {
    match request {
        RequestPacket::Single(req) => req.method().to_string(),
        RequestPacket::Batch(reqs) => match reqs.as_slice() {
            [] => "batch(empty)".to_string(),
            [only] => format!("batch({})", only.method()),
            _ => format!("batch({} calls)", reqs.len()),
        },
    }
}

fn response_count(response: &ResponsePacket) -> usize {
    match response {
        ResponsePacket::Single(_) => 1,
        ResponsePacket::Batch(responses) => responses.len(),
    }
}
