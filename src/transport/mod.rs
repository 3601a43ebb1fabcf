// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Transport layer for JSON-RPC batches.
//!
//! The [`BatchTransport`] trait is the seam between the per-chain caller and
//! the network: one method, one batch, one endpoint. [`HttpTransport`] is the
//! production implementation, built from `alloy-transport-http` wrapped in
//! the tower [`LoggingLayer`]. Tests substitute in-memory transports.
//!
//! The caller also uses:
//!
//! - [`RateLimiter`] to enforce a minimum interval per endpoint
//! - [`should_rotate`] to decide whether a failure warrants trying the next
//!   endpoint
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chaincache::transport::{BatchTransport, HttpTransport};
//!
//! let transport = HttpTransport::new();
//! let response = transport.send(&endpoint, packet).await?;
//! ```

use alloy_json_rpc::{RequestPacket, ResponsePacket};
use alloy_transport::TransportResult;
use async_trait::async_trait;
use url::Url;

mod http;
mod logging;
mod rate_limit;
mod retry;

pub use http::HttpTransport;
pub use logging::{LoggingLayer, LoggingService};
pub use rate_limit::RateLimiter;
pub use retry::should_rotate;

/// Sends one JSON-RPC batch to one endpoint.
#[async_trait]
pub trait BatchTransport: Send + Sync + 'static {
    /// Sends `batch` to `endpoint` and returns the node's response packet.
    async fn send(&self, endpoint: &Url, batch: RequestPacket) -> TransportResult<ResponsePacket>;
}
