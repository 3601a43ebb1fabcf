// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Span creation helpers for chaincache operations.
//!
//! Telemetry is kept out of business logic: instead of `#[instrument]`
//! attributes, each instrumented operation has a span helper here.
//!
//! Usage pattern:
//! ```rust,ignore
//! async fn my_operation(&self) {
//!     async { /* business logic */ }
//!         .instrument(spans::my_operation(&self.chain))
//!         .await
//! }
//! ```

use tracing::Span;
use url::Url;

use crate::network::ChainId;

/// Create span for one polling tick of a chain cache.
///
/// Parent: None (each tick is a root span)
/// Children: dispatch_batch span
#[inline]
pub(crate) fn tick(chain: &ChainId, sequence: u64) -> Span {
    tracing::debug_span!(
        "chaincache.tick",
        chain = %chain,
        tick = sequence,
        to_fetch = tracing::field::Empty,
    )
}

/// Create span for sending one batch, across endpoint rotations.
///
/// Parent: tick span
/// Children: chaincache.rpc_batch spans from the logging layer
#[inline]
pub(crate) fn dispatch_batch(chain: &ChainId, requests: usize, multicalled: usize) -> Span {
    tracing::debug_span!(
        "chaincache.dispatch_batch",
        chain = %chain,
        requests,
        multicalled,
    )
}

/// Create span for one attempt against an endpoint.
///
/// Parent: dispatch_batch span
#[inline]
pub(crate) fn endpoint_attempt(endpoint: &Url, attempt: usize) -> Span {
    tracing::trace_span!(
        "chaincache.endpoint_attempt",
        endpoint = %endpoint,
        attempt,
    )
}
