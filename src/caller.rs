// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Per-chain batching caller.
//!
//! A [`Caller`] turns a set of pending queries into one JSON-RPC batch,
//! sends it through a [`BatchTransport`], and maps the outputs back to query
//! keys. It owns the chain's endpoint list and rotation pointer, the request
//! id sequence, and the per-endpoint rate limiter.
//!
//! A batch goes through three steps:
//!
//! 1. [`Caller::enumerate`] assigns ids and folds call-type queries into one
//!    aggregate multicall placed first
//! 2. [`Caller::call`] sends the batch, rotating endpoints on transport
//!    failure
//! 3. [`Caller::demultiplex`] matches outputs to keys by id and splits the
//!    aggregate result

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, warn, Instrument};
use url::Url;

use crate::config::{ChainCacheConfig, ChainConfig};
use crate::errors::{CallerError, DecodeError};
use crate::multicall;
use crate::network::{ChainId, MulticallContract};
use crate::query::{QueryKey, RawQuery};
use crate::rpc::{self, QueryResult, RpcOutput};
use crate::spans;
use crate::transport::{should_rotate, BatchTransport, RateLimiter};

/// What a request in a batch resolves.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestTarget {
    /// One query, answered directly
    Single(QueryKey),
    /// Several calls folded into one aggregate, answered in this order
    Multicall {
        /// Aggregator the calls were folded into
        contract: MulticallContract,
        /// Keys of the folded calls
        keys: Vec<QueryKey>,
    },
}

/// A request with its assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltRequest {
    /// JSON-RPC id, unique for the lifetime of the caller
    pub id: u64,
    /// Query sent on the wire
    pub query: RawQuery,
    /// Keys this request resolves
    pub target: RequestTarget,
}

/// The requests of one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enumerated {
    /// Requests in wire order; an aggregate, if any, comes first
    pub requests: Vec<BuiltRequest>,
}

impl Enumerated {
    /// Id of the aggregate request, if calls were folded.
    pub fn multicall_id(&self) -> Option<u64> {
        self.requests
            .first()
            .filter(|r| matches!(r.target, RequestTarget::Multicall { .. }))
            .map(|r| r.id)
    }

    /// Keys folded into the aggregate request.
    pub fn multicalled(&self) -> &[QueryKey] {
        match self.requests.first().map(|r| &r.target) {
            Some(RequestTarget::Multicall { keys, .. }) => keys,
            _ => &[],
        }
    }

    /// Whether there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Batching JSON-RPC caller for one chain.
pub struct Caller {
    chain: ChainId,
    multicall: Option<MulticallContract>,
    endpoints: RwLock<Vec<Url>>,
    current: AtomicUsize,
    next_id: AtomicU64,
    dispatched: AtomicU64,
    limiter: RateLimiter,
    transport: Arc<dyn BatchTransport>,
}

impl std::fmt::Debug for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Caller")
            .field("chain", &self.chain)
            .field("endpoints", &self.endpoints())
            .field("current", &self.current_index())
            .field("dispatched", &self.dispatched())
            .finish_non_exhaustive()
    }
}

impl Caller {
    /// Creates a caller for `chain`.
    ///
    /// `multicall` enables folding when the chain has an aggregator.
    pub fn new(
        chain: &ChainConfig,
        multicall: bool,
        rate_limit: Duration,
        transport: Arc<dyn BatchTransport>,
    ) -> Self {
        Self {
            chain: chain.id.clone(),
            multicall: chain.multicall.filter(|_| multicall),
            endpoints: RwLock::new(chain.endpoints.clone()),
            current: AtomicUsize::new(0),
            next_id: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            limiter: RateLimiter::new(rate_limit),
            transport,
        }
    }

    /// Creates a caller with the global and per-chain settings of `config`.
    pub fn from_config(
        config: &ChainCacheConfig,
        chain: &ChainConfig,
        transport: Arc<dyn BatchTransport>,
    ) -> Self {
        Self::new(
            chain,
            config.multicall,
            config.get_rate_limit(&chain.id),
            transport,
        )
    }

    /// The chain this caller serves.
    pub fn chain(&self) -> &ChainId {
        &self.chain
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Assigns ids to `batch`, folding eligible calls into one aggregate.
    ///
    /// Calls are folded only when multicall is enabled for the chain, more
    /// than one query is requested, and more than one of them is eligible.
    pub fn enumerate(&self, batch: &[(QueryKey, RawQuery)]) -> Enumerated {
        let contract = self.multicall.filter(|_| batch.len() > 1);
        let eligible = |query: &RawQuery| {
            contract.is_some_and(|c| query.is_multicall_eligible(c.family()))
        };
        let folded: Vec<&(QueryKey, RawQuery)> =
            batch.iter().filter(|(_, query)| eligible(query)).collect();

        let mut requests = Vec::with_capacity(batch.len());
        let fold = match contract {
            Some(contract) if folded.len() > 1 => {
                let calls: Vec<&RawQuery> = folded.iter().map(|(_, query)| query).collect();
                requests.push(BuiltRequest {
                    id: self.next_id(),
                    query: multicall::aggregate(contract, &calls),
                    target: RequestTarget::Multicall {
                        contract,
                        keys: folded.iter().map(|(key, _)| key.clone()).collect(),
                    },
                });
                true
            }
            _ => false,
        };

        for (key, query) in batch {
            if fold && eligible(query) {
                continue;
            }
            requests.push(BuiltRequest {
                id: self.next_id(),
                query: query.clone(),
                target: RequestTarget::Single(key.clone()),
            });
        }
        Enumerated { requests }
    }

    /// Sends `requests` as one batch.
    ///
    /// Returns `Ok(None)` when the current endpoint is inside its rate limit
    /// interval; the batch is dropped, not delayed. On a transport failure the
    /// caller rotates and re-sends to the next endpoint, trying each endpoint
    /// at most once.
    pub async fn call(
        &self,
        requests: &[BuiltRequest],
    ) -> Result<Option<Vec<RpcOutput>>, CallerError> {
        let serialized = requests
            .iter()
            .map(|request| rpc::serialize_request(request.id, &request.query))
            .collect::<Result<Vec<_>, _>>()?;
        let packet = rpc::batch_packet(serialized);

        let endpoints = self.endpoints();
        if endpoints.is_empty() {
            return Err(CallerError::NoEndpoints {
                chain: self.chain.clone(),
            });
        }

        let mut attempt = 0;
        loop {
            let endpoint = &endpoints[self.current_index() % endpoints.len()];
            if !self.limiter.take(endpoint.as_str()) {
                debug!(chain = %self.chain, endpoint = %endpoint, "Rate limited, dropping batch");
                return Ok(None);
            }
            if attempt == 0 {
                self.dispatched.fetch_add(1, Ordering::Relaxed);
            }
            attempt += 1;

            let response = self
                .transport
                .send(endpoint, packet.clone())
                .instrument(spans::endpoint_attempt(endpoint, attempt))
                .await;

            match response {
                Ok(response) => return Ok(Some(rpc::outputs(response)?)),
                Err(error) if should_rotate(&error) => {
                    warn!(
                        chain = %self.chain,
                        endpoint = %endpoint,
                        attempt,
                        error = %error,
                        "Endpoint failed, rotating"
                    );
                    if !self.rotate() || attempt >= endpoints.len() {
                        return Err(CallerError::endpoints_exhausted(
                            self.chain.clone(),
                            attempt,
                            error,
                        ));
                    }
                }
                Err(error) => return Err(CallerError::transport(self.chain.clone(), error)),
            }
        }
    }

    /// Maps outputs back to query keys.
    ///
    /// Fails without partial results if an output matches no request, the
    /// aggregate returned an error, or its result cannot be split.
    pub fn demultiplex(
        &self,
        enumerated: &Enumerated,
        outputs: Vec<RpcOutput>,
    ) -> Result<Vec<(QueryKey, QueryResult)>, DecodeError> {
        let mut targets: HashMap<u64, &RequestTarget> = enumerated
            .requests
            .iter()
            .map(|request| (request.id, &request.target))
            .collect();

        let mut resolved = Vec::with_capacity(outputs.len());
        for output in outputs {
            let target = output
                .id
                .and_then(|id| targets.remove(&id))
                .ok_or(DecodeError::UnmatchedResponse { id: output.id })?;
            match target {
                RequestTarget::Single(key) => resolved.push((key.clone(), output.result)),
                RequestTarget::Multicall { contract, keys } => {
                    let value = output.result.map_err(DecodeError::AggregateFailed)?;
                    let results = multicall::decode(*contract, &value, keys.len())?;
                    resolved.extend(keys.iter().cloned().zip(results));
                }
            }
        }
        Ok(resolved)
    }

    /// Advances the rotation pointer, wrapping at the end of the list.
    ///
    /// Returns false and does nothing with fewer than two endpoints.
    pub fn rotate(&self) -> bool {
        let len = self.endpoints.read().unwrap_or_else(PoisonError::into_inner).len();
        if len < 2 {
            return false;
        }
        let previous = self
            .current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some((current + 1) % len)
            })
            .unwrap_or_else(|current| current);
        debug!(chain = %self.chain, from = previous, to = (previous + 1) % len, "Rotated endpoint");
        true
    }

    /// Index of the endpoint the next batch goes to.
    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    /// The endpoint the next batch goes to.
    pub fn current_endpoint(&self) -> Option<Url> {
        let endpoints = self.endpoints.read().unwrap_or_else(PoisonError::into_inner);
        if endpoints.is_empty() {
            return None;
        }
        endpoints.get(self.current_index() % endpoints.len()).cloned()
    }

    /// Snapshot of the endpoint list.
    pub fn endpoints(&self) -> Vec<Url> {
        self.endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the endpoint list. New endpoints are immediately eligible
    /// under the rate limiter; the rotation pointer is clamped.
    pub fn set_endpoints(&self, endpoints: Vec<Url>) {
        let mut current = self.endpoints.write().unwrap_or_else(PoisonError::into_inner);
        let len = endpoints.len().max(1);
        *current = endpoints;
        let _ = self
            .current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |index| Some(index % len));
    }

    /// Number of batches dispatched to the network.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }
}
