// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Per-chain cache state, owned by the chain's polling task.
//!
//! Everything a tick reads or writes lives here: registered queries, their
//! slots, subscription counts, expiry deadlines, validity and retry
//! intervals, and pending waiters. Handles never touch it directly; they
//! send [`Update`]s that are applied at the start of the next tick.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn, Instrument, Span};

use super::{CellOptions, Slot};
use crate::caller::Caller;
use crate::config::ChainCacheConfig;
use crate::network::ChainId;
use crate::query::{QueryKey, RawQuery};
use crate::rpc::QueryResult;
use crate::spans;

/// A change requested by a handle.
#[derive(Debug)]
pub(crate) enum Update {
    /// First request for `key`; carries a one-off subscription released once
    /// the key resolves.
    Register {
        key: QueryKey,
        query: RawQuery,
        options: CellOptions,
        slot: Slot,
    },
    Options {
        key: QueryKey,
        options: CellOptions,
    },
    Subscribe(QueryKey),
    Unsubscribe(QueryKey),
    /// Expire `key` now, optionally swapping the request that computes it.
    /// `waiter` receives the next resolution, not the current value.
    Invalidate {
        key: QueryKey,
        replace: Option<RawQuery>,
        waiter: Option<oneshot::Sender<QueryResult>>,
    },
    Activate {
        key: QueryKey,
        active: bool,
    },
    /// Resolve `waiter` with the current value, or the next one if pending.
    Wait {
        key: QueryKey,
        waiter: oneshot::Sender<QueryResult>,
    },
}

/// Cache-wide settings the tick needs.
#[derive(Debug, Clone)]
pub(crate) struct Policy {
    pub retryable_codes: Vec<i64>,
    pub retry_interval: Duration,
    pub request_timeout: Option<Duration>,
}

impl From<&ChainCacheConfig> for Policy {
    fn from(config: &ChainCacheConfig) -> Self {
        Self {
            retryable_codes: config.retryable_codes.clone(),
            retry_interval: config.retry_interval,
            request_timeout: config.request_timeout,
        }
    }
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// Nothing was due
    Idle,
    /// The endpoint was inside its rate limit interval
    RateLimited,
    /// The batch failed at the transport or decoding level
    Failed,
    /// This many keys were resolved
    Resolved(usize),
}

#[derive(Debug)]
pub(crate) struct CacheState {
    chain: ChainId,
    policy: Policy,
    queries: HashMap<QueryKey, RawQuery>,
    slots: HashMap<QueryKey, Slot>,
    /// Keys that have resolved at least once
    cached: HashSet<QueryKey>,
    subscriptions: HashMap<QueryKey, usize>,
    /// Keys still holding their registration subscription
    first_fetch: HashSet<QueryKey>,
    expiry: HashMap<QueryKey, Instant>,
    validity: HashMap<QueryKey, Duration>,
    retry: HashMap<QueryKey, Duration>,
    active: HashSet<QueryKey>,
    waiters: HashMap<QueryKey, Vec<oneshot::Sender<QueryResult>>>,
}

impl CacheState {
    pub(crate) fn new(chain: ChainId, policy: Policy) -> Self {
        Self {
            chain,
            policy,
            queries: HashMap::new(),
            slots: HashMap::new(),
            cached: HashSet::new(),
            subscriptions: HashMap::new(),
            first_fetch: HashSet::new(),
            expiry: HashMap::new(),
            validity: HashMap::new(),
            retry: HashMap::new(),
            active: HashSet::new(),
            waiters: HashMap::new(),
        }
    }

    pub(crate) fn apply(&mut self, update: Update, now: Instant) {
        match update {
            Update::Register {
                key,
                query,
                options,
                slot,
            } => {
                if let Some(validity) = options.validity.or_else(|| query.expiry_hint()) {
                    self.validity.insert(key.clone(), validity);
                }
                if let Some(retry) = options.retry {
                    self.retry.insert(key.clone(), retry);
                }
                self.queries.insert(key.clone(), query);
                self.slots.insert(key.clone(), slot);
                if self.first_fetch.insert(key.clone()) {
                    self.subscribe(key);
                }
            }
            Update::Options { key, options } => {
                if let Some(validity) = options.validity {
                    self.validity.insert(key.clone(), validity);
                }
                if let Some(retry) = options.retry {
                    self.retry.insert(key, retry);
                }
            }
            Update::Subscribe(key) => self.subscribe(key),
            Update::Unsubscribe(key) => {
                if let Some(count) = self.subscriptions.get_mut(&key) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        self.subscriptions.remove(&key);
                    }
                }
            }
            Update::Invalidate {
                key,
                replace,
                waiter,
            } => {
                if let Some(query) = replace {
                    if let Some(validity) = query.expiry_hint() {
                        self.validity.entry(key.clone()).or_insert(validity);
                    }
                    self.queries.insert(key.clone(), query);
                }
                if !self.queries.contains_key(&key) {
                    debug!(chain = %self.chain, key = key.short(), "Invalidating unknown key");
                }
                self.expiry.insert(key.clone(), now);
                if let Some(waiter) = waiter {
                    self.waiters.entry(key).or_default().push(waiter);
                }
            }
            Update::Activate { key, active } => {
                if active {
                    self.active.insert(key);
                } else {
                    self.active.remove(&key);
                }
            }
            Update::Wait { key, waiter } => {
                let current = self.slots.get(&key).and_then(Slot::get);
                match current {
                    Some(value) => {
                        let _ = waiter.send(value);
                    }
                    None => self.waiters.entry(key).or_default().push(waiter),
                }
            }
        }
    }

    fn subscribe(&mut self, key: QueryKey) {
        *self.subscriptions.entry(key).or_default() += 1;
    }

    fn observed(&self, key: &QueryKey) -> bool {
        self.subscriptions.get(key).is_some_and(|n| *n > 0)
            || self.active.contains(key)
            || self.waiters.contains_key(key)
            || self.slots.get(key).is_some_and(|slot| slot.observers() > 0)
    }

    fn valid(&self, key: &QueryKey, now: Instant) -> bool {
        self.cached.contains(key) && self.expiry.get(key).map_or(true, |at| *at > now)
    }

    /// Keys due for fetching at `now`, in key order.
    ///
    /// A key is due when its deadline has passed and someone still observes
    /// it or waits for its next result, or when it is subscribed but has
    /// never resolved. Cached keys that
    /// are still valid are never due.
    pub(crate) fn plan(&self, now: Instant) -> Vec<QueryKey> {
        let expired = self
            .expiry
            .iter()
            .filter(|(key, at)| **at <= now && self.observed(key))
            .map(|(key, _)| key);
        let newly_subscribed = self
            .subscriptions
            .iter()
            .filter(|(key, count)| **count > 0 && !self.cached.contains(*key))
            .map(|(key, _)| key);

        let due: BTreeSet<&QueryKey> = expired.chain(newly_subscribed).collect();
        due.into_iter()
            .filter(|key| !self.valid(key, now) && self.queries.contains_key(*key))
            .cloned()
            .collect()
    }

    /// Fetches every due key in one batch and applies the results.
    pub(crate) async fn tick(&mut self, caller: &Caller) -> TickOutcome {
        let now = Instant::now();
        let keys = self.plan(now);
        Span::current().record("to_fetch", keys.len());
        if keys.is_empty() {
            return TickOutcome::Idle;
        }

        let batch: Vec<(QueryKey, RawQuery)> = keys
            .iter()
            .filter_map(|key| self.queries.get(key).map(|q| (key.clone(), q.clone())))
            .collect();
        let enumerated = caller.enumerate(&batch);
        let span = spans::dispatch_batch(
            &self.chain,
            enumerated.requests.len(),
            enumerated.multicalled().len(),
        );
        let outputs = match caller.call(&enumerated.requests).instrument(span).await {
            Ok(None) => return TickOutcome::RateLimited,
            Ok(Some(outputs)) => {
                self.schedule_timeout(&keys, now);
                outputs
            }
            Err(error) => {
                self.schedule_timeout(&keys, now);
                warn!(chain = %self.chain, keys = keys.len(), error = %error, "Batch failed");
                return TickOutcome::Failed;
            }
        };

        let resolved = match caller.demultiplex(&enumerated, outputs) {
            Ok(resolved) => resolved,
            Err(error) => {
                warn!(chain = %self.chain, error = %error, "Discarding undecodable batch");
                caller.rotate();
                return TickOutcome::Failed;
            }
        };

        let now = Instant::now();
        let count = resolved.len();
        let mut rotate = false;
        for (key, result) in resolved {
            rotate |= self.resolve(key, result, now);
        }
        if rotate {
            caller.rotate();
        }
        TickOutcome::Resolved(count)
    }

    fn schedule_timeout(&mut self, keys: &[QueryKey], sent: Instant) {
        if let Some(timeout) = self.policy.request_timeout {
            for key in keys {
                self.expiry.insert(key.clone(), sent + timeout);
            }
        }
    }

    /// Applies one result. Returns whether it carried a retryable error code.
    fn resolve(&mut self, key: QueryKey, result: QueryResult, now: Instant) -> bool {
        let retryable = matches!(&result, Err(failure) if failure.is_retryable(&self.policy.retryable_codes));
        if retryable {
            let interval = self.policy.retry_interval;
            self.retry.entry(key.clone()).or_insert(interval);
        }

        let keep_previous = matches!(&result, Err(_) | Ok(Value::Null));
        match self.retry.get(&key).copied() {
            Some(interval) if keep_previous => {
                debug!(
                    chain = %self.chain,
                    key = key.short(),
                    retry_in = ?interval,
                    "No usable value, retrying"
                );
                self.expiry.insert(key.clone(), now + interval);
            }
            _ => {
                self.retry.remove(&key);
                match self.validity.get(&key) {
                    Some(validity) => {
                        self.expiry.insert(key.clone(), now + *validity);
                    }
                    None => {
                        self.expiry.remove(&key);
                    }
                }
                if let Some(slot) = self.slots.get(&key) {
                    slot.set_if_changed(Some(result.clone()));
                }
            }
        }

        if let Some(waiters) = self.waiters.remove(&key) {
            for waiter in waiters {
                let _ = waiter.send(result.clone());
            }
        }
        if self.first_fetch.remove(&key) {
            self.apply(Update::Unsubscribe(key.clone()), now);
        }
        self.cached.insert(key);
        retryable
    }

    #[cfg(test)]
    pub(crate) fn subscriptions(&self, key: &QueryKey) -> usize {
        self.subscriptions.get(key).copied().unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn expiry(&self, key: &QueryKey) -> Option<Instant> {
        self.expiry.get(key).copied()
    }
}
