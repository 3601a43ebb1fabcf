// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Per-chain query cache with a polling loop.
//!
//! A [`ChainCache`] owns one background task that wakes every loop delay,
//! applies the changes handles have queued since the previous tick, collects
//! every key that is due, and resolves them all with one batched request.
//!
//! Entries are identified by [`QueryKey`]; asking twice for the same data
//! returns handles to the same entry. An entry is refetched when its
//! validity lapses, but only while something observes it: a live
//! [`QueryCell`], a subscription, or an activation.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use alloy_primitives::address;
//! use chaincache::cache::{CellOptions, ChainCache};
//! use chaincache::config::ChainCacheConfig;
//! use chaincache::query::RawQuery;
//! use chaincache::transport::HttpTransport;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ChainCacheConfig::default();
//! let chain = config.chain(&"mainnet".into()).ok_or("no mainnet")?.clone();
//! let cache = ChainCache::spawn(&config, &chain, Arc::new(HttpTransport::new()))?;
//!
//! let holder = address!("d8da6bf26964af9d7eed9e03e53415d37aa96045");
//! let mut balance = cache.cell(RawQuery::balance(holder), CellOptions::default());
//! println!("{:?}", balance.resolved().await?);
//! # Ok(())
//! # }
//! ```

mod cell;
mod state;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, Instrument};
use url::Url;

pub use cell::QueryCell;
pub(crate) use state::{CacheState, Policy, TickOutcome, Update};

use crate::caller::Caller;
use crate::config::{ChainCacheConfig, ChainConfig};
use crate::errors::RegistryError;
use crate::network::ChainId;
use crate::query::{QueryKey, RawQuery};
use crate::reactive::{self, Cell};
use crate::rpc::QueryResult;
use crate::spans;
use crate::transport::BatchTransport;

/// Storage for one entry's value; `None` until first resolved.
pub type Slot = Cell<Option<QueryResult>>;

/// Per-entry timing options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellOptions {
    /// How long a resolved value stays fresh. Defaults to the query's own
    /// expiry hint; without either the value never expires.
    pub validity: Option<Duration>,
    /// Puts the entry in retry mode: a null or error result keeps the
    /// previous value and is refetched after this interval.
    pub retry: Option<Duration>,
}

impl CellOptions {
    pub fn validity(mut self, validity: Duration) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn retry(mut self, retry: Duration) -> Self {
        self.retry = Some(retry);
        self
    }

    fn is_empty(&self) -> bool {
        self.validity.is_none() && self.retry.is_none()
    }
}

/// Handle to one chain's cache. Cheap to clone; the polling task stops when
/// the last clone is dropped.
#[derive(Debug, Clone)]
pub struct ChainCache {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    chain: ChainId,
    caller: Arc<Caller>,
    slots: Mutex<HashMap<QueryKey, Slot>>,
    updates: mpsc::UnboundedSender<Update>,
    live: Cell<bool>,
}

impl ChainCache {
    /// Starts a cache for `chain` with the settings of `config`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn(
        config: &ChainCacheConfig,
        chain: &ChainConfig,
        transport: Arc<dyn BatchTransport>,
    ) -> Result<Self, RegistryError> {
        let caller = Caller::from_config(config, chain, transport);
        Self::with_caller(
            caller,
            Policy::from(config),
            config.get_loop_delay(&chain.id),
        )
    }

    pub(crate) fn with_caller(
        caller: Caller,
        policy: Policy,
        loop_delay: Duration,
    ) -> Result<Self, RegistryError> {
        let chain = caller.chain().clone();
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| RegistryError::NoRuntime {
            chain: chain.clone(),
        })?;

        let caller = Arc::new(caller);
        let (updates, receiver) = mpsc::unbounded_channel();
        let live = Cell::new(true);
        let ticks = reactive::clock(&live, loop_delay).subscribe();
        let state = CacheState::new(chain.clone(), policy);
        runtime.spawn(poll(state, Arc::clone(&caller), receiver, ticks));

        debug!(chain = %chain, loop_delay = ?loop_delay, "Chain cache started");
        Ok(Self {
            inner: Arc::new(Inner {
                chain,
                caller,
                slots: Mutex::new(HashMap::new()),
                updates,
                live,
            }),
        })
    }

    pub fn chain(&self) -> &ChainId {
        &self.inner.chain
    }

    fn send(&self, update: Update) {
        if self.inner.updates.send(update).is_err() {
            debug!(chain = %self.inner.chain, "Update dropped, polling task stopped");
        }
    }

    /// Returns a handle to the entry for `query`, creating it if needed.
    ///
    /// A new entry is fetched on the next tick. Asking again for a key that
    /// already exists returns a handle to the same entry and applies
    /// `options` to it.
    pub fn cell(&self, query: RawQuery, options: CellOptions) -> QueryCell {
        let key = query.key();
        let mut slots = self.inner.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = match slots.get(&key) {
            Some(slot) => {
                if !options.is_empty() {
                    self.send(Update::Options {
                        key: key.clone(),
                        options,
                    });
                }
                slot.clone()
            }
            None => {
                let slot = Slot::new(None);
                slots.insert(key.clone(), slot.clone());
                self.send(Update::Register {
                    key: key.clone(),
                    query,
                    options,
                    slot: slot.clone(),
                });
                slot
            }
        };
        drop(slots);

        let receiver = slot.subscribe();
        let pending = receiver.borrow().is_none();
        let first = pending.then(|| {
            let (waiter, first) = oneshot::channel();
            self.send(Update::Wait {
                key: key.clone(),
                waiter,
            });
            first
        });
        QueryCell::new(self.inner.chain.clone(), key, receiver, first)
    }

    /// Current value of `key`, if the entry exists and has resolved.
    pub fn get(&self, key: &QueryKey) -> Option<QueryResult> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .and_then(Slot::get)
    }

    /// Subscribes to `key`, keeping it fetched and refreshed until a
    /// matching [`remove`](Self::remove).
    pub fn add(&self, key: QueryKey) {
        self.send(Update::Subscribe(key));
    }

    /// Drops one subscription to `key`.
    pub fn remove(&self, key: QueryKey) {
        self.send(Update::Unsubscribe(key));
    }

    /// Expires `key` so that it is refetched on the next tick while
    /// observed. `replace` swaps the request used to compute it.
    pub fn invalidate(&self, key: QueryKey, replace: Option<RawQuery>) {
        self.send(Update::Invalidate {
            key,
            replace,
            waiter: None,
        });
    }

    /// Expires `key` and returns a receiver for the refetched result.
    pub fn refresh(
        &self,
        key: QueryKey,
        replace: Option<RawQuery>,
    ) -> oneshot::Receiver<QueryResult> {
        let (waiter, receiver) = oneshot::channel();
        self.send(Update::Invalidate {
            key,
            replace,
            waiter: Some(waiter),
        });
        receiver
    }

    /// Marks `key` as observed regardless of handles or subscriptions.
    pub fn activate(&self, key: QueryKey, active: bool) {
        self.send(Update::Activate { key, active });
    }

    /// Pauses or resumes the polling loop.
    pub fn run(&self, live: bool) {
        self.inner.live.set(live);
    }

    pub fn is_running(&self) -> bool {
        self.inner.live.get()
    }

    /// Number of batches dispatched so far.
    pub fn counter(&self) -> u64 {
        self.inner.caller.dispatched()
    }

    pub fn endpoints(&self) -> Vec<Url> {
        self.inner.caller.endpoints()
    }

    /// Replaces the endpoint list; the current index is reset.
    pub fn set_endpoints(&self, endpoints: Vec<Url>) {
        self.inner.caller.set_endpoints(endpoints);
    }
}

async fn poll(
    mut state: CacheState,
    caller: Arc<Caller>,
    mut updates: mpsc::UnboundedReceiver<Update>,
    mut ticks: watch::Receiver<u64>,
) {
    let chain = caller.chain().clone();
    while ticks.changed().await.is_ok() {
        let sequence = *ticks.borrow_and_update();
        loop {
            match updates.try_recv() {
                Ok(update) => state.apply(update, Instant::now()),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    debug!(chain = %chain, "Chain cache stopped");
                    return;
                }
            }
        }
        let outcome = state
            .tick(&caller)
            .instrument(spans::tick(&chain, sequence))
            .await;
        if outcome != TickOutcome::Idle {
            debug!(chain = %chain, tick = sequence, outcome = ?outcome, "Tick finished");
        }
    }
    debug!(chain = %chain, "Chain cache stopped");
}
