// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Scoped subscriptions.
//!
//! A [`LocalSubscriber`] stands for one consumer, such as a screen, a job, or a
//! request handler. Every key it queries is subscribed once for as long as
//! the subscriber lives, so the cache keeps those entries fresh; dropping the
//! last clone releases all of them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::cache::{CellOptions, QueryCell};
use crate::errors::{CellError, ChainCacheError, RegistryError};
use crate::network::ChainId;
use crate::query::{QueryKey, RawQuery};
use crate::reactive::Cell;
use crate::registry::ChainRegistry;
use crate::rpc::QueryResult;

/// A reference-counted set of subscriptions held on behalf of one consumer.
#[derive(Debug, Clone)]
pub struct LocalSubscriber {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    registry: Arc<ChainRegistry>,
    options: CellOptions,
    keys: Mutex<HashSet<(ChainId, QueryKey)>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let keys = std::mem::take(self.keys.get_mut().unwrap_or_else(PoisonError::into_inner));
        debug!(subscriptions = keys.len(), "Releasing local subscriptions");
        for (chain, key) in keys {
            // The chain was started when the key was subscribed.
            if let Err(error) = self.registry.remove(&chain, key) {
                debug!(chain = %chain, error = %error, "Subscription not released");
            }
        }
    }
}

impl LocalSubscriber {
    pub fn new(registry: Arc<ChainRegistry>) -> Self {
        Self::with_options(registry, CellOptions::default())
    }

    /// Creates a subscriber whose queries use `options` unless overridden.
    pub fn with_options(registry: Arc<ChainRegistry>, options: CellOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                options,
                keys: Mutex::new(HashSet::new()),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.inner.registry
    }

    /// Returns a handle to `query`, subscribing to it the first time.
    pub fn query(&self, chain: &ChainId, query: RawQuery) -> Result<QueryCell, RegistryError> {
        self.query_with(chain, query, self.inner.options)
    }

    pub fn query_with(
        &self,
        chain: &ChainId,
        query: RawQuery,
        options: CellOptions,
    ) -> Result<QueryCell, RegistryError> {
        let cell = self.inner.registry.cell(chain, query, options)?;
        let first = self
            .inner
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((chain.clone(), cell.key().clone()));
        if first {
            self.inner.registry.add(chain, cell.key().clone())?;
        }
        Ok(cell)
    }

    /// Releases the subscription to `key`. Returns whether it was held.
    pub fn release(&self, chain: &ChainId, key: &QueryKey) -> Result<bool, RegistryError> {
        let held = self
            .inner
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(chain.clone(), key.clone()));
        if held {
            self.inner.registry.remove(chain, key.clone())?;
        }
        Ok(held)
    }

    /// Number of keys currently subscribed.
    pub fn len(&self) -> usize {
        self.inner
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribes to `query`, forces a refetch, and waits for its result.
    pub async fn refresh(&self, chain: &ChainId, query: RawQuery) -> Result<QueryResult, ChainCacheError> {
        let key = self.query(chain, query)?.key().clone();
        let next = self.inner.registry.refresh(chain, key, None)?;
        next.await.map_err(|_| {
            ChainCacheError::from(CellError::Closed {
                chain: chain.clone(),
            })
        })
    }

    /// A cell following whichever query `source` currently selects.
    ///
    /// Each selected query is subscribed through this subscriber. The
    /// output is `None` while nothing is selected or the selection is
    /// pending, and follows the selected entry's value otherwise.
    pub fn watch(&self, source: &Cell<Option<(ChainId, RawQuery)>>) -> Cell<Option<QueryResult>> {
        let (output, mut derivation) = Cell::derived(None);
        let this = self.clone();
        let mut selections = source.subscribe();
        selections.mark_changed();

        tokio::spawn(async move {
            let mut current: Option<QueryCell> = None;
            loop {
                let value = tokio::select! {
                    _ = &mut derivation.dropped => break,
                    changed = selections.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let selected = selections.borrow_and_update().clone();
                        current = selected.and_then(|(chain, query)| {
                            this.query(&chain, query)
                                .inspect_err(|error| warn!(chain = %chain, error = %error, "Cannot watch query"))
                                .ok()
                        });
                        current.as_ref().and_then(QueryCell::get)
                    }
                    changed = next_value(current.as_mut()) => match changed {
                        Ok(value) => value,
                        Err(_) => {
                            current = None;
                            None
                        }
                    },
                };
                let Some(target) = derivation.target.upgrade() else { break };
                target.send_replace(value);
            }
        });
        output
    }
}

async fn next_value(cell: Option<&mut QueryCell>) -> Result<Option<QueryResult>, CellError> {
    match cell {
        Some(cell) => cell.changed().await,
        None => std::future::pending().await,
    }
}
