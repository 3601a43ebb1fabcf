// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use tokio::sync::{oneshot, watch};

use crate::errors::CellError;
use crate::network::ChainId;
use crate::query::QueryKey;
use crate::reactive::{self, Cell};
use crate::rpc::QueryResult;

/// A handle to one cache entry.
///
/// The value is `None` until the entry first resolves. Holding a `QueryCell`
/// counts as observing the entry, so it keeps being refreshed when its
/// validity lapses; dropping every handle stops refreshes unless the key is
/// subscribed or active.
#[derive(Debug)]
pub struct QueryCell {
    chain: ChainId,
    key: QueryKey,
    receiver: watch::Receiver<Option<QueryResult>>,
    first: Option<oneshot::Receiver<QueryResult>>,
}

impl QueryCell {
    pub(crate) fn new(
        chain: ChainId,
        key: QueryKey,
        receiver: watch::Receiver<Option<QueryResult>>,
        first: Option<oneshot::Receiver<QueryResult>>,
    ) -> Self {
        Self {
            chain,
            key,
            receiver,
            first,
        }
    }

    /// Key of the entry.
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Chain the entry belongs to.
    pub fn chain(&self) -> &ChainId {
        &self.chain
    }

    /// Current value, `None` while pending.
    pub fn get(&self) -> Option<QueryResult> {
        self.receiver.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.receiver.borrow().is_none()
    }

    /// Waits for the entry's first result.
    ///
    /// For a handle created while the entry was pending this is the first
    /// result the cache produced for it, even when that result was an error
    /// or null that did not replace the stored value. Otherwise it is the
    /// current value.
    pub async fn resolved(&mut self) -> Result<QueryResult, CellError> {
        if let Some(first) = self.first.take() {
            return first.await.map_err(|_| self.closed());
        }
        loop {
            let current = self.receiver.borrow_and_update().clone();
            if let Some(value) = current {
                return Ok(value);
            }
            self.receiver.changed().await.map_err(|_| self.closed())?;
        }
    }

    /// Waits until the stored value changes and returns it.
    pub async fn changed(&mut self) -> Result<Option<QueryResult>, CellError> {
        self.receiver.changed().await.map_err(|_| self.closed())?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    /// A derived cell holding `f` of the stored value.
    pub fn map<U, F>(&self, f: F) -> Cell<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(Option<&QueryResult>) -> U + Send + 'static,
    {
        reactive::map_receiver(self.receiver.clone(), move |value| f(value.as_ref()))
    }

    /// A receiver for the stored value.
    pub fn subscribe(&self) -> watch::Receiver<Option<QueryResult>> {
        self.receiver.clone()
    }

    fn closed(&self) -> CellError {
        CellError::Closed {
            chain: self.chain.clone(),
        }
    }
}

impl Clone for QueryCell {
    /// Clones share the entry but not the pending first-result waiter.
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            key: self.key.clone(),
            receiver: self.receiver.clone(),
            first: None,
        }
    }
}
