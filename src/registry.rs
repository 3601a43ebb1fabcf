// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! One cache per chain, created on first use.
//!
//! The registry is an ordinary value owned by the application: construct it
//! once at startup, wrap it in an `Arc`, and pass it to whatever needs cached
//! reads. Each configured chain gets exactly one [`ChainCache`], and with it
//! one polling loop and one endpoint rotation state, for the lifetime of the
//! registry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::oneshot;
use tracing::info;
use url::Url;

use crate::cache::{CellOptions, ChainCache, QueryCell};
use crate::config::ChainCacheConfig;
use crate::errors::RegistryError;
use crate::network::ChainId;
use crate::query::{QueryKey, RawQuery};
use crate::rpc::QueryResult;
use crate::transport::{BatchTransport, HttpTransport};

/// Routes cache operations to per-chain caches.
pub struct ChainRegistry {
    config: RwLock<ChainCacheConfig>,
    transport: Arc<dyn BatchTransport>,
    caches: RwLock<HashMap<ChainId, ChainCache>>,
}

impl std::fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("chains", &self.chains())
            .field("started", &self.started())
            .finish_non_exhaustive()
    }
}

impl ChainRegistry {
    /// Creates a registry that talks HTTP to the configured endpoints.
    pub fn new(config: ChainCacheConfig) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    /// Creates a registry with a custom transport.
    pub fn with_transport(config: ChainCacheConfig, transport: Arc<dyn BatchTransport>) -> Self {
        Self {
            config: RwLock::new(config),
            transport,
            caches: RwLock::new(HashMap::new()),
        }
    }

    /// The cache for `chain`, starting it if this is the first use.
    pub fn cache(&self, chain: &ChainId) -> Result<ChainCache, RegistryError> {
        if let Some(cache) = self
            .caches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(chain)
        {
            return Ok(cache.clone());
        }

        let mut caches = self.caches.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(cache) = caches.get(chain) {
            return Ok(cache.clone());
        }
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        let chain_config = config
            .chain(chain)
            .ok_or_else(|| RegistryError::unknown_chain(chain))?;
        let cache = ChainCache::spawn(&config, chain_config, Arc::clone(&self.transport))?;
        info!(
            chain = %chain,
            endpoints = chain_config.endpoints.len(),
            multicall = chain_config.multicall.is_some() && config.multicall,
            "Started chain cache"
        );
        caches.insert(chain.clone(), cache.clone());
        Ok(cache)
    }

    /// Returns a handle to the entry for `query` on `chain`.
    pub fn cell(
        &self,
        chain: &ChainId,
        query: RawQuery,
        options: CellOptions,
    ) -> Result<QueryCell, RegistryError> {
        Ok(self.cache(chain)?.cell(query, options))
    }

    /// Adds one subscription to `key`.
    pub fn add(&self, chain: &ChainId, key: QueryKey) -> Result<(), RegistryError> {
        self.cache(chain)?.add(key);
        Ok(())
    }

    /// Drops one subscription to `key`.
    pub fn remove(&self, chain: &ChainId, key: QueryKey) -> Result<(), RegistryError> {
        self.cache(chain)?.remove(key);
        Ok(())
    }

    /// Forces `key` to be refetched, optionally with a replacement request.
    pub fn invalidate(
        &self,
        chain: &ChainId,
        key: QueryKey,
        replace: Option<RawQuery>,
    ) -> Result<(), RegistryError> {
        self.cache(chain)?.invalidate(key, replace);
        Ok(())
    }

    /// Like [`invalidate`](Self::invalidate), returning a receiver for the
    /// refetched result.
    pub fn refresh(
        &self,
        chain: &ChainId,
        key: QueryKey,
        replace: Option<RawQuery>,
    ) -> Result<oneshot::Receiver<QueryResult>, RegistryError> {
        Ok(self.cache(chain)?.refresh(key, replace))
    }

    pub fn activate(&self, chain: &ChainId, key: QueryKey, active: bool) -> Result<(), RegistryError> {
        self.cache(chain)?.activate(key, active);
        Ok(())
    }

    /// Batches dispatched for `chain`.
    pub fn counter(&self, chain: &ChainId) -> Result<u64, RegistryError> {
        Ok(self.cache(chain)?.counter())
    }

    /// Pauses or resumes polling for `chain`.
    pub fn run(&self, chain: &ChainId, live: bool) -> Result<(), RegistryError> {
        self.cache(chain)?.run(live);
        Ok(())
    }

    /// Replaces the endpoints of `chain`, for a running cache and for one
    /// started later.
    pub fn update_endpoints(&self, chain: &ChainId, endpoints: Vec<Url>) -> Result<(), RegistryError> {
        {
            let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
            let chain_config = config
                .chains
                .get_mut(chain)
                .ok_or_else(|| RegistryError::unknown_chain(chain))?;
            chain_config.endpoints = endpoints.clone();
        }
        let running = self
            .caches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(chain)
            .cloned();
        if let Some(cache) = running {
            cache.set_endpoints(endpoints);
        }
        Ok(())
    }

    /// Configured chain ids, sorted.
    pub fn chains(&self) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = self
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .chains
            .keys()
            .cloned()
            .collect();
        chains.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        chains
    }

    /// Chains whose cache is running, sorted.
    pub fn started(&self) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = self
            .caches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        chains.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        chains
    }
}
