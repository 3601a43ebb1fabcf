// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Configuration for chaincache operations
//!
//! This module provides the configuration that controls polling cadence,
//! per-endpoint rate limiting, retry policy, multicall batching, and the
//! table of chains the registry can serve.
//!
//! # Example: Using defaults
//!
//! ```rust
//! use chaincache::ChainCacheConfig;
//!
//! // 1 s polling, 1 s per-endpoint rate limit, built-in chain presets
//! let config = ChainCacheConfig::default();
//! assert!(config.chain(&"mainnet".into()).is_some());
//! ```
//!
//! # Example: Custom configuration
//!
//! ```rust
//! use chaincache::{ChainCacheConfigBuilder, ChainConfig};
//! use std::time::Duration;
//! use url::Url;
//!
//! let local = ChainConfig::evm("anvil", vec![Url::parse("http://127.0.0.1:8545").unwrap()]);
//! let config = ChainCacheConfigBuilder::new()
//!     .loop_delay(Duration::from_millis(250))
//!     .chain(local)
//!     .chain_rate_limit("anvil", Duration::ZERO)
//!     .build();
//!
//! assert_eq!(config.get_rate_limit(&"anvil".into()), Duration::ZERO);
//! ```

use std::collections::HashMap;
use std::time::Duration;

use url::Url;

use crate::network::{ChainId, MulticallContract, NetworkFamily};

pub mod chains;
pub mod constants;

use constants::{
    DEFAULT_LOOP_DELAY, DEFAULT_RATE_LIMIT, DEFAULT_RETRYABLE_CODES, DEFAULT_RETRY_INTERVAL,
};

/// Configuration for chaincache operations
///
/// Use [`ChainCacheConfigBuilder`] for a fluent API to construct instances.
#[derive(Debug, Clone)]
pub struct ChainCacheConfig {
    /// Interval between polling ticks
    /// Default: 1 second
    pub loop_delay: Duration,

    /// Minimum interval between two batches sent to the same endpoint.
    /// Batches inside the interval are dropped, not delayed.
    /// Default: 1 second
    pub rate_limit: Duration,

    /// When set, every requested key is rescheduled at request time plus this
    /// duration, so a batch lost mid-flight is re-fetched once it elapses.
    /// Default: None
    pub request_timeout: Option<Duration>,

    /// Re-fetch interval after a retryable RPC error
    /// Default: 1 second
    pub retry_interval: Duration,

    /// JSON-RPC error codes considered transient
    pub retryable_codes: Vec<i64>,

    /// Whether call-type queries are folded into one aggregate call
    /// Default: true
    pub multicall: bool,

    /// Chains the registry can serve, by id
    pub chains: HashMap<ChainId, ChainConfig>,
}

/// Static description of a chain
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Registry id
    pub id: ChainId,

    /// Display name
    pub name: String,

    /// Numeric chain id, when the network has one
    pub numeric_id: Option<u64>,

    /// Wire and call conventions
    pub family: NetworkFamily,

    /// RPC endpoints, tried in order with rotation on failure
    pub endpoints: Vec<Url>,

    /// Aggregator used for call batching; `None` disables multicall here
    pub multicall: Option<MulticallContract>,

    /// Whether this is a test network
    pub testnet: bool,

    /// Override the global rate limit for this chain
    pub rate_limit: Option<Duration>,

    /// Override the global loop delay for this chain
    pub loop_delay: Option<Duration>,
}

impl ChainConfig {
    /// Creates an EVM chain with the default Multicall3 aggregator.
    pub fn evm(id: impl Into<ChainId>, endpoints: Vec<Url>) -> Self {
        Self::with_family(id.into(), NetworkFamily::Evm, endpoints)
    }

    /// Creates a StarkNet chain with the default composable multicall.
    pub fn starknet(id: impl Into<ChainId>, endpoints: Vec<Url>) -> Self {
        Self::with_family(id.into(), NetworkFamily::StarkNet, endpoints)
    }

    fn with_family(id: ChainId, family: NetworkFamily, endpoints: Vec<Url>) -> Self {
        Self {
            name: id.to_string(),
            id,
            numeric_id: None,
            family,
            endpoints,
            multicall: Some(family.default_multicall()),
            testnet: false,
            rate_limit: None,
            loop_delay: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the numeric chain id.
    #[must_use]
    pub fn with_numeric_id(mut self, numeric_id: u64) -> Self {
        self.numeric_id = Some(numeric_id);
        self
    }

    /// Replaces the aggregator contract, or disables batching with `None`.
    #[must_use]
    pub fn with_multicall(mut self, multicall: Option<MulticallContract>) -> Self {
        self.multicall = multicall;
        self
    }

    /// Marks the chain as a test network.
    #[must_use]
    pub fn testnet(mut self) -> Self {
        self.testnet = true;
        self
    }
}

impl Default for ChainCacheConfig {
    fn default() -> Self {
        Self::with_common_defaults()
    }
}

impl ChainCacheConfig {
    /// Create config with default timings and the built-in chain presets
    /// (see [`chains::presets`]).
    pub fn with_common_defaults() -> Self {
        let mut config = Self::minimal();
        for chain in chains::presets() {
            config.set_chain(chain);
        }
        config
    }

    /// Create config with default timings and no chains.
    pub fn minimal() -> Self {
        Self {
            loop_delay: DEFAULT_LOOP_DELAY,
            rate_limit: DEFAULT_RATE_LIMIT,
            request_timeout: None,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            retryable_codes: DEFAULT_RETRYABLE_CODES.to_vec(),
            multicall: true,
            chains: HashMap::new(),
        }
    }

    /// Look up a chain by id.
    pub fn chain(&self, chain: &ChainId) -> Option<&ChainConfig> {
        self.chains.get(chain)
    }

    /// Get effective loop delay for a specific chain
    ///
    /// Returns the chain-specific override if set, otherwise the global default.
    pub fn get_loop_delay(&self, chain: &ChainId) -> Duration {
        self.chains
            .get(chain)
            .and_then(|c| c.loop_delay)
            .unwrap_or(self.loop_delay)
    }

    /// Get effective per-endpoint rate limit for a specific chain
    ///
    /// Returns the chain-specific override if set, otherwise the global default.
    pub fn get_rate_limit(&self, chain: &ChainId) -> Duration {
        self.chains
            .get(chain)
            .and_then(|c| c.rate_limit)
            .unwrap_or(self.rate_limit)
    }

    /// Add or replace a chain.
    pub fn set_chain(&mut self, chain: ChainConfig) {
        self.chains.insert(chain.id.clone(), chain);
    }
}

/// Builder for [`ChainCacheConfig`]
///
/// # Example
///
/// ```rust
/// use chaincache::ChainCacheConfigBuilder;
/// use std::time::Duration;
///
/// let config = ChainCacheConfigBuilder::with_defaults()
///     .rate_limit(Duration::from_millis(500))
///     .chain_rate_limit("polygon", Duration::from_millis(2000))
///     .build();
/// ```
pub struct ChainCacheConfigBuilder {
    config: ChainCacheConfig,
}

impl Default for ChainCacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainCacheConfigBuilder {
    /// Create a new builder with default timings and no chains
    pub fn new() -> Self {
        Self {
            config: ChainCacheConfig::minimal(),
        }
    }

    /// Start with default timings and the built-in chain presets
    pub fn with_defaults() -> Self {
        Self {
            config: ChainCacheConfig::with_common_defaults(),
        }
    }

    /// Set the interval between polling ticks
    pub fn loop_delay(mut self, delay: Duration) -> Self {
        self.config.loop_delay = delay;
        self
    }

    /// Set the global per-endpoint rate limit
    pub fn rate_limit(mut self, limit: Duration) -> Self {
        self.config.rate_limit = limit;
        self
    }

    /// Reschedule requested keys at request time plus `timeout`
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Set the re-fetch interval after a retryable RPC error
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.retry_interval = interval;
        self
    }

    /// Replace the set of retryable JSON-RPC error codes
    pub fn retryable_codes(mut self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.config.retryable_codes = codes.into_iter().collect();
        self
    }

    /// Enable or disable multicall folding globally
    pub fn multicall(mut self, enabled: bool) -> Self {
        self.config.multicall = enabled;
        self
    }

    /// Add or replace a chain
    pub fn chain(mut self, chain: ChainConfig) -> Self {
        self.config.set_chain(chain);
        self
    }

    /// Convenience: set the rate limit for a configured chain
    ///
    /// Has no effect if the chain has not been added.
    pub fn chain_rate_limit(mut self, chain: impl Into<ChainId>, limit: Duration) -> Self {
        if let Some(c) = self.config.chains.get_mut(&chain.into()) {
            c.rate_limit = Some(limit);
        }
        self
    }

    /// Convenience: set the loop delay for a configured chain
    ///
    /// Has no effect if the chain has not been added.
    pub fn chain_loop_delay(mut self, chain: impl Into<ChainId>, delay: Duration) -> Self {
        if let Some(c) = self.config.chains.get_mut(&chain.into()) {
            c.loop_delay = Some(delay);
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> ChainCacheConfig {
        self.config
    }
}
