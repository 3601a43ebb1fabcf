// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for rate limiting
//!
//! These tests use proptest to validate invariants about per-chain rate limit
//! configuration and the per-endpoint limiter across a wide range of inputs.

use chaincache::config::chains;
use chaincache::transport::RateLimiter;
use chaincache::{ChainCacheConfigBuilder, ChainId};
use proptest::prelude::*;
use std::time::Duration;

// Helper to pick one of the preset chain ids
fn arb_chain() -> impl Strategy<Value = ChainId> {
    prop_oneof![
        Just(ChainId::new("mainnet")),
        Just(ChainId::new("optimism")),
        Just(ChainId::new("polygon")),
        Just(ChainId::new("sepolia")),
        Just(ChainId::new("starknet")),
    ]
}

// Helper to generate arbitrary Duration for rate limiting (0-5000ms)
fn arb_duration() -> impl Strategy<Value = Duration> {
    (0u64..=5000).prop_map(Duration::from_millis)
}

fn arb_endpoint() -> impl Strategy<Value = String> {
    "[a-z]{1,12}".prop_map(|host| format!("https://{host}.example/rpc"))
}

proptest! {
    /// Property: Chain-specific rate limit should always override global rate limit
    #[test]
    fn prop_chain_override_always_wins(
        global in arb_duration(),
        override_limit in arb_duration(),
        chain in arb_chain(),
    ) {
        let config = ChainCacheConfigBuilder::with_defaults()
            .rate_limit(global)
            .chain_rate_limit(chain.clone(), override_limit)
            .build();

        prop_assert_eq!(
            config.get_rate_limit(&chain),
            override_limit,
            "Chain-specific limit must override global limit"
        );
    }

    /// Property: If no chain-specific override, global limit should apply
    #[test]
    fn prop_global_applies_without_override(global in arb_duration(), chain in arb_chain()) {
        let config = ChainCacheConfigBuilder::with_defaults()
            .rate_limit(global)
            .build();

        prop_assert_eq!(config.get_rate_limit(&chain), global);
    }

    /// Property: Multiple chain overrides should be independent
    #[test]
    fn prop_multiple_overrides_independent(
        chain1 in arb_chain(),
        chain2 in arb_chain(),
        limit1 in arb_duration(),
        limit2 in arb_duration(),
    ) {
        prop_assume!(chain1 != chain2);

        let config = ChainCacheConfigBuilder::with_defaults()
            .chain_rate_limit(chain1.clone(), limit1)
            .chain_rate_limit(chain2.clone(), limit2)
            .build();

        prop_assert_eq!(config.get_rate_limit(&chain1), limit1);
        prop_assert_eq!(config.get_rate_limit(&chain2), limit2);
    }

    /// Property: Presets survive adding overrides
    #[test]
    fn prop_with_defaults_preserves_presets(chain in arb_chain(), limit in arb_duration()) {
        let config = ChainCacheConfigBuilder::with_defaults()
            .chain_rate_limit(chain, limit)
            .build();

        for preset in chains::presets() {
            prop_assert!(config.chain(&preset.id).is_some(), "preset {} missing", preset.id);
        }
    }

    /// Property: A fresh endpoint is always immediately takeable, and a
    /// second take is refused for any non-zero limit
    #[test]
    fn prop_new_endpoint_takeable_once(limit_ms in 1u64..=60_000, endpoint in arb_endpoint()) {
        let limiter = RateLimiter::new(Duration::from_millis(limit_ms));
        prop_assert!(limiter.take(&endpoint));
        prop_assert!(!limiter.take(&endpoint));
    }

    /// Property: Endpoints are limited independently
    #[test]
    fn prop_endpoints_independent(a in arb_endpoint(), b in arb_endpoint()) {
        prop_assume!(a != b);
        let limiter = RateLimiter::new(Duration::from_secs(60));
        prop_assert!(limiter.take(&a));
        prop_assert!(limiter.take(&b));
        prop_assert!(!limiter.take(&a));
    }

    /// Property: A zero limit never refuses
    #[test]
    fn prop_zero_limit_always_passes(endpoint in arb_endpoint(), takes in 1usize..20) {
        let limiter = RateLimiter::new(Duration::ZERO);
        for _ in 0..takes {
            prop_assert!(limiter.take(&endpoint));
        }
    }
}
