// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Built-in chain presets with public RPC endpoints.

use alloy_chains::NamedChain;
use url::Url;

use super::ChainConfig;

fn endpoints(urls: &[&str]) -> Vec<Url> {
    urls.iter().filter_map(|url| Url::parse(url).ok()).collect()
}

/// Ethereum mainnet (`"mainnet"`).
pub fn ethereum() -> ChainConfig {
    ChainConfig::evm(
        NamedChain::Mainnet,
        endpoints(&["https://eth.llamarpc.com", "https://cloudflare-eth.com"]),
    )
    .with_name("Ethereum Mainnet")
    .with_numeric_id(NamedChain::Mainnet as u64)
}

/// OP mainnet (`"optimism"`).
pub fn optimism() -> ChainConfig {
    ChainConfig::evm(
        NamedChain::Optimism,
        endpoints(&["https://mainnet.optimism.io"]),
    )
    .with_name("OP Mainnet")
    .with_numeric_id(NamedChain::Optimism as u64)
}

/// Polygon PoS (`"polygon"`).
pub fn polygon() -> ChainConfig {
    ChainConfig::evm(
        NamedChain::Polygon,
        endpoints(&["https://polygon.drpc.org", "https://1rpc.io/matic"]),
    )
    .with_name("Polygon")
    .with_numeric_id(NamedChain::Polygon as u64)
}

/// Ethereum Sepolia testnet (`"sepolia"`).
pub fn sepolia() -> ChainConfig {
    ChainConfig::evm(
        NamedChain::Sepolia,
        endpoints(&["https://rpc.sepolia.org", "https://1rpc.io/sepolia"]),
    )
    .with_name("Ethereum Sepolia Testnet")
    .with_numeric_id(NamedChain::Sepolia as u64)
    .testnet()
}

/// StarkNet mainnet (`"starknet"`).
pub fn starknet() -> ChainConfig {
    ChainConfig::starknet(
        "starknet",
        endpoints(&[
            "https://starknet-mainnet.public.blastapi.io",
            "https://rpc.starknet.lava.build",
            "https://free-rpc.nethermind.io/mainnet-juno",
        ]),
    )
    .with_name("Starknet Mainnet")
}

/// Every built-in preset.
pub fn presets() -> Vec<ChainConfig> {
    vec![ethereum(), optimism(), polygon(), sepolia(), starknet()]
}
