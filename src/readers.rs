// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Typed reads on top of the cache.
//!
//! Each reader subscribes its query through a [`LocalSubscriber`] and
//! returns a derived [`Cell`] holding the decoded value. A reading is `None`
//! while the entry is pending, `Some(Ok(_))` once decoded, and
//! `Some(Err(_))` for a JSON-RPC error or a payload of the wrong shape.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use alloy_primitives::address;
//! use chaincache::{readers, ChainCacheConfig, ChainRegistry, LocalSubscriber};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(ChainRegistry::new(ChainCacheConfig::default()));
//! let local = LocalSubscriber::new(registry);
//! let holder = address!("d8da6bf26964af9d7eed9e03e53415d37aa96045");
//!
//! let balance = readers::native_balance(&local, &"mainnet".into(), holder)?;
//! let mut updates = balance.subscribe();
//! updates.changed().await?;
//! println!("{:?}", balance.get());
//! # Ok(())
//! # }
//! ```

use alloy_primitives::{hex, Address, TxHash, U256, U64};
use alloy_rpc_types::{Transaction, TransactionReceipt, TransactionRequest};
use alloy_sol_types::{sol, SolCall};
use serde::de::DeserializeOwned;
use serde_json::Value;
use starknet_types_core::felt::Felt;

use crate::cache::CellOptions;
use crate::config::constants::PENDING_LOOKUP_RETRY;
use crate::errors::{ReadError, RegistryError};
use crate::local::LocalSubscriber;
use crate::network::ChainId;
use crate::query::{stark, RawQuery};
use crate::reactive::Cell;

sol! {
    function balanceOf(address account) external view returns (uint256);
}

/// A decoded value as seen by observers; `None` while pending.
pub type Reading<T> = Option<Result<T, ReadError>>;

fn read<T, F>(
    local: &LocalSubscriber,
    chain: &ChainId,
    query: RawQuery,
    options: Option<CellOptions>,
    decode: F,
) -> Result<Cell<Reading<T>>, RegistryError>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&Value) -> Result<T, ReadError> + Send + 'static,
{
    let cell = match options {
        Some(options) => local.query_with(chain, query, options)?,
        None => local.query(chain, query)?,
    };
    Ok(cell.map(move |value| {
        value.map(|result| match result {
            Ok(value) => decode(value),
            Err(failure) => Err(ReadError::Rpc(failure.clone())),
        })
    }))
}

fn json<T: DeserializeOwned>(what: &'static str) -> impl Fn(&Value) -> Result<T, ReadError> {
    move |value| serde_json::from_value(value.clone()).map_err(|e| ReadError::decode(what, e))
}

/// Native balance of `owner` at the latest block.
pub fn native_balance(
    local: &LocalSubscriber,
    chain: &ChainId,
    owner: Address,
) -> Result<Cell<Reading<U256>>, RegistryError> {
    read(local, chain, RawQuery::balance(owner), None, json("balance"))
}

/// ERC-20 `balanceOf(holder)` on `token`.
pub fn erc20_balance(
    local: &LocalSubscriber,
    chain: &ChainId,
    token: Address,
    holder: Address,
) -> Result<Cell<Reading<U256>>, RegistryError> {
    let query = RawQuery::sol_call(token, &balanceOfCall { account: holder });
    read(local, chain, query, None, |value| {
        let text = value
            .as_str()
            .ok_or_else(|| ReadError::decode("balanceOf", "expected hex string"))?;
        let bytes = hex::decode(text).map_err(|e| ReadError::decode("balanceOf", e))?;
        balanceOfCall::abi_decode_returns(&bytes).map_err(|e| ReadError::decode("balanceOf", e))
    })
}

/// Gas estimate for `tx`.
pub fn estimate_gas(
    local: &LocalSubscriber,
    chain: &ChainId,
    tx: TransactionRequest,
) -> Result<Cell<Reading<U256>>, RegistryError> {
    read(local, chain, RawQuery::estimate_gas(tx), None, json("gas estimate"))
}

/// Current block number.
pub fn block_number(local: &LocalSubscriber, chain: &ChainId) -> Result<Cell<Reading<u64>>, RegistryError> {
    read(local, chain, RawQuery::block_number(), None, |value| {
        json::<U64>("block number")(value).map(|n| n.to::<u64>())
    })
}

/// Receipt of `hash`. Polled every few seconds while the node has none, so
/// the reading stays pending until the transaction is mined.
pub fn transaction_receipt(
    local: &LocalSubscriber,
    chain: &ChainId,
    hash: TxHash,
) -> Result<Cell<Reading<TransactionReceipt>>, RegistryError> {
    let options = CellOptions::default().retry(PENDING_LOOKUP_RETRY);
    read(
        local,
        chain,
        RawQuery::transaction_receipt(hash),
        Some(options),
        json("transaction receipt"),
    )
}

/// Transaction `hash`, pending until the node knows it.
pub fn transaction_by_hash(
    local: &LocalSubscriber,
    chain: &ChainId,
    hash: TxHash,
) -> Result<Cell<Reading<Transaction>>, RegistryError> {
    let options = CellOptions::default().retry(PENDING_LOOKUP_RETRY);
    read(
        local,
        chain,
        RawQuery::transaction_by_hash(hash),
        Some(options),
        json("transaction"),
    )
}

/// Cairo ERC-20 `balanceOf(holder)` on a StarkNet `token`, returned as a
/// `(low, high)` u256 pair.
pub fn stark_erc20_balance(
    local: &LocalSubscriber,
    chain: &ChainId,
    token: Felt,
    holder: Felt,
) -> Result<Cell<Reading<U256>>, RegistryError> {
    let query = RawQuery::stark_call(token, "balanceOf", vec![holder]);
    read(local, chain, query, None, |value| {
        let felts = stark::parse_felts(value)?;
        match felts.as_slice() {
            [low, high] => Ok(felt_to_u256(low) | (felt_to_u256(high) << 128usize)),
            other => Err(ReadError::decode(
                "balanceOf",
                format!("expected 2 felts, got {}", other.len()),
            )),
        }
    })
}

fn felt_to_u256(felt: &Felt) -> U256 {
    U256::from_be_bytes(felt.to_bytes_be())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainCacheConfigBuilder, ChainConfig};
    use crate::registry::ChainRegistry;
    use crate::testing::{evm_chain, ScriptedTransport};
    use alloy_primitives::{address, b256};
    use alloy_sol_types::SolValue;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;

    const HOLDER: Address = address!("d8da6bf26964af9d7eed9e03e53415d37aa96045");
    const TOKEN: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

    fn local(transport: Arc<ScriptedTransport>) -> LocalSubscriber {
        let stark = ChainConfig::starknet("stark", vec![Url::parse("http://s").unwrap()]);
        let config = ChainCacheConfigBuilder::new()
            .chain(evm_chain(&["a"]))
            .chain(stark)
            .build();
        LocalSubscriber::new(Arc::new(ChainRegistry::with_transport(config, transport)))
    }

    async fn settled<T: Clone + Send + Sync + 'static>(cell: &Cell<Reading<T>>) -> Result<T, ReadError> {
        let mut rx = cell.subscribe();
        rx.wait_for(Option::is_some).await.unwrap();
        cell.get().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_balance_decodes_quantity() {
        let local = local(ScriptedTransport::constant(json!("0x64")));
        let balance = native_balance(&local, &"test".into(), HOLDER).unwrap();
        assert_eq!(balance.get(), None);
        assert_eq!(settled(&balance).await, Ok(U256::from(100)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_erc20_balance_decodes_abi_word() {
        let word = hex::encode_prefixed(U256::from(5_000_000u64).abi_encode());
        let local = local(ScriptedTransport::constant(json!(word)));
        let balance = erc20_balance(&local, &"test".into(), TOKEN, HOLDER).unwrap();
        assert_eq!(settled(&balance).await, Ok(U256::from(5_000_000u64)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_number_and_rpc_error() {
        let local = local(ScriptedTransport::new(|request| match request["method"].as_str() {
            Some("eth_blockNumber") => json!({ "result": "0x10" }),
            _ => json!({ "error": { "code": 3, "message": "execution reverted" } }),
        }));
        let chain = ChainId::new("test");
        let block = block_number(&local, &chain).unwrap();
        let gas = estimate_gas(&local, &chain, TransactionRequest::default()).unwrap();

        assert_eq!(settled(&block).await, Ok(16));
        match settled(&gas).await {
            Err(ReadError::Rpc(failure)) => assert_eq!(failure.code, 3),
            other => panic!("unexpected reading {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_receipt_stays_pending_until_mined() {
        let local = local(ScriptedTransport::constant(Value::Null));
        let hash = b256!("0000000000000000000000000000000000000000000000000000000000000001");
        let receipt = transaction_receipt(&local, &"test".into(), hash).unwrap();

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert!(receipt.get().is_none());
        // Polled on the retry interval, not every tick.
        let dispatched = local.registry().counter(&"test".into()).unwrap();
        assert!((2..=4).contains(&dispatched), "dispatched {dispatched}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stark_balance_joins_u256_halves() {
        let local = local(ScriptedTransport::constant(json!(["0x5", "0x1"])));
        let balance = stark_erc20_balance(&local, &"stark".into(), Felt::from(7u64), Felt::from(9u64)).unwrap();
        let expected = U256::from(5) + (U256::from(1) << 128usize);
        assert_eq!(settled(&balance).await, Ok(expected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_shape_is_a_decode_error() {
        let local = local(ScriptedTransport::constant(json!(["0x5"])));
        let balance = stark_erc20_balance(&local, &"stark".into(), Felt::from(7u64), Felt::from(9u64)).unwrap();
        assert!(matches!(settled(&balance).await, Err(ReadError::Decode { .. })));
    }
}
