// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the chain cache polling loop
//!
//! All tests run on paused Tokio time with the default one second loop, so
//! ticks land on whole seconds after the cache starts. Assertions about
//! what a tick did are made half a second later.

mod helpers;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{address, Address, Bytes};
use chaincache::{readers, CellOptions, ChainId, ChainRegistry, LocalSubscriber, RawQuery};
use helpers::{test_config, unthrottled_config, MockTransport};
use serde_json::json;

const HOLDER: Address = address!("d8da6bf26964af9d7eed9e03e53415d37aa96045");
const TOKEN: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

fn chain() -> ChainId {
    ChainId::new("test")
}

fn registry(config: chaincache::ChainCacheConfig, transport: &Arc<MockTransport>) -> ChainRegistry {
    ChainRegistry::with_transport(config, transport.clone())
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_pending_resolved_reused() {
    let transport = MockTransport::new().into_arc();
    let registry = registry(test_config(&["a"]), &transport);

    let mut first = registry
        .cell(&chain(), RawQuery::balance(HOLDER), CellOptions::default())
        .unwrap();
    assert!(first.is_pending());
    assert_eq!(first.resolved().await.unwrap(), Ok(json!("0x64")));
    assert_eq!(registry.counter(&chain()).unwrap(), 1);

    let mut second = registry
        .cell(&chain(), RawQuery::balance(HOLDER), CellOptions::default())
        .unwrap();
    assert!(!second.is_pending());
    assert_eq!(second.resolved().await.unwrap(), Ok(json!("0x64")));

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(registry.counter(&chain()).unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_idle_ticks_send_nothing() {
    let transport = MockTransport::new().into_arc();
    let registry = registry(unthrottled_config(&["a"]), &transport);
    let local = LocalSubscriber::new(Arc::new(registry));

    let mut cell = local.query(&chain(), RawQuery::block_number()).unwrap();
    cell.resolved().await.unwrap();
    let before = transport.batches().len();

    // Subscribed, but with no validity the value never goes stale.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.batches().len(), before);
    assert_eq!(cell.get(), Some(Ok(json!("0x10"))));
}

#[tokio::test(start_paused = true)]
async fn test_balance_at_different_blocks_is_fetched_once() {
    let transport = MockTransport::new().into_arc();
    let registry = registry(test_config(&["a"]), &transport);

    let mut latest = registry
        .cell(&chain(), RawQuery::balance(HOLDER), CellOptions::default())
        .unwrap();
    let mut pinned = registry
        .cell(
            &chain(),
            RawQuery::balance_at(HOLDER, BlockNumberOrTag::Number(19_000_000)),
            CellOptions::default(),
        )
        .unwrap();
    assert_eq!(latest.key(), pinned.key());

    latest.resolved().await.unwrap();
    pinned.resolved().await.unwrap();
    let batches = transport.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].requests.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_calls_in_one_tick_share_one_multicall() {
    let transport = MockTransport::new().into_arc();
    let registry = registry(test_config(&["a"]), &transport);

    let mut a = registry
        .cell(&chain(), RawQuery::call(TOKEN, Bytes::from_static(&[0xaa])), CellOptions::default())
        .unwrap();
    let mut b = registry
        .cell(&chain(), RawQuery::call(TOKEN, Bytes::from_static(&[0xbb])), CellOptions::default())
        .unwrap();

    let a = a.resolved().await.unwrap().unwrap();
    let b = b.resolved().await.unwrap().unwrap();
    assert_ne!(a, b);
    assert_eq!(registry.counter(&chain()).unwrap(), 1);

    let batches = transport.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].methods(), vec!["eth_call"]);
}

#[tokio::test(start_paused = true)]
async fn test_retryable_error_is_refetched_until_it_clears() {
    let failing = Arc::new(AtomicBool::new(true));
    let flag = failing.clone();
    let transport = MockTransport::new()
        .with_responder(move |_| {
            if flag.load(Ordering::SeqCst) {
                json!({ "error": { "code": -32005, "message": "limit exceeded" } })
            } else {
                json!({ "result": "0x2a" })
            }
        })
        .into_arc();
    let registry = registry(test_config(&["a"]), &transport);

    let mut cell = registry
        .cell(&chain(), RawQuery::block_number(), CellOptions::default())
        .unwrap();
    let first = cell.resolved().await.unwrap();
    assert!(matches!(first, Err(failure) if failure.code == -32005));
    assert!(cell.is_pending(), "retryable errors are not stored");

    // Check between ticks, which land on whole seconds.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let mut last = registry.counter(&chain()).unwrap();
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let now = registry.counter(&chain()).unwrap();
        assert!(now > last, "counter should grow while erroring");
        last = now;
    }

    failing.store(false, Ordering::SeqCst);
    cell.changed().await.unwrap();
    assert_eq!(cell.get(), Some(Ok(json!("0x2a"))));
    let settled = registry.counter(&chain()).unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(registry.counter(&chain()).unwrap(), settled);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_error_is_stored() {
    let transport = MockTransport::new()
        .with_responder(|_| json!({ "error": { "code": 3, "message": "execution reverted" } }))
        .into_arc();
    let registry = registry(test_config(&["a"]), &transport);

    let mut cell = registry
        .cell(&chain(), RawQuery::call(TOKEN, Bytes::from_static(&[1])), CellOptions::default())
        .unwrap();
    cell.resolved().await.unwrap().unwrap_err();
    assert!(matches!(cell.get(), Some(Err(failure)) if failure.code == 3));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(registry.counter(&chain()).unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_validity_window_is_respected() {
    let transport = MockTransport::new().into_arc();
    let registry = registry(unthrottled_config(&["a"]), &transport);
    let options = CellOptions::default().validity(Duration::from_secs(5));

    let mut cell = registry
        .cell(&chain(), RawQuery::balance(HOLDER), options)
        .unwrap();
    cell.resolved().await.unwrap();
    assert_eq!(transport.batches().len(), 1);

    // Fetched at t=1, so fresh until t=6.
    tokio::time::sleep(Duration::from_millis(4500)).await;
    assert_eq!(transport.batches().len(), 1);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(transport.batches().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unobserved_entries_are_not_refreshed() {
    let transport = MockTransport::new().into_arc();
    let registry = registry(unthrottled_config(&["a"]), &transport);
    let options = CellOptions::default().validity(Duration::from_secs(1));

    let mut cell = registry
        .cell(&chain(), RawQuery::balance(HOLDER), options)
        .unwrap();
    cell.resolved().await.unwrap();
    drop(cell);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.batches().len(), 1);

    // Pinning the key brings refreshes back.
    registry
        .activate(&chain(), RawQuery::balance(HOLDER).key(), true)
        .unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(transport.batches().len() >= 3);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_answers_without_observers() {
    let transport = MockTransport::new().into_arc();
    let registry = registry(unthrottled_config(&["a"]), &transport);

    let mut cell = registry
        .cell(&chain(), RawQuery::balance(HOLDER), CellOptions::default())
        .unwrap();
    cell.resolved().await.unwrap();
    let key = cell.key().clone();
    drop(cell);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(registry.counter(&chain()).unwrap(), 1);

    let next = registry.refresh(&chain(), key, None).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(30), next)
        .await
        .expect("refresh should resolve")
        .unwrap();
    assert_eq!(result, Ok(json!("0x64")));
    assert_eq!(registry.counter(&chain()).unwrap(), 2);

    // A one-off refresh does not keep the key polled.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(registry.counter(&chain()).unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_reader_stops_refreshes() {
    let transport = MockTransport::new().into_arc();
    let registry = Arc::new(registry(unthrottled_config(&["a"]), &transport));
    let local = LocalSubscriber::with_options(
        Arc::clone(&registry),
        CellOptions::default().validity(Duration::from_secs(2)),
    );

    let block = readers::block_number(&local, &chain()).unwrap();
    block.subscribe().wait_for(Option::is_some).await.unwrap();
    assert_eq!(block.get(), Some(Ok(16)));

    // Subscribed and read, so refreshed every validity window.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(transport.batches().len() >= 2);

    drop(block);
    drop(local);
    tokio::time::sleep(Duration::from_secs(1)).await;
    let settled = transport.batches().len();
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(transport.batches().len(), settled);
}

#[tokio::test(start_paused = true)]
async fn test_failed_endpoint_rotates_to_next() {
    let transport = MockTransport::new().with_failing_host("bad").into_arc();
    let registry = registry(test_config(&["bad", "good1", "good2"]), &transport);

    let mut cell = registry
        .cell(&chain(), RawQuery::block_number(), CellOptions::default())
        .unwrap();
    assert_eq!(cell.resolved().await.unwrap(), Ok(json!("0x10")));
    assert_eq!(transport.hosts(), vec!["bad", "good1"]);
    assert_eq!(registry.counter(&chain()).unwrap(), 1);

    // Rotation persists across batches.
    let mut next = registry
        .cell(&chain(), RawQuery::balance(HOLDER), CellOptions::default())
        .unwrap();
    next.resolved().await.unwrap();
    assert_eq!(transport.hosts().last().map(String::as_str), Some("good1"));
}

#[tokio::test(start_paused = true)]
async fn test_all_endpoints_down_keeps_entries_pending() {
    let transport = MockTransport::new()
        .with_failing_host("a")
        .with_failing_host("b")
        .into_arc();
    let registry = registry(unthrottled_config(&["a", "b"]), &transport);

    let cell = registry
        .cell(&chain(), RawQuery::block_number(), CellOptions::default())
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(cell.is_pending());
    assert_eq!(transport.batches().len(), 4);

    transport.heal_host("a");
    transport.heal_host("b");
    let mut cell = cell;
    cell.resolved().await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_with_replacement_query() {
    let transport = MockTransport::new()
        .with_responder(|request| json!({ "result": request["method"] }))
        .into_arc();
    let registry = registry(test_config(&["a"]), &transport);

    let mut cell = registry
        .cell(&chain(), RawQuery::block_number(), CellOptions::default())
        .unwrap();
    assert_eq!(cell.resolved().await.unwrap(), Ok(json!("eth_blockNumber")));

    let next = registry
        .refresh(&chain(), cell.key().clone(), Some(RawQuery::balance(HOLDER)))
        .unwrap();
    assert_eq!(next.await.unwrap(), Ok(json!("eth_getBalance")));
    assert_eq!(cell.get(), Some(Ok(json!("eth_getBalance"))));
}

#[tokio::test(start_paused = true)]
async fn test_paused_chain_resumes_without_replaying_ticks() {
    let transport = MockTransport::new().into_arc();
    let registry = registry(unthrottled_config(&["a"]), &transport);
    registry.run(&chain(), false).unwrap();

    let options = CellOptions::default().validity(Duration::from_secs(1));
    let mut cell = registry
        .cell(&chain(), RawQuery::block_number(), options)
        .unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.batches().len(), 0);

    registry.run(&chain(), true).unwrap();
    cell.resolved().await.unwrap();
    assert_eq!(transport.batches().len(), 1);
}
