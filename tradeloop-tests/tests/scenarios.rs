// This file is part of the tradeloop engine.
// Copyright (C) 2026 Tradeloop Contributors
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The six end-to-end scenarios of spec.md §8, run against a real [`TradeService`] and its
//! Background Discovery Scheduler rather than any single crate in isolation.

use std::time::Duration;
use tradeloop_cache::ListFilter;
use tradeloop_common::domain::{InventoryMode, ItemSubmission};
use tradeloop_tests::fixtures::{Harness, collection, item, tenant, wallet};

const CONVERGENCE_TIMEOUT: Duration = Duration::from_secs(2);

/// A tenant whose wallet quota is already exhausted rejects a new wallet's inventory, rather than
/// silently accepting it (spec.md §4.8).
#[tokio::test(flavor = "multi_thread")]
async fn exceeding_the_wallet_quota_is_rejected_with_a_quota_error() {
    use assert_matches::assert_matches;
    use fake::Fake;
    use fake::faker::lorem::en::Word;
    use tradeloop_service::{QuotaError, ServiceError, TenantQuotas};

    let harness = Harness::with_quotas(TenantQuotas { max_wallets: 1, ..TenantQuotas::default() }).await;
    let t1 = tenant("t1");

    harness
        .service
        .submit_inventory(t1.clone(), wallet("alice"), vec![ItemSubmission { id: item("sword"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();

    // A second, distinct wallet trips the quota; the item name itself is irrelevant here, so it
    // is generated rather than hand-picked.
    let extra_item: String = Word().fake();
    let result = harness
        .service
        .submit_inventory(
            t1,
            wallet("bob"),
            vec![ItemSubmission { id: item(&extra_item), collection_id: None }],
            InventoryMode::Merge,
        )
        .await;

    assert_matches!(result, Err(ServiceError::Quota(QuotaError::TooManyWallets)));
}

/// Scenario 1: a direct two-way swap between two wallets is discovered once both sides declare
/// reciprocal wants.
#[tokio::test(flavor = "multi_thread")]
async fn direct_two_way_swap_is_discovered() {
    let harness = Harness::new().await;
    let t1 = tenant("t1");

    harness
        .service
        .submit_inventory(t1.clone(), wallet("alice"), vec![ItemSubmission { id: item("sword"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();
    harness
        .service
        .submit_inventory(t1.clone(), wallet("bob"), vec![ItemSubmission { id: item("shield"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();
    harness.service.submit_wants(t1.clone(), wallet("alice"), vec![item("shield")], vec![]).await.unwrap();
    harness.service.submit_wants(t1.clone(), wallet("bob"), vec![item("sword")], vec![]).await.unwrap();

    let found = harness
        .wait_until(CONVERGENCE_TIMEOUT, || async {
            let page = harness
                .service
                .query_trades(t1.clone(), ListFilter { limit: 10, ..ListFilter::default() })
                .await
                .unwrap();
            page.items.len() == 1
        })
        .await;

    assert!(found, "expected the two-way swap to converge within the timeout");
}

/// Scenario 2: a three-way cycle where one participant's want is satisfied by collection
/// membership rather than a specific item id.
#[tokio::test(flavor = "multi_thread")]
async fn three_way_cycle_with_collection_want_is_discovered() {
    let harness = Harness::new().await;
    let t1 = tenant("t1");

    harness
        .service
        .submit_inventory(t1.clone(), wallet("alice"), vec![ItemSubmission { id: item("punk-1"), collection_id: Some(collection("punks")) }], InventoryMode::Merge)
        .await
        .unwrap();
    harness
        .service
        .submit_inventory(t1.clone(), wallet("bob"), vec![ItemSubmission { id: item("ape-7"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();
    harness
        .service
        .submit_inventory(t1.clone(), wallet("carol"), vec![ItemSubmission { id: item("sword"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();

    // alice wants bob's ape, bob wants carol's sword, carol wants any item in the "punks"
    // collection (satisfied by alice's punk-1).
    harness.service.submit_wants(t1.clone(), wallet("alice"), vec![item("ape-7")], vec![]).await.unwrap();
    harness.service.submit_wants(t1.clone(), wallet("bob"), vec![item("sword")], vec![]).await.unwrap();
    harness.service.submit_wants(t1.clone(), wallet("carol"), vec![], vec![collection("punks")]).await.unwrap();

    let found = harness
        .wait_until(CONVERGENCE_TIMEOUT, || async {
            let page = harness
                .service
                .query_trades(t1.clone(), ListFilter { limit: 10, ..ListFilter::default() })
                .await
                .unwrap();
            page.items.iter().any(|cached| cached.trade_loop.steps.len() == 3)
        })
        .await;

    assert!(found, "expected the three-way cycle to converge within the timeout");
}

/// Scenario 3: transferring an item out of a loop's owning wallet invalidates the cached loop
/// immediately, without waiting for the scheduler's debounce window.
#[tokio::test(flavor = "multi_thread")]
async fn ownership_transfer_invalidates_the_loop() {
    let harness = Harness::new().await;
    let t1 = tenant("t1");

    harness
        .service
        .submit_inventory(t1.clone(), wallet("alice"), vec![ItemSubmission { id: item("sword"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();
    harness
        .service
        .submit_inventory(t1.clone(), wallet("bob"), vec![ItemSubmission { id: item("shield"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();
    harness.service.submit_wants(t1.clone(), wallet("alice"), vec![item("shield")], vec![]).await.unwrap();
    harness.service.submit_wants(t1.clone(), wallet("bob"), vec![item("sword")], vec![]).await.unwrap();

    let discovered = harness
        .wait_until(CONVERGENCE_TIMEOUT, || async {
            let page = harness
                .service
                .query_trades(t1.clone(), ListFilter { limit: 10, ..ListFilter::default() })
                .await
                .unwrap();
            page.items.len() == 1
        })
        .await;
    assert!(discovered, "expected the swap to be discovered before transferring");

    harness.service.transfer(t1.clone(), item("sword"), wallet("alice"), wallet("carol")).await.unwrap();

    let page = harness
        .service
        .query_trades(t1.clone(), ListFilter { limit: 10, ..ListFilter::default() })
        .await
        .unwrap();
    assert!(page.items.is_empty(), "loop referencing the transferred item must be gone immediately");
}

/// Scenario 4: two tenants with mirror-image want-graphs never see each other's loops.
#[tokio::test(flavor = "multi_thread")]
async fn tenants_are_isolated_from_each_others_loops() {
    let harness = Harness::new().await;
    let t1 = tenant("t1");
    let t2 = tenant("t2");

    for t in [&t1, &t2] {
        harness
            .service
            .submit_inventory(t.clone(), wallet("alice"), vec![ItemSubmission { id: item("sword"), collection_id: None }], InventoryMode::Merge)
            .await
            .unwrap();
        harness
            .service
            .submit_inventory(t.clone(), wallet("bob"), vec![ItemSubmission { id: item("shield"), collection_id: None }], InventoryMode::Merge)
            .await
            .unwrap();
        harness.service.submit_wants(t.clone(), wallet("alice"), vec![item("shield")], vec![]).await.unwrap();
        harness.service.submit_wants(t.clone(), wallet("bob"), vec![item("sword")], vec![]).await.unwrap();
    }

    for t in [&t1, &t2] {
        let found = harness
            .wait_until(CONVERGENCE_TIMEOUT, || async {
                let page = harness
                    .service
                    .query_trades(t.clone(), ListFilter { limit: 10, ..ListFilter::default() })
                    .await
                    .unwrap();
                page.items.len() == 1
            })
            .await;
        assert!(found, "expected each tenant to converge independently");
    }

    let t1_page = harness.service.query_trades(t1.clone(), ListFilter { limit: 10, ..ListFilter::default() }).await.unwrap();
    let t2_page = harness.service.query_trades(t2.clone(), ListFilter { limit: 10, ..ListFilter::default() }).await.unwrap();
    assert_eq!(t1_page.items.len(), 1);
    assert_eq!(t2_page.items.len(), 1);
    assert_ne!(
        t1_page.items[0].trade_loop.steps[0].from_wallet_id,
        tradeloop_common::domain::WalletId::try_from("nonexistent").unwrap(),
    );

    // Tearing down one tenant must never affect the other.
    harness.service.transfer(t1.clone(), item("sword"), wallet("alice"), wallet("carol")).await.unwrap();
    let t1_page = harness.service.query_trades(t1, ListFilter { limit: 10, ..ListFilter::default() }).await.unwrap();
    let t2_page = harness.service.query_trades(t2, ListFilter { limit: 10, ..ListFilter::default() }).await.unwrap();
    assert!(t1_page.items.is_empty());
    assert_eq!(t2_page.items.len(), 1);
}

/// Scenario 5: enumeration under a time budget too small to finish a single seed returns a
/// partial outcome with a continuation that, when resumed with a generous budget, finds the
/// same loop a full enumeration would have found directly.
#[tokio::test(flavor = "multi_thread")]
async fn budget_bounded_enumeration_resumes_to_the_same_result_a_full_pass_finds() {
    use tradeloop_common::domain::{GraphDelta, TenantId, WalletId};
    use tradeloop_discovery::enumerator::{EnumerationLimits, EnumerationOutcome, enumerate, resume};
    use tradeloop_graph::GraphStore;

    const RING_SIZE: usize = 12;

    async fn build_ring(store: &GraphStore, tenant_id: &TenantId) {
        for i in 0..RING_SIZE {
            store
                .apply_delta(GraphDelta::InventorySubmission {
                    tenant_id: tenant_id.clone(),
                    wallet_id: WalletId::try_from(format!("w{i}").as_str()).unwrap(),
                    items: vec![ItemSubmission { id: item(&format!("item{i}")), collection_id: None }],
                    mode: InventoryMode::Merge,
                })
                .await
                .unwrap();
        }
        for i in 0..RING_SIZE {
            let next = (i + 1) % RING_SIZE;
            store
                .apply_delta(GraphDelta::WantsSubmission {
                    tenant_id: tenant_id.clone(),
                    wallet_id: WalletId::try_from(format!("w{i}").as_str()).unwrap(),
                    specific_item_ids: vec![item(&format!("item{next}"))],
                    collection_ids: vec![],
                })
                .await
                .unwrap();
        }
    }

    let store = GraphStore::new();
    let t1 = tenant("t1");
    build_ring(&store, &t1).await;

    let snapshot = store.snapshot(&t1);
    let seeds = snapshot.all_wallets();

    let tight_limits = EnumerationLimits { max_time_budget: Duration::from_nanos(1), ..EnumerationLimits::default() };
    let EnumerationOutcome::Partial { candidates: partial_candidates, continuation } = enumerate(&snapshot, &seeds, &tight_limits) else {
        panic!("a one-nanosecond budget over a twelve-wallet ring must not complete in one pass");
    };

    let generous_limits = EnumerationLimits::default();
    let EnumerationOutcome::Complete(resumed_candidates) =
        resume(&snapshot, &seeds, &generous_limits, continuation)
    else {
        panic!("resuming with a generous budget must complete");
    };

    let EnumerationOutcome::Complete(full_pass_candidates) = enumerate(&snapshot, &seeds, &generous_limits) else {
        panic!("a full pass over a twelve-wallet ring with the default budget must complete");
    };

    let mut all_from_resumption: Vec<_> = partial_candidates.into_iter().chain(resumed_candidates).map(|c| c.fingerprint).collect();
    let mut all_from_one_pass: Vec<_> = full_pass_candidates.into_iter().map(|c| c.fingerprint).collect();
    all_from_resumption.sort_by_key(|fp| fp.0);
    all_from_one_pass.sort_by_key(|fp| fp.0);

    assert_eq!(all_from_resumption, all_from_one_pass);
    assert_eq!(all_from_one_pass.len(), 1, "a single ring contains exactly one elementary cycle");
}

/// Scenario 6: many concurrent queries against a tenant mid-convergence never observe a
/// torn/partial state — each either sees the pre-discovery empty page or the fully-formed loop,
/// never something in between, matching the Graph Store's copy-on-write publish semantics.
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_queries_never_observe_a_torn_state() {
    let harness = Harness::new().await;
    let t1 = tenant("t1");

    harness
        .service
        .submit_inventory(t1.clone(), wallet("alice"), vec![ItemSubmission { id: item("sword"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();
    harness
        .service
        .submit_inventory(t1.clone(), wallet("bob"), vec![ItemSubmission { id: item("shield"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();
    harness.service.submit_wants(t1.clone(), wallet("alice"), vec![item("shield")], vec![]).await.unwrap();
    harness.service.submit_wants(t1.clone(), wallet("bob"), vec![item("sword")], vec![]).await.unwrap();

    let queriers = (0..50).map(|_| {
        let service = harness.service.clone();
        let t1 = t1.clone();
        tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + CONVERGENCE_TIMEOUT;
            loop {
                let page = service.query_trades(t1.clone(), ListFilter { limit: 10, ..ListFilter::default() }).await.unwrap();
                // Either nothing yet, or exactly the one swap loop: never a duplicate and never a
                // half-built entry with mismatched step counts.
                assert!(page.items.len() <= 1);
                if let Some(cached) = page.items.first() {
                    assert_eq!(cached.trade_loop.steps.len(), 2);
                    return true;
                }
                if tokio::time::Instant::now() >= deadline {
                    return false;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
    });

    let results = futures::future::join_all(queriers).await;
    let converged = results.into_iter().filter_map(Result::ok).filter(|found| *found).count();
    assert_eq!(converged, 50, "every concurrent querier must eventually observe the converged loop");
}

/// Scenario 6b: a recompute that discovers two independent loops for the same tenant at once
/// never lets a concurrent querier observe just one of them — the Loop Cache applies a
/// recompute's discoveries as a single batch (spec.md §4.6), so a query mid-recompute sees either
/// zero loops or both, never exactly one.
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_queries_never_observe_half_of_a_multi_loop_batch() {
    let harness = Harness::new().await;
    let t1 = tenant("t1");

    harness
        .service
        .submit_inventory(t1.clone(), wallet("alice"), vec![ItemSubmission { id: item("sword"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();
    harness
        .service
        .submit_inventory(t1.clone(), wallet("bob"), vec![ItemSubmission { id: item("shield"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();
    harness
        .service
        .submit_inventory(t1.clone(), wallet("carol"), vec![ItemSubmission { id: item("bow"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();
    harness
        .service
        .submit_inventory(t1.clone(), wallet("dave"), vec![ItemSubmission { id: item("axe"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();

    harness.service.submit_wants(t1.clone(), wallet("alice"), vec![item("shield")], vec![]).await.unwrap();
    harness.service.submit_wants(t1.clone(), wallet("bob"), vec![item("sword")], vec![]).await.unwrap();
    harness.service.submit_wants(t1.clone(), wallet("carol"), vec![item("axe")], vec![]).await.unwrap();
    harness.service.submit_wants(t1.clone(), wallet("dave"), vec![item("bow")], vec![]).await.unwrap();

    let queriers = (0..50).map(|_| {
        let service = harness.service.clone();
        let t1 = t1.clone();
        tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + CONVERGENCE_TIMEOUT;
            loop {
                let page = service.query_trades(t1.clone(), ListFilter { limit: 10, ..ListFilter::default() }).await.unwrap();
                // Both disjoint swap loops are discovered by the same recompute, so a torn batch
                // would show up as exactly one of the two rather than zero or both.
                assert_ne!(page.items.len(), 1, "a torn recompute batch exposed exactly one of two converging loops");
                if page.items.len() == 2 {
                    return true;
                }
                if tokio::time::Instant::now() >= deadline {
                    return false;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
    });

    let results = futures::future::join_all(queriers).await;
    let converged = results.into_iter().filter_map(Result::ok).filter(|found| *found).count();
    assert_eq!(converged, 50, "every concurrent querier must eventually observe both converged loops");
}

/// A client-assembled candidate loop, submitted before the scheduler's own debounce window has
/// elapsed, is validated, scored and cached synchronously via the Loop Cache's single-flight
/// `get_or_build` path, not left to wait for the next recompute to rediscover it independently.
#[tokio::test(flavor = "multi_thread")]
async fn a_client_submitted_candidate_loop_is_built_and_queryable_immediately() {
    use tradeloop_common::domain::{ItemRef, LoopStep, TradeLoop};

    let harness = Harness::new().await;
    let t1 = tenant("t1");

    harness
        .service
        .submit_inventory(t1.clone(), wallet("alice"), vec![ItemSubmission { id: item("sword"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();
    harness
        .service
        .submit_inventory(t1.clone(), wallet("bob"), vec![ItemSubmission { id: item("shield"), collection_id: None }], InventoryMode::Merge)
        .await
        .unwrap();
    harness.service.submit_wants(t1.clone(), wallet("alice"), vec![item("shield")], vec![]).await.unwrap();
    harness.service.submit_wants(t1.clone(), wallet("bob"), vec![item("sword")], vec![]).await.unwrap();

    let candidate = TradeLoop {
        steps: vec![
            LoopStep {
                from_wallet_id: wallet("alice"),
                to_wallet_id: wallet("bob"),
                items: vec![ItemRef { id: item("sword"), collection_id: None }],
            },
            LoopStep {
                from_wallet_id: wallet("bob"),
                to_wallet_id: wallet("alice"),
                items: vec![ItemRef { id: item("shield"), collection_id: None }],
            },
        ],
    };

    let built = harness.service.get_or_build_trade_loop(t1.clone(), candidate.clone()).await.unwrap();
    assert_eq!(built.trade_loop, candidate);

    let page = harness
        .service
        .query_trades(t1, ListFilter { limit: 10, ..ListFilter::default() })
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1, "the on-demand build must be visible to a query right away, not just eventually via recompute");
}
