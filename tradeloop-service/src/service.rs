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

//! Persistent Trade Service facade (spec.md §4.7): "Each mutating operation constructs a
//! `GraphDelta`, calls Graph Store.apply_delta, publishes the resulting perturbation, and returns
//! synchronously. Discovery happens asynchronously." The only surface where errors become
//! externally visible (spec.md §7).

use crate::collaborators::TenantRegistry;
use crate::error::ServiceError;
use crate::executor::ValuerProvider;
use crate::quotas::QuotaError;
use crate::tenant::TenantIsolationLayer;
use fastrace::trace;
use std::collections::HashSet;
use std::sync::Arc;
use tradeloop_cache::{LoopCacheError, ListFilter, Page};
use tradeloop_common::domain::{
    CachedLoop, Clock, CollectionId, DiscoveryEvent, GraphChanged, GraphDelta, InvalidationReason, ItemId, ItemSubmission,
    LoopInvalidated, LoopStatus, Publisher, Subscriber, SystemClock, TenantId, TradeLoop, WalletId,
};
use tradeloop_discovery::{fingerprint, scoring};
use tradeloop_graph::GraphStore;

/// Filters an event-stream subscription (spec.md §4.7, `subscribe(tenant, filter)`). Applies only
/// to `loop_discovered` frames: `loop_invalidated` carries no loop content to filter against, so
/// every invalidation for the subscribed tenant passes through.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    pub wallet_id: Option<WalletId>,
    pub item_id: Option<ItemId>,
    pub collection_id: Option<CollectionId>,
}

impl SubscriptionFilter {
    fn matches(&self, event: &DiscoveryEvent) -> bool {
        match event {
            DiscoveryEvent::LoopDiscovered(discovered) => {
                self.wallet_id
                    .as_ref()
                    .is_none_or(|w| discovered.trade_loop.participants().any(|p| p == w))
                    && self
                        .item_id
                        .as_ref()
                        .is_none_or(|i| discovered.trade_loop.items().any(|item| item.id == *i))
                    && self.collection_id.as_ref().is_none_or(|c| {
                        discovered
                            .trade_loop
                            .items()
                            .any(|item| item.collection_id.as_ref() == Some(c))
                    })
            }
            DiscoveryEvent::LoopInvalidated(_) => true,
            DiscoveryEvent::GraphChanged(_) => false,
        }
    }
}

#[derive(Clone)]
pub struct TradeService<P, R, V>
where
    P: Publisher,
    R: TenantRegistry,
    V: ValuerProvider,
{
    graph: GraphStore,
    publisher: P,
    tenants: Arc<TenantIsolationLayer>,
    registry: R,
    valuer_provider: V,
}

impl<P, R, V> TradeService<P, R, V>
where
    P: Publisher,
    R: TenantRegistry,
    V: ValuerProvider,
{
    pub fn new(graph: GraphStore, publisher: P, tenants: Arc<TenantIsolationLayer>, registry: R, valuer_provider: V) -> Self {
        Self { graph, publisher, tenants, registry, valuer_provider }
    }

    /// Replaces or merges a wallet's owned set (spec.md §4.7).
    #[trace]
    pub async fn submit_inventory(
        &self,
        tenant_id: TenantId,
        wallet_id: WalletId,
        items: Vec<ItemSubmission>,
        mode: tradeloop_common::domain::InventoryMode,
    ) -> Result<(), ServiceError> {
        let state = self.tenants.state(&tenant_id, &self.registry).await?;

        let snapshot = self.graph.snapshot(&tenant_id);
        if !snapshot.all_wallets().contains(&wallet_id) && snapshot.all_wallets().len() >= state.quotas.max_wallets {
            return Err(QuotaError::TooManyWallets.into());
        }
        let before = snapshot.inventory_of(&wallet_id);
        let new_item_count = items.iter().filter(|item| !before.contains(&item.id)).count();
        if snapshot.item_count() + new_item_count > state.quotas.max_items {
            return Err(QuotaError::TooManyItems.into());
        }

        let delta = GraphDelta::InventorySubmission {
            tenant_id: tenant_id.clone(),
            wallet_id: wallet_id.clone(),
            items: items.clone(),
            mode,
        };
        let perturbation = self.graph.apply_delta(delta).await?;

        let ownership_changes = if mode == tradeloop_common::domain::InventoryMode::Replace {
            let kept: HashSet<ItemId> = items.into_iter().map(|item| item.id).collect();
            before
                .into_iter()
                .filter(|item_id| !kept.contains(item_id))
                .map(|item_id| (wallet_id.clone(), item_id))
                .collect()
        } else {
            Vec::new()
        };

        self.publish_change(tenant_id, perturbation, ownership_changes).await;
        Ok(())
    }

    /// Merges a wallet's wants (spec.md §4.7).
    #[trace]
    pub async fn submit_wants(
        &self,
        tenant_id: TenantId,
        wallet_id: WalletId,
        specific_item_ids: Vec<ItemId>,
        collection_ids: Vec<CollectionId>,
    ) -> Result<(), ServiceError> {
        let state = self.tenants.state(&tenant_id, &self.registry).await?;

        let snapshot = self.graph.snapshot(&tenant_id);
        let incoming_want_count = specific_item_ids.len() + collection_ids.len();
        if snapshot.total_want_count() + incoming_want_count > state.quotas.max_wants {
            return Err(QuotaError::TooManyWants.into());
        }

        let delta = GraphDelta::WantsSubmission {
            tenant_id: tenant_id.clone(),
            wallet_id,
            specific_item_ids,
            collection_ids,
        };
        let perturbation = self.graph.apply_delta(delta).await?;

        self.publish_change(tenant_id, perturbation, Vec::new()).await;
        Ok(())
    }

    /// Moves ownership of a single item (spec.md §4.7).
    #[trace]
    pub async fn transfer(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        from_wallet_id: WalletId,
        to_wallet_id: WalletId,
    ) -> Result<(), ServiceError> {
        let state = self.tenants.state(&tenant_id, &self.registry).await?;

        let snapshot = self.graph.snapshot(&tenant_id);
        if !snapshot.all_wallets().contains(&to_wallet_id) && snapshot.all_wallets().len() >= state.quotas.max_wallets {
            return Err(QuotaError::TooManyWallets.into());
        }

        let delta = GraphDelta::Transfer {
            tenant_id: tenant_id.clone(),
            item_id: item_id.clone(),
            from_wallet_id: from_wallet_id.clone(),
            to_wallet_id,
        };
        let perturbation = self.graph.apply_delta(delta).await?;

        self.publish_change(tenant_id, perturbation, vec![(from_wallet_id, item_id)])
            .await;
        Ok(())
    }

    /// Paginated query against the tenant's Loop Cache (spec.md §4.7, §4.5 `list`).
    #[trace]
    pub async fn query_trades(&self, tenant_id: TenantId, filter: ListFilter) -> Result<Page, ServiceError> {
        let state = self.tenants.state(&tenant_id, &self.registry).await?;
        Ok(state.cache.list(&filter)?)
    }

    /// Validates and scores a client-proposed candidate loop on demand (spec.md §4.5,
    /// `get_or_build`), for callers that already hold a candidate — e.g. a marketplace UI that
    /// assembled one from its own search — and want it scored and cached without waiting for the
    /// next scheduler recompute to rediscover it independently. Distinct from `recompute`'s own
    /// population path: `recompute` is already the sole writer for its tenant (spec.md §4.6,
    /// one in-flight recompute per tenant) and applies its discoveries via `store_batch`, so this
    /// is the only caller that exercises single-flight coalescing.
    #[trace]
    pub async fn get_or_build_trade_loop(&self, tenant_id: TenantId, candidate: TradeLoop) -> Result<CachedLoop, ServiceError> {
        let state = self.tenants.state(&tenant_id, &self.registry).await?;
        let snapshot = self.graph.snapshot(&tenant_id);
        let valuer = self.valuer_provider.valuer_for(&tenant_id).await;
        let scoring_policy = state.policy.scoring_policy();
        let collection_expansion_cap = state.policy.collection_expansion_cap;
        let ttl = state.policy.cache_ttl;
        let candidate_fingerprint = fingerprint(&candidate.steps);

        let cached = state
            .cache
            .get_or_build(candidate_fingerprint, || async {
                for step in &candidate.steps {
                    let justified: HashSet<ItemId> = snapshot
                        .items_justifying(&step.from_wallet_id, &step.to_wallet_id, collection_expansion_cap)
                        .into_iter()
                        .collect();
                    if let Some(unjustified) = step.items.iter().find(|item| !justified.contains(&item.id)) {
                        return Err(LoopCacheError::BuilderFailed(
                            format!(
                                "item {} is not owned-and-wanted along {} -> {}",
                                unjustified.id, step.from_wallet_id, step.to_wallet_id
                            )
                            .into(),
                        ));
                    }
                }

                let loop_score = scoring::score(&candidate, &valuer, &scoring_policy);
                if !scoring::accepts(&candidate, loop_score, &scoring_policy) {
                    return Err(LoopCacheError::BuilderFailed(
                        format!("candidate loop scored {loop_score} below the tenant's acceptance policy").into(),
                    ));
                }

                Ok(CachedLoop {
                    fingerprint: candidate_fingerprint,
                    trade_loop: candidate.clone(),
                    score: loop_score,
                    created_at_millis: SystemClock.now_millis(),
                    ttl,
                    status: LoopStatus::Fresh,
                })
            })
            .await?;

        Ok(cached)
    }

    /// Server-side streaming of `loop_discovered`/`loop_invalidated` frames for one tenant
    /// (spec.md §4.7, §6).
    pub fn subscribe(&self, tenant_id: TenantId, filter: SubscriptionFilter) -> impl futures::Stream<Item = DiscoveryEvent>
    where
        P: Subscriber,
    {
        use futures::StreamExt;

        self.publisher.subscribe().filter_map(move |event| {
            let tenant_id = tenant_id.clone();
            let filter = filter.clone();
            async move {
                let event = event.ok()?;
                if event.tenant_id() != &tenant_id {
                    return None;
                }
                filter.matches(&event).then_some(event)
            }
        })
    }

    /// Publishes the change event and, for any ownership changes, invalidates the affected cached
    /// loops immediately (spec.md §4.5, "Invalidation is immediate on ownership change") rather
    /// than waiting for the scheduler's debounce window.
    async fn publish_change(&self, tenant_id: TenantId, perturbed_wallets: HashSet<WalletId>, ownership_changes: Vec<(WalletId, ItemId)>) {
        if let Ok(state) = self.tenants.state(&tenant_id, &self.registry).await {
            if !ownership_changes.is_empty() {
                let removed = state.cache.invalidate_ownership_changes(&ownership_changes);
                for fingerprint in removed {
                    let _ = self
                        .publisher
                        .publish(DiscoveryEvent::LoopInvalidated(LoopInvalidated {
                            tenant_id: tenant_id.clone(),
                            fingerprint,
                            reason: InvalidationReason::OwnerChanged,
                        }))
                        .await;
                }
            }
        }

        let _ = self
            .publisher
            .publish(DiscoveryEvent::GraphChanged(GraphChanged {
                tenant_id,
                perturbed_wallets,
                ownership_changes,
            }))
            .await;
    }
}
