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

use crate::data::GraphData;
use crate::error::GraphStoreError;
use crate::snapshot::GraphSnapshot;
use dashmap::DashMap;
use fastrace::trace;
use parking_lot::RwLock;
use std::sync::Arc;
use tradeloop_common::domain::{GraphDelta, TenantId, WalletId};

pub type PerturbationSet = std::collections::HashSet<WalletId>;

/// A tenant's slot: a writer mutex serializing `apply_delta` calls, and a swappable `Arc` the
/// writer publishes into so readers never block (spec.md §4.1, "single-writer-per-tenant").
struct TenantSlot {
    writer: tokio::sync::Mutex<()>,
    published: RwLock<Arc<GraphData>>,
}

impl Default for TenantSlot {
    fn default() -> Self {
        Self {
            writer: tokio::sync::Mutex::new(()),
            published: RwLock::new(Arc::new(GraphData::default())),
        }
    }
}

/// The per-tenant want-graph store (spec.md §4.1). Cheaply `Clone`, shares state via `Arc`.
#[derive(Clone, Default)]
pub struct GraphStore {
    tenants: Arc<DashMap<TenantId, Arc<TenantSlot>>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, tenant_id: &TenantId) -> Arc<TenantSlot> {
        self.tenants
            .entry(tenant_id.clone())
            .or_insert_with(|| Arc::new(TenantSlot::default()))
            .clone()
    }

    /// Atomically applies `delta`, returning the perturbation set on success (spec.md §4.1).
    #[trace]
    pub async fn apply_delta(
        &self,
        delta: GraphDelta,
    ) -> Result<PerturbationSet, GraphStoreError> {
        let slot = self.slot(delta.tenant_id());
        let _permit = slot.writer.lock().await;

        let current = slot.published.read().clone();
        let (next, perturbation) = current.apply(&delta)?;
        *slot.published.write() = Arc::new(next);

        metrics::counter!("tradeloop_graph_deltas_applied_total").increment(1);
        Ok(perturbation)
    }

    /// Cheap, immutable view of a tenant's graph (spec.md §4.1, `snapshot()`).
    pub fn snapshot(&self, tenant_id: &TenantId) -> GraphSnapshot {
        let slot = self.slot(tenant_id);
        let data = slot.published.read().clone();
        GraphSnapshot { data }
    }

    /// Drops all state for a tenant, e.g. on tenant teardown (spec.md §3, "Lifecycles").
    pub fn teardown_tenant(&self, tenant_id: &TenantId) {
        self.tenants.remove(tenant_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeloop_common::domain::{InventoryMode, ItemId, ItemSubmission};

    fn tenant(s: &str) -> TenantId {
        TenantId::try_from(s).unwrap()
    }
    fn wallet(s: &str) -> WalletId {
        WalletId::try_from(s).unwrap()
    }
    fn item(s: &str) -> ItemId {
        ItemId::try_from(s).unwrap()
    }

    #[tokio::test]
    async fn direct_two_way_swap_produces_reciprocal_edges() {
        let store = GraphStore::new();
        let t1 = tenant("t1");

        store
            .apply_delta(GraphDelta::InventorySubmission {
                tenant_id: t1.clone(),
                wallet_id: wallet("a"),
                items: vec![ItemSubmission {
                    id: item("x"),
                    collection_id: None,
                }],
                mode: InventoryMode::Merge,
            })
            .await
            .unwrap();

        store
            .apply_delta(GraphDelta::InventorySubmission {
                tenant_id: t1.clone(),
                wallet_id: wallet("b"),
                items: vec![ItemSubmission {
                    id: item("y"),
                    collection_id: None,
                }],
                mode: InventoryMode::Merge,
            })
            .await
            .unwrap();

        store
            .apply_delta(GraphDelta::WantsSubmission {
                tenant_id: t1.clone(),
                wallet_id: wallet("a"),
                specific_item_ids: vec![item("y")],
                collection_ids: vec![],
            })
            .await
            .unwrap();

        store
            .apply_delta(GraphDelta::WantsSubmission {
                tenant_id: t1.clone(),
                wallet_id: wallet("b"),
                specific_item_ids: vec![item("x")],
                collection_ids: vec![],
            })
            .await
            .unwrap();

        let snapshot = store.snapshot(&t1);
        assert_eq!(snapshot.neighbors_out(&wallet("a")), [wallet("b")].into());
        assert_eq!(snapshot.neighbors_out(&wallet("b")), [wallet("a")].into());
        assert_eq!(
            snapshot.items_justifying(&wallet("a"), &wallet("b"), 10),
            vec![item("x")]
        );
    }

    #[tokio::test]
    async fn transfer_to_a_different_owner_than_current_is_a_conflict() {
        let store = GraphStore::new();
        let t1 = tenant("t1");

        let err = store
            .apply_delta(GraphDelta::Transfer {
                tenant_id: t1,
                item_id: item("x"),
                from_wallet_id: wallet("a"),
                to_wallet_id: wallet("b"),
            })
            .await
            .unwrap_err();

        assert_matches::assert_matches!(err, GraphStoreError::InvalidDelta(_));
    }

    #[tokio::test]
    async fn arbitrary_wallet_ids_round_trip_through_inventory_submission() {
        use fake::Fake;
        use fake::faker::lorem::en::Word;

        let store = GraphStore::new();
        let t1 = tenant("t1");

        for _ in 0..16 {
            let wallet_word: String = Word().fake();
            let item_word: String = Word().fake();
            let wallet_id = WalletId::try_from(wallet_word.as_str()).unwrap();

            store
                .apply_delta(GraphDelta::InventorySubmission {
                    tenant_id: t1.clone(),
                    wallet_id: wallet_id.clone(),
                    items: vec![ItemSubmission {
                        id: ItemId::try_from(item_word.as_str()).unwrap(),
                        collection_id: None,
                    }],
                    mode: InventoryMode::Merge,
                })
                .await
                .unwrap();

            let snapshot = store.snapshot(&t1);
            assert!(snapshot.all_wallets().contains(&wallet_id));
        }
    }

    #[tokio::test]
    async fn resubmitting_identical_replace_payload_is_idempotent() {
        let store = GraphStore::new();
        let t1 = tenant("t1");
        let submission = || GraphDelta::InventorySubmission {
            tenant_id: t1.clone(),
            wallet_id: wallet("a"),
            items: vec![ItemSubmission {
                id: item("x"),
                collection_id: None,
            }],
            mode: InventoryMode::Replace,
        };

        let first = store.apply_delta(submission()).await.unwrap();
        assert_eq!(first, [wallet("a")].into());

        let second = store.apply_delta(submission()).await.unwrap();
        assert!(second.is_empty(), "identical replace-mode resubmission must be a no-op: {second:?}");
    }

    #[tokio::test]
    async fn tenants_are_isolated() {
        let store = GraphStore::new();
        let t1 = tenant("t1");
        let t2 = tenant("t2");

        store
            .apply_delta(GraphDelta::WantsSubmission {
                tenant_id: t1.clone(),
                wallet_id: wallet("a"),
                specific_item_ids: vec![item("x")],
                collection_ids: vec![],
            })
            .await
            .unwrap();

        assert!(store.snapshot(&t2).neighbors_out(&wallet("a")).is_empty());
        assert_eq!(store.snapshot(&t1).seq(), 1);
        assert_eq!(store.snapshot(&t2).seq(), 0);
    }
}
