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
use std::collections::HashSet;
use std::sync::Arc;
use tradeloop_common::domain::{CollectionId, ItemId, WalletId};

/// Cheap, immutable view of a tenant's want-graph, handed to the Cycle Enumerator. Commits after
/// a snapshot is taken are invisible to it (spec.md §GLOSSARY, "Snapshot isolation").
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    pub(crate) data: Arc<GraphData>,
}

impl GraphSnapshot {
    /// Monotonic commit sequence number this snapshot was taken at.
    pub fn seq(&self) -> u64 {
        self.data.seq
    }

    pub fn owner_of(&self, item_id: &ItemId) -> Option<&WalletId> {
        self.data.owners.get(item_id)
    }

    pub fn collection_of(&self, item_id: &ItemId) -> Option<CollectionId> {
        self.data.item_collection.get(item_id).cloned()
    }

    pub fn inventory_of(&self, wallet_id: &WalletId) -> HashSet<ItemId> {
        self.data
            .inventory
            .get(wallet_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Wallets `to` such that `to` wants some item owned by `wallet_id`, i.e. the want-graph
    /// edges directed into `wallet_id`.
    pub fn neighbors_in(&self, wallet_id: &WalletId) -> HashSet<WalletId> {
        let mut wanters = HashSet::new();
        if let Some(owned) = self.data.inventory.get(wallet_id) {
            for item_id in owned {
                if let Some(specific) = self.data.wanted_by.get(item_id) {
                    wanters.extend(specific.iter().filter(|w| *w != wallet_id).cloned());
                }
                if let Some(collection_id) = self.data.item_collection.get(item_id) {
                    if let Some(collection_wanters) = self.data.collection_wanters.get(collection_id) {
                        wanters.extend(collection_wanters.iter().filter(|w| *w != wallet_id).cloned());
                    }
                }
            }
        }
        wanters
    }

    /// Wallets `from` such that `wallet_id` wants some item owned by `from`, i.e. the want-graph
    /// edges directed out of `wallet_id`.
    pub fn neighbors_out(&self, wallet_id: &WalletId) -> HashSet<WalletId> {
        let mut owners = HashSet::new();
        if let Some(wants) = self.data.specific_wants.get(wallet_id) {
            for item_id in wants {
                if let Some(owner) = self.data.owners.get(item_id) {
                    if owner != wallet_id {
                        owners.insert(owner.clone());
                    }
                }
            }
        }
        if let Some(collections) = self.data.collection_wants.get(wallet_id) {
            for collection_id in collections {
                for (item_id, item_collection) in &self.data.item_collection {
                    if item_collection != collection_id {
                        continue;
                    }
                    if let Some(owner) = self.data.owners.get(item_id) {
                        if owner != wallet_id {
                            owners.insert(owner.clone());
                        }
                    }
                }
            }
        }
        owners
    }

    /// The item choices that justify the edge `from -> to`: items `from` owns that satisfy a
    /// want of `to`, either specific or collection-derived. `collection_expansion_cap` bounds how
    /// many collection-derived items are materialized (spec.md §6, `collection_expansion_cap`).
    pub fn items_justifying(
        &self,
        from: &WalletId,
        to: &WalletId,
        collection_expansion_cap: usize,
    ) -> Vec<ItemId> {
        let owned = match self.data.inventory.get(from) {
            Some(owned) => owned,
            None => return Vec::new(),
        };

        let specific_wants = self.data.specific_wants.get(to);
        let collection_wants = self.data.collection_wants.get(to);

        let mut specific = Vec::new();
        let mut collection_derived = Vec::new();

        for item_id in owned {
            if specific_wants.is_some_and(|wants| wants.contains(item_id)) {
                specific.push(item_id.clone());
                continue;
            }
            if let Some(collection_id) = self.data.item_collection.get(item_id) {
                if collection_wants.is_some_and(|wants| wants.contains(collection_id))
                    && collection_derived.len() < collection_expansion_cap
                {
                    collection_derived.push(item_id.clone());
                }
            }
        }

        specific.sort();
        collection_derived.sort();
        specific.extend(collection_derived);
        specific
    }

    /// All wallets known to this tenant's graph, the seed universe for a full rescan.
    pub fn all_wallets(&self) -> HashSet<WalletId> {
        let mut wallets: HashSet<WalletId> = self.data.inventory.keys().cloned().collect();
        wallets.extend(self.data.specific_wants.keys().cloned());
        wallets.extend(self.data.collection_wants.keys().cloned());
        wallets
    }

    /// Total distinct items with a known owner, for quota enforcement (spec.md §4.8, `max_items`).
    pub fn item_count(&self) -> usize {
        self.data.owners.len()
    }

    /// Total want declarations (specific plus collection) across every wallet, for quota
    /// enforcement (spec.md §4.8, `max_wants`).
    pub fn total_want_count(&self) -> usize {
        let specific: usize = self.data.specific_wants.values().map(HashSet::len).sum();
        let collections: usize = self.data.collection_wants.values().map(HashSet::len).sum();
        specific + collections
    }
}
