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

use crate::error::GraphStoreError;
use std::collections::{HashMap, HashSet};
use tradeloop_common::domain::{
    CollectionId, GraphDelta, InventoryMode, ItemId, ItemSubmission, WalletId,
};

/// Per-tenant graph state (spec.md §4.1). Immutable once built; a commit produces a new
/// [`GraphData`] that atomically replaces the previous one behind the tenant's snapshot lock,
/// giving readers copy-on-write MVCC without ever blocking on the writer.
#[derive(Debug, Clone, Default)]
pub struct GraphData {
    pub(crate) owners: HashMap<ItemId, WalletId>,
    pub(crate) inventory: HashMap<WalletId, HashSet<ItemId>>,
    pub(crate) specific_wants: HashMap<WalletId, HashSet<ItemId>>,
    pub(crate) collection_wants: HashMap<WalletId, HashSet<CollectionId>>,
    pub(crate) wanted_by: HashMap<ItemId, HashSet<WalletId>>,
    pub(crate) collection_wanters: HashMap<CollectionId, HashSet<WalletId>>,
    pub(crate) item_collection: HashMap<ItemId, CollectionId>,
    pub(crate) seq: u64,
}

/// Wallets whose outgoing or incoming want-graph edges may have changed as a result of a commit.
/// The seed set for incremental enumeration (spec.md §GLOSSARY, "Perturbation set").
pub type Perturbation = HashSet<WalletId>;

impl GraphData {
    pub(crate) fn apply(&self, delta: &GraphDelta) -> Result<(Self, Perturbation), GraphStoreError> {
        let mut next = self.clone();
        let perturbation = match delta {
            GraphDelta::InventorySubmission {
                wallet_id,
                items,
                mode,
                ..
            } => next.apply_inventory(wallet_id, items, *mode)?,
            GraphDelta::WantsSubmission {
                wallet_id,
                specific_item_ids,
                collection_ids,
                ..
            } => next.apply_wants(wallet_id, specific_item_ids, collection_ids),
            GraphDelta::Transfer {
                item_id,
                from_wallet_id,
                to_wallet_id,
                ..
            } => next.apply_transfer(item_id, from_wallet_id, to_wallet_id)?,
        };
        next.seq = self.seq + 1;
        Ok((next, perturbation))
    }

    fn apply_inventory(
        &mut self,
        wallet_id: &WalletId,
        items: &[ItemSubmission],
        mode: InventoryMode,
    ) -> Result<Perturbation, GraphStoreError> {
        let mut perturbed = Perturbation::new();

        for submission in items {
            if let Some(owner) = self.owners.get(&submission.id) {
                if owner != wallet_id {
                    return Err(GraphStoreError::ConsistencyConflict);
                }
            }
            if let Some(existing) = self.item_collection.get(&submission.id) {
                if let Some(incoming) = &submission.collection_id {
                    if existing != incoming {
                        return Err(GraphStoreError::InvalidDelta(format!(
                            "item {} collection membership is immutable once known",
                            submission.id
                        )));
                    }
                }
            }
        }

        let current = self.inventory.get(wallet_id).cloned().unwrap_or_default();
        let incoming: HashSet<ItemId> = items.iter().map(|i| i.id.clone()).collect();

        if mode == InventoryMode::Replace {
            for removed in current.difference(&incoming) {
                self.owners.remove(removed);
                perturbed.insert(wallet_id.clone());
                if let Some(wanters) = self.wanted_by.get(removed) {
                    perturbed.extend(wanters.iter().cloned());
                }
            }
        }

        let entry = self.inventory.entry(wallet_id.clone()).or_default();
        if mode == InventoryMode::Replace {
            entry.clear();
        }

        for submission in items {
            // An item already present in this wallet's current inventory, with the same
            // (already-validated) collection membership, is not a change: no self-perturbation,
            // no re-notifying its wanters. Otherwise resubmitting an identical payload would
            // never be a no-op for tenants with outstanding wants on the resubmitted items.
            let is_new = !current.contains(&submission.id);

            entry.insert(submission.id.clone());
            self.owners.insert(submission.id.clone(), wallet_id.clone());
            if let Some(collection_id) = &submission.collection_id {
                self.item_collection
                    .insert(submission.id.clone(), collection_id.clone());
            }

            if !is_new {
                continue;
            }
            perturbed.insert(wallet_id.clone());
            if let Some(collection_id) = &submission.collection_id {
                if let Some(wanters) = self.collection_wanters.get(collection_id) {
                    perturbed.extend(wanters.iter().cloned());
                }
            }
            if let Some(wanters) = self.wanted_by.get(&submission.id) {
                perturbed.extend(wanters.iter().cloned());
            }
        }

        Ok(perturbed)
    }

    fn apply_wants(
        &mut self,
        wallet_id: &WalletId,
        specific_item_ids: &[ItemId],
        collection_ids: &[CollectionId],
    ) -> Perturbation {
        let mut perturbed = Perturbation::new();
        perturbed.insert(wallet_id.clone());

        let wants = self.specific_wants.entry(wallet_id.clone()).or_default();
        for item_id in specific_item_ids {
            wants.insert(item_id.clone());
            self.wanted_by
                .entry(item_id.clone())
                .or_default()
                .insert(wallet_id.clone());
            if let Some(owner) = self.owners.get(item_id) {
                perturbed.insert(owner.clone());
            }
        }

        let collection_wants = self.collection_wants.entry(wallet_id.clone()).or_default();
        for collection_id in collection_ids {
            collection_wants.insert(collection_id.clone());
            self.collection_wanters
                .entry(collection_id.clone())
                .or_default()
                .insert(wallet_id.clone());
        }

        perturbed
    }

    fn apply_transfer(
        &mut self,
        item_id: &ItemId,
        from_wallet_id: &WalletId,
        to_wallet_id: &WalletId,
    ) -> Result<Perturbation, GraphStoreError> {
        match self.owners.get(item_id) {
            Some(owner) if owner == from_wallet_id => {}
            Some(_) => return Err(GraphStoreError::ConsistencyConflict),
            None => {
                return Err(GraphStoreError::InvalidDelta(format!(
                    "item {item_id} has no current owner"
                )));
            }
        }

        let mut perturbed = Perturbation::new();
        perturbed.insert(from_wallet_id.clone());
        perturbed.insert(to_wallet_id.clone());
        if let Some(wanters) = self.wanted_by.get(item_id) {
            perturbed.extend(wanters.iter().cloned());
        }
        if let Some(collection_id) = self.item_collection.get(item_id) {
            if let Some(wanters) = self.collection_wanters.get(collection_id) {
                perturbed.extend(wanters.iter().cloned());
            }
        }

        self.owners.insert(item_id.clone(), to_wallet_id.clone());
        if let Some(set) = self.inventory.get_mut(from_wallet_id) {
            set.remove(item_id);
        }
        self.inventory
            .entry(to_wallet_id.clone())
            .or_default()
            .insert(item_id.clone());

        Ok(perturbed)
    }
}
