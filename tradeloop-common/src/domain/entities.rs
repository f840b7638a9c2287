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

use crate::domain::ids::{CollectionId, ItemId, LoopFingerprint, WalletId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An NFT. Collection membership, once known, never changes; ownership changes via
/// [`crate::domain::GraphDelta::Transfer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub collection_id: Option<CollectionId>,
    pub owner_wallet_id: WalletId,
}

/// A reference to an item as it appears in a trade-loop step, carrying the collection id purely
/// for display purposes on the wire (see spec.md §6 query response shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: ItemId,
    pub collection_id: Option<CollectionId>,
}

/// The target of a [`Want`]: either a specific item, or a disjunction over a collection's
/// members (excluding items the wanting wallet already owns).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WantTarget {
    Item(ItemId),
    Collection(CollectionId),
}

/// A directed step of a [`TradeLoop`]: `from_wallet_id` sends every listed item to
/// `to_wallet_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopStep {
    pub from_wallet_id: WalletId,
    pub to_wallet_id: WalletId,
    pub items: Vec<ItemRef>,
}

/// An ordered, concrete directed cycle: step `k` transfers items from `wallet_k` to
/// `wallet_{k+1 mod n}`. See spec.md §3 invariants 2-5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeLoop {
    pub steps: Vec<LoopStep>,
}

impl TradeLoop {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// All wallets participating in this loop, in step order.
    pub fn participants(&self) -> impl Iterator<Item = &WalletId> {
        self.steps.iter().map(|step| &step.from_wallet_id)
    }

    /// All items transferred by this loop.
    pub fn items(&self) -> impl Iterator<Item = &ItemRef> {
        self.steps.iter().flat_map(|step| &step.items)
    }
}

/// Freshness state of a [`CachedLoop`]. Invalidation is terminal: an invalidated entry is
/// removed, never resurrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopStatus {
    Fresh,
    Stale,
    Invalidated,
}

/// A scored [`TradeLoop`] held in the Loop Cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedLoop {
    pub fingerprint: LoopFingerprint,
    pub trade_loop: TradeLoop,
    pub score: f64,
    pub created_at_millis: u64,
    pub ttl: Duration,
    pub status: LoopStatus,
}

impl CachedLoop {
    pub fn is_expired(&self, now_millis: u64) -> bool {
        let age = now_millis.saturating_sub(self.created_at_millis);
        age >= self.ttl.as_millis() as u64
    }
}
