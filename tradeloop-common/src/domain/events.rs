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

use crate::domain::ids::{ItemId, LoopFingerprint, TenantId, WalletId};
use crate::domain::entities::TradeLoop;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Published by the Graph Store after `apply_delta` commits. Carries the perturbation set that
/// seeds incremental enumeration (spec.md §4.1, §GLOSSARY).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphChanged {
    pub tenant_id: TenantId,
    pub perturbed_wallets: HashSet<WalletId>,
    /// `(wallet, item)` pairs whose ownership changed, used by the Loop Cache to invalidate
    /// promptly (spec.md §4.5).
    pub ownership_changes: Vec<(WalletId, ItemId)>,
}

/// Why a [`LoopInvalidated`] event fired, per spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidationReason {
    OwnerChanged,
    WantRemoved,
    TtlExpired,
    TenantPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopDiscovered {
    pub tenant_id: TenantId,
    pub fingerprint: LoopFingerprint,
    pub trade_loop: TradeLoop,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopInvalidated {
    pub tenant_id: TenantId,
    pub fingerprint: LoopFingerprint,
    pub reason: InvalidationReason,
}

/// The tagged union of events carried on the internal Event Bus. Replaces "event listeners
/// registered on module import" (spec.md §9): every subscription is explicit, created at
/// component-construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiscoveryEvent {
    GraphChanged(GraphChanged),
    LoopDiscovered(LoopDiscovered),
    LoopInvalidated(LoopInvalidated),
}

impl DiscoveryEvent {
    pub fn tenant_id(&self) -> &TenantId {
        match self {
            DiscoveryEvent::GraphChanged(event) => &event.tenant_id,
            DiscoveryEvent::LoopDiscovered(event) => &event.tenant_id,
            DiscoveryEvent::LoopInvalidated(event) => &event.tenant_id,
        }
    }
}

impl From<GraphChanged> for DiscoveryEvent {
    fn from(event: GraphChanged) -> Self {
        DiscoveryEvent::GraphChanged(event)
    }
}

impl From<LoopDiscovered> for DiscoveryEvent {
    fn from(event: LoopDiscovered) -> Self {
        DiscoveryEvent::LoopDiscovered(event)
    }
}

impl From<LoopInvalidated> for DiscoveryEvent {
    fn from(event: LoopInvalidated) -> Self {
        DiscoveryEvent::LoopInvalidated(event)
    }
}
