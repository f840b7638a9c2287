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

use crate::domain::ids::{CollectionId, ItemId, TenantId, WalletId};
use serde::{Deserialize, Serialize};

/// Whether a submitted inventory set replaces or merges with the existing one. Named per
/// spec.md §4.7 (`submit_inventory`'s "mode is a parameter").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryMode {
    Merge,
    Replace,
}

/// An item as carried on an ingestion payload (spec.md §6): an id plus an optional, once-known,
/// immutable collection membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSubmission {
    pub id: ItemId,
    pub collection_id: Option<CollectionId>,
}

/// Tagged union of the mutations the Graph Store accepts, replacing "dynamic field access on
/// untyped payloads" per spec.md §9.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphDelta {
    InventorySubmission {
        tenant_id: TenantId,
        wallet_id: WalletId,
        items: Vec<ItemSubmission>,
        mode: InventoryMode,
    },

    WantsSubmission {
        tenant_id: TenantId,
        wallet_id: WalletId,
        specific_item_ids: Vec<ItemId>,
        collection_ids: Vec<CollectionId>,
    },

    Transfer {
        tenant_id: TenantId,
        item_id: ItemId,
        from_wallet_id: WalletId,
        to_wallet_id: WalletId,
    },
}

impl GraphDelta {
    pub fn tenant_id(&self) -> &TenantId {
        match self {
            GraphDelta::InventorySubmission { tenant_id, .. }
            | GraphDelta::WantsSubmission { tenant_id, .. }
            | GraphDelta::Transfer { tenant_id, .. } => tenant_id,
        }
    }
}
