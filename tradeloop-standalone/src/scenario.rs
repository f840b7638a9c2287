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

//! The wire shape of a scenario file: a JSON array of ingestion operations, applied in order
//! against a [`tradeloop_service::TradeService`]. Mirrors spec.md §6's "Ingestion payload
//! (semantic, not wire-bound)" shapes, given a concrete JSON encoding for this standalone runner.

use serde::Deserialize;
use tradeloop_common::domain::{CollectionId, InventoryMode, ItemId, ItemSubmission, TenantId, WalletId};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScenarioOp {
    Inventory {
        tenant: String,
        wallet: String,
        items: Vec<ScenarioItem>,
        #[serde(default)]
        mode: ScenarioInventoryMode,
    },
    Wants {
        tenant: String,
        wallet: String,
        #[serde(default)]
        items: Vec<String>,
        #[serde(default)]
        collections: Vec<String>,
    },
    Transfer {
        tenant: String,
        item: String,
        from: String,
        to: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioItem {
    pub id: String,
    #[serde(default)]
    pub collection: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioInventoryMode {
    #[default]
    Merge,
    Replace,
}

impl From<ScenarioInventoryMode> for InventoryMode {
    fn from(mode: ScenarioInventoryMode) -> Self {
        match mode {
            ScenarioInventoryMode::Merge => InventoryMode::Merge,
            ScenarioInventoryMode::Replace => InventoryMode::Replace,
        }
    }
}

/// Parsed scenario, with every opaque id validated at the ingestion boundary (spec.md §6, "IDs
/// are opaque strings ≤ 128 bytes"). Fails fast, before any op is applied, on a malformed id.
pub fn parse(raw: &str) -> anyhow::Result<Vec<ScenarioOp>> {
    let ops: Vec<ScenarioOp> = serde_json::from_str(raw)?;
    for op in &ops {
        validate(op)?;
    }
    Ok(ops)
}

fn validate(op: &ScenarioOp) -> anyhow::Result<()> {
    match op {
        ScenarioOp::Inventory { tenant, wallet, items, .. } => {
            TenantId::try_from(tenant.as_str())?;
            WalletId::try_from(wallet.as_str())?;
            for item in items {
                ItemId::try_from(item.id.as_str())?;
                if let Some(collection) = &item.collection {
                    CollectionId::try_from(collection.as_str())?;
                }
            }
        }
        ScenarioOp::Wants { tenant, wallet, items, collections } => {
            TenantId::try_from(tenant.as_str())?;
            WalletId::try_from(wallet.as_str())?;
            for item in items {
                ItemId::try_from(item.as_str())?;
            }
            for collection in collections {
                CollectionId::try_from(collection.as_str())?;
            }
        }
        ScenarioOp::Transfer { tenant, item, from, to } => {
            TenantId::try_from(tenant.as_str())?;
            ItemId::try_from(item.as_str())?;
            WalletId::try_from(from.as_str())?;
            WalletId::try_from(to.as_str())?;
        }
    }
    Ok(())
}

impl ScenarioOp {
    pub fn tenant_id(&self) -> TenantId {
        let tenant = match self {
            ScenarioOp::Inventory { tenant, .. } => tenant,
            ScenarioOp::Wants { tenant, .. } => tenant,
            ScenarioOp::Transfer { tenant, .. } => tenant,
        };
        TenantId::try_from(tenant.as_str()).expect("validated during parse")
    }
}

impl ScenarioItem {
    pub fn into_submission(self) -> ItemSubmission {
        ItemSubmission {
            id: ItemId::try_from(self.id.as_str()).expect("validated during parse"),
            collection_id: self
                .collection
                .map(|c| CollectionId::try_from(c.as_str()).expect("validated during parse")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_two_way_swap_scenario() {
        let raw = r#"[
            {"op": "inventory", "tenant": "t1", "wallet": "a", "items": [{"id": "x"}]},
            {"op": "inventory", "tenant": "t1", "wallet": "b", "items": [{"id": "y"}]},
            {"op": "wants", "tenant": "t1", "wallet": "a", "items": ["y"]},
            {"op": "wants", "tenant": "t1", "wallet": "b", "items": ["x"]}
        ]"#;

        let ops = parse(raw).unwrap();
        assert_eq!(ops.len(), 4);
    }

    #[test]
    fn rejects_an_oversized_id_before_applying_anything() {
        let raw = format!(
            r#"[{{"op": "transfer", "tenant": "t1", "item": "{}", "from": "a", "to": "b"}}]"#,
            "x".repeat(200)
        );
        assert!(parse(&raw).is_err());
    }
}
