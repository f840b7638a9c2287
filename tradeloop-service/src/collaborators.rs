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

//! External collaborators (spec.md §1, "Out of scope: interfaces only"): the core consumes these
//! through traits and never implements the other side. Mirrors the teacher's `Storage`/`Api`
//! traits — `trait_variant::make(Send)`, `Clone + Send + Sync + 'static`, associated `Error`.

use crate::policy::DiscoveryPolicy;
use crate::quotas::TenantQuotas;
use std::convert::Infallible;
use tradeloop_common::domain::{CollectionId, ItemId, TenantId, TradeLoop};

/// Address/id → metadata. The core never calls this during enumeration (spec.md §5, "Shared
/// resources"); metadata is resolved at ingestion time only.
#[trait_variant::make(Send)]
pub trait NFTMetadataProvider
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: std::error::Error + Send + Sync + 'static;

    async fn collection_of(&self, tenant_id: &TenantId, item_id: &ItemId) -> Result<Option<CollectionId>, Self::Error>;
}

/// Abstract loop → chain-specific payload. Opaque to discovery: the core only ever hands over a
/// [`TradeLoop`], never inspects what the adapter does with it.
#[trait_variant::make(Send)]
pub trait BlockchainAdapter
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: std::error::Error + Send + Sync + 'static;

    async fn materialize(&self, tenant_id: &TenantId, trade_loop: &TradeLoop) -> Result<(), Self::Error>;
}

/// Tenant id → configuration/limits. Administrative tenant CRUD is out of scope (spec.md §1); the
/// core only ever reads.
#[trait_variant::make(Send)]
pub trait TenantRegistry
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: std::error::Error + Send + Sync + 'static;

    async fn quotas(&self, tenant_id: &TenantId) -> Result<TenantQuotas, Self::Error>;

    async fn discovery_policy(&self, tenant_id: &TenantId) -> Result<DiscoveryPolicy, Self::Error>;
}

/// A metadata provider that never resolves anything, for compositions where collection membership
/// is always supplied at ingestion (mirrors the workspace's `NoopPubSub`).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetadataProvider;

impl NFTMetadataProvider for NoopMetadataProvider {
    type Error = Infallible;

    async fn collection_of(&self, _tenant_id: &TenantId, _item_id: &ItemId) -> Result<Option<CollectionId>, Self::Error> {
        Ok(None)
    }
}

/// A blockchain adapter that discards every loop it is handed, for compositions that only need
/// discovery and not settlement.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBlockchainAdapter;

impl BlockchainAdapter for NoopBlockchainAdapter {
    type Error = Infallible;

    async fn materialize(&self, _tenant_id: &TenantId, _trade_loop: &TradeLoop) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A tenant registry returning the same quotas for every tenant, for single-tenant or test
/// compositions.
#[derive(Debug, Clone)]
pub struct StaticTenantRegistry {
    quotas: TenantQuotas,
    policy: DiscoveryPolicy,
}

impl StaticTenantRegistry {
    pub fn new(quotas: TenantQuotas) -> Self {
        Self { quotas, policy: DiscoveryPolicy::default() }
    }

    pub fn with_policy(quotas: TenantQuotas, policy: DiscoveryPolicy) -> Self {
        Self { quotas, policy }
    }
}

impl TenantRegistry for StaticTenantRegistry {
    type Error = Infallible;

    async fn quotas(&self, _tenant_id: &TenantId) -> Result<TenantQuotas, Self::Error> {
        Ok(self.quotas.clone())
    }

    async fn discovery_policy(&self, _tenant_id: &TenantId) -> Result<DiscoveryPolicy, Self::Error> {
        Ok(self.policy.clone())
    }
}
