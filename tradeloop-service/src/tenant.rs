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

//! Tenant Isolation Layer (spec.md §4.8): "Each tenant has its own ... Loop Cache, scheduler
//! queue, and metric counters." Holds per-tenant containers in a `DashMap`, the same
//! concurrent-map idiom the teacher uses for `worker_by_wallet_id`, and never hands out a
//! reference that outlives a lookup (spec.md §9, "singleton services returning shared mutable
//! state across tenants").

use crate::collaborators::TenantRegistry;
use crate::error::ServiceError;
use crate::policy::DiscoveryPolicy;
use crate::quotas::TenantQuotas;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tradeloop_cache::LoopCache;
use tradeloop_common::domain::{Clock, SystemClock, TenantId};

/// A single tenant's state: its Loop Cache, quotas, discovery policy, and the freshness
/// indicator surfaced on queries (spec.md §7, "age of last successful recompute for the queried
/// tenant").
pub struct TenantState {
    pub cache: LoopCache<SystemClock>,
    pub quotas: TenantQuotas,
    pub policy: DiscoveryPolicy,
    last_successful_recompute_millis: AtomicU64,
}

impl TenantState {
    fn new(quotas: TenantQuotas, policy: DiscoveryPolicy) -> Self {
        Self {
            cache: LoopCache::new(quotas.max_loops_cached, SystemClock),
            quotas,
            policy,
            last_successful_recompute_millis: AtomicU64::new(0),
        }
    }

    pub fn record_successful_recompute(&self, clock: &impl Clock) {
        self.last_successful_recompute_millis
            .store(clock.now_millis(), Ordering::Release);
    }

    pub fn last_successful_recompute_millis(&self) -> u64 {
        self.last_successful_recompute_millis.load(Ordering::Acquire)
    }
}

#[derive(Default)]
pub struct TenantIsolationLayer {
    tenants: DashMap<TenantId, Arc<TenantState>>,
}

impl TenantIsolationLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tenant's state, registering it from `registry` on first use.
    pub async fn state(
        &self,
        tenant_id: &TenantId,
        registry: &impl TenantRegistry,
    ) -> Result<Arc<TenantState>, ServiceError> {
        if let Some(existing) = self.tenants.get(tenant_id) {
            return Ok(existing.clone());
        }

        let quotas = registry
            .quotas(tenant_id)
            .await
            .map_err(|error| ServiceError::Registry(Box::new(error)))?;
        let policy = registry
            .discovery_policy(tenant_id)
            .await
            .map_err(|error| ServiceError::Registry(Box::new(error)))?;

        let state = Arc::new(TenantState::new(quotas, policy));
        Ok(self
            .tenants
            .entry(tenant_id.clone())
            .or_insert_with(|| state)
            .clone())
    }

    /// Drops all state for a tenant (spec.md §3, "Lifecycles").
    pub fn teardown(&self, tenant_id: &TenantId) {
        self.tenants.remove(tenant_id);
    }

    /// Actively sweeps every registered tenant's Loop Cache for TTL-expired entries. Called
    /// periodically from the composition root rather than per-tenant, since tenants are
    /// registered lazily and there is no per-tenant background task to hang this off of.
    pub fn sweep_expired(&self) -> usize {
        self.tenants
            .iter()
            .map(|entry| entry.value().cache.sweep_expired())
            .sum()
    }
}
