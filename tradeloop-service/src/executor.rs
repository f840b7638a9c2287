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

//! Wires the Graph Store, Cycle Enumerator, scorer and Loop Cache into a
//! [`tradeloop_scheduler::RecomputeExecutor`] (spec.md §4.6/§4.7): exactly the collaborator the
//! scheduler's `run` loop is generic over, the same way `tradeloop-service` wires a concrete
//! `Storage` for `wallet-indexer::application::run` in the teacher.

use crate::collaborators::TenantRegistry;
use fastrace::trace;
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tradeloop_common::domain::{Clock, DiscoveryEvent, LoopDiscovered, LoopStatus, Publisher, SystemClock, TenantId, WalletId};
use tradeloop_discovery::{CandidateLoop, EnumerationError, EnumerationOutcome, ItemValuer, enumerator, scoring};
use tradeloop_graph::GraphStore;

use crate::tenant::TenantIsolationLayer;

/// Produces the [`ItemValuer`] a tenant's loops should be scored with. Implemented per
/// integration the way [`crate::collaborators::NFTMetadataProvider`] is: the core never assumes a
/// particular valuation source.
#[trait_variant::make(Send)]
pub trait ValuerProvider
where
    Self: Clone + Send + Sync + 'static,
{
    type Valuer: ItemValuer;

    async fn valuer_for(&self, tenant_id: &TenantId) -> Self::Valuer;
}

/// Always hands back [`tradeloop_discovery::UniformValuer`], for compositions that have not wired
/// a real valuation source.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformValuerProvider;

impl ValuerProvider for UniformValuerProvider {
    type Valuer = tradeloop_discovery::UniformValuer;

    async fn valuer_for(&self, _tenant_id: &TenantId) -> Self::Valuer {
        tradeloop_discovery::UniformValuer
    }
}

#[derive(Clone)]
pub struct DiscoveryExecutor<P, R, V>
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

impl<P, R, V> DiscoveryExecutor<P, R, V>
where
    P: Publisher,
    R: TenantRegistry,
    V: ValuerProvider,
{
    pub fn new(graph: GraphStore, publisher: P, tenants: Arc<TenantIsolationLayer>, registry: R, valuer_provider: V) -> Self {
        Self { graph, publisher, tenants, registry, valuer_provider }
    }
}

impl<P, R, V> tradeloop_scheduler::RecomputeExecutor for DiscoveryExecutor<P, R, V>
where
    P: Publisher,
    R: TenantRegistry,
    V: ValuerProvider,
{
    #[trace(properties = { "tenant_id": "{tenant_id}" })]
    async fn recompute(&self, tenant_id: TenantId, seeds: HashSet<WalletId>, full_rescan: bool, deadline: Instant) {
        let state = match self.tenants.state(&tenant_id, &self.registry).await {
            Ok(state) => state,
            Err(error) => {
                warn!(tenant_id:%, error:%; "could not load tenant state for recompute");
                return;
            }
        };

        let snapshot = self.graph.snapshot(&tenant_id);
        let seeds = if full_rescan { snapshot.all_wallets() } else { seeds };

        let remaining = deadline.saturating_duration_since(Instant::now());
        let limits = state.policy.enumeration_limits(remaining);

        let outcome = enumerator::enumerate(&snapshot, &seeds, &limits);
        let candidates: Vec<CandidateLoop> = match outcome {
            EnumerationOutcome::Complete(candidates) => candidates,
            EnumerationOutcome::Partial { candidates, .. } => {
                metrics::counter!("tradeloop_recompute_budget_exhausted_total").increment(1);
                let error = EnumerationError::BudgetExhausted { loops_found: candidates.len() };
                warn!(tenant_id:%, error:%; "recompute hit its time budget before finishing");
                candidates
            }
        };

        let valuer = self.valuer_provider.valuer_for(&tenant_id).await;
        let scoring_policy = state.policy.scoring_policy();

        // Collected rather than stored/published per-candidate: `state.cache.store(...)` followed
        // by `self.publisher.publish(...).await` inside the same loop would suspend between
        // per-candidate cache writes, letting a concurrent `query_trades` observe some but not
        // all of this recompute's loops (spec.md §4.6, "applied as a single batch"). Nothing in
        // this loop body awaits, so the batch below really does land as one atomic step.
        let mut to_cache = Vec::new();
        let mut to_publish = Vec::new();
        for candidate in candidates {
            let trade_loop = tradeloop_common::domain::TradeLoop { steps: candidate.steps };
            let loop_score = scoring::score(&trade_loop, &valuer, &scoring_policy);
            if !scoring::accepts(&trade_loop, loop_score, &scoring_policy) {
                continue;
            }

            to_cache.push(tradeloop_common::domain::CachedLoop {
                fingerprint: candidate.fingerprint,
                trade_loop: trade_loop.clone(),
                score: loop_score,
                created_at_millis: SystemClock.now_millis(),
                ttl: state.policy.cache_ttl,
                status: LoopStatus::Fresh,
            });
            to_publish.push(DiscoveryEvent::LoopDiscovered(LoopDiscovered {
                tenant_id: tenant_id.clone(),
                fingerprint: candidate.fingerprint,
                trade_loop,
                score: loop_score,
            }));
        }

        let discovered = to_cache.len();
        state.cache.store_batch(to_cache);

        for event in to_publish {
            let _ = self.publisher.publish(event).await;
        }

        state.record_successful_recompute(&SystemClock);
        metrics::counter!("tradeloop_loops_discovered_total").increment(discovered as u64);
        debug!(tenant_id:%, discovered:%; "tenant recompute discovered loops");
    }
}
