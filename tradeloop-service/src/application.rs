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

//! Composition-root wiring for the Persistent Trade Service, mirroring `spo_api::application::run`
//! and `wallet_indexer::application::run`: construct collaborators, hand them to the
//! generalized `run` loop, race against SIGTERM.

use crate::collaborators::TenantRegistry;
use crate::config::Config;
use crate::executor::{DiscoveryExecutor, ValuerProvider};
use crate::service::TradeService;
use crate::tenant::TenantIsolationLayer;
use anyhow::Context;
use log::debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::Signal;
use tradeloop_common::domain::{Publisher, Subscriber};
use tradeloop_graph::GraphStore;

/// Builds a [`TradeService`] ready to accept ingestion/query calls, and a future that runs the
/// Background Discovery Scheduler until `sigterm` fires. The returned service is usable
/// immediately; the caller is expected to `tokio::spawn` the returned future (or `.await` it
/// directly if discovery is the whole process).
pub fn build<P, R, V>(
    config: Config,
    publisher: P,
    registry: R,
    valuer_provider: V,
    sigterm: Signal,
) -> (TradeService<P, R, V>, impl Future<Output = anyhow::Result<()>>)
where
    P: Publisher + Subscriber,
    R: TenantRegistry,
    V: ValuerProvider,
{
    let graph = GraphStore::new();
    let tenants = Arc::new(TenantIsolationLayer::new());

    let trade_service = TradeService::new(
        graph.clone(),
        publisher.clone(),
        tenants.clone(),
        registry.clone(),
        valuer_provider.clone(),
    );
    let executor = DiscoveryExecutor::new(graph, publisher.clone(), tenants.clone(), registry, valuer_provider);

    tokio::task::spawn(run_ttl_sweep(tenants, config.ttl_sweep_interval));

    let scheduler_task = run_scheduler(config, publisher, executor, sigterm);

    (trade_service, scheduler_task)
}

/// Housekeeping loop, detached for the life of the process: periodically drops TTL-expired Loop
/// Cache entries across every registered tenant (spec.md §4.5). Structured like the teacher's
/// `index_wallets_task`, minus a shutdown race, since this is pure cache hygiene rather than work
/// that must drain before the process exits.
async fn run_ttl_sweep(tenants: Arc<TenantIsolationLayer>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        let removed = tenants.sweep_expired();
        if removed > 0 {
            debug!(removed; "ttl sweep removed expired loop cache entries across all tenants");
        }
    }
}

async fn run_scheduler<P, E>(config: Config, subscriber: P, executor: E, sigterm: Signal) -> anyhow::Result<()>
where
    P: Subscriber,
    E: tradeloop_scheduler::RecomputeExecutor,
{
    tradeloop_scheduler::run(config.scheduler_config, subscriber, executor, sigterm)
        .await
        .context("run background discovery scheduler")
}
