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

use crate::config::Config;
use crate::queue::TenantQueue;
use anyhow::Context;
use async_stream::stream;
use dashmap::DashMap;
use fastrace::trace;
use futures::{Stream, StreamExt, TryStreamExt};
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::{select, signal::unix::Signal, sync::Semaphore, task, time::sleep};
use tradeloop_common::domain::{DiscoveryEvent, Subscriber, TenantId, WalletId};

/// Executes a single tenant's recompute pass: snapshot the graph, enumerate cycles, score, and
/// refresh the Loop Cache. Kept abstract the same way `wallet-indexer::application::run` is
/// generic over `Storage` rather than depending on a concrete database; `tradeloop-service` wires
/// a concrete implementation over the Graph Store, Discovery, and Loop Cache together.
#[trait_variant::make(Send)]
pub trait RecomputeExecutor
where
    Self: Clone + Send + Sync + 'static,
{
    /// `full_rescan` is set when the scheduler collapsed backpressure (spec.md §4.6); the
    /// executor should then seed enumeration from every wallet in the tenant's graph rather than
    /// just `seeds`.
    async fn recompute(&self, tenant_id: TenantId, seeds: HashSet<WalletId>, full_rescan: bool, deadline: Instant);
}

/// Runs the scheduler until `sigterm` fires. Mirrors `wallet-indexer::application::run`'s shape:
/// one task folding bus events into shared state, one task draining a bounded worker pool over a
/// cyclically-polled ready set, raced against shutdown.
pub async fn run(
    config: Config,
    subscriber: impl Subscriber,
    executor: impl RecomputeExecutor,
    mut sigterm: Signal,
) -> anyhow::Result<()> {
    let Config {
        debounce,
        poll_delay,
        recompute_deadline,
        concurrency_limit,
        max_pending_wallets_per_tenant,
    } = config;

    let queues: Arc<DashMap<TenantId, Arc<TenantQueue>>> = Arc::new(DashMap::new());
    let worker_by_tenant_id: Arc<DashMap<TenantId, Arc<Semaphore>>> = Arc::new(DashMap::new());

    let graph_changed_task = task::spawn({
        let queues = queues.clone();

        async move {
            subscriber
                .subscribe()
                .try_for_each(|event| {
                    let queues = queues.clone();

                    async move {
                        if let DiscoveryEvent::GraphChanged(changed) = event {
                            let queue = queues
                                .entry(changed.tenant_id.clone())
                                .or_insert_with(|| Arc::new(TenantQueue::default()))
                                .clone();

                            queue
                                .record_change(&changed.perturbed_wallets, max_pending_wallets_per_tenant, debounce)
                                .await;
                        }

                        Ok(())
                    }
                })
                .await
                .context("graph-changed subscription failed")?;

            warn!("graph_changed_task completed");

            Ok::<(), anyhow::Error>(())
        }
    });

    let recompute_task = {
        let queues = queues.clone();

        task::spawn(async move {
            ready_tenant_ids(poll_delay, &queues)
                .map(Ok::<_, std::convert::Infallible>)
                .try_for_each_concurrent(Some(concurrency_limit.get()), |tenant_id| {
                    let queues = queues.clone();
                    let worker_by_tenant_id = worker_by_tenant_id.clone();
                    let executor = executor.clone();

                    async move {
                        // One in-flight recompute per tenant (spec.md §4.6, "per-tenant
                        // concurrency cap of 1"), same single-permit-per-key idiom as the
                        // teacher's `worker_by_wallet_id`.
                        let permit = worker_by_tenant_id
                            .entry(tenant_id.clone())
                            .or_insert_with(|| Arc::new(Semaphore::new(1)))
                            .clone()
                            .try_acquire_owned();

                        if permit.is_ok() {
                            process_tenant(tenant_id, &queues, &executor, recompute_deadline).await;
                        }

                        Ok(())
                    }
                })
                .await?;

            warn!("recompute_task completed");

            Ok::<(), anyhow::Error>(())
        })
    };

    select! {
        result = graph_changed_task => result
            .context("graph_changed_task panicked")
            .and_then(|r| r.context("graph_changed_task failed")),

        result = recompute_task => result
            .context("recompute_task panicked")
            .and_then(|r| r.context("recompute_task failed")),

        _ = sigterm.recv() => {
            warn!("SIGTERM received");
            Ok(())
        }
    }
}

#[trace(properties = { "tenant_id": "{tenant_id}" })]
async fn process_tenant(
    tenant_id: TenantId,
    queues: &DashMap<TenantId, Arc<TenantQueue>>,
    executor: &impl RecomputeExecutor,
    recompute_deadline: Duration,
) {
    let Some(queue) = queues.get(&tenant_id).map(|entry| entry.clone()) else {
        return;
    };

    let Some(pending) = queue.try_start().await else {
        return;
    };

    let deadline = Instant::now() + recompute_deadline;
    executor
        .recompute(tenant_id.clone(), pending.perturbed_wallets, pending.full_rescan, deadline)
        .await;

    queue.finish(recompute_deadline).await;

    debug!(tenant_id:%; "tenant recompute finished");
}

/// Cycles over the tenants currently known to have a queue, the same shape as
/// `wallet-indexer::active_wallet_ids`: one cheap listing per repetition, then a hot re-yield of
/// that listing until `poll_delay` elapses, so newly-registered tenants are only picked up once
/// the current repetition ends.
fn ready_tenant_ids(
    poll_delay: Duration,
    queues: &Arc<DashMap<TenantId, Arc<TenantQueue>>>,
) -> impl Stream<Item = TenantId> + 'static {
    let queues = queues.clone();

    stream! {
        loop {
            let tenant_ids: Vec<TenantId> = queues.iter().map(|entry| entry.key().clone()).collect();

            if tenant_ids.is_empty() {
                sleep(poll_delay).await;
                continue;
            }

            let deadline = Instant::now() + poll_delay;

            for tenant_id in &tenant_ids {
                yield tenant_id.clone();
            }

            for tenant_id in tenant_ids.into_iter().cycle() {
                if Instant::now() > deadline {
                    break;
                }
                yield tenant_id;
            }
        }
    }
}
