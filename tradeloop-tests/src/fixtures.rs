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

//! A running [`TradeService`] plus its Background Discovery Scheduler, wired the way
//! `tradeloop-standalone` wires them, but with a debounce short enough that scenario tests
//! converge in milliseconds rather than the default quarter second.

use std::future::Future;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tradeloop_common::domain::{CollectionId, InMemoryBus, ItemId, TenantId, WalletId};
use tradeloop_service::{Config, StaticTenantRegistry, TenantQuotas, TradeService, UniformValuerProvider, application};

type ServiceUnderTest = TradeService<InMemoryBus, StaticTenantRegistry, UniformValuerProvider>;

pub fn tenant(s: &str) -> TenantId {
    TenantId::try_from(s).unwrap()
}

pub fn wallet(s: &str) -> WalletId {
    WalletId::try_from(s).unwrap()
}

pub fn item(s: &str) -> ItemId {
    ItemId::try_from(s).unwrap()
}

pub fn collection(s: &str) -> CollectionId {
    CollectionId::try_from(s).unwrap()
}

/// A debounce/poll/deadline tuning fast enough for tests to converge well under a second.
pub fn fast_config() -> Config {
    Config {
        scheduler_config: tradeloop_scheduler::Config {
            debounce: Duration::from_millis(5),
            poll_delay: Duration::from_millis(5),
            recompute_deadline: Duration::from_millis(200),
            ..tradeloop_scheduler::Config::default()
        },
        ..Config::default()
    }
}

/// A running service plus its scheduler task. The scheduler is aborted on drop, mirroring how
/// the workspace's other harness tests tear down `tokio::spawn`ed background loops.
pub struct Harness {
    pub service: ServiceUnderTest,
    scheduler: JoinHandle<anyhow::Result<()>>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_quotas(TenantQuotas::default()).await
    }

    pub async fn with_quotas(quotas: TenantQuotas) -> Self {
        let sigterm = signal(SignalKind::terminate()).expect("register SIGTERM handler");
        let bus = InMemoryBus::new(256);
        let registry = StaticTenantRegistry::new(quotas);

        let (service, scheduler_task) = application::build(fast_config(), bus, registry, UniformValuerProvider, sigterm);
        let scheduler = tokio::spawn(scheduler_task);

        Self { service, scheduler }
    }

    /// Polls `condition` until it holds or `timeout` elapses, for waiting on the scheduler's
    /// asynchronous convergence without a fixed sleep.
    pub async fn wait_until<F, Fut>(&self, timeout: Duration, mut condition: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if condition().await {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.scheduler.abort();
    }
}
