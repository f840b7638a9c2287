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

use serde::Deserialize;
use std::num::NonZeroUsize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Coalescing window per tenant (spec.md §4.6, `debounce_ms`).
    #[serde(with = "humantime_serde", default = "default_debounce")]
    pub debounce: Duration,

    /// How often the ready-tenant cycle re-queries which tenants have pending work. Plays the
    /// role of `active_wallets_query_delay` in the teacher's indexing loop.
    #[serde(with = "humantime_serde", default = "default_poll_delay")]
    pub poll_delay: Duration,

    /// Per-recompute deadline handed to the enumerator (spec.md §5, "every recompute carries a
    /// deadline").
    #[serde(with = "humantime_serde", default = "default_recompute_deadline")]
    pub recompute_deadline: Duration,

    /// Upper bound on concurrently running recomputes across all tenants.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: NonZeroUsize,

    /// Backpressure cap: once a tenant's coalesced perturbation set would exceed this many
    /// wallets, the scheduler collapses to a full rescan (spec.md §4.6, "Backpressure").
    #[serde(default = "default_max_pending_wallets")]
    pub max_pending_wallets_per_tenant: usize,
}

fn default_debounce() -> Duration {
    Duration::from_millis(250)
}

fn default_poll_delay() -> Duration {
    Duration::from_millis(50)
}

fn default_recompute_deadline() -> Duration {
    Duration::from_millis(50)
}

fn default_concurrency_limit() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

fn default_max_pending_wallets() -> usize {
    4096
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
            poll_delay: default_poll_delay(),
            recompute_deadline: default_recompute_deadline(),
            concurrency_limit: default_concurrency_limit(),
            max_pending_wallets_per_tenant: default_max_pending_wallets(),
        }
    }
}
