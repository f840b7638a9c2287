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
use std::time::Duration;

/// Top-level configuration for a composition root embedding the Persistent Trade Service,
/// mirroring `spo_api::config::Config`'s `{application, infra, telemetry}` nesting.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "scheduler", default)]
    pub scheduler_config: tradeloop_scheduler::Config,

    #[serde(rename = "telemetry", default)]
    pub telemetry_config: tradeloop_common::telemetry::Config,

    /// How often each tenant's Loop Cache is actively swept for TTL-expired entries (spec.md
    /// §4.5, "Eviction policy"), independent of the lazy expiry check on read.
    #[serde(with = "humantime_serde", default = "default_ttl_sweep_interval")]
    pub ttl_sweep_interval: Duration,
}

fn default_ttl_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler_config: tradeloop_scheduler::Config::default(),
            telemetry_config: tradeloop_common::telemetry::Config {
                tracing_config: Default::default(),
                metrics_config: Default::default(),
            },
            ttl_sweep_interval: default_ttl_sweep_interval(),
        }
    }
}
