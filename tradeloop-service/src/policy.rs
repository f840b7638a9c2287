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

//! Per-tenant discovery tuning (spec.md §6's configuration table): `max_loop_length`,
//! `min_score`, `cache_ttl_ms` and `collection_expansion_cap`, plus the scoring weights spec.md
//! §4.4 leaves open. Kept separate from [`crate::quotas::TenantQuotas`]: quotas bound resource
//! consumption, this tunes discovery behavior.

use serde::Deserialize;
use std::time::Duration;
use tradeloop_common::domain::CollectionId;
use tradeloop_discovery::enumerator::DEFAULT_MAX_LOOP_LEN;
use tradeloop_discovery::{EnumerationLimits, ScoringPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryPolicy {
    pub max_loop_length: usize,
    pub min_score: f64,
    pub collection_expansion_cap: usize,
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
    #[serde(default)]
    pub denied_collections: Vec<CollectionId>,
    pub length_weight: f64,
    pub fairness_weight: f64,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            max_loop_length: DEFAULT_MAX_LOOP_LEN,
            min_score: 0.0,
            collection_expansion_cap: 64,
            cache_ttl: Duration::from_secs(600),
            denied_collections: Vec::new(),
            length_weight: 0.5,
            fairness_weight: 0.5,
        }
    }
}

impl DiscoveryPolicy {
    pub fn enumeration_limits(&self, max_time_budget: Duration) -> EnumerationLimits {
        EnumerationLimits {
            max_loop_len: self.max_loop_length,
            max_loops_per_call: 1_000,
            max_time_budget,
            collection_expansion_cap: self.collection_expansion_cap,
        }
    }

    pub fn scoring_policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            length_weight: self.length_weight,
            fairness_weight: self.fairness_weight,
            min_score: self.min_score,
            denied_collections: self.denied_collections.clone(),
        }
    }
}
