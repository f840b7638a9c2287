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

//! Deterministic, side-effect-free scoring and policy filtering (spec.md §4.4). The weighting
//! formula between length penalty and fairness is left to configuration (spec.md §9, open
//! question on multiplicative vs. additive composition): this module fixes the interface and
//! composes both terms additively, each independently weighted.

use tradeloop_common::domain::{CollectionId, LoopStep, TradeLoop};

/// Caller-supplied, non-negative valuation for an item; injected so the scorer itself stays pure
/// and tenant-agnostic (spec.md §4.4).
pub trait ItemValuer
where
    Self: Send + Sync,
{
    fn value_of(&self, item: &tradeloop_common::domain::ItemId) -> f64;
}

/// Always returns `1.0`, making fairness degrade to pure length-based scoring. Useful for tenants
/// that have not configured a valuer yet, and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformValuer;

impl ItemValuer for UniformValuer {
    fn value_of(&self, _item: &tradeloop_common::domain::ItemId) -> f64 {
        1.0
    }
}

#[derive(Debug, Clone)]
pub struct ScoringPolicy {
    /// Weight in `[0, 1]` applied to the length penalty term.
    pub length_weight: f64,
    /// Weight in `[0, 1]` applied to the fairness (value-dispersion) term.
    pub fairness_weight: f64,
    /// Loops below this score are discarded (spec.md §6, `min_score`).
    pub min_score: f64,
    /// Collections denied outright for this tenant; any loop touching one is rejected regardless
    /// of score.
    pub denied_collections: Vec<CollectionId>,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            length_weight: 0.5,
            fairness_weight: 0.5,
            min_score: 0.0,
            denied_collections: Vec::new(),
        }
    }
}

/// Scores `trade_loop` against `policy` using `valuer` for per-item values. Pure: does not mutate
/// shared state and is deterministic given identical inputs (spec.md §4.4).
pub fn score(trade_loop: &TradeLoop, valuer: &dyn ItemValuer, policy: &ScoringPolicy) -> f64 {
    if trade_loop.is_empty() {
        return 0.0;
    }

    let length_penalty = length_penalty(trade_loop.len());
    let fairness = fairness_score(&trade_loop.steps, valuer);

    (policy.length_weight * length_penalty + policy.fairness_weight * fairness)
        .clamp(0.0, 1.0)
}

/// Applies `policy`: returns `true` when the loop should be accepted and cached.
pub fn accepts(trade_loop: &TradeLoop, loop_score: f64, policy: &ScoringPolicy) -> bool {
    if loop_score < policy.min_score {
        return false;
    }

    !trade_loop.items().any(|item| {
        item.collection_id
            .as_ref()
            .is_some_and(|collection_id| policy.denied_collections.contains(collection_id))
    })
}

/// Shorter loops score higher; asymptotically approaches zero for very long loops.
fn length_penalty(len: usize) -> f64 {
    1.0 / len as f64
}

/// Lower dispersion among per-step item values scores higher: a maximally fair loop gives every
/// participant comparable value.
fn fairness_score(steps: &[LoopStep], valuer: &dyn ItemValuer) -> f64 {
    let values: Vec<f64> = steps
        .iter()
        .flat_map(|step| step.items.iter())
        .map(|item| valuer.value_of(&item.id))
        .collect();

    if values.len() < 2 {
        return 1.0;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean <= 0.0 {
        return 1.0;
    }

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let coefficient_of_variation = variance.sqrt() / mean;

    (1.0 - coefficient_of_variation).clamp(0.0, 1.0)
}
