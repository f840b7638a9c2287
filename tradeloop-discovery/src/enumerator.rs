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

//! Bounded directed-cycle search over a [`GraphSnapshot`] (spec.md §4.3): Tarjan SCC pruning
//! followed by a perturbation-seeded, elementary-circuit search restricted to each non-trivial
//! SCC, with item-choice expansion at every edge traversed.

use crate::fingerprint;
use fastrace::trace;
use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tradeloop_common::domain::{ItemId, ItemRef, LoopFingerprint, LoopStep, WalletId};
use tradeloop_graph::GraphSnapshot;

/// Default max cycle length considered, per spec.md §4.3.
pub const DEFAULT_MAX_LOOP_LEN: usize = 10;

/// Hard ceiling no tenant configuration may exceed, per spec.md §4.3.
pub const HARD_CAP_MAX_LOOP_LEN: usize = 20;

/// Maximum number of concrete item-assignment combinations expanded per abstract wallet cycle,
/// to keep the item-choice multiplier (spec.md §4.3, adaptation 3) from exploding combinatorially
/// on densely-wanted items.
const MAX_ITEM_COMBINATIONS_PER_CYCLE: usize = 32;

#[derive(Debug, Clone)]
pub struct EnumerationLimits {
    pub max_loop_len: usize,
    pub max_loops_per_call: usize,
    pub max_time_budget: Duration,
    pub collection_expansion_cap: usize,
}

impl Default for EnumerationLimits {
    fn default() -> Self {
        Self {
            max_loop_len: DEFAULT_MAX_LOOP_LEN,
            max_loops_per_call: 1_000,
            max_time_budget: Duration::from_millis(50),
            collection_expansion_cap: 64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CandidateLoop {
    pub fingerprint: LoopFingerprint,
    pub steps: Vec<LoopStep>,
}

/// Opaque resumption point for a budget-exhausted enumeration (spec.md §4.3, `BudgetExhausted`).
/// Coarser-grained than a literal frame-by-frame Johnson stack snapshot: it resumes at the next
/// not-yet-started (SCC, seed) pair rather than mid-DFS, trading a little redundant work at the
/// boundary for a continuation token simple enough to hand across a recompute task.
#[derive(Debug, Clone)]
pub struct ContinuationToken {
    next_scc_index: usize,
    next_seed_index: usize,
}

#[derive(Debug)]
pub enum EnumerationOutcome {
    Complete(Vec<CandidateLoop>),
    Partial {
        candidates: Vec<CandidateLoop>,
        continuation: ContinuationToken,
    },
}

/// Runs enumeration seeded from `seeds` (spec.md §4.3). Pass `snapshot.all_wallets()` for a full
/// rescan.
pub fn enumerate(
    snapshot: &GraphSnapshot,
    seeds: &HashSet<WalletId>,
    limits: &EnumerationLimits,
) -> EnumerationOutcome {
    enumerate_from(snapshot, seeds, limits, None)
}

/// Resumes a `Partial` enumeration using its continuation token.
pub fn resume(
    snapshot: &GraphSnapshot,
    seeds: &HashSet<WalletId>,
    limits: &EnumerationLimits,
    continuation: ContinuationToken,
) -> EnumerationOutcome {
    enumerate_from(snapshot, seeds, limits, Some(continuation))
}

#[trace]
fn enumerate_from(
    snapshot: &GraphSnapshot,
    seeds: &HashSet<WalletId>,
    limits: &EnumerationLimits,
    resume_from: Option<ContinuationToken>,
) -> EnumerationOutcome {
    let max_loop_len = limits.max_loop_len.min(HARD_CAP_MAX_LOOP_LEN);
    let deadline = Instant::now() + limits.max_time_budget;

    let universe = snapshot.all_wallets();
    let mut graph = DiGraph::<WalletId, ()>::new();
    let mut index_of = HashMap::new();
    for wallet in &universe {
        index_of.insert(wallet.clone(), graph.add_node(wallet.clone()));
    }
    for wallet in &universe {
        let from_idx = index_of[wallet];
        for neighbor in snapshot.neighbors_out(wallet) {
            if let Some(&to_idx) = index_of.get(&neighbor) {
                graph.add_edge(from_idx, to_idx, ());
            }
        }
    }

    // Discard singleton SCCs: no cycle is possible within them (spec.md §4.3, adaptation 1).
    let mut sccs: Vec<Vec<WalletId>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| {
            let mut members: Vec<WalletId> = scc.into_iter().map(|idx| graph[idx].clone()).collect();
            members.sort();
            members
        })
        .collect();
    sccs.sort();

    let mut candidates = Vec::new();
    let mut seen = HashSet::new();

    let (start_scc, start_seed) = resume_from
        .map(|token| (token.next_scc_index, token.next_seed_index))
        .unwrap_or((0, 0));

    for (scc_index, members) in sccs.iter().enumerate().skip(start_scc) {
        let scc_seeds: Vec<WalletId> = members.iter().filter(|w| seeds.contains(*w)).cloned().collect();
        let seed_start = if scc_index == start_scc { start_seed } else { 0 };

        let order: HashMap<&WalletId, usize> =
            members.iter().enumerate().map(|(i, w)| (w, i)).collect();

        for (seed_index, seed) in scc_seeds.iter().enumerate().skip(seed_start) {
            if Instant::now() >= deadline || candidates.len() >= limits.max_loops_per_call {
                metrics::counter!("tradeloop_discovery_budget_exhausted_total").increment(1);
                return EnumerationOutcome::Partial {
                    candidates,
                    continuation: ContinuationToken {
                        next_scc_index: scc_index,
                        next_seed_index: seed_index,
                    },
                };
            }

            let mut path = vec![seed.clone()];
            let mut on_path: HashSet<WalletId> = [seed.clone()].into_iter().collect();
            let exhausted = dfs_extend(
                snapshot,
                seed,
                &order[seed],
                &order,
                max_loop_len,
                deadline,
                &mut path,
                &mut on_path,
                limits,
                &mut candidates,
                &mut seen,
            );

            if exhausted {
                metrics::counter!("tradeloop_discovery_budget_exhausted_total").increment(1);
                return EnumerationOutcome::Partial {
                    candidates,
                    continuation: ContinuationToken {
                        next_scc_index: scc_index,
                        next_seed_index: seed_index + 1,
                    },
                };
            }
        }
    }

    metrics::counter!("tradeloop_discovery_loops_found_total").increment(candidates.len() as u64);
    EnumerationOutcome::Complete(candidates)
}

#[allow(clippy::too_many_arguments)]
fn dfs_extend(
    snapshot: &GraphSnapshot,
    start: &WalletId,
    start_order: &usize,
    order: &HashMap<&WalletId, usize>,
    max_loop_len: usize,
    deadline: Instant,
    path: &mut Vec<WalletId>,
    on_path: &mut HashSet<WalletId>,
    limits: &EnumerationLimits,
    candidates: &mut Vec<CandidateLoop>,
    seen: &mut HashSet<LoopFingerprint>,
) -> bool {
    if Instant::now() >= deadline || candidates.len() >= limits.max_loops_per_call {
        return true;
    }

    let current = path.last().expect("path is never empty").clone();
    let mut neighbors: Vec<WalletId> = snapshot.neighbors_out(&current).into_iter().collect();
    neighbors.sort();

    for neighbor in neighbors {
        let Some(&neighbor_order) = order.get(&neighbor) else {
            continue;
        };
        // Johnson-style restriction: only consider vertices at or after the start's position in
        // this SCC's fixed order, so each elementary circuit is attributed to exactly one start.
        if neighbor_order < *start_order {
            continue;
        }

        if &neighbor == start {
            if path.len() >= 2 {
                emit_candidates(snapshot, path, limits, candidates, seen);
            }
            continue;
        }

        if on_path.contains(&neighbor) || path.len() >= max_loop_len {
            continue;
        }

        path.push(neighbor.clone());
        on_path.insert(neighbor.clone());

        let exhausted = dfs_extend(
            snapshot,
            start,
            start_order,
            order,
            max_loop_len,
            deadline,
            path,
            on_path,
            limits,
            candidates,
            seen,
        );

        on_path.remove(&neighbor);
        path.pop();

        if exhausted {
            return true;
        }
    }

    false
}

/// Expands an abstract wallet cycle into concrete candidate loops: one per combination of item
/// choices across its edges (spec.md §4.3, adaptation 3), bounded to keep the multiplier finite.
fn emit_candidates(
    snapshot: &GraphSnapshot,
    wallet_path: &[WalletId],
    limits: &EnumerationLimits,
    candidates: &mut Vec<CandidateLoop>,
    seen: &mut HashSet<LoopFingerprint>,
) {
    let n = wallet_path.len();
    let mut choices_per_edge = Vec::with_capacity(n);
    for i in 0..n {
        let wanter = &wallet_path[i];
        let owner = &wallet_path[(i + 1) % n];
        let choices = snapshot.items_justifying(owner, wanter, limits.collection_expansion_cap);
        if choices.is_empty() {
            return;
        }
        choices_per_edge.push(choices);
    }

    for combo in bounded_cartesian_product(&choices_per_edge, MAX_ITEM_COMBINATIONS_PER_CYCLE) {
        if candidates.len() >= limits.max_loops_per_call {
            return;
        }

        let mut steps = Vec::with_capacity(n);
        for i in 0..n {
            let wanter = &wallet_path[i];
            let owner = &wallet_path[(i + 1) % n];
            let item_id = combo[i].clone();
            let collection_id = snapshot.collection_of(&item_id);
            steps.push(LoopStep {
                from_wallet_id: owner.clone(),
                to_wallet_id: wanter.clone(),
                items: vec![ItemRef {
                    id: item_id,
                    collection_id,
                }],
            });
        }

        let fp = fingerprint::fingerprint(&steps);
        if seen.insert(fp) {
            candidates.push(CandidateLoop { fingerprint: fp, steps });
        }
    }
}

fn bounded_cartesian_product(choices_per_edge: &[Vec<ItemId>], cap: usize) -> Vec<Vec<ItemId>> {
    let mut combos = vec![Vec::new()];
    for choices in choices_per_edge {
        let mut next = Vec::new();
        'outer: for combo in &combos {
            for choice in choices {
                let mut extended = combo.clone();
                extended.push(choice.clone());
                next.push(extended);
                if next.len() >= cap {
                    break 'outer;
                }
            }
        }
        combos = next;
        if combos.len() >= cap {
            combos.truncate(cap);
        }
    }
    combos
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeloop_common::domain::{GraphDelta, InventoryMode, ItemSubmission};
    use tradeloop_graph::GraphStore;

    fn tenant(s: &str) -> tradeloop_common::domain::TenantId {
        tradeloop_common::domain::TenantId::try_from(s).unwrap()
    }
    fn wallet(s: &str) -> WalletId {
        WalletId::try_from(s).unwrap()
    }
    fn item(s: &str) -> ItemId {
        ItemId::try_from(s).unwrap()
    }

    async fn two_wallet_swap_store() -> (GraphStore, tradeloop_common::domain::TenantId) {
        let store = GraphStore::new();
        let t1 = tenant("t1");

        store
            .apply_delta(GraphDelta::InventorySubmission {
                tenant_id: t1.clone(),
                wallet_id: wallet("a"),
                items: vec![ItemSubmission { id: item("x"), collection_id: None }],
                mode: InventoryMode::Merge,
            })
            .await
            .unwrap();
        store
            .apply_delta(GraphDelta::InventorySubmission {
                tenant_id: t1.clone(),
                wallet_id: wallet("b"),
                items: vec![ItemSubmission { id: item("y"), collection_id: None }],
                mode: InventoryMode::Merge,
            })
            .await
            .unwrap();
        store
            .apply_delta(GraphDelta::WantsSubmission {
                tenant_id: t1.clone(),
                wallet_id: wallet("a"),
                specific_item_ids: vec![item("y")],
                collection_ids: vec![],
            })
            .await
            .unwrap();
        store
            .apply_delta(GraphDelta::WantsSubmission {
                tenant_id: t1.clone(),
                wallet_id: wallet("b"),
                specific_item_ids: vec![item("x")],
                collection_ids: vec![],
            })
            .await
            .unwrap();

        (store, t1)
    }

    #[tokio::test]
    async fn direct_two_way_swap_is_found_exactly_once() {
        let (store, t1) = two_wallet_swap_store().await;
        let snapshot = store.snapshot(&t1);
        let seeds: HashSet<WalletId> = [wallet("a"), wallet("b")].into_iter().collect();

        let outcome = enumerate(&snapshot, &seeds, &EnumerationLimits::default());
        let EnumerationOutcome::Complete(candidates) = outcome else {
            panic!("expected a complete enumeration");
        };

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].steps.len(), 2);
    }

    #[tokio::test]
    async fn no_cycle_exists_without_reciprocal_wants() {
        let store = GraphStore::new();
        let t1 = tenant("t1");
        store
            .apply_delta(GraphDelta::WantsSubmission {
                tenant_id: t1.clone(),
                wallet_id: wallet("a"),
                specific_item_ids: vec![item("y")],
                collection_ids: vec![],
            })
            .await
            .unwrap();

        let snapshot = store.snapshot(&t1);
        let seeds: HashSet<WalletId> = [wallet("a")].into_iter().collect();
        let outcome = enumerate(&snapshot, &seeds, &EnumerationLimits::default());

        assert!(matches!(outcome, EnumerationOutcome::Complete(c) if c.is_empty()));
    }

    /// Builds a store where wallet `i` owns `item{i}` and, for each `(i, j)` pair marked `true`
    /// in `edges`, wants `item{j}` (so a reciprocal pair of `true` marks is a two-way swap edge
    /// pair, and a ring of them is an elementary cycle).
    async fn random_want_graph(n: usize, edges: &[bool]) -> (GraphStore, tradeloop_common::domain::TenantId) {
        let store = GraphStore::new();
        let t1 = tenant("t1");

        for i in 0..n {
            store
                .apply_delta(GraphDelta::InventorySubmission {
                    tenant_id: t1.clone(),
                    wallet_id: wallet(&format!("w{i}")),
                    items: vec![ItemSubmission { id: item(&format!("item{i}")), collection_id: None }],
                    mode: InventoryMode::Merge,
                })
                .await
                .unwrap();
        }

        for i in 0..n {
            let wants: Vec<ItemId> = (0..n)
                .filter(|&j| j != i && edges[i * n + j])
                .map(|j| item(&format!("item{j}")))
                .collect();
            if !wants.is_empty() {
                store
                    .apply_delta(GraphDelta::WantsSubmission {
                        tenant_id: t1.clone(),
                        wallet_id: wallet(&format!("w{i}")),
                        specific_item_ids: wants,
                        collection_ids: vec![],
                    })
                    .await
                    .unwrap();
            }
        }

        (store, t1)
    }

    proptest::proptest! {
        /// spec.md §8 soundness: every candidate loop is a closed chain over wallets that
        /// actually own and want the items it proposes, at the snapshot the enumeration ran
        /// against.
        #[test]
        fn every_candidate_is_a_closed_chain_of_real_ownership_and_wants(
            n in 2usize..5,
            edges in proptest::collection::vec(proptest::bool::ANY, 16),
        ) {
            tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
                let (store, t1) = random_want_graph(n, &edges).await;
                let snapshot = store.snapshot(&t1);
                let seeds = snapshot.all_wallets();

                let outcome = enumerate(&snapshot, &seeds, &EnumerationLimits::default());
                let candidates = match outcome {
                    EnumerationOutcome::Complete(candidates) => candidates,
                    EnumerationOutcome::Partial { candidates, .. } => candidates,
                };

                for candidate in &candidates {
                    let steps = &candidate.steps;
                    proptest::prop_assert!(steps.len() >= 2);

                    for (index, step) in steps.iter().enumerate() {
                        let next = &steps[(index + 1) % steps.len()];
                        proptest::prop_assert_eq!(&step.to_wallet_id, &next.from_wallet_id);

                        for item_ref in &step.items {
                            proptest::prop_assert_eq!(snapshot.owner_of(&item_ref.id), Some(&step.from_wallet_id));
                            let justifies = snapshot
                                .items_justifying(&step.from_wallet_id, &step.to_wallet_id, 64)
                                .contains(&item_ref.id);
                            proptest::prop_assert!(justifies);
                        }
                    }
                }
                Ok(())
            })?;
        }
    }
}
