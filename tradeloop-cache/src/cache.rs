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

//! Fingerprint-keyed cache of [`CachedLoop`]s (spec.md §4.5), single-flighted per fingerprint the
//! same way `wallet-indexer` single-flights per-wallet indexing work: a `DashMap<Key,
//! Arc<Semaphore>>` where the semaphore has exactly one permit.

use crate::error::LoopCacheError;
use crate::pagination::{self, CursorPosition};
use dashmap::DashMap;
use fastrace::trace;
use log::debug;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tradeloop_common::domain::{CachedLoop, Clock, CollectionId, ItemId, LoopFingerprint, LoopStatus, WalletId};

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub wallet_id: Option<WalletId>,
    pub item_id: Option<ItemId>,
    pub collection_id: Option<CollectionId>,
    pub min_score: Option<f64>,
    pub limit: usize,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<CachedLoop>,
    pub next_cursor: Option<String>,
}

/// A single tenant's loop cache. One instance per tenant (spec.md §4.8, Tenant Isolation Layer).
pub struct LoopCache<C: Clock> {
    entries: DashMap<LoopFingerprint, CachedLoop>,
    last_access_millis: DashMap<LoopFingerprint, u64>,
    inflight: DashMap<LoopFingerprint, Arc<Semaphore>>,
    /// Gates multi-key visibility: [`LoopCache::store_batch`] holds the write side for its whole
    /// batch, [`LoopCache::list`] holds the read side for its whole scan, so a lister sees every
    /// entry from a batch or none of them, never a subset (spec.md §4.6, "Loop Cache updates from
    /// a recompute are applied as a single batch"). `DashMap` only guarantees atomicity per key,
    /// not across a batch, hence this separate gate.
    batch_gate: RwLock<()>,
    max_entries: usize,
    clock: C,
}

impl<C: Clock> LoopCache<C> {
    pub fn new(max_entries: usize, clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            last_access_millis: DashMap::new(),
            inflight: DashMap::new(),
            batch_gate: RwLock::new(()),
            max_entries,
            clock,
        }
    }

    /// Returns the fresh cached loop for `fingerprint`, or runs `builder` exactly once across all
    /// concurrent callers for that fingerprint (spec.md §4.5, §8 scenario 6). A failed builder
    /// does not poison the slot: the next caller may retry.
    #[trace]
    pub async fn get_or_build<F, Fut>(
        &self,
        fingerprint: LoopFingerprint,
        builder: F,
    ) -> Result<CachedLoop, LoopCacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedLoop, LoopCacheError>>,
    {
        if let Some(cached) = self.fresh_hit(&fingerprint) {
            metrics::counter!("tradeloop_cache_hits_total").increment(1);
            return Ok(cached);
        }

        let semaphore = self
            .inflight
            .entry(fingerprint)
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone();
        let _permit = semaphore
            .acquire()
            .await
            .expect("single-flight semaphore is never closed");

        if let Some(cached) = self.fresh_hit(&fingerprint) {
            metrics::counter!("tradeloop_cache_single_flight_joined_total").increment(1);
            self.inflight.remove(&fingerprint);
            return Ok(cached);
        }

        metrics::counter!("tradeloop_cache_misses_total").increment(1);
        let result = builder().await;
        self.inflight.remove(&fingerprint);

        if let Ok(cached) = &result {
            self.store(cached.clone());
        }

        result
    }

    fn fresh_hit(&self, fingerprint: &LoopFingerprint) -> Option<CachedLoop> {
        let entry = self.entries.get(fingerprint)?;
        if entry.status != LoopStatus::Fresh || entry.is_expired(self.clock.now_millis()) {
            return None;
        }
        let cached = entry.clone();
        drop(entry);
        self.last_access_millis
            .insert(*fingerprint, self.clock.now_millis());
        Some(cached)
    }

    /// Inserts a freshly-computed loop, e.g. on enumeration emission (spec.md §4.5, `store`).
    pub fn store(&self, cached: CachedLoop) {
        self.store_batch(vec![cached]);
    }

    /// Applies every `CachedLoop` of one recompute as a single atomic step (spec.md §4.6, "Loop
    /// Cache updates from a recompute are applied as a single batch after enumeration completes;
    /// readers either see the pre-batch or post-batch state of the cache, never a partial mixture
    /// for that recompute"). Held under [`LoopCache::batch_gate`]'s write side for the whole
    /// insert so a concurrent [`LoopCache::list`] can never observe some but not all of `batch`.
    pub fn store_batch(&self, batch: Vec<CachedLoop>) {
        if batch.is_empty() {
            return;
        }

        let _gate = self.batch_gate.write();
        let now = self.clock.now_millis();
        for cached in batch {
            let fingerprint = cached.fingerprint;
            self.entries.insert(fingerprint, cached);
            self.last_access_millis.insert(fingerprint, now);
        }
        self.evict_over_capacity();
    }

    /// Removes every cached loop matching `predicate`, returning their fingerprints (spec.md
    /// §4.5, `invalidate`).
    pub fn invalidate(&self, predicate: impl Fn(&CachedLoop) -> bool) -> Vec<LoopFingerprint> {
        let matching: Vec<LoopFingerprint> = self
            .entries
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| *entry.key())
            .collect();

        for fingerprint in &matching {
            self.entries.remove(fingerprint);
            self.last_access_millis.remove(fingerprint);
        }

        matching
    }

    /// Invalidates every cached loop whose step set references any of `changes` (spec.md §4.5,
    /// "Invalidation is immediate on ownership change").
    pub fn invalidate_ownership_changes(&self, changes: &[(WalletId, ItemId)]) -> Vec<LoopFingerprint> {
        self.invalidate(|cached| {
            cached.trade_loop.steps.iter().any(|step| {
                step.items.iter().any(|item| {
                    changes
                        .iter()
                        .any(|(wallet_id, item_id)| item.id == *item_id && step.from_wallet_id == *wallet_id)
                })
            })
        })
    }

    /// Bounded, paginated query (spec.md §4.5, `list`).
    pub fn list(&self, filter: &ListFilter) -> Result<Page, LoopCacheError> {
        let after = filter
            .cursor
            .as_deref()
            .map(pagination::decode)
            .transpose()?;

        let mut matching: Vec<CachedLoop> = {
            let _gate = self.batch_gate.read();
            self.entries
                .iter()
                .map(|entry| entry.value().clone())
                .filter(|cached| cached.status == LoopStatus::Fresh)
                .filter(|cached| {
                    filter
                        .wallet_id
                        .as_ref()
                        .is_none_or(|w| cached.trade_loop.participants().any(|p| p == w))
                })
                .filter(|cached| {
                    filter
                        .item_id
                        .as_ref()
                        .is_none_or(|i| cached.trade_loop.items().any(|item| item.id == *i))
                })
                .filter(|cached| {
                    filter.collection_id.as_ref().is_none_or(|c| {
                        cached
                            .trade_loop
                            .items()
                            .any(|item| item.collection_id.as_ref() == Some(c))
                    })
                })
                .filter(|cached| filter.min_score.is_none_or(|min| cached.score >= min))
                .collect()
        };

        matching.sort_by(|a, b| {
            (a.created_at_millis, a.fingerprint.0).cmp(&(b.created_at_millis, b.fingerprint.0))
        });

        if let Some(after) = after {
            matching.retain(|cached| {
                (cached.created_at_millis, hex::encode(cached.fingerprint.0))
                    > (after.created_at_millis, after.fingerprint_hex.clone())
            });
        }

        let limit = filter.limit.max(1);
        let next_cursor = if matching.len() > limit {
            matching.get(limit - 1).map(|last_included| {
                pagination::encode(&CursorPosition {
                    created_at_millis: last_included.created_at_millis,
                    fingerprint_hex: hex::encode(last_included.fingerprint.0),
                })
            })
        } else {
            None
        };
        matching.truncate(limit);

        Ok(Page {
            items: matching,
            next_cursor,
        })
    }

    /// Actively drops every entry whose TTL has elapsed, rather than waiting for the next
    /// [`LoopCache::get_or_build`] read to discover it lazily (spec.md §4.5, "Eviction policy.
    /// TTL ... plus LRU cap"). Returns the number of entries removed, mirroring the teacher's
    /// convention of returning a count from housekeeping passes for the caller to log.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let expired: Vec<LoopFingerprint> = self
            .entries
            .iter()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| *entry.key())
            .collect();

        for fingerprint in &expired {
            self.entries.remove(fingerprint);
            self.last_access_millis.remove(fingerprint);
        }

        if !expired.is_empty() {
            debug!(removed = expired.len(); "loop cache ttl sweep removed expired entries");
        }

        expired.len()
    }

    fn evict_over_capacity(&self) {
        if self.entries.len() <= self.max_entries {
            return;
        }

        let mut by_access: Vec<(LoopFingerprint, u64)> = self
            .last_access_millis
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        by_access.sort_by_key(|(_, last_access)| *last_access);

        let overflow = self.entries.len() - self.max_entries;
        for (fingerprint, _) in by_access.into_iter().take(overflow) {
            self.entries.remove(&fingerprint);
            self.last_access_millis.remove(&fingerprint);
        }
    }
}
