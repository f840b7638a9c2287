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

//! Per-tenant debounce/coalesce state machine (spec.md §4.6):
//! `idle -> pending (event received) -> running (worker picks up) -> (idle | pending)`.
//!
//! A newer delta arriving while `running` never cancels the in-flight recompute; it is recorded
//! and the queue returns to `pending` on completion so the earlier work still contributes fresh
//! loops, and a follow-up recompute picks up what arrived meanwhile.

use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tradeloop_common::domain::WalletId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueState {
    Idle,
    Pending,
    Running,
    RunningWithPending,
}

/// The perturbation accumulated for a tenant between pickups.
#[derive(Debug, Default)]
pub(crate) struct PendingWork {
    pub(crate) perturbed_wallets: HashSet<WalletId>,
    /// Set once the coalesced perturbation set exceeds its cap; the finer-grained wallet set is
    /// discarded in favor of rescanning every wallet (spec.md §4.6, "Backpressure").
    pub(crate) full_rescan: bool,
}

impl PendingWork {
    fn merge(&mut self, wallets: &HashSet<WalletId>, cap: usize) {
        if self.full_rescan {
            return;
        }
        self.perturbed_wallets.extend(wallets.iter().cloned());
        if self.perturbed_wallets.len() > cap {
            self.full_rescan = true;
            self.perturbed_wallets.clear();
        }
    }
}

struct TenantQueueInner {
    state: QueueState,
    pending: PendingWork,
    /// Earliest instant at which pending work may be picked up; pushed out by every event that
    /// arrives while still within the debounce window.
    ready_at: Instant,
}

pub(crate) struct TenantQueue {
    inner: Mutex<TenantQueueInner>,
}

impl Default for TenantQueue {
    fn default() -> Self {
        Self {
            inner: Mutex::new(TenantQueueInner {
                state: QueueState::Idle,
                pending: PendingWork::default(),
                ready_at: Instant::now(),
            }),
        }
    }
}

impl TenantQueue {
    /// Records a perturbation, coalescing it into whatever is already pending and extending the
    /// debounce window.
    pub(crate) async fn record_change(&self, wallets: &HashSet<WalletId>, cap: usize, debounce: Duration) {
        let mut inner = self.inner.lock().await;
        inner.pending.merge(wallets, cap);
        inner.ready_at = Instant::now() + debounce;
        if inner.state == QueueState::Idle {
            inner.state = QueueState::Pending;
        } else if inner.state == QueueState::Running {
            inner.state = QueueState::RunningWithPending;
        }
    }

    /// Picks up pending work if it exists and its debounce window has elapsed.
    pub(crate) async fn try_start(&self) -> Option<PendingWork> {
        let mut inner = self.inner.lock().await;
        if inner.state != QueueState::Pending || Instant::now() < inner.ready_at {
            return None;
        }
        inner.state = QueueState::Running;
        Some(std::mem::take(&mut inner.pending))
    }

    /// Marks a recompute as finished, returning to `idle` unless events coalesced in while
    /// running, in which case a fresh debounce window starts for the follow-up.
    pub(crate) async fn finish(&self, debounce: Duration) {
        let mut inner = self.inner.lock().await;
        inner.state = match inner.state {
            QueueState::RunningWithPending => {
                inner.ready_at = Instant::now() + debounce;
                QueueState::Pending
            }
            _ => QueueState::Idle,
        };
    }
}
