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

//! Per-tenant resource limits (spec.md §4.8): "max wallets, max items, max wants, max loops
//! cached, max recompute time per task. Exceeding a quota returns `QuotaExceeded` on the
//! offending ingestion call."

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct TenantQuotas {
    pub max_wallets: usize,
    pub max_items: usize,
    pub max_wants: usize,
    pub max_loops_cached: usize,
    #[serde(with = "humantime_serde")]
    pub max_recompute_time: Duration,
}

impl Default for TenantQuotas {
    fn default() -> Self {
        Self {
            max_wallets: 10_000,
            max_items: 100_000,
            max_wants: 100_000,
            max_loops_cached: 10_000,
            max_recompute_time: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QuotaError {
    #[error("tenant has reached its wallet quota")]
    TooManyWallets,

    #[error("tenant has reached its item quota")]
    TooManyItems,

    #[error("tenant has reached its want quota")]
    TooManyWants,
}
