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

use thiserror::Error;

// No `TenantMismatch` variant: a `GraphDelta` carries exactly one `tenant_id`, and each tenant's
// `GraphData` is partitioned into its own slot in `GraphStore`'s `DashMap<TenantId, TenantSlot>`
// (store.rs), so there is never a second tenant in scope for an id to be checked against. See
// SPEC_FULL.md's error handling section for the full reasoning.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphStoreError {
    #[error("delta is invalid: {0}")]
    InvalidDelta(String),

    #[error("concurrent deltas target the same (wallet, item) differently; retry on current snapshot")]
    ConsistencyConflict,

    #[error("writer lock could not be acquired within the caller's deadline")]
    Timeout,
}
