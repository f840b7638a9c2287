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

//! The Persistent Trade Service is the only surface where errors become externally visible
//! (spec.md §7, "Propagation policy"). `Budget` and `Resource` kinds never reach here: they are
//! logged and metered inside the scheduler/enumerator.

use thiserror::Error;
use tradeloop_cache::LoopCacheError;
use tradeloop_common::error::BoxError;
use tradeloop_graph::GraphStoreError;

use crate::quotas::QuotaError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// *Validation* / *Contention* per spec.md §7: propagated straight from the Graph Store.
    #[error(transparent)]
    Graph(#[from] GraphStoreError),

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error(transparent)]
    Cache(#[from] LoopCacheError),

    #[error("tenant registry lookup failed: {0}")]
    Registry(#[source] BoxError),
}
