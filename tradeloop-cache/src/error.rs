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
use tradeloop_common::error::BoxError;

#[derive(Debug, Error)]
pub enum LoopCacheError {
    /// The builder passed to `get_or_build` failed; the slot is not poisoned, the next caller
    /// may retry (spec.md §4.5).
    #[error("loop builder failed: {0}")]
    BuilderFailed(#[source] BoxError),

    #[error("pagination cursor is malformed")]
    InvalidCursor,
}
