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

//! Opaque cursor tokens for `list` (spec.md §6, "Pagination: opaque cursor token"). The cursor is
//! a base64 envelope around the sort key of the last item returned, so callers cannot construct
//! or inspect one meaningfully, only pass it back.

use crate::error::LoopCacheError;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CursorPosition {
    pub created_at_millis: u64,
    pub fingerprint_hex: String,
}

pub(crate) fn encode(position: &CursorPosition) -> String {
    let json = serde_json::to_vec(position).expect("cursor position is always serializable");
    URL_SAFE_NO_PAD.encode(json)
}

pub(crate) fn decode(cursor: &str) -> Result<CursorPosition, LoopCacheError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| LoopCacheError::InvalidCursor)?;
    serde_json::from_slice(&bytes).map_err(|_| LoopCacheError::InvalidCursor)
}
