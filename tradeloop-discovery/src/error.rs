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

/// Internal-only: enumeration never surfaces an error to a query caller (spec.md §7, "Budget").
/// A budget exhaustion degrades to a partial result plus a continuation token.
#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("enumeration time budget exhausted with {loops_found} loop(s) found so far")]
    BudgetExhausted { loops_found: usize },
}
