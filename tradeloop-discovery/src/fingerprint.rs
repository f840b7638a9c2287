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

//! Rotation-invariant, direction-sensitive loop identifiers (spec.md §4.2).

use sha2::{Digest, Sha256};
use tradeloop_common::domain::{LoopFingerprint, LoopStep};

/// Computes the canonical [`LoopFingerprint`] for an ordered step sequence. Two step sequences
/// that are rotations of one another hash identically; the reversed-direction sequence hashes
/// differently, since barter direction matters (spec.md §3, invariant 5).
pub fn fingerprint(steps: &[LoopStep]) -> LoopFingerprint {
    let canonical = canonicalize(steps);

    let mut hasher = Sha256::new();
    for step in &canonical {
        write_len_prefixed(&mut hasher, step.from_wallet_id.as_str().as_bytes());
        write_len_prefixed(&mut hasher, step.to_wallet_id.as_str().as_bytes());

        let mut item_ids: Vec<&str> = step.items.iter().map(|item| item.id.as_str()).collect();
        item_ids.sort_unstable();
        hasher.update((item_ids.len() as u32).to_le_bytes());
        for id in item_ids {
            write_len_prefixed(&mut hasher, id.as_bytes());
        }
    }

    LoopFingerprint(hasher.finalize().into())
}

fn write_len_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u32).to_le_bytes());
    hasher.update(bytes);
}

/// Rotates `steps` so it starts from the lex-smallest `from_wallet_id`; among rotations tied on
/// that first wallet (impossible in a well-formed loop, since a wallet appears once as sender,
/// but checked defensively), picks the one whose serialized form is lex-smallest.
fn canonicalize(steps: &[LoopStep]) -> Vec<LoopStep> {
    let len = steps.len();
    if len == 0 {
        return Vec::new();
    }

    let min_from = steps
        .iter()
        .map(|step| step.from_wallet_id.as_str())
        .min()
        .expect("non-empty loop");

    let mut best: Option<Vec<LoopStep>> = None;
    for start in 0..len {
        if steps[start].from_wallet_id.as_str() != min_from {
            continue;
        }

        let rotated: Vec<LoopStep> = (0..len).map(|offset| steps[(start + offset) % len].clone()).collect();

        match &best {
            Some(current) if serialized_key(current) <= serialized_key(&rotated) => {}
            _ => best = Some(rotated),
        }
    }

    best.expect("at least one rotation starts at the lex-smallest wallet")
}

fn serialized_key(steps: &[LoopStep]) -> Vec<u8> {
    let mut key = Vec::new();
    for step in steps {
        key.extend_from_slice(step.from_wallet_id.as_str().as_bytes());
        key.push(0);
        key.extend_from_slice(step.to_wallet_id.as_str().as_bytes());
        key.push(0);
    }
    key
}
