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

use derive_more::{AsRef, Display, From};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length in bytes of any opaque id accepted at the ingestion boundary.
pub const MAX_ID_LEN: usize = 128;

macro_rules! opaque_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRef, From, Serialize, Deserialize,
        )]
        #[as_ref(str, String)]
        pub struct $name(String);

        impl $name {
            /// Construct from an already-validated string. Use [`TryFrom`] at ingestion
            /// boundaries instead when the source is untrusted.
            pub fn new_unchecked(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(id: String) -> Result<Self, Self::Error> {
                if id.is_empty() {
                    Err(IdError::Empty)
                } else if id.len() > MAX_ID_LEN {
                    Err(IdError::TooLong(id.len()))
                } else {
                    Ok(Self(id))
                }
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IdError;

            fn try_from(id: &str) -> Result<Self, Self::Error> {
                Self::try_from(id.to_owned())
            }
        }
    };
}

opaque_id!(TenantId, "Opaque, tenant-scoping identifier.");
opaque_id!(WalletId, "Opaque wallet identifier, scoped to a tenant.");
opaque_id!(ItemId, "Opaque NFT item identifier, scoped to a tenant.");
opaque_id!(
    CollectionId,
    "Opaque NFT collection identifier, scoped to a tenant."
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("id must not be empty")]
    Empty,

    #[error("id length {0} exceeds the {MAX_ID_LEN} byte limit")]
    TooLong(usize),
}

/// Rotation-invariant, direction-sensitive identifier of a concrete [`crate::domain::TradeLoop`].
///
/// A 256-bit digest, displayed as lowercase hex, mirroring the workspace's convention for
/// fixed-size hash identifiers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoopFingerprint(pub [u8; 32]);

impl fmt::Debug for LoopFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoopFingerprint({self})")
    }
}

impl fmt::Display for LoopFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
