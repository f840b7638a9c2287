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

pub mod application;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod executor;
pub mod policy;
pub mod quotas;
pub mod service;
pub mod tenant;

pub use collaborators::{
    BlockchainAdapter, NFTMetadataProvider, NoopBlockchainAdapter, NoopMetadataProvider, StaticTenantRegistry, TenantRegistry,
};
pub use config::Config;
pub use error::ServiceError;
pub use executor::{DiscoveryExecutor, UniformValuerProvider, ValuerProvider};
pub use policy::DiscoveryPolicy;
pub use quotas::{QuotaError, TenantQuotas};
pub use service::{SubscriptionFilter, TradeService};
pub use tenant::{TenantIsolationLayer, TenantState};
