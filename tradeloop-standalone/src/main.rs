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

//! Consolidated binary for standalone execution (spec.md §2, "composition-root binary wiring all
//! of the above into one process"). Loads a scenario of ingestion operations, feeds them to the
//! Persistent Trade Service, lets the Background Discovery Scheduler converge, then prints the
//! discovered trade loops. There is no HTTP surface here (spec.md §1, "Out of scope: HTTP
//! routing"); this binary exists to exercise the discovery core end to end.

mod scenario;

use clap::Parser;
use log::{error, info};
use std::panic;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tradeloop_cache::ListFilter;
use tradeloop_common::config::ConfigExt;
use tradeloop_common::domain::{InMemoryBus, WalletId};
use tradeloop_common::telemetry;
use tradeloop_service::{Config, StaticTenantRegistry, TenantQuotas, UniformValuerProvider, application};

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs the tradeloop discovery engine over a scenario file")]
struct Args {
    /// Path to a JSON array of ingestion operations (see `scenario::ScenarioOp`).
    #[arg(long)]
    scenario: PathBuf,

    /// How long to wait, in milliseconds, after ingestion for the scheduler to converge before
    /// querying.
    #[arg(long, default_value_t = 1_000)]
    settle_ms: u64,

    /// Only print loops a given wallet participates in.
    #[arg(long)]
    wallet: Option<String>,

    /// Maximum number of loops to print.
    #[arg(long, default_value_t = 100)]
    limit: usize,
}

#[tokio::main]
async fn main() {
    telemetry::init_logging();
    panic::set_hook(Box::new(|panic| error!(panic:%; "process panicked")));

    if let Err(error) = run().await {
        let backtrace = error.backtrace();
        let error = format!("{error:#}");
        error!(error, backtrace:%; "process exited with ERROR");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    use anyhow::Context;

    let args = Args::parse();
    let config = Config::load().context("load configuration")?;
    info!(config:?; "starting tradeloop-standalone");

    telemetry::init_tracing(&config.telemetry_config.tracing_config);
    telemetry::init_metrics(&config.telemetry_config.metrics_config).context("install metrics exporter")?;

    let sigterm = signal(SignalKind::terminate()).context("register SIGTERM handler")?;
    let bus = InMemoryBus::new(4096);
    let registry = StaticTenantRegistry::new(TenantQuotas::default());

    let (service, scheduler_task) = application::build(config, bus, registry, UniformValuerProvider, sigterm);
    let scheduler_handle = tokio::spawn(scheduler_task);

    let raw = tokio::fs::read_to_string(&args.scenario)
        .await
        .with_context(|| format!("read scenario file {}", args.scenario.display()))?;
    let ops = scenario::parse(&raw).context("parse scenario file")?;
    info!(op_count = ops.len(); "applying scenario");

    let mut tenants_touched = std::collections::HashSet::new();
    for op in ops {
        let tenant_id = op.tenant_id();
        tenants_touched.insert(tenant_id.clone());

        match op {
            scenario::ScenarioOp::Inventory { wallet, items, mode, .. } => {
                let wallet_id = WalletId::try_from(wallet.as_str()).expect("validated during parse");
                let items = items.into_iter().map(scenario::ScenarioItem::into_submission).collect();
                service
                    .submit_inventory(tenant_id, wallet_id, items, mode.into())
                    .await
                    .context("submit_inventory")?;
            }
            scenario::ScenarioOp::Wants { wallet, items, collections, .. } => {
                let wallet_id = WalletId::try_from(wallet.as_str()).expect("validated during parse");
                let specific_item_ids = items
                    .into_iter()
                    .map(|id| tradeloop_common::domain::ItemId::try_from(id.as_str()).expect("validated during parse"))
                    .collect();
                let collection_ids = collections
                    .into_iter()
                    .map(|id| tradeloop_common::domain::CollectionId::try_from(id.as_str()).expect("validated during parse"))
                    .collect();
                service
                    .submit_wants(tenant_id, wallet_id, specific_item_ids, collection_ids)
                    .await
                    .context("submit_wants")?;
            }
            scenario::ScenarioOp::Transfer { item, from, to, .. } => {
                let item_id = tradeloop_common::domain::ItemId::try_from(item.as_str()).expect("validated during parse");
                let from_wallet_id = WalletId::try_from(from.as_str()).expect("validated during parse");
                let to_wallet_id = WalletId::try_from(to.as_str()).expect("validated during parse");
                service
                    .transfer(tenant_id, item_id, from_wallet_id, to_wallet_id)
                    .await
                    .context("transfer")?;
            }
        }
    }

    info!(settle_ms = args.settle_ms; "ingestion complete, waiting for scheduler to converge");
    tokio::time::sleep(Duration::from_millis(args.settle_ms)).await;

    let wallet_filter = args
        .wallet
        .as_deref()
        .map(WalletId::try_from)
        .transpose()
        .context("parse --wallet")?;

    for tenant_id in tenants_touched {
        let page = service
            .query_trades(
                tenant_id.clone(),
                ListFilter {
                    wallet_id: wallet_filter.clone(),
                    limit: args.limit,
                    ..ListFilter::default()
                },
            )
            .await
            .context("query_trades")?;

        info!(tenant_id:%, loop_count = page.items.len(); "discovered loops");
        for cached in &page.items {
            println!("{}", serde_json::to_string(cached).expect("CachedLoop is always serializable"));
        }
    }

    scheduler_handle.abort();
    telemetry::flush_tracing();
    Ok(())
}
