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

use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Deserialize;
use std::net::SocketAddr;

/// Telemetry configuration, merged into each binary's top-level `Config` the same way every
/// composition root merges `tracing_config`/`metrics_config`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracing_config: TracingConfig,

    #[serde(default)]
    pub metrics_config: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    /// Whether fastrace spans are reported anywhere at all; disabled in most tests.
    #[serde(default)]
    pub enabled: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_addr")]
    pub listen_address: SocketAddr,
}

fn default_metrics_addr() -> SocketAddr {
    ([0, 0, 0, 0], 9000).into()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: default_metrics_addr(),
        }
    }
}

/// Installs the process-wide `log` backend. Call once, as early as possible in `main`.
pub fn init_logging() {
    logforth::starter_log::builder()
        .dispatch(|d| d.diagnostic(logforth::diagnostic::FastraceDiagnostic::default()))
        .apply();
}

/// Wires fastrace to report completed spans, if enabled. A no-op reporter is installed when
/// disabled so that `#[trace]`-annotated functions remain cheap rather than erroring.
pub fn init_tracing(config: &TracingConfig) {
    if config.enabled {
        fastrace::set_reporter(
            fastrace::collector::ConsoleReporter,
            fastrace::collector::Config::default(),
        );
    }
}

/// Installs the Prometheus metrics exporter, if enabled. Returns `Ok(())` whether or not metrics
/// were actually enabled, so callers can always `.context(...)` it uniformly.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), metrics_exporter_prometheus::BuildError> {
    if !config.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen_address)
        .install()
}

/// Flushes any buffered fastrace spans. Call at shutdown, mirroring the SIGTERM-aware
/// `select!`-based `run` loops that every composition root uses.
pub fn flush_tracing() {
    fastrace::flush();
}
