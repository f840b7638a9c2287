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

//! Optional append-only replay log (spec.md §6, "Persistence boundary"). The Graph Store itself
//! stays in-memory; a [`ReplayLog`] lets a composition root recover it across restarts. The Loop
//! Cache is never persisted here — it is always repopulated by a scheduled full rescan.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::Row;
use tradeloop_common::domain::{GraphDelta, TenantId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub tenant_id: TenantId,
    pub monotonic_seq: u64,
    pub delta: GraphDelta,
    pub commit_timestamp_millis: u64,
}

#[trait_variant::make(Send)]
pub trait ReplayLog
where
    Self: Clone + Send + Sync + 'static,
{
    async fn append(&self, record: &LogRecord) -> Result<(), sqlx::Error>;

    async fn replay(&self, tenant_id: &TenantId) -> Result<Vec<LogRecord>, sqlx::Error>;
}

/// Sqlite-backed [`ReplayLog`], intended for the `standalone` composition root.
#[derive(Debug, Clone)]
pub struct SqliteReplayLog {
    pool: SqlitePool,
}

impl SqliteReplayLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the backing table if absent. Call once during startup.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS delta_log (
                tenant_id TEXT NOT NULL,
                monotonic_seq INTEGER NOT NULL,
                delta TEXT NOT NULL,
                commit_timestamp_millis INTEGER NOT NULL,
                PRIMARY KEY (tenant_id, monotonic_seq)
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl ReplayLog for SqliteReplayLog {
    async fn append(&self, record: &LogRecord) -> Result<(), sqlx::Error> {
        let delta_json = serde_json::to_string(&record.delta)
            .map_err(|err| sqlx::Error::Encode(Box::new(err)))?;

        sqlx::query(
            "INSERT INTO delta_log (tenant_id, monotonic_seq, delta, commit_timestamp_millis)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(record.tenant_id.as_str())
        .bind(record.monotonic_seq as i64)
        .bind(delta_json)
        .bind(record.commit_timestamp_millis as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn replay(&self, tenant_id: &TenantId) -> Result<Vec<LogRecord>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT monotonic_seq, delta, commit_timestamp_millis
             FROM delta_log
             WHERE tenant_id = $1
             ORDER BY monotonic_seq ASC",
        )
        .bind(tenant_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let delta_json: String = row.try_get("delta")?;
                let delta: GraphDelta = serde_json::from_str(&delta_json)
                    .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
                Ok(LogRecord {
                    tenant_id: tenant_id.clone(),
                    monotonic_seq: row.try_get::<i64, _>("monotonic_seq")? as u64,
                    delta,
                    commit_timestamp_millis: row
                        .try_get::<i64, _>("commit_timestamp_millis")?
                        as u64,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use tradeloop_common::domain::{InventoryMode, ItemSubmission, WalletId};

    fn tenant(s: &str) -> TenantId {
        TenantId::try_from(s).unwrap()
    }

    fn wallet(s: &str) -> WalletId {
        WalletId::try_from(s).unwrap()
    }

    fn item(s: &str) -> tradeloop_common::domain::ItemId {
        tradeloop_common::domain::ItemId::try_from(s).unwrap()
    }

    /// A real file on disk rather than `sqlite::memory:`, so the test exercises the same
    /// close-and-reopen path a composition root hits across a process restart.
    async fn file_backed_pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("replay_log.sqlite");
        let pool = SqlitePoolOptions::new()
            .connect(&format!("sqlite://{}?mode=rwc", db_path.display()))
            .await
            .expect("open sqlite pool");
        (dir, pool)
    }

    #[tokio::test]
    async fn replay_returns_appended_records_in_monotonic_order() {
        let (_dir, pool) = file_backed_pool().await;
        let log = SqliteReplayLog::new(pool);
        log.migrate().await.unwrap();

        let t1 = tenant("t1");
        for seq in 0..3u64 {
            log.append(&LogRecord {
                tenant_id: t1.clone(),
                monotonic_seq: seq,
                delta: GraphDelta::InventorySubmission {
                    tenant_id: t1.clone(),
                    wallet_id: wallet("alice"),
                    items: vec![ItemSubmission {
                        id: item(&format!("item{seq}")),
                        collection_id: None,
                    }],
                    mode: InventoryMode::Merge,
                },
                commit_timestamp_millis: 1_000 + seq,
            })
            .await
            .unwrap();
        }

        let replayed = log.replay(&t1).await.unwrap();
        let seqs: Vec<u64> = replayed.iter().map(|record| record.monotonic_seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn replay_reopened_from_disk_sees_what_was_appended_before_close() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("replay_log.sqlite");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let t1 = tenant("t1");

        {
            let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
            let log = SqliteReplayLog::new(pool.clone());
            log.migrate().await.unwrap();
            log.append(&LogRecord {
                tenant_id: t1.clone(),
                monotonic_seq: 0,
                delta: GraphDelta::InventorySubmission {
                    tenant_id: t1.clone(),
                    wallet_id: wallet("alice"),
                    items: vec![ItemSubmission { id: item("sword"), collection_id: None }],
                    mode: InventoryMode::Merge,
                },
                commit_timestamp_millis: 1_000,
            })
            .await
            .unwrap();
            pool.close().await;
        }

        let reopened_pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
        let reopened_log = SqliteReplayLog::new(reopened_pool);
        let replayed = reopened_log.replay(&t1).await.unwrap();
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0].monotonic_seq, 0);
    }

    #[tokio::test]
    async fn replay_is_scoped_to_the_requesting_tenant() {
        let (_dir, pool) = file_backed_pool().await;
        let log = SqliteReplayLog::new(pool);
        log.migrate().await.unwrap();

        let t1 = tenant("t1");
        let t2 = tenant("t2");
        for (tenant_id, item_name) in [(&t1, "sword"), (&t2, "shield")] {
            log.append(&LogRecord {
                tenant_id: tenant_id.clone(),
                monotonic_seq: 0,
                delta: GraphDelta::InventorySubmission {
                    tenant_id: tenant_id.clone(),
                    wallet_id: wallet("alice"),
                    items: vec![ItemSubmission { id: item(item_name), collection_id: None }],
                    mode: InventoryMode::Merge,
                },
                commit_timestamp_millis: 1_000,
            })
            .await
            .unwrap();
        }

        let t1_only = log.replay(&t1).await.unwrap();
        assert_eq!(t1_only.len(), 1);
        assert_eq!(t1_only[0].tenant_id, t1);
    }
}
