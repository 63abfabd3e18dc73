//! SqliteLedgerStore
//! ------------------
//! SQLite-backed implementation of the `LedgerStore` trait. It is
//! responsible for durable persistence of the engine's two collections so
//! that:
//!
//!  - the pending-withdrawal queue survives restarts
//!  - retry state is tracked across dispatch attempts
//!  - the mix history outlives the queue entries that produced it
//!  - scheduler and coordinator operate against one source of truth
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use super::LedgerStore;
use crate::model::{DeliveryStatus, MixRecord, PendingWithdrawal};
use gateway::types::DepositId;

/// SQLite-based persistence backend for the queue and history.
///
/// Provides:
///   - schema creation on startup
///   - wholesale loads in insertion order (`load_withdrawals`) and
///     newest-first (`load_history`)
///   - upsert semantics (`save_withdrawal` / `save_record`)
///   - atomic multi-row queue insertion (`save_withdrawals`)
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new SQLite-backed store and ensure schema exists.
    pub async fn new(path: &str) -> anyhow::Result<Self> {
        let pool = SqlitePool::connect(path).await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Creates tables if they do not exist.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pending_withdrawals (
                id TEXT PRIMARY KEY,
                deposit_id INTEGER NOT NULL,
                recipient TEXT NOT NULL,
                amount INTEGER NOT NULL,
                scheduled_at_ms INTEGER NOT NULL,
                status TEXT NOT NULL,
                retry_count INTEGER NOT NULL,
                pool_id INTEGER NOT NULL,
                fee_rate REAL NOT NULL,
                delay_ms INTEGER NOT NULL,
                created_at_ms INTEGER NOT NULL
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mix_history (
                id TEXT PRIMARY KEY,
                deposit_id INTEGER NOT NULL,
                amount INTEGER NOT NULL,
                fee_rate REAL NOT NULL,
                status TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL,
                ledger_reference TEXT,
                note TEXT
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn withdrawal_from_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<PendingWithdrawal> {
    let id_str: String = row.get("id");
    let id = uuid::Uuid::parse_str(&id_str)?;

    let status_str: String = row.get("status");
    let status = DeliveryStatus::from_str(&status_str)
        .map_err(|e| anyhow::anyhow!("Invalid withdrawal status '{}': {}", status_str, e))?;

    Ok(PendingWithdrawal {
        id,
        deposit_id: row.get::<i64, _>("deposit_id") as u64,
        recipient: row.get("recipient"),
        amount: row.get::<i64, _>("amount") as u64,
        scheduled_at_ms: row.get::<i64, _>("scheduled_at_ms") as u64,
        status,
        retry_count: row.get::<i64, _>("retry_count") as u32,
        pool_id: row.get::<i64, _>("pool_id") as u32,
        fee_rate: row.get("fee_rate"),
        delay_ms: row.get::<i64, _>("delay_ms") as u64,
        created_at_ms: row.get::<i64, _>("created_at_ms") as u64,
    })
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<MixRecord> {
    let id_str: String = row.get("id");
    let id = uuid::Uuid::parse_str(&id_str)?;

    let status_str: String = row.get("status");
    let status = DeliveryStatus::from_str(&status_str)
        .map_err(|e| anyhow::anyhow!("Invalid record status '{}': {}", status_str, e))?;

    Ok(MixRecord {
        id,
        deposit_id: row.get::<i64, _>("deposit_id") as u64,
        amount: row.get::<i64, _>("amount") as u64,
        fee_rate: row.get("fee_rate"),
        status,
        created_at_ms: row.get::<i64, _>("created_at_ms") as u64,
        ledger_reference: row.get("ledger_reference"),
        note: row.get("note"),
    })
}

const UPSERT_WITHDRAWAL: &str = r#"
    INSERT INTO pending_withdrawals (
        id, deposit_id, recipient, amount,
        scheduled_at_ms, status, retry_count,
        pool_id, fee_rate, delay_ms, created_at_ms
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        deposit_id = excluded.deposit_id,
        recipient = excluded.recipient,
        amount = excluded.amount,
        scheduled_at_ms = excluded.scheduled_at_ms,
        status = excluded.status,
        retry_count = excluded.retry_count,
        pool_id = excluded.pool_id,
        fee_rate = excluded.fee_rate,
        delay_ms = excluded.delay_ms,
        created_at_ms = excluded.created_at_ms;
"#;

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    /// Load the whole queue in insertion order (rowid order).
    ///
    /// Called at startup by the scheduler to recover in-flight state, and on
    /// every tick to find due entries.
    async fn load_withdrawals(&self) -> anyhow::Result<Vec<PendingWithdrawal>> {
        let rows = sqlx::query("SELECT * FROM pending_withdrawals ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        let mut withdrawals = Vec::with_capacity(rows.len());
        for row in rows {
            withdrawals.push(withdrawal_from_row(&row)?);
        }

        Ok(withdrawals)
    }

    async fn save_withdrawal(&self, withdrawal: &PendingWithdrawal) -> anyhow::Result<()> {
        sqlx::query(UPSERT_WITHDRAWAL)
            .bind(withdrawal.id.to_string())
            .bind(withdrawal.deposit_id as i64)
            .bind(&withdrawal.recipient)
            .bind(withdrawal.amount as i64)
            .bind(withdrawal.scheduled_at_ms as i64)
            .bind(withdrawal.status.to_string())
            .bind(withdrawal.retry_count as i64)
            .bind(withdrawal.pool_id as i64)
            .bind(withdrawal.fee_rate)
            .bind(withdrawal.delay_ms as i64)
            .bind(withdrawal.created_at_ms as i64)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a planner batch in one transaction. A rejected plan never
    /// partially pollutes the queue.
    async fn save_withdrawals(&self, withdrawals: &[PendingWithdrawal]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        for w in withdrawals {
            sqlx::query(UPSERT_WITHDRAWAL)
                .bind(w.id.to_string())
                .bind(w.deposit_id as i64)
                .bind(&w.recipient)
                .bind(w.amount as i64)
                .bind(w.scheduled_at_ms as i64)
                .bind(w.status.to_string())
                .bind(w.retry_count as i64)
                .bind(w.pool_id as i64)
                .bind(w.fee_rate)
                .bind(w.delay_ms as i64)
                .bind(w.created_at_ms as i64)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Full history, most recent first.
    async fn load_history(&self) -> anyhow::Result<Vec<MixRecord>> {
        let rows =
            sqlx::query("SELECT * FROM mix_history ORDER BY created_at_ms DESC, rowid DESC")
                .fetch_all(&self.pool)
                .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(record_from_row(&row)?);
        }

        Ok(records)
    }

    async fn save_record(&self, record: &MixRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO mix_history (
                id, deposit_id, amount, fee_rate,
                status, created_at_ms, ledger_reference, note
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                deposit_id = excluded.deposit_id,
                amount = excluded.amount,
                fee_rate = excluded.fee_rate,
                status = excluded.status,
                created_at_ms = excluded.created_at_ms,
                ledger_reference = excluded.ledger_reference,
                note = excluded.note;
        "#,
        )
        .bind(record.id.to_string())
        .bind(record.deposit_id as i64)
        .bind(record.amount as i64)
        .bind(record.fee_rate)
        .bind(record.status.to_string())
        .bind(record.created_at_ms as i64)
        .bind(&record.ledger_reference)
        .bind(&record.note)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_record(&self, deposit_id: DepositId) -> anyhow::Result<Option<MixRecord>> {
        let row = sqlx::query("SELECT * FROM mix_history WHERE deposit_id = ? ORDER BY rowid LIMIT 1")
            .bind(deposit_id as i64)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Called by the coordinator's `clear_history`. Does not touch the
    /// pending-withdrawal queue: these are independent lifecycles.
    async fn clear_history(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM mix_history")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
