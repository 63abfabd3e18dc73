use sqlx::SqlitePool;
use uuid::Uuid;

use ledger::model::{DeliveryStatus, MixRecord, PendingWithdrawal};
use ledger::store::LedgerStore;
use ledger::store::sqlite_store::SqliteLedgerStore;

///
/// Test suite for SqliteLedgerStore
///
/// Verifies:
///   · schema creation on a fresh pool
///   · save() insert + update for both collections
///   · insertion-order loads for the queue
///   · newest-first loads for the history
///   · atomicity surface of save_withdrawals
///   · clear_history leaves the queue untouched
///
async fn store(pool: SqlitePool) -> anyhow::Result<SqliteLedgerStore> {
    let store = SqliteLedgerStore::from_pool(pool);
    store.ensure_schema().await?;
    Ok(store)
}

fn sample_withdrawal(deposit_id: u64, amount: u64) -> PendingWithdrawal {
    PendingWithdrawal {
        id: Uuid::new_v4(),
        deposit_id,
        recipient: "EQRecipient123".into(),
        amount,
        scheduled_at_ms: 10_000,
        status: DeliveryStatus::Pending,
        retry_count: 0,
        pool_id: 2,
        fee_rate: 0.03,
        delay_ms: 3_600_000,
        created_at_ms: 1_000,
    }
}

fn sample_record(deposit_id: u64, created_at_ms: u64) -> MixRecord {
    MixRecord {
        id: Uuid::new_v4(),
        deposit_id,
        amount: 500,
        fee_rate: 0.03,
        status: DeliveryStatus::Pending,
        created_at_ms,
        ledger_reference: None,
        note: Some("rent".into()),
    }
}

#[sqlx::test]
async fn insert_and_load_withdrawal(pool: SqlitePool) -> anyhow::Result<()> {
    let store = store(pool).await?;

    let w = sample_withdrawal(7, 250);
    store.save_withdrawal(&w).await?;

    let loaded = store.load_withdrawals().await?;
    assert_eq!(loaded.len(), 1);

    let got = &loaded[0];
    assert_eq!(got.id, w.id);
    assert_eq!(got.deposit_id, 7);
    assert_eq!(got.recipient, "EQRecipient123");
    assert_eq!(got.amount, 250);
    assert_eq!(got.scheduled_at_ms, 10_000);
    assert_eq!(got.status, DeliveryStatus::Pending);
    assert_eq!(got.retry_count, 0);
    assert_eq!(got.pool_id, 2);
    assert!((got.fee_rate - 0.03).abs() < 1e-9);
    assert_eq!(got.delay_ms, 3_600_000);

    Ok(())
}

#[sqlx::test]
async fn update_withdrawal_via_second_save(pool: SqlitePool) -> anyhow::Result<()> {
    let store = store(pool).await?;

    let mut w = sample_withdrawal(7, 250);
    store.save_withdrawal(&w).await?;

    w.status = DeliveryStatus::Processing;
    w.retry_count = 2;
    w.scheduled_at_ms = 99_000;
    store.save_withdrawal(&w).await?;

    let loaded = store.load_withdrawals().await?;
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].status, DeliveryStatus::Processing);
    assert_eq!(loaded[0].retry_count, 2);
    assert_eq!(loaded[0].scheduled_at_ms, 99_000);

    Ok(())
}

#[sqlx::test]
async fn withdrawals_load_in_insertion_order(pool: SqlitePool) -> anyhow::Result<()> {
    let store = store(pool).await?;

    let first = sample_withdrawal(1, 10);
    let second = sample_withdrawal(1, 20);
    let third = sample_withdrawal(2, 30);

    store.save_withdrawal(&first).await?;
    store.save_withdrawal(&second).await?;
    store.save_withdrawal(&third).await?;

    // Updating an early row must not move it to the back.
    let mut updated = first.clone();
    updated.retry_count = 1;
    store.save_withdrawal(&updated).await?;

    let loaded = store.load_withdrawals().await?;
    let ids: Vec<_> = loaded.iter().map(|w| w.id).collect();
    assert_eq!(ids, vec![first.id, second.id, third.id]);

    Ok(())
}

#[sqlx::test]
async fn save_withdrawals_inserts_all(pool: SqlitePool) -> anyhow::Result<()> {
    let store = store(pool).await?;

    let batch: Vec<_> = (0..5).map(|i| sample_withdrawal(3, 10 + i)).collect();
    store.save_withdrawals(&batch).await?;

    let loaded = store.load_withdrawals().await?;
    assert_eq!(loaded.len(), 5);

    let amounts: Vec<_> = loaded.iter().map(|w| w.amount).collect();
    assert_eq!(amounts, vec![10, 11, 12, 13, 14]);

    Ok(())
}

#[sqlx::test]
async fn history_loads_newest_first(pool: SqlitePool) -> anyhow::Result<()> {
    let store = store(pool).await?;

    let old = sample_record(1, 1_000);
    let newer = sample_record(2, 2_000);
    let newest = sample_record(3, 3_000);

    store.save_record(&old).await?;
    store.save_record(&newest).await?;
    store.save_record(&newer).await?;

    let history = store.load_history().await?;
    let deposits: Vec<_> = history.iter().map(|r| r.deposit_id).collect();
    assert_eq!(deposits, vec![3, 2, 1]);

    Ok(())
}

#[sqlx::test]
async fn record_update_and_find_by_deposit(pool: SqlitePool) -> anyhow::Result<()> {
    let store = store(pool).await?;

    let mut r = sample_record(11, 1_000);
    store.save_record(&r).await?;

    r.status = DeliveryStatus::Completed;
    r.ledger_reference = Some("ref-abc".into());
    store.save_record(&r).await?;

    let found = store.find_record(11).await?.expect("record should exist");
    assert_eq!(found.status, DeliveryStatus::Completed);
    assert_eq!(found.ledger_reference.as_deref(), Some("ref-abc"));
    assert_eq!(found.note.as_deref(), Some("rent"));

    assert!(store.find_record(999).await?.is_none());

    Ok(())
}

#[sqlx::test]
async fn clear_history_leaves_queue_untouched(pool: SqlitePool) -> anyhow::Result<()> {
    let store = store(pool).await?;

    store.save_withdrawal(&sample_withdrawal(5, 100)).await?;
    store.save_record(&sample_record(5, 1_000)).await?;

    store.clear_history().await?;

    assert!(store.load_history().await?.is_empty());
    assert_eq!(store.load_withdrawals().await?.len(), 1);

    Ok(())
}
