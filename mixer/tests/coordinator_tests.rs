use std::sync::Arc;

use catalog::PoolCatalog;
use gateway::types::PoolParameters;
use ledger::model::DeliveryStatus;
use ledger::store::LedgerStore;
use mixer::{MixCoordinator, MixError, RecipientRequest};

use mock_gateway::MockGateway;
use mock_store::InMemoryLedgerStore;

const POOL: u32 = 1;
const MIN_DELAY_MS: u64 = 1_000;

fn pool_params() -> PoolParameters {
    PoolParameters {
        fee_rate: 0.03,
        min_amount: 10,
        max_amount: 1_000,
        min_delay_ms: MIN_DELAY_MS,
    }
}

fn request(amount: u64) -> RecipientRequest {
    RecipientRequest {
        recipient: "EQRecipient".into(),
        amount,
        delay_ms: MIN_DELAY_MS,
    }
}

async fn setup(
    batch_capacity: u32,
) -> (
    Arc<InMemoryLedgerStore>,
    Arc<MockGateway>,
    MixCoordinator<InMemoryLedgerStore>,
) {
    let store = Arc::new(InMemoryLedgerStore::new());
    let gw = Arc::new(MockGateway::new(batch_capacity).with_pool(POOL, pool_params()));

    let catalog = Arc::new(PoolCatalog::new(gw.clone(), vec![POOL]));
    catalog.refresh().await.expect("catalog refresh");

    let coordinator = MixCoordinator::new(store.clone(), gw.clone(), catalog);
    (store, gw, coordinator)
}

#[tokio::test]
async fn initiate_mix_accepts_amounts_within_pool_bounds() -> anyhow::Result<()> {
    let (store, _gw, coordinator) = setup(4).await;

    for amount in [10, 500, 1_000] {
        let deposit = coordinator.initiate_mix(amount, POOL, None).await?;
        assert_eq!(deposit.amount, amount);
        assert_eq!(deposit.pool_id, POOL);
    }

    assert_eq!(store.load_history().await?.len(), 3);

    Ok(())
}

#[tokio::test]
async fn initiate_mix_writes_pending_record_with_note() -> anyhow::Result<()> {
    let (store, _gw, coordinator) = setup(4).await;

    let deposit = coordinator
        .initiate_mix(100, POOL, Some("weekly".into()))
        .await?;

    let record = store.find_record(deposit.deposit_id).await?.expect("record");
    assert_eq!(record.status, DeliveryStatus::Pending);
    assert_eq!(record.amount, 100);
    assert!((record.fee_rate - 0.03).abs() < 1e-9);
    assert_eq!(record.note.as_deref(), Some("weekly"));
    assert!(record.ledger_reference.is_none());

    Ok(())
}

#[tokio::test]
async fn initiate_mix_rejects_amounts_outside_bounds() -> anyhow::Result<()> {
    let (store, gw, coordinator) = setup(4).await;

    for amount in [0, 9, 1_001] {
        let err = coordinator.initiate_mix(amount, POOL, None).await;
        assert!(matches!(err, Err(MixError::InvalidAmount { .. })));
    }

    // Rejected before any gateway traffic, nothing committed.
    assert_eq!(gw.deposit_call_count().await, 0);
    assert!(store.load_history().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn initiate_mix_rejects_unknown_pool() {
    let (_store, _gw, coordinator) = setup(4).await;

    let err = coordinator.initiate_mix(100, 99, None).await;
    assert!(matches!(err, Err(MixError::UnknownPool(99))));
}

#[tokio::test]
async fn failed_deposit_commits_nothing() -> anyhow::Result<()> {
    let (store, gw, coordinator) = setup(4).await;
    gw.fail_deposits();

    let err = coordinator.initiate_mix(100, POOL, None).await;
    assert!(matches!(err, Err(MixError::Gateway(_))));

    // Exactly one attempt: deposit creation is never auto-retried.
    assert_eq!(gw.deposit_call_count().await, 1);
    assert!(store.load_history().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn small_distribution_settles_as_one_batch() -> anyhow::Result<()> {
    let (store, gw, coordinator) = setup(4).await;

    let deposit = coordinator.initiate_mix(100, POOL, None).await?;
    coordinator
        .schedule_distribution(deposit.deposit_id, &[request(40), request(30), request(20)])
        .await?;

    assert_eq!(gw.batch_call_count().await, 1);
    assert!(store.load_withdrawals().await?.is_empty());

    let record = store.find_record(deposit.deposit_id).await?.expect("record");
    assert_eq!(record.status, DeliveryStatus::Completed);
    assert_eq!(record.ledger_reference.as_deref(), Some("batch-ref-1"));

    Ok(())
}

#[tokio::test]
async fn oversize_distribution_decomposes_without_a_batch_attempt() -> anyhow::Result<()> {
    let (store, gw, coordinator) = setup(4).await;

    let deposit = coordinator.initiate_mix(100, POOL, None).await?;
    let requests: Vec<_> = (0..5).map(|_| request(20)).collect();
    coordinator
        .schedule_distribution(deposit.deposit_id, &requests)
        .await?;

    assert_eq!(gw.batch_call_count().await, 0);

    let withdrawals = store.load_withdrawals().await?;
    assert_eq!(withdrawals.len(), 5);
    for w in &withdrawals {
        assert_eq!(w.deposit_id, deposit.deposit_id);
        assert_eq!(w.status, DeliveryStatus::Pending);
        assert_eq!(w.retry_count, 0);
        assert_eq!(w.scheduled_at_ms, w.created_at_ms + MIN_DELAY_MS);
    }

    Ok(())
}

#[tokio::test]
async fn batch_failure_falls_back_to_decomposition() -> anyhow::Result<()> {
    let (store, gw, coordinator) = setup(4).await;
    gw.fail_batches();

    let deposit = coordinator.initiate_mix(100, POOL, None).await?;
    coordinator
        .schedule_distribution(deposit.deposit_id, &[request(40), request(30)])
        .await?;

    assert_eq!(gw.batch_call_count().await, 1);

    let withdrawals = store.load_withdrawals().await?;
    assert_eq!(withdrawals.len(), 2);
    assert!(withdrawals.iter().all(|w| w.status == DeliveryStatus::Pending));

    // The record stays pending until the scheduler settles the legs.
    let record = store.find_record(deposit.deposit_id).await?.expect("record");
    assert_eq!(record.status, DeliveryStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn invalid_plan_persists_nothing() -> anyhow::Result<()> {
    let (store, gw, coordinator) = setup(4).await;

    let deposit = coordinator.initiate_mix(100, POOL, None).await?;

    // One bad leg poisons the whole plan.
    let err = coordinator
        .schedule_distribution(deposit.deposit_id, &[request(40), request(0)])
        .await;
    assert!(matches!(err, Err(MixError::PlanInvalid(_))));

    // Totals above the deposit are rejected too.
    let err = coordinator
        .schedule_distribution(deposit.deposit_id, &[request(60), request(41)])
        .await;
    assert!(matches!(err, Err(MixError::PlanInvalid(_))));

    assert_eq!(gw.batch_call_count().await, 0);
    assert!(store.load_withdrawals().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn repeated_distributions_cannot_overcommit_the_deposit() -> anyhow::Result<()> {
    // Capacity 0 forces every plan down the decomposition path.
    let (store, gw, coordinator) = setup(0).await;

    let deposit = coordinator.initiate_mix(100, POOL, None).await?;
    coordinator
        .schedule_distribution(deposit.deposit_id, &[request(60)])
        .await?;

    // A second 60 would take the deposit's queued total to 120.
    let err = coordinator
        .schedule_distribution(deposit.deposit_id, &[request(60)])
        .await;
    assert!(matches!(err, Err(MixError::PlanInvalid(_))));

    let queued: u64 = store.load_withdrawals().await?.iter().map(|w| w.amount).sum();
    assert_eq!(queued, 60);

    // The untouched remainder is still spendable.
    coordinator
        .schedule_distribution(deposit.deposit_id, &[request(40)])
        .await?;

    let queued: u64 = store.load_withdrawals().await?.iter().map(|w| w.amount).sum();
    assert_eq!(queued, 100);
    assert_eq!(gw.batch_call_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn batched_settlement_counts_against_the_deposit() -> anyhow::Result<()> {
    let (store, gw, coordinator) = setup(4).await;

    let deposit = coordinator.initiate_mix(100, POOL, None).await?;
    coordinator
        .schedule_distribution(deposit.deposit_id, &[request(60)])
        .await?;
    assert_eq!(gw.batch_call_count().await, 1);

    // The batch already spent 60 of the deposit even though the queue is empty.
    let err = coordinator
        .schedule_distribution(deposit.deposit_id, &[request(60)])
        .await;
    assert!(matches!(err, Err(MixError::PlanInvalid(_))));
    assert!(store.load_withdrawals().await?.is_empty());

    coordinator
        .schedule_distribution(deposit.deposit_id, &[request(40)])
        .await?;
    assert_eq!(gw.batch_call_count().await, 2);

    Ok(())
}

#[tokio::test]
async fn distribution_for_unknown_deposit_is_rejected() {
    let (_store, _gw, coordinator) = setup(4).await;

    let err = coordinator.schedule_distribution(999, &[request(10)]).await;
    assert!(matches!(err, Err(MixError::PlanInvalid(_))));
}

#[tokio::test]
async fn clear_history_leaves_scheduled_withdrawals_alone() -> anyhow::Result<()> {
    let (store, _gw, coordinator) = setup(2).await;

    let deposit = coordinator.initiate_mix(100, POOL, None).await?;
    let requests: Vec<_> = (0..3).map(|_| request(20)).collect();
    coordinator
        .schedule_distribution(deposit.deposit_id, &requests)
        .await?;

    assert_eq!(coordinator.get_history().await?.len(), 1);

    coordinator.clear_history().await?;

    assert!(coordinator.get_history().await?.is_empty());
    assert_eq!(store.load_withdrawals().await?.len(), 3);

    Ok(())
}
