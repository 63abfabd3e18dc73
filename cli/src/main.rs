mod cli;
mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use catalog::PoolCatalog;
use common::logger::init_logger;
use common::time::now_ms;
use gateway::ContractGateway;
use gateway::client::HttpContractGateway;
use gateway::config::GatewayConfig;
use ledger::store::sqlite_store::SqliteLedgerStore;
use mixer::MixCoordinator;
use scheduler::{QueueScheduler, SchedulerConfig};

use crate::cli::{Cli, Command};
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("tumbler");

    let args = Cli::parse();
    let cfg = AppConfig::from_env();

    // Contract address and network are hard requirements; bail before
    // touching the database if they are absent.
    let gateway_cfg = GatewayConfig::from_env()?;
    let gateway: Arc<dyn ContractGateway> = Arc::new(HttpContractGateway::new(gateway_cfg)?);

    let store = Arc::new(SqliteLedgerStore::new(&cfg.database_url).await?);

    let catalog = Arc::new(PoolCatalog::new(gateway.clone(), cfg.pool_ids.clone()));
    if let Err(e) = catalog.refresh().await {
        warn!(error = %e, "initial pool catalog refresh failed");
    }

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run_daemon(cfg, store, gateway, catalog).await,

        Command::Mix {
            amount,
            pool,
            note,
            recipients,
        } => {
            let requests = recipients
                .iter()
                .map(|s| cli::parse_recipient(s))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let coordinator = MixCoordinator::new(store, gateway, catalog);
            let deposit = coordinator.initiate_mix(amount, pool, note).await?;
            coordinator
                .schedule_distribution(deposit.deposit_id, &requests)
                .await?;

            println!(
                "deposit {} accepted into pool {} ({} recipients scheduled)",
                deposit.deposit_id,
                deposit.pool_id,
                requests.len()
            );
            Ok(())
        }

        Command::History => {
            let coordinator = MixCoordinator::new(store, gateway, catalog);
            for r in coordinator.get_history().await? {
                println!(
                    "{}  deposit={}  amount={}  fee={:.4}  status={}  ref={}",
                    r.id,
                    r.deposit_id,
                    r.amount,
                    r.fee_rate,
                    r.status,
                    r.ledger_reference.as_deref().unwrap_or("-"),
                );
            }
            Ok(())
        }

        Command::ClearHistory => {
            let coordinator = MixCoordinator::new(store, gateway, catalog);
            coordinator.clear_history().await?;
            println!("history cleared");
            Ok(())
        }
    }
}

/// Recovery, then the tick loop until ctrl-c.
async fn run_daemon(
    cfg: AppConfig,
    store: Arc<SqliteLedgerStore>,
    gateway: Arc<dyn ContractGateway>,
    catalog: Arc<PoolCatalog>,
) -> anyhow::Result<()> {
    info!(
        tick_ms = cfg.tick_interval_ms,
        max_retries = cfg.max_retries,
        "starting tumbler daemon"
    );

    catalog.spawn_refresh_loop(Duration::from_millis(cfg.catalog_refresh_ms));

    let scheduler = Arc::new(QueueScheduler::new(
        SchedulerConfig {
            tick_interval: Duration::from_millis(cfg.tick_interval_ms),
            max_retries: cfg.max_retries,
            retry_delay_ms: cfg.retry_delay_ms,
        },
        store,
        gateway,
    ));

    let recovered = scheduler.recover().await?;
    if recovered > 0 {
        info!(recovered, "re-queued indeterminate withdrawals from previous run");
    }

    let tick_interval = Duration::from_millis(cfg.tick_interval_ms);
    let ticking = scheduler.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            if let Err(e) = ticking.tick(now_ms()).await {
                error!(error = %e, "scheduler tick failed");
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    Ok(())
}
