//! Read-only pool catalog.
//!
//! Derives the set of available mixing pools from gateway reads. The catalog
//! is refreshed wholesale on a fixed cadence; readers only ever see a
//! complete snapshot, never a half-updated set.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use gateway::ContractGateway;
use gateway::error::GatewayError;
use gateway::types::PoolId;

use crate::types::Pool;

pub struct PoolCatalog {
    gateway: Arc<dyn ContractGateway>,
    pool_ids: Vec<PoolId>,
    pools: RwLock<HashMap<PoolId, Pool>>,
    batch_capacity: RwLock<Option<u32>>,
}

impl PoolCatalog {
    pub fn new(gateway: Arc<dyn ContractGateway>, pool_ids: Vec<PoolId>) -> Self {
        Self {
            gateway,
            pool_ids,
            pools: RwLock::new(HashMap::new()),
            batch_capacity: RwLock::new(None),
        }
    }

    /// Re-read every configured pool and the contract's batch capacity.
    ///
    /// On any gateway failure the previous snapshot stays in place; a stale
    /// catalog is preferred over a partial one.
    pub async fn refresh(&self) -> Result<(), GatewayError> {
        let mut next = HashMap::with_capacity(self.pool_ids.len());

        for &id in &self.pool_ids {
            let params = self.gateway.read_pool_parameters(id).await?;
            next.insert(id, Pool::from_parameters(id, params));
        }

        let capacity = self.gateway.read_batch_capacity().await?;

        debug!(
            pools = next.len(),
            batch_capacity = capacity,
            "pool catalog refreshed"
        );

        *self.pools.write().await = next;
        *self.batch_capacity.write().await = Some(capacity);

        Ok(())
    }

    pub async fn get(&self, pool_id: PoolId) -> Option<Pool> {
        self.pools.read().await.get(&pool_id).cloned()
    }

    pub async fn all(&self) -> Vec<Pool> {
        let mut pools: Vec<_> = self.pools.read().await.values().cloned().collect();
        pools.sort_by_key(|p| p.id);
        pools
    }

    /// Batch capacity advertised by the contract.
    ///
    /// Served from the last refresh; falls back to a live read if the
    /// catalog has never been refreshed.
    pub async fn batch_capacity(&self) -> Result<u32, GatewayError> {
        if let Some(capacity) = *self.batch_capacity.read().await {
            return Ok(capacity);
        }

        let capacity = self.gateway.read_batch_capacity().await?;
        *self.batch_capacity.write().await = Some(capacity);
        Ok(capacity)
    }

    /// Periodic refresh loop. Failures are logged and retried on the next
    /// interval; the engine keeps running on the stale snapshot.
    pub fn spawn_refresh_loop(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                if let Err(e) = self.refresh().await {
                    warn!(error = %e, "pool catalog refresh failed");
                }
            }
        })
    }
}
