//! Resilient connection pool.
//!
//! Wraps sqlx's `AnyPool` so that a database interaction survives one
//! transient failure:
//! - the interaction runs inside a transaction on one pooled connection
//! - on a transient error the transaction is rolled back and only that
//!   connection is closed; the pool opens a replacement lazily
//! - the interaction is then run once more and its outcome returned as is

use std::sync::Arc;

use futures::future::BoxFuture;
use log::{debug, info, warn};
use sqlx::any::AnyPoolOptions;
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyConnection, AnyPool, Connection};

use crate::backend::BackendKind;
use crate::config::DatabaseConfig;
use crate::error_handling::{PipelineError, PipelineEvent, PipelineStats};

/// Pool wrapper with the retry-once, discard-one-connection policy.
#[derive(Debug, Clone)]
pub struct ResilientPool {
    pool: AnyPool,
    backend: BackendKind,
    stats: Arc<PipelineStats>,
}

impl ResilientPool {
    /// Opens a pool for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` for an unusable configuration, or the
    /// classified driver error if the first connection cannot be opened.
    pub async fn connect(
        config: &DatabaseConfig,
        stats: Arc<PipelineStats>,
    ) -> Result<Self, PipelineError> {
        sqlx::any::install_default_drivers();
        let url = config.connect_url()?;

        let pool = AnyPoolOptions::new()
            .max_connections(config.effective_max_connections())
            .acquire_timeout(config.acquire_timeout())
            .connect(&url)
            .await
            .map_err(|e| config.backend.classify(e))?;

        info!(
            "Connected to {} database (max {} connections)",
            config.backend,
            config.effective_max_connections()
        );
        Ok(Self::from_pool(pool, config.backend, stats))
    }

    /// Wraps an already opened pool.
    pub fn from_pool(pool: AnyPool, backend: BackendKind, stats: Arc<PipelineStats>) -> Self {
        ResilientPool {
            pool,
            backend,
            stats,
        }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Closes every connection. Safe to call more than once.
    pub async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!("Closed {} connection pool", self.backend);
        }
    }

    /// Runs an interaction in a transaction, retrying it once on a fresh
    /// connection if it fails with a transient error.
    ///
    /// The interaction must be safe to run twice: after a transient failure
    /// its first transaction has been rolled back.
    pub async fn run<T, F>(&self, interaction: F) -> Result<T, PipelineError>
    where
        F: for<'c> Fn(&'c mut AnyConnection) -> BoxFuture<'c, Result<T, PipelineError>>
            + Send
            + Sync,
        T: Send,
    {
        match self.attempt(&interaction).await {
            Err(e) if e.is_transient() => {
                warn!("Transient {} error, retrying once: {}", self.backend, e);
                self.stats.increment(PipelineEvent::TransientRetry);
                self.attempt(&interaction).await
            }
            outcome => outcome,
        }
    }

    async fn attempt<T, F>(&self, interaction: &F) -> Result<T, PipelineError>
    where
        F: for<'c> Fn(&'c mut AnyConnection) -> BoxFuture<'c, Result<T, PipelineError>>
            + Send
            + Sync,
        T: Send,
    {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| self.backend.classify(e))?;

        let outcome = self.transact(&mut conn, interaction).await;
        if matches!(&outcome, Err(e) if e.is_transient()) {
            self.discard(conn).await;
        }
        outcome
    }

    async fn transact<T, F>(
        &self,
        conn: &mut PoolConnection<Any>,
        interaction: &F,
    ) -> Result<T, PipelineError>
    where
        F: for<'c> Fn(&'c mut AnyConnection) -> BoxFuture<'c, Result<T, PipelineError>>
            + Send
            + Sync,
        T: Send,
    {
        let mut tx = conn.begin().await.map_err(|e| self.backend.classify(e))?;

        match interaction(&mut *tx).await {
            Ok(value) => {
                tx.commit().await.map_err(|e| self.backend.classify(e))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    debug!("Rollback after failed interaction also failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Closes one connection instead of returning it to the pool.
    async fn discard(&self, conn: PoolConnection<Any>) {
        self.stats.increment(PipelineEvent::ConnectionDiscarded);
        if let Err(e) = conn.close().await {
            debug!("Error while closing discarded connection: {}", e);
        }
    }
}
