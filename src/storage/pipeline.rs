//! The persistence orchestrator.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use log::info;
use sqlx::any::AnyRow;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

use crate::backend::{BackendProfile, Operation};
use crate::config::DatabaseConfig;
use crate::error_handling::{PipelineError, PipelineEvent, PipelineStats};
use crate::record::Record;

use super::pool::ResilientPool;
use super::statement::{StatementExecutor, StatementRunner};
use super::upsert::{upsert, UpsertOutcome};

/// Hook run once after the pool is opened, e.g. to create tables.
pub type OnConnect =
    Arc<dyn Fn(SqlPipeline) -> BoxFuture<'static, Result<(), PipelineError>> + Send + Sync>;

/// Writes records to a database through a resilient pool.
///
/// Cloning is cheap; clones share the pool, the profile and the statistics.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use sql_pipeline::{DatabaseConfig, RecordSchema, SqlPipeline};
///
/// # async fn example() -> Result<(), sql_pipeline::PipelineError> {
/// let pipeline = SqlPipeline::new(DatabaseConfig::sqlite("items.db"));
/// pipeline.connect().await?;
///
/// let schema = Arc::new(RecordSchema::new("items").unique_field("id").field("name"));
/// let record = schema.record().with("id", 1)?.with("name", "x")?;
/// pipeline.process(record).await?;
///
/// pipeline.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqlPipeline {
    inner: Arc<Inner>,
}

struct Inner {
    config: DatabaseConfig,
    profile: Arc<BackendProfile>,
    stats: Arc<PipelineStats>,
    on_connect: Option<OnConnect>,
    pool: OnceCell<ResilientPool>,
    hooked: OnceCell<()>,
}

impl std::fmt::Debug for SqlPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlPipeline")
            .field("config", &self.inner.config)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl SqlPipeline {
    /// Resolves the backend profile. Does not connect.
    pub fn new(config: DatabaseConfig) -> Self {
        let profile = Arc::new(config.profile());
        SqlPipeline {
            inner: Arc::new(Inner {
                config,
                profile,
                stats: Arc::new(PipelineStats::new()),
                on_connect: None,
                pool: OnceCell::new(),
                hooked: OnceCell::new(),
            }),
        }
    }

    /// Sets the hook [`SqlPipeline::connect`] runs once the pool is open.
    ///
    /// Returns a pipeline that is not connected yet, so call it before
    /// `connect`.
    pub fn on_connect<F, Fut>(self, hook: F) -> Self
    where
        F: Fn(SqlPipeline) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), PipelineError>> + Send + 'static,
    {
        let hook: OnConnect = Arc::new(move |pipeline| hook(pipeline).boxed());
        SqlPipeline {
            inner: Arc::new(Inner {
                config: self.inner.config.clone(),
                profile: Arc::clone(&self.inner.profile),
                stats: Arc::clone(&self.inner.stats),
                on_connect: Some(hook),
                pool: OnceCell::new(),
                hooked: OnceCell::new(),
            }),
        }
    }

    pub fn profile(&self) -> &BackendProfile {
        &self.inner.profile
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.inner.stats
    }

    pub fn is_connected(&self) -> bool {
        self.inner.pool.get().is_some_and(|pool| !pool.is_closed())
    }

    /// Opens the pool and runs the on-connect hook.
    ///
    /// Calling it again after success does nothing. If the hook fails the
    /// pool stays open and the next call runs the hook again.
    pub async fn connect(&self) -> Result<(), PipelineError> {
        let inner = &self.inner;
        inner
            .pool
            .get_or_try_init(|| ResilientPool::connect(&inner.config, Arc::clone(&inner.stats)))
            .await?;

        inner
            .hooked
            .get_or_try_init(|| async {
                if let Some(hook) = &inner.on_connect {
                    hook(self.clone()).await?;
                    info!("On-connect hook completed");
                }
                Ok::<(), PipelineError>(())
            })
            .await?;
        Ok(())
    }

    /// Closes the pool. A no-op if never connected or already shut down.
    pub async fn shutdown(&self) {
        if let Some(pool) = self.inner.pool.get() {
            pool.close().await;
        }
    }

    fn pool(&self) -> Result<&ResilientPool, PipelineError> {
        self.inner.pool.get().ok_or(PipelineError::NotConnected)
    }

    fn runner(&self) -> StatementRunner {
        StatementRunner {
            backend: self.inner.profile.kind(),
            debug: self.inner.config.debug,
        }
    }

    /// Inserts the record, or updates it if the insert hits the identity
    /// constraint. Resolves to the record it was given.
    ///
    /// # Errors
    ///
    /// Expansion errors, and any backend error other than the uniqueness
    /// conflict on the insert (after the pool's single transient retry).
    pub async fn process(&self, record: Record) -> Result<Record, PipelineError> {
        self.store(record, self.runner()).await
    }

    async fn store<R>(&self, record: Record, runner: R) -> Result<Record, PipelineError>
    where
        R: StatementExecutor + Clone + 'static,
    {
        let pool = self.pool()?;
        let record = Arc::new(record);

        let outcome = pool
            .run(|conn| {
                let profile = Arc::clone(&self.inner.profile);
                let record = Arc::clone(&record);
                let runner = runner.clone();
                Box::pin(async move { upsert(conn, &profile, &runner, &record).await })
            })
            .await;

        match outcome {
            Ok(UpsertOutcome::Inserted) => self.inner.stats.increment(PipelineEvent::RecordInserted),
            Ok(UpsertOutcome::Updated) => self.inner.stats.increment(PipelineEvent::RecordUpdated),
            Err(e) => {
                self.inner.stats.increment(PipelineEvent::RecordFailed);
                return Err(e);
            }
        }

        Ok(Arc::try_unwrap(record).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// Spawns [`SqlPipeline::process`] on the runtime.
    pub fn submit(&self, record: Record) -> JoinHandle<Result<Record, PipelineError>> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.process(record).await })
    }

    /// Expands and runs a non-query operation; returns affected rows.
    pub async fn execute(&self, operation: &str, record: &Record) -> Result<u64, PipelineError> {
        let pool = self.pool()?;
        let statement = Arc::new(self.inner.profile.expand(operation, record)?);
        let runner = self.runner();

        pool.run(|conn| {
            let statement = Arc::clone(&statement);
            Box::pin(async move { runner.execute(conn, &statement).await })
        })
        .await
    }

    /// Expands and runs a query operation, decoding rows into records of
    /// the same type as `record`.
    pub async fn fetch(
        &self,
        operation: &str,
        record: &Record,
    ) -> Result<Vec<Record>, PipelineError> {
        let pool = self.pool()?;
        let statement = Arc::new(self.inner.profile.expand(operation, record)?);
        let schema = Arc::clone(record.schema());
        let runner = self.runner();

        pool.run(|conn| {
            let statement = Arc::clone(&statement);
            let schema = Arc::clone(&schema);
            Box::pin(async move { runner.fetch(conn, &statement, &schema).await })
        })
        .await
    }

    /// Looks the record up by its unique fields.
    pub async fn fetch_one(&self, record: &Record) -> Result<Option<Record>, PipelineError> {
        let rows = self.fetch(Operation::FetchOne.as_str(), record).await?;
        Ok(rows.into_iter().next())
    }

    /// Runs unparameterized SQL (DDL, scripts) through the pool.
    pub async fn execute_raw(&self, sql: &str) -> Result<u64, PipelineError> {
        let pool = self.pool()?;
        let sql: Arc<str> = Arc::from(sql);
        let runner = self.runner();

        pool.run(|conn| {
            let sql = Arc::clone(&sql);
            Box::pin(async move { runner.execute_raw(conn, &sql).await })
        })
        .await
    }

    /// Runs unparameterized SQL through the pool and returns the raw rows.
    pub async fn query_raw(&self, sql: &str) -> Result<Vec<AnyRow>, PipelineError> {
        let pool = self.pool()?;
        let sql: Arc<str> = Arc::from(sql);
        let runner = self.runner();

        pool.run(|conn| {
            let sql = Arc::clone(&sql);
            Box::pin(async move { runner.fetch_raw(conn, &sql).await })
        })
        .await
    }
}
