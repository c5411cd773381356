use crate::context::RequestContext;
use crate::error::{ErrorTranslator, StatementError};
use crate::handle::Handle;
use crate::options::DatabaseOptions;
use crate::tx::BoundTx;
use repokit_data::{DataError, Dialect, Entity, IdentifierPolicy, QueryBuilder};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Connection provider: owns the pool, the transaction lifecycle and the
/// error translator.
///
/// Cheap to clone; clones share the same pool.
///
/// # Example
///
/// ```ignore
/// let db = Database::connect(
///     DatabaseOptions::new(Driver::Sqlite, "sqlite::memory:").translator(Classifying),
/// )
/// .await?;
/// let users = SqlxRepository::<User>::new(db.clone());
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

struct Inner {
    pool: AnyPool,
    dialect: Dialect,
    table_prefix: String,
    identifier_policy: IdentifierPolicy,
    translator: Arc<dyn ErrorTranslator>,
    log_statements: bool,
}

impl Database {
    /// Open a pool for `options` and apply its migrations when `auto_migrate` is set.
    pub async fn connect(options: DatabaseOptions) -> Result<Self, DataError> {
        options
            .validate()
            .map_err(|e| DataError::invalid_argument(e.to_string()))?;
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(Duration::from_secs(options.acquire_timeout_secs))
            .connect(&options.url)
            .await
            .map_err(DataError::connection)?;
        tracing::info!(
            driver = %options.driver,
            max_connections = options.max_connections,
            "database pool ready"
        );

        let db = Self::build(pool, &options);
        if options.auto_migrate && !options.migrations.is_empty() {
            db.migrate(&options.migrations).await?;
        }
        Ok(db)
    }

    /// Wrap an existing pool. `options.url` and pool settings are ignored.
    pub fn from_pool(pool: AnyPool, options: &DatabaseOptions) -> Self {
        Self::build(pool, options)
    }

    fn build(pool: AnyPool, options: &DatabaseOptions) -> Self {
        let identifier_policy = if options.quote_identifiers {
            IdentifierPolicy::Quote
        } else {
            IdentifierPolicy::Validate
        };
        Self {
            inner: Arc::new(Inner {
                pool,
                dialect: options.driver.dialect(),
                table_prefix: options.table_prefix.clone(),
                identifier_policy,
                translator: options.translator.clone(),
                log_statements: options.log_statements,
            }),
        }
    }

    /// A statement executor for `ctx`: its bound transaction when it has one,
    /// the pool otherwise.
    pub fn handle(&self, ctx: &RequestContext) -> Handle {
        let cancel = ctx.cancellation_token().clone();
        match ctx.transaction() {
            Some(tx) => Handle::transaction(
                tx.clone(),
                cancel,
                ctx.deadline(),
                self.inner.log_statements,
            ),
            None => Handle::pool(
                self.inner.pool.clone(),
                cancel,
                ctx.deadline(),
                self.inner.log_statements,
            ),
        }
    }

    /// Run `body` inside a new transaction.
    ///
    /// `body` receives a context bound to the transaction; every repository
    /// call made with it runs on that transaction. Commits when `body`
    /// returns `Ok`, rolls back when it returns `Err`. A transaction dropped
    /// by a panic or a cancelled future is rolled back by the driver.
    pub async fn run_in_transaction<F, Fut, R, E>(
        &self,
        ctx: &RequestContext,
        body: F,
    ) -> Result<R, E>
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: From<DataError>,
    {
        let tx = self
            .inner
            .pool
            .begin()
            .await
            .map_err(DataError::connection)?;
        let bound = BoundTx::new(tx);
        let child = ctx.with_transaction(bound.clone());

        match body(child).await {
            Ok(value) => {
                bound.commit().await.map_err(DataError::connection)?;
                Ok(value)
            }
            Err(err) => {
                tracing::warn!("transaction body failed, rolling back");
                if let Err(rollback) = bound.rollback().await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Convert a driver failure with the installed translator.
    pub fn translate(&self, ctx: &RequestContext, err: StatementError) -> DataError {
        self.inner.translator.translate(ctx, err)
    }

    /// Close the pool. Safe to call more than once.
    pub async fn close(&self) {
        if !self.inner.pool.is_closed() {
            tracing::info!("closing database pool");
        }
        self.inner.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.pool.is_closed()
    }

    pub fn pool(&self) -> &AnyPool {
        &self.inner.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.inner.dialect
    }

    /// Table name for `T` with the configured prefix.
    pub fn table_name<T: Entity>(&self) -> String {
        format!("{}{}", self.inner.table_prefix, T::table_name())
    }

    /// A query builder over `T`'s table, set up for this database.
    pub fn query<T: Entity>(&self) -> QueryBuilder {
        self.query_table(T::table_name())
    }

    /// A query builder over `table` (prefix applied).
    pub fn query_table(&self, table: &str) -> QueryBuilder {
        QueryBuilder::new_with_dialect(
            &format!("{}{}", self.inner.table_prefix, table),
            self.inner.dialect,
        )
        .identifier_policy(self.inner.identifier_policy)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("dialect", &self.inner.dialect)
            .field("table_prefix", &self.inner.table_prefix)
            .field("closed", &self.inner.pool.is_closed())
            .finish_non_exhaustive()
    }
}
