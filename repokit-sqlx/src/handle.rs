use crate::error::{cancelled, timed_out, transaction_finished, StatementError};
use crate::tx::BoundTx;
use repokit_data::{Statement, Value};
use sqlx::any::{AnyQueryResult, AnyRow};
use sqlx::{AnyPool, FromRow};
use std::future::Future;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Binds every value of a statement, in order, onto an sqlx query.
macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for value in $params {
            query = match value {
                Value::Null => query.bind(Option::<String>::None),
                Value::Bool(b) => query.bind(*b),
                Value::Int(i) => query.bind(*i),
                Value::Float(f) => query.bind(*f),
                Value::Text(s) => query.bind(s.clone()),
                Value::Timestamp(ts) => query.bind(ts.to_rfc3339()),
            };
        }
        query
    }};
}

/// Where a handle sends its statements.
enum Target {
    Pool(AnyPool),
    Transaction(BoundTx),
}

/// A request-scoped executor for single statements.
///
/// Obtained from [`Database::handle`](crate::Database::handle) at the start of
/// every operation. Runs on the bound transaction when the request context
/// carries one, on the pool otherwise, and gives up as soon as the context is
/// cancelled or its deadline passes.
pub struct Handle {
    target: Target,
    cancel: CancellationToken,
    deadline: Option<Instant>,
    log_statements: bool,
}

impl Handle {
    pub(crate) fn pool(
        pool: AnyPool,
        cancel: CancellationToken,
        deadline: Option<Instant>,
        log_statements: bool,
    ) -> Self {
        Self {
            target: Target::Pool(pool),
            cancel,
            deadline,
            log_statements,
        }
    }

    pub(crate) fn transaction(
        tx: BoundTx,
        cancel: CancellationToken,
        deadline: Option<Instant>,
        log_statements: bool,
    ) -> Self {
        Self {
            target: Target::Transaction(tx),
            cancel,
            deadline,
            log_statements,
        }
    }

    pub fn in_transaction(&self) -> bool {
        matches!(self.target, Target::Transaction(_))
    }

    /// Run a statement that returns no rows.
    pub async fn execute(&self, stmt: &Statement) -> Result<AnyQueryResult, StatementError> {
        let query = bind_params!(sqlx::query(&stmt.sql), &stmt.params);
        let fut = async {
            match &self.target {
                Target::Pool(pool) => query.execute(pool).await,
                Target::Transaction(tx) => {
                    let mut guard = tx.lock().await;
                    let conn = (*guard).as_mut().ok_or_else(transaction_finished)?;
                    query.execute(&mut **conn).await
                }
            }
        };
        self.run(stmt, fut).await
    }

    pub async fn fetch_all<O>(&self, stmt: &Statement) -> Result<Vec<O>, StatementError>
    where
        O: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        let query = bind_params!(sqlx::query_as::<_, O>(&stmt.sql), &stmt.params);
        let fut = async {
            match &self.target {
                Target::Pool(pool) => query.fetch_all(pool).await,
                Target::Transaction(tx) => {
                    let mut guard = tx.lock().await;
                    let conn = (*guard).as_mut().ok_or_else(transaction_finished)?;
                    query.fetch_all(&mut **conn).await
                }
            }
        };
        self.run(stmt, fut).await
    }

    /// Fetch exactly one row; no row is `sqlx::Error::RowNotFound`.
    pub async fn fetch_one<O>(&self, stmt: &Statement) -> Result<O, StatementError>
    where
        O: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
    {
        let query = bind_params!(sqlx::query_as::<_, O>(&stmt.sql), &stmt.params);
        let fut = async {
            match &self.target {
                Target::Pool(pool) => query.fetch_one(pool).await,
                Target::Transaction(tx) => {
                    let mut guard = tx.lock().await;
                    let conn = (*guard).as_mut().ok_or_else(transaction_finished)?;
                    query.fetch_one(&mut **conn).await
                }
            }
        };
        self.run(stmt, fut).await
    }

    /// First column of the first row as an integer (e.g. `COUNT(*)`).
    pub async fn fetch_scalar(&self, stmt: &Statement) -> Result<i64, StatementError> {
        let query = bind_params!(sqlx::query_scalar::<_, i64>(&stmt.sql), &stmt.params);
        let fut = async {
            match &self.target {
                Target::Pool(pool) => query.fetch_one(pool).await,
                Target::Transaction(tx) => {
                    let mut guard = tx.lock().await;
                    let conn = (*guard).as_mut().ok_or_else(transaction_finished)?;
                    query.fetch_one(&mut **conn).await
                }
            }
        };
        self.run(stmt, fut).await
    }

    /// First column of every row as an integer (e.g. `RETURNING id`).
    pub async fn fetch_scalars(&self, stmt: &Statement) -> Result<Vec<i64>, StatementError> {
        let query = bind_params!(sqlx::query_scalar::<_, i64>(&stmt.sql), &stmt.params);
        let fut = async {
            match &self.target {
                Target::Pool(pool) => query.fetch_all(pool).await,
                Target::Transaction(tx) => {
                    let mut guard = tx.lock().await;
                    let conn = (*guard).as_mut().ok_or_else(transaction_finished)?;
                    query.fetch_all(&mut **conn).await
                }
            }
        };
        self.run(stmt, fut).await
    }

    /// Drive `fut` under the request's cancellation token and deadline.
    async fn run<R>(
        &self,
        stmt: &Statement,
        fut: impl Future<Output = Result<R, sqlx::Error>>,
    ) -> Result<R, StatementError> {
        let span = tracing::debug_span!("db.statement", db.statement = %stmt.sql);
        async {
            if self.log_statements {
                tracing::debug!(sql = %stmt.sql, params = stmt.params.len(), "executing statement");
            }
            if self.deadline.is_some_and(|at| Instant::now() >= at) {
                return Err(StatementError::new(&stmt.sql, timed_out()));
            }
            let bounded = async {
                match self.deadline {
                    Some(at) => tokio::time::timeout_at(at, fut)
                        .await
                        .unwrap_or_else(|_| Err(timed_out())),
                    None => fut.await,
                }
            };
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(cancelled()),
                result = bounded => result,
            };
            result.map_err(|source| StatementError::new(&stmt.sql, source))
        }
        .instrument(span)
        .await
    }
}
