use crate::context::RequestContext;
use repokit_data::DataError;
use std::io;

/// A driver failure together with the statement that produced it.
#[derive(Debug)]
pub struct StatementError {
    pub sql: String,
    pub source: sqlx::Error,
}

impl StatementError {
    pub fn new(sql: &str, source: sqlx::Error) -> Self {
        Self {
            sql: sql.to_string(),
            source,
        }
    }

    pub fn into_source(self) -> sqlx::Error {
        self.source
    }
}

impl std::fmt::Display for StatementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (statement: {})", self.source, self.sql)
    }
}

impl std::error::Error for StatementError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Turns driver failures into [`DataError`]s.
///
/// Installed on the [`Database`](crate::Database) through
/// [`DatabaseOptions::translator`](crate::DatabaseOptions::translator). Any
/// `Fn(&RequestContext, StatementError) -> DataError` closure qualifies.
pub trait ErrorTranslator: Send + Sync {
    fn translate(&self, ctx: &RequestContext, err: StatementError) -> DataError;
}

impl<F> ErrorTranslator for F
where
    F: Fn(&RequestContext, StatementError) -> DataError + Send + Sync,
{
    fn translate(&self, ctx: &RequestContext, err: StatementError) -> DataError {
        self(ctx, err)
    }
}

/// The default translator: the raw driver error, unchanged, in `DataError::Database`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl ErrorTranslator for Passthrough {
    fn translate(&self, _ctx: &RequestContext, err: StatementError) -> DataError {
        DataError::database(err.into_source())
    }
}

/// Classifies driver failures with [`SqlxErrorExt::into_data_error`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifying;

impl ErrorTranslator for Classifying {
    fn translate(&self, _ctx: &RequestContext, err: StatementError) -> DataError {
        tracing::debug!(sql = %err.sql, error = %err.source, "classifying statement failure");
        err.into_source().into_data_error()
    }
}

/// Extension trait for converting `sqlx::Error` into `DataError`.
///
/// Due to Rust's orphan rules, we can't implement `From<sqlx::Error> for DataError`
/// in this crate. Instead, use `.into_data_error()` or install [`Classifying`].
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        match &self {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".into()),
            sqlx::Error::Database(db) => match db.kind() {
                sqlx::error::ErrorKind::UniqueViolation
                | sqlx::error::ErrorKind::ForeignKeyViolation
                | sqlx::error::ErrorKind::NotNullViolation
                | sqlx::error::ErrorKind::CheckViolation => {
                    DataError::Constraint(db.message().to_string())
                }
                _ => DataError::database(self),
            },
            sqlx::Error::Io(e) if e.kind() == io::ErrorKind::TimedOut => {
                DataError::Timeout(e.to_string())
            }
            sqlx::Error::Io(e) if e.kind() == io::ErrorKind::Interrupted => {
                DataError::Cancelled(e.to_string())
            }
            sqlx::Error::PoolTimedOut => DataError::Timeout("Timed out acquiring a connection".into()),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => DataError::connection(self),
            _ => DataError::database(self),
        }
    }
}

/// Convenience alias for data-layer results using `DataError`.
pub type SqlxResult<T> = Result<T, DataError>;

pub(crate) fn timed_out() -> sqlx::Error {
    sqlx::Error::Io(io::Error::new(
        io::ErrorKind::TimedOut,
        "request deadline exceeded",
    ))
}

pub(crate) fn cancelled() -> sqlx::Error {
    sqlx::Error::Io(io::Error::new(
        io::ErrorKind::Interrupted,
        "request cancelled",
    ))
}

pub(crate) fn transaction_finished() -> sqlx::Error {
    sqlx::Error::Io(io::Error::new(
        io::ErrorKind::NotConnected,
        "transaction already finished",
    ))
}
