use crate::query::QueryError;

/// Errors that can occur in the data layer.
///
/// Bulk operations without a filter fail with `InvalidArgument` before any
/// statement is issued. Everything the database reports goes through the
/// connection provider's translator, which picks the final variant: the
/// default translator keeps the raw driver error in `Database`.
#[derive(Debug)]
pub enum DataError {
    NotFound(String),
    InvalidArgument(String),
    Constraint(String),
    Timeout(String),
    Cancelled(String),
    /// Opening, committing or closing a pool or transaction failed.
    Connection(Box<dyn std::error::Error + Send + Sync>),
    Database(Box<dyn std::error::Error + Send + Sync>),
    Other(String),
}

impl DataError {
    /// Construct a `Database` variant from any error type.
    ///
    /// Used by backend crates (e.g. `repokit-sqlx`) to wrap driver-specific errors.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }

    pub fn connection(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Connection(Box::new(err))
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        DataError::InvalidArgument(msg.into())
    }

    /// True for `NotFound`, and for an untranslated driver "row not found".
    pub fn is_not_found(&self) -> bool {
        match self {
            DataError::NotFound(_) => true,
            DataError::Database(err) => matches!(
                err.downcast_ref::<sqlx::Error>(),
                Some(sqlx::Error::RowNotFound)
            ),
            _ => false,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, DataError::InvalidArgument(_))
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::NotFound(msg) => write!(f, "Not found: {msg}"),
            DataError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            DataError::Constraint(msg) => write!(f, "Constraint violation: {msg}"),
            DataError::Timeout(msg) => write!(f, "Timed out: {msg}"),
            DataError::Cancelled(msg) => write!(f, "Cancelled: {msg}"),
            DataError::Connection(err) => write!(f, "Connection error: {err}"),
            DataError::Database(err) => write!(f, "Database error: {err}"),
            DataError::Other(msg) => write!(f, "Data error: {msg}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) | DataError::Connection(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<QueryError> for DataError {
    fn from(err: QueryError) -> Self {
        DataError::InvalidArgument(err.to_string())
    }
}
