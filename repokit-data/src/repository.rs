use crate::changes::Changes;
use crate::condition::Condition;
use crate::entity::Entity;
use crate::error::DataError;
use crate::page::{Limit, Page};
use std::future::Future;

/// Generic async repository trait for CRUD, query and transaction operations.
///
/// Every operation takes the request context first; the context decides
/// which connection (pool or active transaction) runs the statement.
///
/// Uses RPITIT (return-position `impl Trait` in traits), no `async-trait` needed.
pub trait Repository<T: Entity>: Send + Sync {
    /// Request-scoped state: cancellation, deadline, bound transaction.
    type Context: Send + Sync;
    /// The connection provider backing this repository.
    type Provider: Send + Sync;

    fn create(&self, ctx: &Self::Context, entity: &mut T) -> impl Future<Output = Result<(), DataError>> + Send;

    /// Insert all entities in one statement.
    fn create_many(&self, ctx: &Self::Context, entities: &mut [T]) -> impl Future<Output = Result<(), DataError>> + Send;

    fn find_many(
        &self,
        ctx: &Self::Context,
        limit: &Limit,
        conditions: &[Condition],
    ) -> impl Future<Output = Result<Page<T>, DataError>> + Send;

    fn find_one(&self, ctx: &Self::Context, id: u64) -> impl Future<Output = Result<T, DataError>> + Send;

    fn find_one_by(&self, ctx: &Self::Context, conditions: &[Condition]) -> impl Future<Output = Result<T, DataError>> + Send;

    fn count(&self, ctx: &Self::Context, conditions: &[Condition]) -> impl Future<Output = Result<u64, DataError>> + Send;

    /// Deleting a missing id is not an error.
    fn delete_one(&self, ctx: &Self::Context, id: u64) -> impl Future<Output = Result<(), DataError>> + Send;

    /// Fails with [`DataError::InvalidArgument`] unless at least one filter is given.
    fn delete_by(&self, ctx: &Self::Context, conditions: &[Condition]) -> impl Future<Output = Result<(), DataError>> + Send;

    /// Full-record update, related records included.
    fn update(&self, ctx: &Self::Context, id: u64, entity: &T) -> impl Future<Output = Result<(), DataError>> + Send;

    fn update_columns(&self, ctx: &Self::Context, id: u64, changes: &Changes) -> impl Future<Output = Result<(), DataError>> + Send;

    /// Fails with [`DataError::InvalidArgument`] unless at least one filter is given.
    fn update_columns_by(
        &self,
        ctx: &Self::Context,
        conditions: &[Condition],
        changes: &Changes,
    ) -> impl Future<Output = Result<(), DataError>> + Send;

    /// Run `body` in a transaction: commit on `Ok`, roll back on `Err`.
    fn exec_tx<F, Fut, R, E>(&self, ctx: &Self::Context, body: F) -> impl Future<Output = Result<R, E>> + Send
    where
        F: FnOnce(Self::Context) -> Fut + Send,
        Fut: Future<Output = Result<R, E>> + Send,
        R: Send,
        E: From<DataError> + Send;

    fn database(&self) -> &Self::Provider;

    /// A zero-valued entity.
    fn model(&self) -> T
    where
        T: Default,
    {
        T::default()
    }
}
