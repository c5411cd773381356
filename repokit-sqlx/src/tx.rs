//! Transaction slot shared between a transactional [`RequestContext`] and
//! the provider that opened it.
//!
//! The slot is emptied when the transaction finishes, so a context that
//! outlives its transaction fails on use instead of falling back to the pool.
//!
//! [`RequestContext`]: crate::RequestContext

use sqlx::{Any, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct BoundTx(Arc<Mutex<Option<Transaction<'static, Any>>>>);

impl BoundTx {
    pub(crate) fn new(tx: Transaction<'static, Any>) -> Self {
        Self(Arc::new(Mutex::new(Some(tx))))
    }

    /// Exclusive access to the transaction; `None` once it has finished.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Option<Transaction<'static, Any>>> {
        self.0.lock().await
    }

    pub(crate) async fn commit(&self) -> Result<(), sqlx::Error> {
        let tx = self.0.lock().await.take();
        match tx {
            Some(tx) => tx.commit().await,
            None => Ok(()),
        }
    }

    pub(crate) async fn rollback(&self) -> Result<(), sqlx::Error> {
        let tx = self.0.lock().await.take();
        match tx {
            Some(tx) => tx.rollback().await,
            None => Ok(()),
        }
    }
}
