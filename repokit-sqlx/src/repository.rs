use crate::context::RequestContext;
use crate::database::Database;
use crate::handle::Handle;
use repokit_data::entity::non_id_values;
use repokit_data::{
    has_filter, Changes, Condition, DataError, Entity, Limit, Page, Related, Repository, Value,
};
use sqlx::any::AnyRow;
use sqlx::FromRow;
use std::future::Future;
use std::marker::PhantomData;

/// A generic SQL-based repository implementation.
///
/// Stateless apart from the [`Database`] it was built from: every call asks
/// the database for a fresh [`Handle`] bound to the request context, so the
/// same repository serves plain and transactional requests alike.
///
/// # Example
///
/// ```ignore
/// let users = SqlxRepository::<User>::new(db.clone());
/// let page = users
///     .find_many(&ctx, &Limit::page(2, 10).with_count(), &[Condition::gt("age", 18)])
///     .await?;
/// ```
pub struct SqlxRepository<T> {
    db: Database,
    _marker: PhantomData<T>,
}

impl<T> SqlxRepository<T> {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for SqlxRepository<T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for SqlxRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxRepository")
            .field("entity", &std::any::type_name::<T>())
            .field("db", &self.db)
            .finish()
    }
}

impl<T> SqlxRepository<T>
where
    T: Entity + for<'r> FromRow<'r, AnyRow>,
{
    /// Insert `entities` in one statement and write back the assigned ids.
    async fn insert(&self, ctx: &RequestContext, entities: &mut [T]) -> Result<(), DataError> {
        if entities.is_empty() {
            return Err(DataError::invalid_argument("nothing to insert"));
        }
        let id_column = T::id_column();
        let assign_ids = entities.iter().all(|e| e.id() == 0);
        if !assign_ids && entities.iter().any(|e| e.id() == 0) {
            return Err(DataError::invalid_argument(
                "cannot mix new and pre-assigned ids in one insert",
            ));
        }

        let columns: Vec<&str> = T::columns()
            .iter()
            .copied()
            .filter(|c| !assign_ids || *c != id_column)
            .collect();
        let rows: Vec<Vec<Value>> = entities
            .iter()
            .map(|e| {
                if assign_ids {
                    non_id_values(e).into_iter().map(|(_, v)| v).collect()
                } else {
                    e.values()
                }
            })
            .collect();

        let query = self.db.query::<T>();
        let handle = self.db.handle(ctx);
        if !assign_ids {
            let stmt = query.build_insert(&columns, &rows)?;
            handle
                .execute(&stmt)
                .await
                .map_err(|e| self.db.translate(ctx, e))?;
            return Ok(());
        }

        if self.db.dialect().supports_returning() {
            let stmt = query.build_insert_returning(&columns, &rows, id_column)?;
            let ids = handle
                .fetch_scalars(&stmt)
                .await
                .map_err(|e| self.db.translate(ctx, e))?;
            if ids.len() != entities.len() {
                return Err(DataError::Other(format!(
                    "inserted {} rows but {} ids were returned",
                    entities.len(),
                    ids.len()
                )));
            }
            for (entity, id) in entities.iter_mut().zip(ids) {
                entity.set_id(id as u64);
            }
        } else {
            let stmt = query.build_insert(&columns, &rows)?;
            let result = handle
                .execute(&stmt)
                .await
                .map_err(|e| self.db.translate(ctx, e))?;
            // Multi-row inserts report the first generated id.
            let first = result.last_insert_id().ok_or_else(|| {
                DataError::Other("database did not report the inserted id".into())
            })?;
            for (offset, entity) in entities.iter_mut().enumerate() {
                entity.set_id(first as u64 + offset as u64);
            }
        }
        Ok(())
    }

    /// Full-record update followed by the deep save of `related`.
    async fn save(
        &self,
        ctx: &RequestContext,
        id: u64,
        entity: &T,
        related: &[Related],
    ) -> Result<(), DataError> {
        let assignments: Vec<(String, Value)> = non_id_values(entity)
            .into_iter()
            .map(|(col, v)| (col.to_string(), v))
            .collect();
        let stmt = self
            .db
            .query::<T>()
            .where_eq(T::id_column(), id)
            .build_update(&assignments)?;
        let handle = self.db.handle(ctx);
        handle
            .execute(&stmt)
            .await
            .map_err(|e| self.db.translate(ctx, e))?;

        for record in related {
            self.save_related(ctx, &handle, record).await?;
        }
        Ok(())
    }

    async fn save_related(
        &self,
        ctx: &RequestContext,
        handle: &Handle,
        record: &Related,
    ) -> Result<(), DataError> {
        let query = self.db.query_table(record.table);
        let mut columns: Vec<&str> = record.columns.iter().map(|(c, _)| *c).collect();
        let mut row: Vec<Value> = record.columns.iter().map(|(_, v)| v.clone()).collect();
        let stmt = if record.id == 0 {
            query.build_insert(&columns, &[row])?
        } else {
            columns.insert(0, record.id_column);
            row.insert(0, Value::from(record.id));
            query.build_upsert(record.id_column, &columns, row)?
        };
        tracing::debug!(table = record.table, id = record.id, "saving related record");
        let result = handle
            .execute(&stmt)
            .await
            .map_err(|e| self.db.translate(ctx, e))?;
        if record.id == 0 {
            tracing::debug!(
                table = record.table,
                assigned_id = ?result.last_insert_id(),
                "inserted related record"
            );
        }
        Ok(())
    }

    async fn fetch_count(
        &self,
        ctx: &RequestContext,
        handle: &Handle,
        conditions: &[Condition],
    ) -> Result<u64, DataError> {
        let stmt = self.db.query::<T>().conditions(conditions).build_count()?;
        let total = handle
            .fetch_scalar(&stmt)
            .await
            .map_err(|e| self.db.translate(ctx, e))?;
        Ok(total.max(0) as u64)
    }
}

impl<T> Repository<T> for SqlxRepository<T>
where
    T: Entity + for<'r> FromRow<'r, AnyRow>,
{
    type Context = RequestContext;
    type Provider = Database;

    async fn create(&self, ctx: &RequestContext, entity: &mut T) -> Result<(), DataError> {
        self.insert(ctx, std::slice::from_mut(entity)).await
    }

    async fn create_many(&self, ctx: &RequestContext, entities: &mut [T]) -> Result<(), DataError> {
        self.insert(ctx, entities).await
    }

    async fn find_many(
        &self,
        ctx: &RequestContext,
        limit: &Limit,
        conditions: &[Condition],
    ) -> Result<Page<T>, DataError> {
        let handle = self.db.handle(ctx);
        let total = if limit.want_count {
            Some(self.fetch_count(ctx, &handle, conditions).await?)
        } else {
            None
        };

        let mut query = self.db.query::<T>().conditions(conditions);
        if !limit.all && !query.has_order() {
            query = query.order_by(T::id_column(), true);
        }
        let stmt = query.window(limit.window()).build_select(T::columns())?;
        let content = handle
            .fetch_all::<T>(&stmt)
            .await
            .map_err(|e| self.db.translate(ctx, e))?;
        Ok(Page::new(content, limit, total))
    }

    async fn find_one(&self, ctx: &RequestContext, id: u64) -> Result<T, DataError> {
        let stmt = self
            .db
            .query::<T>()
            .where_eq(T::id_column(), id)
            .build_select(T::columns())?;
        self.db
            .handle(ctx)
            .fetch_one::<T>(&stmt)
            .await
            .map_err(|e| self.db.translate(ctx, e))
    }

    async fn find_one_by(&self, ctx: &RequestContext, conditions: &[Condition]) -> Result<T, DataError> {
        let mut query = self.db.query::<T>().conditions(conditions);
        if !query.has_order() {
            query = query.order_by(T::id_column(), true);
        }
        let stmt = query.limit(1).build_select(T::columns())?;
        self.db
            .handle(ctx)
            .fetch_one::<T>(&stmt)
            .await
            .map_err(|e| self.db.translate(ctx, e))
    }

    async fn count(&self, ctx: &RequestContext, conditions: &[Condition]) -> Result<u64, DataError> {
        let handle = self.db.handle(ctx);
        self.fetch_count(ctx, &handle, conditions).await
    }

    async fn delete_one(&self, ctx: &RequestContext, id: u64) -> Result<(), DataError> {
        let stmt = self
            .db
            .query::<T>()
            .where_eq(T::id_column(), id)
            .build_delete()?;
        self.db
            .handle(ctx)
            .execute(&stmt)
            .await
            .map_err(|e| self.db.translate(ctx, e))?;
        Ok(())
    }

    async fn delete_by(&self, ctx: &RequestContext, conditions: &[Condition]) -> Result<(), DataError> {
        if !has_filter(conditions) {
            return Err(DataError::invalid_argument(
                "delete_by requires at least one filter condition",
            ));
        }
        let stmt = self.db.query::<T>().conditions(conditions).build_delete()?;
        self.db
            .handle(ctx)
            .execute(&stmt)
            .await
            .map_err(|e| self.db.translate(ctx, e))?;
        Ok(())
    }

    async fn update(&self, ctx: &RequestContext, id: u64, entity: &T) -> Result<(), DataError> {
        let related = entity.related();
        if related.is_empty() || ctx.in_transaction() {
            return self.save(ctx, id, entity, &related).await;
        }
        self.db
            .run_in_transaction(ctx, |tx_ctx| async move {
                self.save(&tx_ctx, id, entity, &related).await
            })
            .await
    }

    async fn update_columns(&self, ctx: &RequestContext, id: u64, changes: &Changes) -> Result<(), DataError> {
        if changes.is_empty() {
            return Err(DataError::invalid_argument("no columns to update"));
        }
        let stmt = self
            .db
            .query::<T>()
            .where_eq(T::id_column(), id)
            .build_update(changes.as_slice())?;
        self.db
            .handle(ctx)
            .execute(&stmt)
            .await
            .map_err(|e| self.db.translate(ctx, e))?;
        Ok(())
    }

    async fn update_columns_by(
        &self,
        ctx: &RequestContext,
        conditions: &[Condition],
        changes: &Changes,
    ) -> Result<(), DataError> {
        if !has_filter(conditions) {
            return Err(DataError::invalid_argument(
                "update_columns_by requires at least one filter condition",
            ));
        }
        if changes.is_empty() {
            return Err(DataError::invalid_argument("no columns to update"));
        }
        let stmt = self
            .db
            .query::<T>()
            .conditions(conditions)
            .build_update(changes.as_slice())?;
        self.db
            .handle(ctx)
            .execute(&stmt)
            .await
            .map_err(|e| self.db.translate(ctx, e))?;
        Ok(())
    }

    async fn exec_tx<F, Fut, R, E>(&self, ctx: &RequestContext, body: F) -> Result<R, E>
    where
        F: FnOnce(RequestContext) -> Fut + Send,
        Fut: Future<Output = Result<R, E>> + Send,
        R: Send,
        E: From<DataError> + Send,
    {
        self.db.run_in_transaction(ctx, body).await
    }

    fn database(&self) -> &Database {
        &self.db
    }
}
