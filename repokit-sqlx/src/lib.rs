//! # repokit-sqlx: SQLx backend for the repokit data layer
//!
//! Implements the [`Repository`](repokit_data::Repository) contract from
//! `repokit-data` on top of [SQLx](https://github.com/launchbadge/sqlx)'s
//! runtime-selected `Any` driver.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Database`] | Connection provider: pool, transactions, error translation |
//! | [`RequestContext`] | Per-request cancellation, deadline and bound transaction |
//! | [`Handle`] | Statement executor handed out by [`Database::handle`] |
//! | [`SqlxRepository`] | Generic repository over any [`Entity`](repokit_data::Entity) |
//! | [`ErrorTranslator`] | Hook turning driver failures into `DataError` ([`Passthrough`], [`Classifying`]) |
//! | [`DatabaseOptions`] | Connection settings, loadable from YAML and the environment |
//! | [`Migration`] | Named SQL script applied at connect time |
//!
//! # Feature flags
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` (default) |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//! | `mysql`    | MySQL via `sqlx/mysql` |
//!
//! # Quick start
//!
//! ```ignore
//! use repokit_sqlx::prelude::*;
//!
//! let db = Database::connect(DatabaseOptions::load("application.yaml")?).await?;
//! let users = SqlxRepository::<User>::new(db.clone());
//! let ctx = RequestContext::new().with_timeout(Duration::from_secs(5));
//!
//! let mut alice = User::new("alice");
//! users.create(&ctx, &mut alice).await?;
//!
//! users
//!     .exec_tx(&ctx, |tx| async move {
//!         users.update_columns(&tx, alice.id, &Changes::new().set("active", true)).await?;
//!         users.delete_by(&tx, &[Condition::eq("name", "bob")]).await
//!     })
//!     .await?;
//! ```
//!
//! # Transactions
//!
//! [`Database::run_in_transaction`] (and `Repository::exec_tx`) begins a
//! transaction and hands the body a derived [`RequestContext`] bound to it.
//! Every repository call made with that context runs on the transaction; the
//! transaction commits when the body returns `Ok` and rolls back when it
//! returns `Err`. Using the context after the body has finished fails instead
//! of silently running on the pool.

pub mod context;
pub mod database;
pub mod error;
pub mod handle;
pub mod migrate;
pub mod options;
pub mod repository;
mod tx;

pub use context::RequestContext;
pub use database::Database;
pub use error::{Classifying, ErrorTranslator, Passthrough, SqlxErrorExt, SqlxResult, StatementError};
pub use handle::Handle;
pub use migrate::Migration;
pub use options::{DatabaseOptions, Driver, OptionsError};
pub use repository::SqlxRepository;

/// Re-exports of the most commonly used types from both `repokit-data` and this crate.
pub mod prelude {
    pub use crate::{Classifying, Database, DatabaseOptions, Driver, RequestContext, SqlxRepository};
    pub use repokit_data::prelude::*;
}
