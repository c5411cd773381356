//! # repokit-data: backend-agnostic data model
//!
//! Entity description, filter conditions, paging policy, SQL rendering and
//! the generic [`Repository`] contract. Backends (e.g. `repokit-sqlx`)
//! implement the contract on top of a real database driver.

pub mod changes;
pub mod condition;
pub mod entity;
pub mod error;
pub mod page;
pub mod query;
pub mod repository;
pub mod value;

pub use changes::Changes;
pub use condition::{has_filter, Condition, OrderColumn};
pub use entity::{Entity, Related};
pub use error::DataError;
pub use page::{Limit, Page, Window, DEFAULT_PAGE_SIZE, MAX_WINDOW};
pub use query::{Dialect, IdentifierPolicy, QueryBuilder, QueryError, Statement};
pub use repository::Repository;
pub use value::{IntoValues, Operand, Value};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{Changes, Condition, DataError, Entity, Limit, Page, Repository, Value};
}
