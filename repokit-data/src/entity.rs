use crate::value::Value;

/// Trait representing a database entity with a table name, id column, and column list.
///
/// The primary key is an unsigned integer. A zero id means "not yet
/// persisted": inserts leave the column out and write back the id the
/// database assigned.
///
/// # Example
///
/// ```ignore
/// impl Entity for UserEntity {
///     fn table_name() -> &'static str { "users" }
///     fn columns() -> &'static [&'static str] { &["id", "name", "email"] }
///     fn id(&self) -> u64 { self.id }
///     fn set_id(&mut self, id: u64) { self.id = id }
///     fn values(&self) -> Vec<Value> {
///         vec![self.id.into(), self.name.clone().into(), self.email.clone().into()]
///     }
/// }
/// ```
pub trait Entity: Send + Sync + Unpin + 'static {
    fn table_name() -> &'static str;

    fn id_column() -> &'static str {
        "id"
    }

    /// All persisted columns, id column included.
    fn columns() -> &'static [&'static str];

    fn id(&self) -> u64;

    fn set_id(&mut self, id: u64);

    /// Column values, in the same order as [`Entity::columns`].
    fn values(&self) -> Vec<Value>;

    /// Associated records saved together with this one on a full update.
    ///
    /// A record with id 0 is inserted, any other id is upserted. Ids the
    /// database assigns to inserted records are not written back to the
    /// owning entity; reload the associations to pick them up.
    fn related(&self) -> Vec<Related> {
        Vec::new()
    }
}

/// A record owned by an entity and persisted alongside it.
///
/// Saved by primary key: updated when it already exists, inserted otherwise.
/// A zero `id` always inserts.
#[derive(Debug, Clone, PartialEq)]
pub struct Related {
    pub table: &'static str,
    pub id_column: &'static str,
    pub id: u64,
    /// Non-id columns.
    pub columns: Vec<(&'static str, Value)>,
}

impl Related {
    pub fn new(table: &'static str, id: u64) -> Self {
        Self {
            table,
            id_column: "id",
            id,
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.columns.push((name, value.into()));
        self
    }
}

/// Pairs an entity's non-id columns with their values.
pub fn non_id_values<T: Entity>(entity: &T) -> Vec<(&'static str, Value)> {
    let id_column = T::id_column();
    T::columns()
        .iter()
        .copied()
        .zip(entity.values())
        .filter(|(col, _)| *col != id_column)
        .collect()
}
