use crate::entity::{non_id_values, Entity};
use crate::value::Value;

/// An ordered set of column assignments for a partial update.
///
/// ```ignore
/// let changes = Changes::new().set("name", "Alice").set("age", 31);
/// repo.update_columns(&ctx, id, &changes).await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    columns: Vec<(String, Value)>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `value` to `column`, replacing an earlier assignment of the same column.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.columns.iter_mut().find(|(c, _)| c == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column.to_string(), value)),
        }
        self
    }

    /// The non-null, non-id columns of `entity`.
    pub fn from_entity<T: Entity>(entity: &T) -> Self {
        let columns = non_id_values(entity)
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(c, v)| (c.to_string(), v))
            .collect();
        Self { columns }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.columns.iter()
    }

    pub fn as_slice(&self) -> &[(String, Value)] {
        &self.columns
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Changes {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.iter()
            .fold(Changes::new(), |changes, (k, v)| changes.set(k, Value::from(v)))
    }
}

impl FromIterator<(String, Value)> for Changes {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Changes::new(), |changes, (k, v)| changes.set(&k, v))
    }
}
