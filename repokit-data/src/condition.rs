use crate::value::{IntoValues, Operand, Value};

/// A single filter or ordering directive.
///
/// Every variant except [`Condition::OrderBy`] is a filter predicate; a list
/// of conditions is combined with `AND`. Conditions are plain data and carry
/// no execution logic; [`QueryBuilder`](crate::QueryBuilder) renders them.
///
/// # Example
///
/// ```ignore
/// let conditions = [
///     Condition::eq("status", "active"),
///     Condition::compare("age", 18, ">="),
///     Condition::is_in("role", ["admin", "owner"]),
///     Condition::desc("created_at"),
/// ];
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equal(String, Value),
    GreaterThan(String, Value),
    GreaterOrEqual(String, Value),
    LessThan(String, Value),
    LessOrEqual(String, Value),
    Like(String, Value),
    CaseInsensitiveLike(String, Value),
    In(String, Vec<Value>),
    /// A literal SQL fragment. `?` placeholders are bound from `params`.
    Raw { sql: String, params: Vec<Value> },
    OrderBy(Vec<OrderColumn>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderColumn {
    pub column: String,
    pub descending: bool,
}

impl OrderColumn {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: false,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: true,
        }
    }
}

impl Condition {
    /// Equality. A list operand becomes an `IN` predicate.
    pub fn eq(column: &str, operand: impl Into<Operand>) -> Self {
        match operand.into() {
            Operand::Scalar(v) => Condition::Equal(column.to_string(), v),
            Operand::List(values) => Condition::In(column.to_string(), values),
        }
    }

    /// Build a condition from an operator symbol.
    ///
    /// Recognized symbols are `>`, `>=`, `<`, `<=`, `like`, `ilike`, `in` and
    /// `expr` (where `column` is taken as raw SQL). Anything else is equality.
    pub fn compare(column: &str, operand: impl Into<Operand>, symbol: &str) -> Self {
        let operand = operand.into();
        let col = column.to_string();
        match symbol.trim().to_ascii_lowercase().as_str() {
            ">" => Condition::GreaterThan(col, operand.into_scalar()),
            ">=" => Condition::GreaterOrEqual(col, operand.into_scalar()),
            "<" => Condition::LessThan(col, operand.into_scalar()),
            "<=" => Condition::LessOrEqual(col, operand.into_scalar()),
            "like" => Condition::Like(col, operand.into_scalar()),
            "ilike" => Condition::CaseInsensitiveLike(col, operand.into_scalar()),
            "in" => Condition::In(col, operand.into_list()),
            "expr" => Condition::raw(column),
            _ => Condition::eq(column, operand),
        }
    }

    pub fn gt(column: &str, value: impl Into<Value>) -> Self {
        Condition::GreaterThan(column.to_string(), value.into())
    }

    pub fn gte(column: &str, value: impl Into<Value>) -> Self {
        Condition::GreaterOrEqual(column.to_string(), value.into())
    }

    pub fn lt(column: &str, value: impl Into<Value>) -> Self {
        Condition::LessThan(column.to_string(), value.into())
    }

    pub fn lte(column: &str, value: impl Into<Value>) -> Self {
        Condition::LessOrEqual(column.to_string(), value.into())
    }

    pub fn like(column: &str, pattern: impl Into<Value>) -> Self {
        Condition::Like(column.to_string(), pattern.into())
    }

    pub fn ilike(column: &str, pattern: impl Into<Value>) -> Self {
        Condition::CaseInsensitiveLike(column.to_string(), pattern.into())
    }

    pub fn is_in(column: &str, values: impl IntoValues) -> Self {
        Condition::In(column.to_string(), values.into_values())
    }

    pub fn raw(sql: &str) -> Self {
        Condition::Raw {
            sql: sql.to_string(),
            params: Vec::new(),
        }
    }

    pub fn raw_with(sql: &str, params: impl IntoValues) -> Self {
        Condition::Raw {
            sql: sql.to_string(),
            params: params.into_values(),
        }
    }

    pub fn order_by(columns: impl IntoIterator<Item = OrderColumn>) -> Self {
        Condition::OrderBy(columns.into_iter().collect())
    }

    pub fn asc(column: &str) -> Self {
        Condition::OrderBy(vec![OrderColumn::asc(column)])
    }

    pub fn desc(column: &str) -> Self {
        Condition::OrderBy(vec![OrderColumn::desc(column)])
    }

    pub fn is_order(&self) -> bool {
        matches!(self, Condition::OrderBy(_))
    }
}

/// Returns `true` if at least one condition is a filter predicate.
///
/// Bulk deletes and updates refuse to run without one.
pub fn has_filter(conditions: &[Condition]) -> bool {
    conditions.iter().any(|c| !c.is_order())
}
