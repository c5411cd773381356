use crate::condition::{Condition, OrderColumn};
use crate::page::{Window, MAX_WINDOW};
use crate::value::Value;

/// A fluent query builder for SELECT, COUNT, INSERT, UPDATE and DELETE statements.
///
/// Filters are combined with `AND`. Identifiers are validated (and optionally
/// quoted) according to the [`IdentifierPolicy`]; raw SQL conditions are
/// passed through untouched.
///
/// # Example
///
/// ```ignore
/// let stmt = QueryBuilder::new("users")
///     .filter(Condition::eq("email", "a@b.com"))
///     .filter(Condition::like("name", "%alice%"))
///     .order_by("id", true)
///     .limit(10)
///     .build_select(&["*"])?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Generic SQL using `?` placeholders (default).
    Generic,
    /// SQLite-style `?` placeholders.
    Sqlite,
    /// MySQL-style `?` placeholders with backtick quoting.
    MySql,
    /// Postgres-style `$1, $2, ...` placeholders.
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Generic | Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }

    /// Whether `INSERT ... RETURNING` is available.
    pub fn supports_returning(self) -> bool {
        matches!(self, Dialect::Postgres | Dialect::Sqlite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierPolicy {
    /// Do not validate or quote identifiers.
    Raw,
    /// Validate identifiers against a conservative pattern.
    Validate,
    /// Validate and quote identifiers using the dialect quoting style.
    Quote,
}

/// Rendered SQL plus its bind values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    conditions: Vec<Condition>,
    order: Vec<OrderColumn>,
    limit_val: Option<u64>,
    offset_val: Option<u64>,
    dialect: Dialect,
    identifier_policy: IdentifierPolicy,
}

/// Hands out placeholders and collects the matching bind values.
struct Binder {
    dialect: Dialect,
    params: Vec<Value>,
}

impl Binder {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            params: Vec::new(),
        }
    }

    /// Placeholder for `value`, or an inline `NULL`.
    ///
    /// Timestamps travel as RFC 3339 text, so Postgres and MySQL get an
    /// explicit cast back to their timestamp type.
    fn bind(&mut self, value: &Value) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        self.params.push(value.clone());
        let placeholder = self.dialect.placeholder(self.params.len());
        match (value, self.dialect) {
            (Value::Timestamp(_), Dialect::Postgres) => format!("CAST({placeholder} AS TIMESTAMPTZ)"),
            (Value::Timestamp(_), Dialect::MySql) => format!("CAST({placeholder} AS DATETIME)"),
            _ => placeholder,
        }
    }

    fn finish(self, sql: String) -> Statement {
        Statement {
            sql,
            params: self.params,
        }
    }
}

impl QueryBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            conditions: Vec::new(),
            order: Vec::new(),
            limit_val: None,
            offset_val: None,
            dialect: Dialect::Generic,
            identifier_policy: IdentifierPolicy::Validate,
        }
    }

    /// Create a new builder with an explicit SQL dialect.
    pub fn new_with_dialect(table: &str, dialect: Dialect) -> Self {
        Self::new(table).dialect(dialect)
    }

    /// Set the SQL dialect (affects placeholder style and quoting).
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Configure identifier validation/quoting behavior.
    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = policy;
        self
    }

    /// Add one condition. `OrderBy` entries become sort clauses.
    pub fn filter(mut self, condition: Condition) -> Self {
        match condition {
            Condition::OrderBy(columns) => self.order.extend(columns),
            other => self.conditions.push(other),
        }
        self
    }

    /// Add every condition in order.
    pub fn conditions(self, conditions: &[Condition]) -> Self {
        conditions
            .iter()
            .cloned()
            .fold(self, |builder, c| builder.filter(c))
    }

    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Condition::Equal(column.to_string(), value.into()))
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(OrderColumn {
            column: column.to_string(),
            descending: !ascending,
        });
        self
    }

    pub fn has_filters(&self) -> bool {
        !self.conditions.is_empty()
    }

    pub fn has_order(&self) -> bool {
        !self.order.is_empty()
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_val = Some(offset);
        self
    }

    pub fn window(mut self, window: Window) -> Self {
        self.limit_val = window.limit;
        self.offset_val = window.offset;
        self
    }

    /// Build a SELECT statement over `columns` (e.g. `&["*"]` or `&["id", "name"]`).
    pub fn build_select(&self, columns: &[&str]) -> Result<Statement, QueryError> {
        let table = self.table_ident()?;
        let columns = self.format_column_list(columns)?;

        let mut sql = format!("SELECT {columns} FROM {table}");
        let mut binder = Binder::new(self.dialect);
        self.append_where(&mut sql, &mut binder)?;
        self.append_order(&mut sql)?;
        self.append_limit_offset(&mut sql);
        Ok(binder.finish(sql))
    }

    /// Build a COUNT statement. Ordering and paging are ignored.
    pub fn build_count(&self) -> Result<Statement, QueryError> {
        let table = self.table_ident()?;
        let mut sql = format!("SELECT COUNT(*) FROM {table}");
        let mut binder = Binder::new(self.dialect);
        self.append_where(&mut sql, &mut binder)?;
        Ok(binder.finish(sql))
    }

    /// Build a DELETE statement. Ordering and paging are ignored.
    pub fn build_delete(&self) -> Result<Statement, QueryError> {
        let table = self.table_ident()?;
        let mut sql = format!("DELETE FROM {table}");
        let mut binder = Binder::new(self.dialect);
        self.append_where(&mut sql, &mut binder)?;
        Ok(binder.finish(sql))
    }

    /// Build an UPDATE statement assigning each `(column, value)` pair.
    pub fn build_update(&self, assignments: &[(String, Value)]) -> Result<Statement, QueryError> {
        if assignments.is_empty() {
            return Err(QueryError::Empty("update assignments"));
        }
        let table = self.table_ident()?;
        let mut binder = Binder::new(self.dialect);
        let mut sets = Vec::with_capacity(assignments.len());
        for (col, val) in assignments {
            let col = self.format_identifier(col, false, "column")?;
            let placeholder = binder.bind(val);
            sets.push(format!("{col} = {placeholder}"));
        }
        let mut sql = format!("UPDATE {table} SET {}", sets.join(", "));
        self.append_where(&mut sql, &mut binder)?;
        Ok(binder.finish(sql))
    }

    /// Build a (possibly multi-row) INSERT. Every row must match `columns`.
    pub fn build_insert(&self, columns: &[&str], rows: &[Vec<Value>]) -> Result<Statement, QueryError> {
        if columns.is_empty() {
            return Err(QueryError::Empty("insert columns"));
        }
        if rows.is_empty() {
            return Err(QueryError::Empty("insert rows"));
        }
        let table = self.table_ident()?;
        let column_list = self.format_column_list(columns)?;
        let mut binder = Binder::new(self.dialect);
        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != columns.len() {
                return Err(QueryError::ArityMismatch {
                    expected: columns.len(),
                    found: row.len(),
                });
            }
            let placeholders: Vec<_> = row.iter().map(|v| binder.bind(v)).collect();
            tuples.push(format!("({})", placeholders.join(", ")));
        }
        let sql = format!("INSERT INTO {table} ({column_list}) VALUES {}", tuples.join(", "));
        Ok(binder.finish(sql))
    }

    /// Build an INSERT that reports `returning` for every inserted row.
    pub fn build_insert_returning(
        &self,
        columns: &[&str],
        rows: &[Vec<Value>],
        returning: &str,
    ) -> Result<Statement, QueryError> {
        if !self.dialect.supports_returning() {
            return Err(QueryError::Unsupported("INSERT ... RETURNING"));
        }
        let mut stmt = self.build_insert(columns, rows)?;
        let returning = self.format_identifier(returning, false, "column")?;
        stmt.sql.push_str(&format!(" RETURNING {returning}"));
        Ok(stmt)
    }

    /// Build an insert-or-update keyed on `key_column`, which must be one of `columns`.
    pub fn build_upsert(
        &self,
        key_column: &str,
        columns: &[&str],
        row: Vec<Value>,
    ) -> Result<Statement, QueryError> {
        let mut stmt = self.build_insert(columns, &[row])?;
        let key = self.format_identifier(key_column, false, "column")?;
        let mut updates = Vec::new();
        for col in columns.iter().filter(|c| **c != key_column) {
            let col = self.format_identifier(col, false, "column")?;
            updates.push(match self.dialect {
                Dialect::MySql => format!("{col} = VALUES({col})"),
                _ => format!("{col} = excluded.{col}"),
            });
        }
        let clause = match (self.dialect, updates.is_empty()) {
            (Dialect::MySql, true) => format!(" ON DUPLICATE KEY UPDATE {key} = {key}"),
            (Dialect::MySql, false) => format!(" ON DUPLICATE KEY UPDATE {}", updates.join(", ")),
            (_, true) => format!(" ON CONFLICT ({key}) DO NOTHING"),
            (_, false) => format!(" ON CONFLICT ({key}) DO UPDATE SET {}", updates.join(", ")),
        };
        stmt.sql.push_str(&clause);
        Ok(stmt)
    }

    fn table_ident(&self) -> Result<String, QueryError> {
        self.format_identifier(&self.table, false, "table")
    }

    fn append_where(&self, sql: &mut String, binder: &mut Binder) -> Result<(), QueryError> {
        if self.conditions.is_empty() {
            return Ok(());
        }
        let mut predicates = Vec::with_capacity(self.conditions.len());
        for cond in &self.conditions {
            predicates.push(self.render_predicate(cond, binder)?);
        }
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
        Ok(())
    }

    fn render_predicate(&self, cond: &Condition, binder: &mut Binder) -> Result<String, QueryError> {
        let predicate = match cond {
            Condition::Equal(col, val) => {
                let col = self.format_identifier(col, false, "column")?;
                if val.is_null() {
                    format!("{col} IS NULL")
                } else {
                    format!("{col} = {}", binder.bind(val))
                }
            }
            Condition::GreaterThan(col, val) => self.binary(col, ">", val, binder)?,
            Condition::GreaterOrEqual(col, val) => self.binary(col, ">=", val, binder)?,
            Condition::LessThan(col, val) => self.binary(col, "<", val, binder)?,
            Condition::LessOrEqual(col, val) => self.binary(col, "<=", val, binder)?,
            Condition::Like(col, pat) => self.binary(col, "LIKE", pat, binder)?,
            Condition::CaseInsensitiveLike(col, pat) => match self.dialect {
                Dialect::Postgres => self.binary(col, "ILIKE", pat, binder)?,
                _ => {
                    let col = self.format_identifier(col, false, "column")?;
                    format!("LOWER({col}) LIKE LOWER({})", binder.bind(pat))
                }
            },
            Condition::In(col, vals) => {
                let col = self.format_identifier(col, false, "column")?;
                if vals.is_empty() {
                    // An empty IN list matches nothing.
                    "1 = 0".to_string()
                } else {
                    let placeholders: Vec<_> = vals.iter().map(|v| binder.bind(v)).collect();
                    format!("{col} IN ({})", placeholders.join(", "))
                }
            }
            Condition::Raw { sql, params } => format!("({})", renumber_raw(sql, params, binder)),
            Condition::OrderBy(_) => unreachable!("order conditions are split off in filter()"),
        };
        Ok(predicate)
    }

    fn binary(
        &self,
        col: &str,
        op: &str,
        val: &Value,
        binder: &mut Binder,
    ) -> Result<String, QueryError> {
        let col = self.format_identifier(col, false, "column")?;
        Ok(format!("{col} {op} {}", binder.bind(val)))
    }

    fn append_order(&self, sql: &mut String) -> Result<(), QueryError> {
        if self.order.is_empty() {
            return Ok(());
        }
        sql.push_str(" ORDER BY ");
        let mut clauses = Vec::with_capacity(self.order.len());
        for OrderColumn { column, descending } in &self.order {
            let col = self.format_identifier(column, false, "column")?;
            if *descending {
                clauses.push(format!("{col} DESC"));
            } else {
                clauses.push(format!("{col} ASC"));
            }
        }
        sql.push_str(&clauses.join(", "));
        Ok(())
    }

    fn append_limit_offset(&self, sql: &mut String) {
        if let Some(limit) = self.limit_val {
            sql.push_str(&format!(" LIMIT {}", limit.min(MAX_WINDOW)));
        }
        if let Some(offset) = self.offset_val {
            sql.push_str(&format!(" OFFSET {}", offset.min(MAX_WINDOW)));
        }
    }

    fn format_column_list(&self, columns: &[&str]) -> Result<String, QueryError> {
        let mut out = Vec::with_capacity(columns.len());
        for col in columns {
            out.push(self.format_identifier(col, true, "column")?);
        }
        Ok(out.join(", "))
    }

    fn format_identifier(
        &self,
        ident: &str,
        allow_star: bool,
        kind: &'static str,
    ) -> Result<String, QueryError> {
        if matches!(self.identifier_policy, IdentifierPolicy::Raw) {
            return Ok(ident.to_string());
        }
        if !is_valid_identifier(ident, allow_star) {
            return Err(QueryError::InvalidIdentifier {
                kind,
                ident: ident.to_string(),
            });
        }
        match self.identifier_policy {
            IdentifierPolicy::Quote => Ok(quote_identifier(ident, self.dialect, allow_star)),
            IdentifierPolicy::Raw | IdentifierPolicy::Validate => Ok(ident.to_string()),
        }
    }
}

/// Replace each `?` in a raw fragment with a dialect placeholder, binding
/// `params` in order. A `?` inside a `'...'` literal is text, and extra `?`
/// beyond `params` are left as written.
fn renumber_raw(sql: &str, params: &[Value], binder: &mut Binder) -> String {
    if params.is_empty() {
        return sql.to_string();
    }
    let mut out = String::with_capacity(sql.len() + params.len() * 2);
    let mut remaining = params.iter();
    // A doubled '' inside a literal toggles twice, which leaves it quoted.
    let mut quoted = false;
    for c in sql.chars() {
        match c {
            '\'' => quoted = !quoted,
            '?' if !quoted => {
                if let Some(param) = remaining.next() {
                    out.push_str(&binder.bind(param));
                    continue;
                }
            }
            _ => {}
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
    Empty(&'static str),
    ArityMismatch { expected: usize, found: usize },
    Unsupported(&'static str),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            QueryError::Empty(what) => write!(f, "No {what} given"),
            QueryError::ArityMismatch { expected, found } => {
                write!(f, "Row has {found} values, expected {expected}")
            }
            QueryError::Unsupported(what) => write!(f, "{what} is not supported by this dialect"),
        }
    }
}

impl std::error::Error for QueryError {}

fn is_valid_identifier(ident: &str, allow_star: bool) -> bool {
    if ident.is_empty() {
        return false;
    }
    let parts: Vec<&str> = ident.split('.').collect();
    for (idx, part) in parts.iter().enumerate() {
        if allow_star && *part == "*" {
            return idx + 1 == parts.len();
        }
        if !is_valid_segment(part) {
            return false;
        }
    }
    true
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    for c in chars {
        if !(c.is_ascii_alphanumeric() || c == '_') {
            return false;
        }
    }
    true
}

fn quote_identifier(ident: &str, dialect: Dialect, allow_star: bool) -> String {
    let quote = dialect.quote_char();
    let parts: Vec<&str> = ident.split('.').collect();
    let last_idx = parts.len().saturating_sub(1);
    parts
        .into_iter()
        .enumerate()
        .map(|(idx, part)| {
            if allow_star && part == "*" && idx == last_idx {
                part.to_string()
            } else {
                format!("{quote}{part}{quote}")
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
