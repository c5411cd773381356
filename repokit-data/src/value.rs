use chrono::{DateTime, Utc};

/// A scalar value bound to a statement parameter.
///
/// `Null` is never sent as a bind parameter: the query builder renders it
/// inline (`IS NULL`, `NULL`) so every backend sees the same SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

macro_rules! value_from_int {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )+
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

// Values above i64::MAX are kept as text rather than wrapped.
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or_else(|_| Value::Text(v.to_string()), Value::Int)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::from(v as u64)
    }
}

impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::from(u)
                } else {
                    n.as_f64().map_or(Value::Null, Value::Float)
                }
            }
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }
}

/// The right-hand side of a condition: either a single value or a list.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Scalar(Value),
    List(Vec<Value>),
}

impl Operand {
    /// Collapse to a single value. Lists yield their first element.
    pub fn into_scalar(self) -> Value {
        match self {
            Operand::Scalar(v) => v,
            Operand::List(values) => values.into_iter().next().unwrap_or(Value::Null),
        }
    }

    /// Expand to a list. A scalar becomes a one-element list.
    pub fn into_list(self) -> Vec<Value> {
        match self {
            Operand::Scalar(v) => vec![v],
            Operand::List(values) => values,
        }
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Scalar(v)
    }
}

impl From<Vec<Value>> for Operand {
    fn from(values: Vec<Value>) -> Self {
        Operand::List(values)
    }
}

/// Flattens a container of scalars into bind values.
///
/// This is the explicit conversion table used for `IN` lists: every supported
/// element type is listed below, and each element is converted by value.
pub trait IntoValues {
    fn into_values(self) -> Vec<Value>;
}

impl IntoValues for Vec<Value> {
    fn into_values(self) -> Vec<Value> {
        self
    }
}

impl IntoValues for &[Value] {
    fn into_values(self) -> Vec<Value> {
        self.to_vec()
    }
}

macro_rules! list_conversions {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::Scalar(v.into())
                }
            }

            impl IntoValues for Vec<$ty> {
                fn into_values(self) -> Vec<Value> {
                    self.into_iter().map(Value::from).collect()
                }
            }

            impl IntoValues for &[$ty] {
                fn into_values(self) -> Vec<Value> {
                    self.iter().cloned().map(Value::from).collect()
                }
            }

            impl<const N: usize> IntoValues for [$ty; N] {
                fn into_values(self) -> Vec<Value> {
                    self.into_iter().map(Value::from).collect()
                }
            }

            impl From<Vec<$ty>> for Operand {
                fn from(v: Vec<$ty>) -> Self {
                    Operand::List(v.into_values())
                }
            }

            impl From<&[$ty]> for Operand {
                fn from(v: &[$ty]) -> Self {
                    Operand::List(v.into_values())
                }
            }

            impl<const N: usize> From<[$ty; N]> for Operand {
                fn from(v: [$ty; N]) -> Self {
                    Operand::List(v.into_values())
                }
            }
        )+
    };
}

list_conversions!(
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    bool,
    String,
    &str,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_lists_flatten_by_value() {
        assert_eq!(
            vec![7i32, 8, 9].into_values(),
            vec![Value::Int(7), Value::Int(8), Value::Int(9)]
        );
        assert_eq!(
            [1.5f32, 2.5].into_values(),
            vec![Value::Float(1.5), Value::Float(2.5)]
        );
        assert_eq!(
            vec![true, false].into_values(),
            vec![Value::Bool(true), Value::Bool(false)]
        );
    }

    #[test]
    fn string_slices_flatten() {
        let names = ["alice", "bob"];
        assert_eq!(
            names.as_slice().into_values(),
            vec![Value::Text("alice".into()), Value::Text("bob".into())]
        );
    }

    #[test]
    fn optional_timestamps_keep_nulls() {
        let now = Utc::now();
        assert_eq!(
            vec![Some(now), None].into_values(),
            vec![Value::Timestamp(now), Value::Null]
        );
    }

    #[test]
    fn huge_unsigned_becomes_text() {
        assert_eq!(Value::from(u64::MAX), Value::Text(u64::MAX.to_string()));
        assert_eq!(Value::from(42u64), Value::Int(42));
    }

    #[test]
    fn scalar_operand_expands_to_single_element_list() {
        let operand: Operand = 5i64.into();
        assert_eq!(operand.into_list(), vec![Value::Int(5)]);
    }

    #[test]
    fn list_operand_collapses_to_first_element() {
        let operand: Operand = vec![3i64, 4].into();
        assert_eq!(operand.into_scalar(), Value::Int(3));
        assert_eq!(Operand::List(Vec::new()).into_scalar(), Value::Null);
    }

    #[test]
    fn json_values_convert() {
        let json = serde_json::json!({"n": 3, "f": 1.25, "s": "x", "b": true, "z": null});
        assert_eq!(Value::from(&json["n"]), Value::Int(3));
        assert_eq!(Value::from(&json["f"]), Value::Float(1.25));
        assert_eq!(Value::from(&json["s"]), Value::Text("x".into()));
        assert_eq!(Value::from(&json["b"]), Value::Bool(true));
        assert_eq!(Value::from(&json["z"]), Value::Null);
    }
}
