use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::ops::Deref;

use base64::prelude::*;
use serde::{Deserialize, Serialize};

/// A single cell value.
///
/// Values are totally ordered so they can be used as key parts: `Null` sorts
/// first, then values are grouped by type, and floats use IEEE total order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Reports whether the value can be stored in a column of the given type.
    pub fn conforms_to(&self, column_type: &ColumnType) -> bool {
        match (self, column_type) {
            (Value::Null, _) => true,
            (Value::Bool(_), ColumnType::Bool) => true,
            (Value::Int64(_), ColumnType::Int64) => true,
            (Value::Float64(_), ColumnType::Float64) => true,
            (Value::String(s), ColumnType::String(max)) => max.map_or(true, |max| s.chars().count() <= max),
            (Value::Bytes(b), ColumnType::Bytes(max)) => max.map_or(true, |max| b.len() <= max),
            _ => false,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int64(_) => 2,
            Value::Float64(_) => 3,
            Value::String(_) => 4,
            Value::Bytes(_) => 5,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Float64(a), Value::Float64(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::Float64(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "{}", BASE64_STANDARD.encode(v)),
        }
    }
}

/// Column types understood by the DDL.
///
/// `String` and `Bytes` carry the declared maximum length; `None` means `MAX`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Bool,
    Int64,
    Float64,
    String(Option<usize>),
    Bytes(Option<usize>),
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn length(max: &Option<usize>) -> String {
            max.map_or_else(|| "MAX".to_string(), |v| v.to_string())
        }
        match self {
            ColumnType::Bool => write!(f, "BOOL"),
            ColumnType::Int64 => write!(f, "INT64"),
            ColumnType::Float64 => write!(f, "FLOAT64"),
            ColumnType::String(max) => write!(f, "STRING({})", length(max)),
            ColumnType::Bytes(max) => write!(f, "BYTES({})", length(max)),
        }
    }
}

/// Time at which a read-write transaction or batch of mutations was applied.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Debug)]
pub struct CommitTimestamp {
    pub(crate) timestamp: time::OffsetDateTime,
}

impl CommitTimestamp {
    pub(crate) fn now() -> Self {
        CommitTimestamp {
            timestamp: time::OffsetDateTime::now_utc(),
        }
    }
}

impl Deref for CommitTimestamp {
    type Target = time::OffsetDateTime;

    fn deref(&self) -> &Self::Target {
        &self.timestamp
    }
}

impl From<CommitTimestamp> for time::OffsetDateTime {
    fn from(s: CommitTimestamp) -> Self {
        s.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_order() {
        assert!(Value::Null < Value::Int64(i64::MIN));
        assert!(Value::Int64(1) < Value::Int64(2));
        assert!(Value::String("a".into()) < Value::String("b".into()));
        assert_eq!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
    }

    #[test]
    fn test_conforms_to() {
        assert!(Value::Int64(1).conforms_to(&ColumnType::Int64));
        assert!(!Value::Int64(1).conforms_to(&ColumnType::Float64));
        assert!(Value::Null.conforms_to(&ColumnType::Bool));
        assert!(Value::String("abc".into()).conforms_to(&ColumnType::String(Some(3))));
        assert!(!Value::String("abcd".into()).conforms_to(&ColumnType::String(Some(3))));
        assert!(Value::Bytes(vec![0; 1024]).conforms_to(&ColumnType::Bytes(None)));
    }

    #[test]
    fn test_column_type_display() {
        assert_eq!(ColumnType::String(Some(1024)).to_string(), "STRING(1024)");
        assert_eq!(ColumnType::Bytes(None).to_string(), "BYTES(MAX)");
    }
}
