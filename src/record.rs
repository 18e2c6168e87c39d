use std::{cmp::Ordering, fmt};

use rust_decimal::Decimal;
use serde::Serialize;

/// Stable surrogate identifier of a record within one table store.
///
/// Assigned on load and on create; never reused inside a session, so it stays
/// valid while display positions shift around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Decimal(Decimal),
    Text(String),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(i) => Some(Decimal::from(*i)),
            Value::Decimal(d) => Some(*d),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Text(s) if s.trim().is_empty())
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => d.normalize().to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    /// Total order used for sorting: numbers by magnitude (integers and decimals
    /// compare with each other), then text lexicographically after all numbers.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self.as_decimal(), other.as_decimal()) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self
                .as_text()
                .unwrap_or_default()
                .cmp(other.as_text().unwrap_or_default()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// One row of a table. Cells are aligned with the owning table's headers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: RecordId,
    pub cells: Vec<Value>,
}

impl Record {
    pub fn cell(&self, index: usize) -> Option<&Value> {
        self.cells.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_mixes_integer_and_decimal() {
        let small = Value::Integer(2);
        let large = Value::Decimal(Decimal::new(25, 1));
        assert_eq!(small.compare(&large), Ordering::Less);
        assert_eq!(
            Value::Integer(3).compare(&Value::Decimal(Decimal::from(3))),
            Ordering::Equal
        );
    }

    #[test]
    fn compare_places_text_after_numbers() {
        assert_eq!(
            Value::Integer(1_000).compare(&Value::text("abc")),
            Ordering::Less
        );
        assert_eq!(
            Value::text("Budi").compare(&Value::text("Andi")),
            Ordering::Greater
        );
    }

    #[test]
    fn decimal_display_drops_trailing_zeros() {
        let value = Value::Decimal(Decimal::new(150000, 2));
        assert_eq!(value.as_display(), "1500");
    }

    #[test]
    fn blank_detects_whitespace_text_only() {
        assert!(Value::text("  ").is_blank());
        assert!(!Value::Integer(0).is_blank());
    }
}
