use std::cmp::Ordering;

use anyhow::{Result, anyhow};

use crate::{
    error::{StoreError, StoreResult},
    kinds::ColumnType,
    record::{Record, Value},
    store::TableStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCondition {
    pub column: String,
    pub operator: ComparisonOperator,
    pub raw_value: String,
}

pub fn parse_filters(filters: &[String]) -> Result<Vec<FilterCondition>> {
    filters.iter().map(|f| parse_filter(f)).collect()
}

pub fn parse_filter(filter: &str) -> Result<FilterCondition> {
    let trimmed = filter.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Empty filter expression"));
    }

    let lowered = trimmed.to_ascii_lowercase();
    for (needle, op) in [
        (" contains ", ComparisonOperator::Contains),
        (" startswith ", ComparisonOperator::StartsWith),
        (" endswith ", ComparisonOperator::EndsWith),
    ] {
        if let Some(idx) = lowered.find(needle) {
            return Ok(FilterCondition {
                column: trimmed[..idx].trim().to_string(),
                operator: op,
                raw_value: unquote(trimmed[idx + needle.len()..].trim()).to_string(),
            });
        }
    }

    for (needle, op) in [
        ("!=", ComparisonOperator::NotEq),
        (">=", ComparisonOperator::Ge),
        ("<=", ComparisonOperator::Le),
        ("=", ComparisonOperator::Eq),
        (">", ComparisonOperator::Gt),
        ("<", ComparisonOperator::Lt),
    ] {
        if let Some(idx) = trimmed.find(needle) {
            let column = trimmed[..idx].trim();
            if column.is_empty() {
                break;
            }
            return Ok(FilterCondition {
                column: column.to_string(),
                operator: op,
                raw_value: unquote(trimmed[idx + needle.len()..].trim()).to_string(),
            });
        }
    }

    Err(anyhow!("Failed to parse filter expression '{trimmed}'"))
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        let last = value.len() - 1;
        if (bytes[0] == b'"' && bytes[last] == b'"') || (bytes[0] == b'\'' && bytes[last] == b'\'') {
            return &value[1..last];
        }
    }
    value
}

/// A condition bound to a column of one table.
#[derive(Debug, Clone)]
pub struct BoundFilter {
    index: usize,
    operator: ComparisonOperator,
    expected: Value,
}

impl FilterCondition {
    pub fn bind(&self, store: &TableStore) -> StoreResult<BoundFilter> {
        let index = store
            .column_index(&self.column)
            .ok_or_else(|| StoreError::UnknownColumn {
                table: store.name().to_string(),
                column: self.column.clone(),
            })?;
        let expected = match (store.column_types()[index], self.operator) {
            (ColumnType::Text, _)
            | (_, ComparisonOperator::Contains)
            | (_, ComparisonOperator::StartsWith)
            | (_, ComparisonOperator::EndsWith) => Value::text(self.raw_value.clone()),
            _ => store.coerce_cell(index, &self.raw_value),
        };
        Ok(BoundFilter {
            index,
            operator: self.operator,
            expected,
        })
    }
}

impl BoundFilter {
    pub fn matches(&self, record: &Record) -> bool {
        let Some(cell) = record.cell(self.index) else {
            return false;
        };
        use ComparisonOperator::*;
        match self.operator {
            Contains | StartsWith | EndsWith => {
                let haystack = cell.as_display().to_lowercase();
                let needle = self.expected.as_display().to_lowercase();
                match self.operator {
                    Contains => haystack.contains(&needle),
                    StartsWith => haystack.starts_with(&needle),
                    _ => haystack.ends_with(&needle),
                }
            }
            Eq | NotEq | Gt | Ge | Lt | Le => {
                let ordering = match (cell, &self.expected) {
                    (Value::Text(left), Value::Text(right)) => {
                        left.to_lowercase().cmp(&right.to_lowercase())
                    }
                    _ => cell.compare(&self.expected),
                };
                match self.operator {
                    Eq => ordering == Ordering::Equal,
                    NotEq => ordering != Ordering::Equal,
                    Gt => ordering == Ordering::Greater,
                    Ge => ordering != Ordering::Less,
                    Lt => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                }
            }
        }
    }
}
