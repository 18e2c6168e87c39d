//! Display listings: ranked, labelled, optionally re-sorted and filtered rows.
//!
//! Labels are computed over the complete table in rank order before any
//! filter or display sort is applied, so narrowing the view never moves a
//! record into a different tier.

use serde::Serialize;

use crate::{
    derive::{derive, labels_by_id},
    error::{StoreError, StoreResult},
    filter::FilterCondition,
    kinds::Direction,
    record::{RecordId, Value},
    store::TableStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub direction: Direction,
}

impl SortKey {
    /// Parses `column[:asc|desc]`; the direction defaults to descending.
    pub fn parse(spec: &str) -> Option<Self> {
        let (column, direction) = match spec.rsplit_once(':') {
            Some((column, dir)) if dir.trim().eq_ignore_ascii_case("asc") => {
                (column, Direction::Asc)
            }
            Some((column, dir)) if dir.trim().eq_ignore_ascii_case("desc") => {
                (column, Direction::Desc)
            }
            _ => (spec, Direction::Desc),
        };
        let column = column.trim();
        (!column.is_empty()).then(|| SortKey {
            column: column.to_string(),
            direction,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub sort: Option<SortKey>,
    pub filters: Vec<FilterCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedRow {
    pub position: usize,
    pub id: RecordId,
    /// Rank in the table's ranking order, independent of the display sort.
    pub rank: usize,
    pub cells: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub table: String,
    pub headers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived: Option<String>,
    pub rows: Vec<ListedRow>,
}

impl Listing {
    pub fn build(store: &TableStore, request: &ListRequest) -> StoreResult<Self> {
        let ranked = derive(store);
        let filters = request
            .filters
            .iter()
            .map(|condition| condition.bind(store))
            .collect::<StoreResult<Vec<_>>>()?;

        let ordered = match &request.sort {
            Some(key) => {
                let column = store
                    .column_index(&key.column)
                    .ok_or_else(|| StoreError::UnknownColumn {
                        table: store.name().to_string(),
                        column: key.column.clone(),
                    })?;
                let labels = labels_by_id(&ranked);
                store
                    .sorted_view(column, key.direction)
                    .into_iter()
                    .map(|record| {
                        let (rank, label) = labels.get(&record.id).cloned().unwrap_or((0, None));
                        (record, rank, label)
                    })
                    .collect::<Vec<_>>()
            }
            None => ranked
                .into_iter()
                .map(|r| (r.record, r.rank, r.label))
                .collect::<Vec<_>>(),
        };

        let rows = ordered
            .into_iter()
            .filter(|(record, _, _)| filters.iter().all(|f| f.matches(record)))
            .enumerate()
            .map(|(position, (record, rank, label))| ListedRow {
                position,
                id: record.id,
                rank,
                cells: record.cells.clone(),
                label,
            })
            .collect();

        Ok(Listing {
            table: store.name().to_string(),
            headers: store.headers().to_vec(),
            derived: store.kind().derivation.column_name().map(str::to_string),
            rows,
        })
    }

    /// Maps a displayed position to the record shown there.
    pub fn resolve(&self, position: i64) -> StoreResult<RecordId> {
        usize::try_from(position)
            .ok()
            .and_then(|idx| self.rows.get(idx))
            .map(|row| row.id)
            .ok_or_else(|| StoreError::Position {
                table: self.table.clone(),
                position,
                len: self.rows.len(),
            })
    }

    pub fn labels(&self) -> Vec<Option<&str>> {
        self.rows.iter().map(|row| row.label.as_deref()).collect()
    }
}
