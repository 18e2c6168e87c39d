//! In-memory table store for one sheet.
//!
//! Records are kept in insertion order and addressed by [`RecordId`]. Display
//! order is always a fresh view ([`TableStore::sorted_view`],
//! [`TableStore::ranked_view`]) and never reorders the store itself. Every
//! mutation validates all of its input before touching a record, so a failed
//! call leaves the table exactly as it was.

use std::cmp::Ordering;

use log::info;

use crate::{
    coerce::column_key,
    error::{StoreError, StoreResult},
    kinds::{ColumnType, Direction, TableKind},
    record::{Record, RecordId, Value},
};

/// Raw `column=value` input as typed by a user.
pub type FieldInput = (String, String);

#[derive(Debug, Clone)]
pub struct TableStore {
    kind: TableKind,
    headers: Vec<String>,
    types: Vec<ColumnType>,
    records: Vec<Record>,
    next_id: u64,
    dirty: bool,
}

impl TableStore {
    /// Empty store: schema columns first, then pass-through text columns.
    pub fn new(kind: TableKind, extra_columns: Vec<String>) -> Self {
        let mut headers = kind
            .columns
            .iter()
            .map(|c| c.name.clone())
            .collect::<Vec<_>>();
        let mut types = kind.columns.iter().map(|c| c.datatype).collect::<Vec<_>>();
        for extra in extra_columns {
            headers.push(extra);
            types.push(ColumnType::Text);
        }
        Self {
            kind,
            headers,
            types,
            records: Vec::new(),
            next_id: 1,
            dirty: false,
        }
    }

    /// Appends an already-coerced row without validation; used while loading.
    pub(crate) fn push_loaded(&mut self, mut cells: Vec<Value>) -> RecordId {
        cells.resize_with(self.headers.len(), || Value::text(""));
        let id = self.allocate_id();
        self.records.push(Record { id, cells });
        id
    }

    fn allocate_id(&mut self) -> RecordId {
        let id = RecordId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn kind(&self) -> &TableKind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.kind.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column_types(&self) -> &[ColumnType] {
        &self.types
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let key = column_key(name);
        self.headers.iter().position(|h| column_key(h) == key)
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    fn index_of(&self, id: RecordId) -> StoreResult<usize> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::StaleRecord {
                table: self.kind.name.clone(),
                id,
            })
    }

    fn default_value(&self, index: usize) -> Value {
        match self.types[index] {
            ColumnType::Text => Value::text(""),
            ColumnType::Integer => Value::Integer(0),
            ColumnType::Decimal => Value::Decimal(rust_decimal::Decimal::ZERO),
        }
    }

    /// Coerces one cell of column `index` with the kind's rules.
    pub(crate) fn coerce_cell(&self, index: usize, raw: &str) -> Value {
        let rules = &self.kind.coercion;
        match self.types[index] {
            ColumnType::Text => Value::text(raw.trim()),
            ColumnType::Integer => Value::Integer(rules.coerce_integer(raw)),
            ColumnType::Decimal => Value::Decimal(rules.coerce_numeric(raw)),
        }
    }

    fn parse_fields(&self, fields: &[FieldInput]) -> StoreResult<Vec<(usize, Value)>> {
        let mut parsed = Vec::with_capacity(fields.len());
        for (column, raw) in fields {
            let index = self
                .column_index(column)
                .ok_or_else(|| StoreError::UnknownColumn {
                    table: self.kind.name.clone(),
                    column: column.clone(),
                })?;
            let value = self.coerce_cell(index, raw);
            self.check_choice(index, &value)?;
            parsed.push((index, value));
        }
        Ok(parsed)
    }

    fn check_choice(&self, index: usize, value: &Value) -> StoreResult<()> {
        let Some(spec) = self.kind.columns.get(index) else {
            return Ok(());
        };
        if spec.choices.is_empty() || value.is_blank() {
            return Ok(());
        }
        let text = value.as_display();
        if spec.choices.iter().any(|choice| choice == &text) {
            Ok(())
        } else {
            Err(StoreError::validation(
                &self.kind.name,
                &spec.name,
                format!("must be one of: {}", spec.choices.join(", ")),
            ))
        }
    }

    fn check_required(&self, cells: &[Value]) -> StoreResult<()> {
        for (index, spec) in self.kind.columns.iter().enumerate() {
            if spec.required && cells.get(index).is_none_or(Value::is_blank) {
                return Err(StoreError::validation(
                    &self.kind.name,
                    &spec.name,
                    "must not be blank",
                ));
            }
        }
        Ok(())
    }

    /// Appends a record built from `fields`; unnamed columns get their zero value.
    pub fn create(&mut self, fields: &[FieldInput]) -> StoreResult<RecordId> {
        let parsed = self.parse_fields(fields)?;
        let mut cells = (0..self.headers.len())
            .map(|idx| self.default_value(idx))
            .collect::<Vec<_>>();
        for (index, value) in parsed {
            cells[index] = value;
        }
        self.check_required(&cells)?;
        let id = self.allocate_id();
        self.records.push(Record { id, cells });
        self.dirty = true;
        info!("{}: added record #{id}", self.kind.name);
        Ok(id)
    }

    /// Overwrites the named fields of one record, leaving the others untouched.
    pub fn update(&mut self, id: RecordId, fields: &[FieldInput]) -> StoreResult<()> {
        let index = self.index_of(id)?;
        let parsed = self.parse_fields(fields)?;
        let mut cells = self.records[index].cells.clone();
        for (column, value) in parsed {
            cells[column] = value;
        }
        self.check_required(&cells)?;
        self.records[index].cells = cells;
        self.dirty = true;
        info!("{}: updated record #{id}", self.kind.name);
        Ok(())
    }

    pub fn delete(&mut self, id: RecordId) -> StoreResult<Record> {
        let index = self.index_of(id)?;
        let removed = self.records.remove(index);
        self.dirty = true;
        info!("{}: removed record #{id}", self.kind.name);
        Ok(removed)
    }

    /// Stable sort by one column; ties keep insertion order.
    pub fn sorted_view(&self, column: usize, direction: Direction) -> Vec<&Record> {
        let mut view = self.records.iter().collect::<Vec<_>>();
        let blank = Value::text("");
        view.sort_by(|a, b| {
            let left = a.cell(column).unwrap_or(&blank);
            let right = b.cell(column).unwrap_or(&blank);
            if direction.is_descending() {
                right.compare(left)
            } else {
                left.compare(right)
            }
        });
        view
    }

    /// Records in rank order: by the ranking column, or insertion order without one.
    ///
    /// Ties on the ranking value are broken by the remaining cells (ascending),
    /// so ranks depend only on record contents and not on load or edit history.
    pub fn ranked_view(&self) -> Vec<&Record> {
        let ranking = self
            .kind
            .ranking
            .as_ref()
            .and_then(|r| self.column_index(&r.column).map(|idx| (idx, r.direction)));
        let Some((column, direction)) = ranking else {
            return self.records.iter().collect();
        };
        let mut view = self.records.iter().collect::<Vec<_>>();
        view.sort_by(|a, b| {
            let primary = match (a.cell(column), b.cell(column)) {
                (Some(left), Some(right)) if direction.is_descending() => right.compare(left),
                (Some(left), Some(right)) => left.compare(right),
                _ => Ordering::Equal,
            };
            primary.then_with(|| {
                a.cells
                    .iter()
                    .zip(&b.cells)
                    .map(|(left, right)| left.compare(right))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
        });
        view
    }

    /// Maps a position in [`TableStore::ranked_view`] to the record it shows.
    pub fn id_at(&self, position: i64) -> StoreResult<RecordId> {
        let view = self.ranked_view();
        usize::try_from(position)
            .ok()
            .and_then(|idx| view.get(idx))
            .map(|record| record.id)
            .ok_or_else(|| StoreError::Position {
                table: self.kind.name.clone(),
                position,
                len: view.len(),
            })
    }

    pub fn update_at(&mut self, position: i64, fields: &[FieldInput]) -> StoreResult<RecordId> {
        let id = self.id_at(position)?;
        self.update(id, fields)?;
        Ok(id)
    }

    pub fn delete_at(&mut self, position: i64) -> StoreResult<Record> {
        let id = self.id_at(position)?;
        self.delete(id)
    }
}
