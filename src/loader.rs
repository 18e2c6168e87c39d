//! Workbook loader: one stored region into a typed [`TableStore`].

use log::{info, warn};

use crate::{
    coerce::{column_key, normalize_header},
    error::StoreResult,
    kinds::TableKind,
    record::Value,
    storage::{Region, TabularStorage},
    store::TableStore,
};

pub fn load<S>(storage: &S, kind: &TableKind) -> StoreResult<TableStore>
where
    S: TabularStorage + ?Sized,
{
    let region = storage.read_region(&kind.sheet)?;
    let store = from_region(kind, &region);
    info!(
        "Loaded {} row(s) into '{}' from {:?}",
        store.len(),
        kind.name,
        storage.location()
    );
    Ok(store)
}

/// Maps region columns onto the kind's schema by normalised header, keeps
/// unknown columns as text, and coerces every cell.
pub fn from_region(kind: &TableKind, region: &Region) -> TableStore {
    let headers = region
        .headers
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            normalize_header(Some(raw))
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| format!("column_{}", idx + 1))
        })
        .collect::<Vec<_>>();

    let mut claimed = vec![false; headers.len()];
    let mut sources = Vec::with_capacity(kind.columns.len());
    for spec in &kind.columns {
        let key = column_key(&spec.name);
        let found = headers
            .iter()
            .enumerate()
            .position(|(idx, h)| !claimed[idx] && column_key(h) == key);
        match found {
            Some(idx) => claimed[idx] = true,
            None => warn!(
                "Region '{}' has no '{}' column; using empty values",
                kind.sheet, spec.name
            ),
        }
        sources.push(found);
    }

    let extras = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| !claimed[*idx])
        .map(|(idx, h)| (idx, h.clone()))
        .collect::<Vec<_>>();
    for (idx, _) in &extras {
        sources.push(Some(*idx));
    }

    let mut store = TableStore::new(
        kind.clone(),
        extras.into_iter().map(|(_, header)| header).collect(),
    );

    for row in &region.rows {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let cells = sources
            .iter()
            .enumerate()
            .map(|(column, source)| {
                let raw = source
                    .and_then(|idx| row.get(idx))
                    .map(String::as_str)
                    .unwrap_or("");
                store.coerce_cell(column, raw)
            })
            .collect::<Vec<Value>>();
        store.push_loaded(cells);
    }
    store
}
