//! Persistence synchronizer: writes one table back to its region.
//!
//! Only stored columns are written. Derived labels are presentation state and
//! are recomputed on every read, so they can never be persisted stale.

use log::info;

use crate::{
    error::StoreResult,
    record::Value,
    storage::{Region, TabularStorage},
    store::TableStore,
};

/// Region text for the store's current records, in insertion order.
pub fn to_region(store: &TableStore) -> Region {
    let rules = &store.kind().coercion;
    let rows = store
        .records()
        .iter()
        .map(|record| {
            record
                .cells
                .iter()
                .map(|cell| match cell {
                    Value::Decimal(d) => rules.format_decimal(*d),
                    other => other.as_display(),
                })
                .collect()
        })
        .collect();
    Region {
        headers: store.headers().to_vec(),
        rows,
    }
}

pub fn flush<S>(storage: &mut S, store: &TableStore) -> StoreResult<()>
where
    S: TabularStorage + ?Sized,
{
    let region = to_region(store);
    storage.write_region(&store.kind().sheet, &region)?;
    info!(
        "Saved {} row(s) of '{}' to {:?}",
        region.rows.len(),
        store.name(),
        storage.location()
    );
    Ok(())
}
