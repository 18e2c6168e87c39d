//! Session context: one storage handle, one registry, one store per opened table.
//!
//! Tables load lazily the first time an operation names them and stay in
//! memory for the rest of the session. A table whose load failed is halted:
//! later operations on it fail fast instead of running on partial data.
//! Mutations never write to storage; only [`Session::save`] does.

use std::collections::BTreeMap;

use log::warn;

use crate::{
    error::{StoreError, StoreResult},
    kinds::Registry,
    listing::{ListRequest, Listing},
    loader,
    record::{Record, RecordId},
    storage::TabularStorage,
    store::{FieldInput, TableStore},
    sync,
};

#[derive(Debug)]
enum Slot {
    Ready(TableStore),
    Halted,
}

#[derive(Debug)]
pub struct Session<S: TabularStorage> {
    storage: S,
    registry: Registry,
    tables: BTreeMap<String, Slot>,
}

impl<S: TabularStorage> Session<S> {
    pub fn new(storage: S, registry: Registry) -> Self {
        Self {
            storage,
            registry,
            tables: BTreeMap::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Opens (loading once) and returns the store behind `name`.
    pub fn table(&mut self, name: &str) -> StoreResult<&mut TableStore> {
        let kind = self
            .registry
            .get(name)
            .ok_or_else(|| StoreError::UnknownTable(name.to_string()))?;
        let key = kind.name.clone();
        if !self.tables.contains_key(&key) {
            match loader::load(&self.storage, kind) {
                Ok(store) => {
                    self.tables.insert(key.clone(), Slot::Ready(store));
                }
                Err(err) => {
                    warn!("'{key}' is halted for this session: {err}");
                    self.tables.insert(key, Slot::Halted);
                    return Err(err);
                }
            }
        }
        match self.tables.get_mut(&key) {
            Some(Slot::Ready(store)) => Ok(store),
            _ => Err(StoreError::Halted(key)),
        }
    }

    pub fn list(&mut self, name: &str, request: &ListRequest) -> StoreResult<Listing> {
        let store = self.table(name)?;
        Listing::build(store, request)
    }

    pub fn add(&mut self, name: &str, fields: &[FieldInput]) -> StoreResult<RecordId> {
        self.table(name)?.create(fields)
    }

    pub fn edit(&mut self, name: &str, id: RecordId, fields: &[FieldInput]) -> StoreResult<()> {
        self.table(name)?.update(id, fields)
    }

    pub fn remove(&mut self, name: &str, id: RecordId) -> StoreResult<Record> {
        self.table(name)?.delete(id)
    }

    /// Writes the table back if it has unsaved changes. Returns whether it wrote.
    pub fn save(&mut self, name: &str) -> StoreResult<bool> {
        self.table(name)?;
        let Some(kind) = self.registry.get(name) else {
            return Err(StoreError::UnknownTable(name.to_string()));
        };
        let Some(Slot::Ready(store)) = self.tables.get_mut(&kind.name) else {
            return Err(StoreError::Halted(kind.name.clone()));
        };
        if !store.is_dirty() {
            return Ok(false);
        }
        sync::flush(&mut self.storage, store)?;
        store.mark_clean();
        Ok(true)
    }

    /// Saves every table with unsaved changes, stopping at the first failure.
    pub fn save_all(&mut self) -> StoreResult<Vec<String>> {
        let dirty = self.dirty_tables();
        for name in &dirty {
            self.save(name)?;
        }
        Ok(dirty)
    }

    pub fn dirty_tables(&self) -> Vec<String> {
        self.tables
            .iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Ready(store) if store.is_dirty() => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

impl<S: TabularStorage> Drop for Session<S> {
    fn drop(&mut self) {
        let dirty = self.dirty_tables();
        if !dirty.is_empty() {
            warn!("Discarding unsaved changes to: {}", dirty.join(", "));
        }
    }
}
