use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use super::row::{ColumnValue, RowData};
use crate::error::DbResult;

/// Internal, insertion-ordered row identifier. Never reused within a table.
pub type RowId = u64;

/// Rows of a single table.
///
/// The row map sits behind an `Arc` so that cloning a store (to stage a
/// mutation or to hand a snapshot to a reader) is O(1); the first write
/// after a clone copies the map.
#[derive(Debug, Clone, Default)]
pub struct TableStore {
    rows: Arc<BTreeMap<RowId, RowData>>,
    next_row_id: RowId,
}

impl TableStore {
    pub fn new() -> Self {
        TableStore::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn insert(&mut self, data: RowData) -> RowId {
        let id = self.next_row_id;
        self.next_row_id += 1;
        Arc::make_mut(&mut self.rows).insert(id, data);
        debug!("row {} stored", id);
        id
    }

    pub fn replace(&mut self, id: RowId, data: RowData) -> Option<RowData> {
        if !self.rows.contains_key(&id) {
            return None;
        }
        Arc::make_mut(&mut self.rows).insert(id, data)
    }

    pub fn remove(&mut self, id: RowId) -> Option<RowData> {
        if !self.rows.contains_key(&id) {
            return None;
        }
        Arc::make_mut(&mut self.rows).remove(&id)
    }

    pub fn get(&self, id: RowId) -> Option<&RowData> {
        self.rows.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RowId, &RowData)> {
        self.rows.iter().map(|(id, data)| (*id, data))
    }

    /// First row whose value at `column` equals `value` under key semantics.
    pub fn find(&self, column: usize, value: &ColumnValue) -> Option<RowId> {
        let key = value.index_key()?;
        self.iter()
            .find(|(_, data)| data.get(column).index_key().as_ref() == Some(&key))
            .map(|(id, _)| id)
    }

    /// Ids of every row whose value at `column` equals `value`.
    pub fn find_all(&self, column: usize, value: &ColumnValue) -> Vec<RowId> {
        let Some(key) = value.index_key() else {
            return Vec::new();
        };
        self.iter()
            .filter(|(_, data)| data.get(column).index_key().as_ref() == Some(&key))
            .map(|(id, _)| id)
            .collect()
    }

    /// Rewrite every row through `f`, keeping ids. Used by schema changes
    /// that reshape stored rows.
    pub fn rewrite<F>(&mut self, mut f: F) -> DbResult<()>
    where
        F: FnMut(&RowData) -> DbResult<RowData>,
    {
        let mut rewritten = BTreeMap::new();
        for (id, data) in self.rows.iter() {
            rewritten.insert(*id, f(data)?);
        }
        self.rows = Arc::new(rewritten);
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<BTreeMap<RowId, RowData>> {
        Arc::clone(&self.rows)
    }
}
