use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use super::row::{Row, RowData};
use super::table::RowId;

/// Lazy iterator over a snapshot of a table's rows, in insertion order.
///
/// The snapshot is fixed when the cursor is created; mutations committed
/// afterwards are not visible. `rewind` restarts from the first row.
#[derive(Debug, Clone)]
pub struct RowCursor {
    columns: Arc<[String]>,
    rows: Arc<BTreeMap<RowId, RowData>>,
    last: Option<RowId>,
}

impl RowCursor {
    pub fn new(columns: Arc<[String]>, rows: Arc<BTreeMap<RowId, RowData>>) -> Self {
        RowCursor { columns, rows, last: None }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rewind(&mut self) {
        self.last = None;
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Iterator for RowCursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        let lower = match self.last {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        let (id, data) = self.rows.range((lower, Bound::Unbounded)).next()?;
        self.last = Some(*id);
        Some(Row::new(Arc::clone(&self.columns), data.clone()))
    }
}
