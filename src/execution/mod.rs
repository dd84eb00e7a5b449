pub mod runtime;

use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::error::{DbError, DbResult};
use crate::storage::row::ColumnValue;
use crate::storage::table::TableStore;

/// Right-hand side of one assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Assigned {
    Value(ColumnValue),
    /// Use the column's stored default, as `DEFAULT` does in SQL.
    Default,
}

/// Column assignments for an insert or an update. Columns left out of an
/// insert take their defaults; columns left out of an update keep their
/// values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignments {
    entries: Vec<(String, Assigned)>,
}

impl Assignments {
    pub fn new() -> Self {
        Assignments::default()
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        self.entries.push((column.into(), Assigned::Value(value.into())));
        self
    }

    pub fn set_default(mut self, column: impl Into<String>) -> Self {
        self.entries.push((column.into(), Assigned::Default));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Assigned)> {
        self.entries.iter().map(|(c, a)| (c.as_str(), a))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type NewRow = Assignments;
pub type Changes = Assignments;

/// Catalog plus the rows of every table. Cloning is cheap: row maps are
/// shared until written.
#[derive(Debug, Clone, Default)]
pub struct Database {
    pub catalog: Catalog,
    pub stores: HashMap<String, TableStore>,
}

impl Database {
    pub fn store(&self, table: &str) -> DbResult<&TableStore> {
        self.stores.get(table).ok_or_else(|| DbError::UnknownTable(table.to_string()))
    }

    pub fn store_mut(&mut self, table: &str) -> DbResult<&mut TableStore> {
        self.stores.get_mut(table).ok_or_else(|| DbError::UnknownTable(table.to_string()))
    }
}
