pub mod check;
pub mod column_type;
pub mod default;
pub mod foreign_key;
pub mod not_null;
pub mod primary_key;
pub mod unique;

use std::collections::HashMap;

use crate::catalog::{Catalog, TableSchema};
use crate::error::{DbError, DbResult};
use crate::storage::row::{ColumnValue, RowData};
use crate::storage::table::{RowId, TableStore};

use check::CheckConstraint;
use column_type::ColumnTypeConstraint;
use foreign_key::ForeignKeyConstraint;
use not_null::NotNullConstraint;
use primary_key::PrimaryKeyConstraint;
use unique::UniqueConstraint;

/// Everything a constraint may look at while judging one row.
pub struct ValidationContext<'a> {
    pub catalog: &'a Catalog,
    pub stores: &'a HashMap<String, TableStore>,
    pub table: &'a TableSchema,
    /// The stored row being replaced, for updates.
    pub row_id: Option<RowId>,
    /// Column positions assigned by an update. `None` validates every column.
    pub changed: Option<&'a [usize]>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(catalog: &'a Catalog, stores: &'a HashMap<String, TableStore>, table: &'a TableSchema) -> Self {
        ValidationContext { catalog, stores, table, row_id: None, changed: None }
    }

    /// Validate as a replacement for the stored row `row_id`.
    pub fn with_row(mut self, row_id: RowId) -> Self {
        self.row_id = Some(row_id);
        self
    }

    /// Restrict validation to the assigned columns.
    pub fn with_changes(mut self, changed: &'a [usize]) -> Self {
        self.changed = Some(changed);
        self
    }

    pub fn touches(&self, idx: usize) -> bool {
        self.changed.is_none_or(|c| c.contains(&idx))
    }

    pub fn store(&self, table: &str) -> DbResult<&'a TableStore> {
        self.stores.get(table).ok_or_else(|| DbError::UnknownTable(table.to_string()))
    }

    /// Another row of this table holding `value` at `idx`, if any.
    pub(crate) fn conflicting_row(&self, idx: usize, value: &ColumnValue) -> DbResult<Option<RowId>> {
        Ok(self
            .store(&self.table.name)?
            .find_all(idx, value)
            .into_iter()
            .find(|id| Some(*id) != self.row_id))
    }
}

pub trait Constraint {
    fn validate_insert(&self, ctx: &ValidationContext<'_>, row: &mut RowData) -> DbResult<()>;
    fn validate_delete(&self, _ctx: &ValidationContext<'_>, _row: &RowData) -> DbResult<()> {
        Ok(())
    }
}

/// Runs every constraint kind over a row in a fixed order, stopping at the
/// first violation.
pub struct ConstraintEnforcer;

impl ConstraintEnforcer {
    const CHAIN: [&'static dyn Constraint; 6] = [
        &NotNullConstraint,
        &ColumnTypeConstraint,
        &CheckConstraint,
        &UniqueConstraint,
        &PrimaryKeyConstraint,
        &ForeignKeyConstraint,
    ];

    /// Validate (and normalise, for the type step) a row about to be stored.
    pub fn validate_row(ctx: &ValidationContext<'_>, row: &mut RowData) -> DbResult<()> {
        if row.0.len() != ctx.table.columns.len() {
            return Err(DbError::InvalidDefinition(format!(
                "row has {} values but relation \"{}\" has {} columns",
                row.0.len(),
                ctx.table.name,
                ctx.table.columns.len()
            )));
        }
        for constraint in Self::CHAIN {
            constraint.validate_insert(ctx, row)?;
        }
        Ok(())
    }

    /// Checks run once `row` has left the table.
    pub fn validate_delete(ctx: &ValidationContext<'_>, row: &RowData) -> DbResult<()> {
        for constraint in Self::CHAIN {
            constraint.validate_delete(ctx, row)?;
        }
        Ok(())
    }
}
