use super::{Constraint, ValidationContext};
use crate::error::{DbError, DbResult};
use crate::storage::row::RowData;

/// Checked after the other column rules so that, say, a missing NOT NULL
/// name is reported before a duplicate id.
pub struct PrimaryKeyConstraint;

impl Constraint for PrimaryKeyConstraint {
    fn validate_insert(&self, ctx: &ValidationContext<'_>, row: &mut RowData) -> DbResult<()> {
        let Some((name, column)) = ctx.table.primary_key() else {
            return Ok(());
        };
        let idx = ctx.table.require_column(column)?;
        if !ctx.touches(idx) {
            return Ok(());
        }
        let value = row.get(idx);
        if value.is_null() {
            return Err(DbError::not_null(&ctx.table.name, column));
        }
        if ctx.conflicting_row(idx, value)?.is_some() {
            return Err(DbError::UniqueConstraintViolation {
                table: ctx.table.name.clone(),
                constraint: name.to_string(),
                column: column.to_string(),
                value: value.to_string(),
            });
        }
        Ok(())
    }
}
