use super::{Constraint, ValidationContext};
use crate::error::{DbError, DbResult};
use crate::storage::row::RowData;

pub struct UniqueConstraint;

impl Constraint for UniqueConstraint {
    fn validate_insert(&self, ctx: &ValidationContext<'_>, row: &mut RowData) -> DbResult<()> {
        for (name, column) in ctx.table.unique_columns() {
            let idx = ctx.table.require_column(column)?;
            let value = row.get(idx);
            if !ctx.touches(idx) || value.is_null() {
                continue;
            }
            if ctx.conflicting_row(idx, value)?.is_some() {
                return Err(DbError::UniqueConstraintViolation {
                    table: ctx.table.name.clone(),
                    constraint: name.to_string(),
                    column: column.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}
