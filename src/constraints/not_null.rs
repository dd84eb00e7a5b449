use super::{Constraint, ValidationContext};
use crate::error::{DbError, DbResult};
use crate::storage::row::RowData;

pub struct NotNullConstraint;

impl Constraint for NotNullConstraint {
    fn validate_insert(&self, ctx: &ValidationContext<'_>, row: &mut RowData) -> DbResult<()> {
        for (idx, column) in ctx.table.columns.iter().enumerate() {
            if column.not_null && ctx.touches(idx) && row.get(idx).is_null() {
                return Err(DbError::not_null(&ctx.table.name, &column.name));
            }
        }
        Ok(())
    }
}
