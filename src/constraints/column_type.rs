use std::mem;

use super::{Constraint, ValidationContext};
use crate::error::DbResult;
use crate::storage::row::{ColumnValue, RowData};

/// Coerces each assigned value into its column type in place, rejecting
/// values that don't fit.
pub struct ColumnTypeConstraint;

impl Constraint for ColumnTypeConstraint {
    fn validate_insert(&self, ctx: &ValidationContext<'_>, row: &mut RowData) -> DbResult<()> {
        for (idx, column) in ctx.table.columns.iter().enumerate() {
            if !ctx.touches(idx) {
                continue;
            }
            let value = mem::replace(&mut row.0[idx], ColumnValue::Null);
            row.0[idx] = column.ty.coerce(&column.name, value)?;
        }
        Ok(())
    }
}
