use super::{Constraint, ValidationContext};
use crate::catalog::{Reference, ReferentialAction};
use crate::error::{DbError, DbResult};
use crate::storage::row::{ColumnValue, RowData};
use crate::storage::table::RowId;

pub struct ForeignKeyConstraint;

impl Constraint for ForeignKeyConstraint {
    fn validate_insert(&self, ctx: &ValidationContext<'_>, row: &mut RowData) -> DbResult<()> {
        let table = ctx.table;
        for (name, fk) in table.foreign_keys() {
            let idx = table.require_column(&fk.column)?;
            let value = row.get(idx);
            if !ctx.touches(idx) || value.is_null() {
                continue;
            }
            let self_reference = fk.parent_table == table.name;
            let parent = if self_reference { table } else { ctx.catalog.get_table(&fk.parent_table)? };
            let parent_idx = parent.require_column(&fk.parent_column)?;
            if self_reference && row.get(parent_idx).index_key() == value.index_key() {
                continue;
            }
            let found = ctx
                .store(&fk.parent_table)?
                .find_all(parent_idx, value)
                .into_iter()
                .any(|id| !self_reference || Some(id) != ctx.row_id);
            if !found {
                return Err(DbError::ForeignKeyViolation {
                    table: table.name.clone(),
                    constraint: name.to_string(),
                    detail: format!(
                        "Key ({})=({}) is not present in table \"{}\"",
                        fk.column, value, fk.parent_table
                    ),
                });
            }
        }
        Ok(())
    }

    /// Rejects the delete while `NO ACTION` dependents remain. Cascading
    /// actions have already been applied by the caller.
    fn validate_delete(&self, ctx: &ValidationContext<'_>, row: &RowData) -> DbResult<()> {
        for r in ctx.catalog.referencing(&ctx.table.name) {
            if r.fk.on_delete != ReferentialAction::NoAction {
                continue;
            }
            let idx = ctx.table.require_column(&r.fk.parent_column)?;
            let value = row.get(idx);
            if !dependents(ctx, &r, value)?.is_empty() {
                return Err(still_referenced(ctx, &r, value));
            }
        }
        Ok(())
    }
}

/// Rows of `r.child_table` pointing at `value`, skipping the row under
/// validation.
pub fn dependents(ctx: &ValidationContext<'_>, r: &Reference, value: &ColumnValue) -> DbResult<Vec<RowId>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let child = ctx.catalog.get_table(&r.child_table)?;
    let idx = child.require_column(&r.fk.column)?;
    let same_table = r.child_table == ctx.table.name;
    Ok(ctx
        .store(&r.child_table)?
        .find_all(idx, value)
        .into_iter()
        .filter(|id| !same_table || Some(*id) != ctx.row_id)
        .collect())
}

/// An update may not move a referenced key out from under its dependents.
pub fn validate_parent_update(ctx: &ValidationContext<'_>, old: &RowData, new: &RowData) -> DbResult<()> {
    for r in ctx.catalog.referencing(&ctx.table.name) {
        let idx = ctx.table.require_column(&r.fk.parent_column)?;
        if !ctx.touches(idx) || old.get(idx).index_key() == new.get(idx).index_key() {
            continue;
        }
        if !dependents(ctx, &r, old.get(idx))?.is_empty() {
            return Err(still_referenced(ctx, &r, old.get(idx)));
        }
        // the row may be its own dependent
        if r.child_table == ctx.table.name {
            let own = new.get(ctx.table.require_column(&r.fk.column)?).index_key();
            if own.is_some() && own == old.get(idx).index_key() {
                return Err(still_referenced(ctx, &r, old.get(idx)));
            }
        }
    }
    Ok(())
}

fn still_referenced(ctx: &ValidationContext<'_>, r: &Reference, value: &ColumnValue) -> DbError {
    DbError::ForeignKeyViolation {
        table: ctx.table.name.clone(),
        constraint: r.constraint.clone(),
        detail: format!(
            "Key ({})=({}) is still referenced from table \"{}\"",
            r.fk.parent_column, value, r.child_table
        ),
    }
}
