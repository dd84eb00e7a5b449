use super::{Constraint, ValidationContext};
use crate::catalog::SchemaRow;
use crate::error::{DbError, DbResult};
use crate::sql::eval::RowContext;
use crate::storage::row::RowData;

pub struct CheckConstraint;

impl Constraint for CheckConstraint {
    fn validate_insert(&self, ctx: &ValidationContext<'_>, row: &mut RowData) -> DbResult<()> {
        let table = ctx.table;
        let view = SchemaRow { schema: table, data: &*row };
        for (name, expr) in table.checks() {
            let relevant = expr
                .columns()
                .into_iter()
                .any(|c| table.column_index(c).is_some_and(|idx| ctx.touches(idx)));
            if !relevant {
                continue;
            }
            // unknown counts as satisfied
            if expr.truth(&view)? == Some(false) {
                let columns = expr.columns();
                let values: Vec<String> = columns
                    .iter()
                    .map(|c| view.value(c).map_or_else(|| "NULL".to_string(), ToString::to_string))
                    .collect();
                return Err(DbError::CheckConstraintViolation {
                    table: table.name.clone(),
                    constraint: name.to_string(),
                    columns: columns.join(", "),
                    values: values.join(", "),
                });
            }
        }
        Ok(())
    }
}
