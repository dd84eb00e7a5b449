use crate::catalog::{Catalog, Column, ColumnDefault};
use crate::error::DbResult;
use crate::sql::functions::FunctionEvaluator;
use crate::storage::row::ColumnValue;

pub struct DefaultConstraint;

impl DefaultConstraint {
    /// Value a column takes when an insert leaves it out. Draws from the
    /// column's sequence when it has one.
    pub fn resolve(catalog: &mut Catalog, column: &Column) -> DbResult<ColumnValue> {
        match &column.default {
            None => Ok(ColumnValue::Null),
            Some(ColumnDefault::Value(v)) => Ok(v.clone()),
            Some(ColumnDefault::Sequence(seq)) => Ok(ColumnValue::Integer(catalog.next_sequence_value(seq)?)),
            Some(ColumnDefault::CurrentDate) => FunctionEvaluator::evaluate_function("CURRENT_DATE", &[]),
            Some(ColumnDefault::CurrentTime) => FunctionEvaluator::evaluate_function("CURRENT_TIME", &[]),
            Some(ColumnDefault::CurrentTimestamp) => FunctionEvaluator::evaluate_function("CURRENT_TIMESTAMP", &[]),
        }
    }
}
