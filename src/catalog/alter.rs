use super::definition::{ColumnDef, ConstraintDef};
use super::schema::ColumnDefault;
use crate::storage::row::ColumnType;

/// One `ALTER TABLE` action.
#[derive(Debug, Clone, PartialEq)]
pub enum AlterTable {
    AddColumn(ColumnDef),
    DropColumn(String),
    RenameColumn { from: String, to: String },
    AlterColumnType { column: String, ty: ColumnType },
    SetDefault { column: String, default: ColumnDefault },
    DropDefault(String),
    SetNotNull(String),
    DropNotNull(String),
    AddConstraint(ConstraintDef),
    DropConstraint(String),
    RenameTable(String),
}

impl AlterTable {
    pub fn set_default(column: impl Into<String>, value: impl Into<crate::storage::row::ColumnValue>) -> Self {
        AlterTable::SetDefault { column: column.into(), default: ColumnDefault::Value(value.into()) }
    }

    pub fn rename_column(from: impl Into<String>, to: impl Into<String>) -> Self {
        AlterTable::RenameColumn { from: from.into(), to: to.into() }
    }

    pub fn alter_type(column: impl Into<String>, ty: ColumnType) -> Self {
        AlterTable::AlterColumnType { column: column.into(), ty }
    }
}
