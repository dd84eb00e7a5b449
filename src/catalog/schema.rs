use std::fmt;
use std::sync::Arc;

use crate::error::{DbError, DbResult};
use crate::sql::ast::Expr;
use crate::sql::eval::RowContext;
use crate::storage::row::{ColumnType, ColumnValue, RowData, TypeFamily};

/// How a column obtains its value when an insert omits it.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    Value(ColumnValue),
    /// `nextval('<sequence>')`
    Sequence(String),
    CurrentDate,
    CurrentTime,
    CurrentTimestamp,
}

impl fmt::Display for ColumnDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnDefault::Value(v) => write!(f, "{}", Expr::Literal(v.clone())),
            ColumnDefault::Sequence(name) => write!(f, "nextval('{}')", name),
            ColumnDefault::CurrentDate => write!(f, "CURRENT_DATE"),
            ColumnDefault::CurrentTime => write!(f, "CURRENT_TIME"),
            ColumnDefault::CurrentTimestamp => write!(f, "CURRENT_TIMESTAMP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub not_null: bool,
    pub default: Option<ColumnDefault>,
}

/// What a foreign key does to referencing rows when the parent row goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferentialAction {
    /// Reject the delete while dependents exist.
    #[default]
    NoAction,
    Cascade,
    SetNull,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub column: String,
    pub parent_table: String,
    pub parent_column: String,
    pub on_delete: ReferentialAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    PrimaryKey { column: String },
    Unique { column: String },
    Check { expr: Expr },
    ForeignKey(ForeignKey),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableConstraint {
    pub name: String,
    pub kind: ConstraintKind,
}

impl TableConstraint {
    /// Whether the constraint depends on `column` of its own table.
    pub fn mentions(&self, column: &str) -> bool {
        match &self.kind {
            ConstraintKind::PrimaryKey { column: c } | ConstraintKind::Unique { column: c } => c == column,
            ConstraintKind::Check { expr } => expr.references(column),
            ConstraintKind::ForeignKey(fk) => fk.column == column,
        }
    }
}

impl fmt::Display for TableConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConstraintKind::PrimaryKey { column } => write!(f, "CONSTRAINT {} PRIMARY KEY ({})", self.name, column),
            ConstraintKind::Unique { column } => write!(f, "CONSTRAINT {} UNIQUE ({})", self.name, column),
            ConstraintKind::Check { expr } => write!(f, "CONSTRAINT {} CHECK ({})", self.name, expr),
            ConstraintKind::ForeignKey(fk) => {
                write!(
                    f,
                    "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                    self.name, fk.column, fk.parent_table, fk.parent_column
                )?;
                match fk.on_delete {
                    ReferentialAction::NoAction => Ok(()),
                    ReferentialAction::Cascade => write!(f, " ON DELETE CASCADE"),
                    ReferentialAction::SetNull => write!(f, " ON DELETE SET NULL"),
                }
            }
        }
    }
}

/// Registered definition of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
    pub constraints: Vec<TableConstraint>,
}

impl TableSchema {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub(crate) fn require_column(&self, name: &str) -> DbResult<usize> {
        self.column_index(name).ok_or_else(|| DbError::unknown_column(&self.name, name))
    }

    pub fn column_names(&self) -> Arc<[String]> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn constraint(&self, name: &str) -> Option<&TableConstraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Option<(&str, &str)> {
        self.constraints.iter().find_map(|c| match &c.kind {
            ConstraintKind::PrimaryKey { column } => Some((c.name.as_str(), column.as_str())),
            _ => None,
        })
    }

    pub fn primary_key_index(&self) -> Option<usize> {
        self.primary_key().and_then(|(_, column)| self.column_index(column))
    }

    pub fn unique_columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.constraints.iter().filter_map(|c| match &c.kind {
            ConstraintKind::Unique { column } => Some((c.name.as_str(), column.as_str())),
            _ => None,
        })
    }

    pub fn checks(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.constraints.iter().filter_map(|c| match &c.kind {
            ConstraintKind::Check { expr } => Some((c.name.as_str(), expr)),
            _ => None,
        })
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = (&str, &ForeignKey)> {
        self.constraints.iter().filter_map(|c| match &c.kind {
            ConstraintKind::ForeignKey(fk) => Some((c.name.as_str(), fk)),
            _ => None,
        })
    }

    /// True when `column` carries a PRIMARY KEY or UNIQUE constraint, which
    /// is what a foreign key needs on its parent side.
    pub fn is_unique_key(&self, column: &str) -> bool {
        self.primary_key().is_some_and(|(_, c)| c == column) || self.unique_columns().any(|(_, c)| c == column)
    }

    /// Type-check `expr` as a condition over this table's columns.
    pub(crate) fn check_condition(&self, expr: &Expr) -> DbResult<()> {
        expr.check_condition(&|c: &str| -> DbResult<TypeFamily> {
            Ok(self.columns[self.require_column(c)?].ty.family())
        })
    }

    /// One-line `name TYPE | name TYPE` rendering of the columns.
    pub fn header(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.ty))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// A stored row viewed through its table's column names.
pub struct SchemaRow<'a> {
    pub schema: &'a TableSchema,
    pub data: &'a RowData,
}

impl RowContext for SchemaRow<'_> {
    fn value(&self, column: &str) -> Option<&ColumnValue> {
        self.schema.column_index(column).map(|idx| self.data.get(idx))
    }
}
