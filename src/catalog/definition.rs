//! Builder types describing a table or column before it is registered.

use super::schema::{ColumnDefault, ReferentialAction};
use crate::storage::row::{ColumnType, ColumnValue};

/// Column declaration, including the column-level constraints that
/// `CREATE TABLE` allows inline.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub not_null: bool,
    pub default: Option<ColumnDefault>,
    /// Backed by an owned sequence, like `SERIAL`.
    pub generated: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub check: Option<String>,
    pub references: Option<(String, String)>,
    pub on_delete: ReferentialAction,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        ColumnDef {
            name: name.into(),
            ty,
            not_null: false,
            default: None,
            generated: false,
            primary_key: false,
            unique: false,
            check: None,
            references: None,
            on_delete: ReferentialAction::NoAction,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn default(mut self, value: impl Into<ColumnValue>) -> Self {
        self.default = Some(ColumnDefault::Value(value.into()));
        self
    }

    pub fn default_to(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub fn generated(mut self) -> Self {
        self.generated = true;
        self.not_null = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check = Some(expr.into());
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some((table.into(), column.into()));
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Inline constraints rewritten as table constraints.
    pub(crate) fn inline_constraints(&self) -> Vec<ConstraintDef> {
        let mut out = Vec::new();
        if self.primary_key {
            out.push(ConstraintDef::primary_key(&self.name));
        }
        if self.unique {
            out.push(ConstraintDef::unique(&self.name));
        }
        if let Some(expr) = &self.check {
            out.push(ConstraintDef::check(expr.clone()));
        }
        if let Some((table, column)) = &self.references {
            out.push(ConstraintDef::foreign_key(&self.name, table, column).on_delete(self.on_delete));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintSpec {
    PrimaryKey(String),
    Unique(String),
    /// Expression source, parsed on registration.
    Check(String),
    ForeignKey {
        column: String,
        parent_table: String,
        parent_column: String,
        on_delete: ReferentialAction,
    },
}

/// A table constraint, optionally named. Unnamed constraints get a
/// generated name when registered.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDef {
    pub name: Option<String>,
    pub spec: ConstraintSpec,
}

impl ConstraintDef {
    pub fn primary_key(column: impl Into<String>) -> Self {
        ConstraintDef { name: None, spec: ConstraintSpec::PrimaryKey(column.into()) }
    }

    pub fn unique(column: impl Into<String>) -> Self {
        ConstraintDef { name: None, spec: ConstraintSpec::Unique(column.into()) }
    }

    pub fn check(expr: impl Into<String>) -> Self {
        ConstraintDef { name: None, spec: ConstraintSpec::Check(expr.into()) }
    }

    pub fn foreign_key(
        column: impl Into<String>,
        parent_table: impl Into<String>,
        parent_column: impl Into<String>,
    ) -> Self {
        ConstraintDef {
            name: None,
            spec: ConstraintSpec::ForeignKey {
                column: column.into(),
                parent_table: parent_table.into(),
                parent_column: parent_column.into(),
                on_delete: ReferentialAction::NoAction,
            },
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Only meaningful for foreign keys; ignored otherwise.
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        if let ConstraintSpec::ForeignKey { on_delete, .. } = &mut self.spec {
            *on_delete = action;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<ConstraintDef>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        TableDefinition { name: name.into(), columns: Vec::new(), constraints: Vec::new() }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn constraint(mut self, constraint: ConstraintDef) -> Self {
        self.constraints.push(constraint);
        self
    }
}
