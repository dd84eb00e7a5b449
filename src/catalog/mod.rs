pub mod alter;
pub mod definition;
pub mod schema;
pub mod sequence;

use std::collections::BTreeMap;

use log::{debug, info};

pub use alter::AlterTable;
pub use definition::{ColumnDef, ConstraintDef, ConstraintSpec, TableDefinition};
pub use schema::{
    Column, ColumnDefault, ConstraintKind, ForeignKey, ReferentialAction, SchemaRow, TableConstraint, TableSchema,
};
pub use sequence::Sequence;

use crate::error::{DbError, DbResult};
use crate::sql::ast::Expr;
use crate::storage::row::{ColumnType, TypeFamily};

/// A foreign key seen from its parent table.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub child_table: String,
    pub constraint: String,
    pub fk: ForeignKey,
}

/// Schema registry: table definitions and the sequences backing generated
/// columns.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: BTreeMap<String, TableSchema>,
    sequences: BTreeMap<String, Sequence>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Look up a table's definition, or return an error if it doesn't exist.
    pub fn get_table(&self, name: &str) -> DbResult<&TableSchema> {
        self.tables.get(name).ok_or_else(|| DbError::UnknownTable(name.to_string()))
    }

    /// Table names in lexical order.
    pub fn list_tables(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Every foreign key, in any table (including `parent` itself), that
    /// points at `parent`.
    pub fn referencing(&self, parent: &str) -> Vec<Reference> {
        self.tables
            .values()
            .flat_map(|t| {
                t.foreign_keys().filter(|(_, fk)| fk.parent_table == parent).map(|(name, fk)| Reference {
                    child_table: t.name.clone(),
                    constraint: name.to_string(),
                    fk: fk.clone(),
                })
            })
            .collect()
    }

    pub fn define_table(&mut self, def: TableDefinition) -> DbResult<&TableSchema> {
        if self.tables.contains_key(&def.name) {
            return Err(DbError::DuplicateTable(def.name));
        }
        if def.columns.is_empty() {
            return Err(DbError::InvalidDefinition(format!("table \"{}\" needs at least one column", def.name)));
        }

        let mut schema = TableSchema { name: def.name.clone(), columns: Vec::new(), constraints: Vec::new() };
        let mut new_sequences = Vec::new();
        let mut pending = Vec::new();
        for col in &def.columns {
            if schema.column_index(&col.name).is_some() {
                return Err(DbError::InvalidDefinition(format!("column \"{}\" specified more than once", col.name)));
            }
            let column = self.build_column(&schema.name, col, &mut new_sequences)?;
            schema.columns.push(column);
            pending.extend(col.inline_constraints());
        }
        pending.extend(def.constraints);
        // keys first so that self-referencing foreign keys can find them
        pending.sort_by_key(|c| match c.spec {
            ConstraintSpec::PrimaryKey(_) | ConstraintSpec::Unique(_) => 0,
            ConstraintSpec::Check(_) => 1,
            ConstraintSpec::ForeignKey { .. } => 2,
        });
        for c in pending {
            let resolved = self.resolve_constraint(&schema, c)?;
            Self::push_constraint(&mut schema, resolved)?;
        }

        for seq in new_sequences {
            self.sequences.insert(seq.name.clone(), seq);
        }
        self.claim_sequences(&schema);
        info!(
            "table {} defined with {} column(s), {} constraint(s)",
            schema.name,
            schema.columns.len(),
            schema.constraints.len()
        );
        let name = schema.name.clone();
        Ok(self.tables.entry(name).or_insert(schema))
    }

    pub fn alter_table(&mut self, name: &str, change: AlterTable) -> DbResult<()> {
        let mut schema = self.get_table(name)?.clone();
        debug!("altering table {}: {:?}", name, change);
        match change {
            AlterTable::AddColumn(def) => {
                if schema.column_index(&def.name).is_some() {
                    return Err(DbError::InvalidDefinition(format!(
                        "column \"{}\" of relation \"{}\" already exists",
                        def.name, name
                    )));
                }
                let mut new_sequences = Vec::new();
                let column = self.build_column(name, &def, &mut new_sequences)?;
                schema.columns.push(column);
                for c in def.inline_constraints() {
                    let resolved = self.resolve_constraint(&schema, c)?;
                    Self::push_constraint(&mut schema, resolved)?;
                }
                for seq in new_sequences {
                    self.sequences.insert(seq.name.clone(), seq);
                }
            }
            AlterTable::DropColumn(column) => {
                let idx = schema.require_column(&column)?;
                if schema.columns.len() == 1 {
                    return Err(DbError::InvalidDefinition(format!(
                        "cannot drop the only column of relation \"{}\"",
                        name
                    )));
                }
                if let Some(r) = self
                    .referencing(name)
                    .into_iter()
                    .find(|r| r.child_table != name && r.fk.parent_column == column)
                {
                    return Err(DbError::ConstraintViolation(format!(
                        "cannot drop column {} of table {} because constraint {} on table {} depends on it",
                        column, name, r.constraint, r.child_table
                    )));
                }
                schema.constraints.retain(|c| {
                    let self_parent = matches!(
                        &c.kind,
                        ConstraintKind::ForeignKey(fk) if fk.parent_table == name && fk.parent_column == column
                    );
                    !c.mentions(&column) && !self_parent
                });
                let removed = schema.columns.remove(idx);
                if let Some(ColumnDefault::Sequence(seq)) = removed.default {
                    let owner = Some((name.to_string(), column.clone()));
                    if self.sequences.get(&seq).is_some_and(|s| s.owner == owner) {
                        self.sequences.remove(&seq);
                    }
                }
            }
            AlterTable::RenameColumn { from, to } => {
                let idx = schema.require_column(&from)?;
                if schema.column_index(&to).is_some() {
                    return Err(DbError::InvalidDefinition(format!(
                        "column \"{}\" of relation \"{}\" already exists",
                        to, name
                    )));
                }
                schema.columns[idx].name = to.clone();
                for c in &mut schema.constraints {
                    rename_in_constraint(c, name, &from, &to);
                }
                for (table_name, table) in self.tables.iter_mut() {
                    if table_name == name {
                        continue;
                    }
                    for c in &mut table.constraints {
                        if let ConstraintKind::ForeignKey(fk) = &mut c.kind {
                            if fk.parent_table == name && fk.parent_column == from {
                                fk.parent_column = to.clone();
                            }
                        }
                    }
                }
                let old_owner = Some((name.to_string(), from));
                for seq in self.sequences.values_mut() {
                    if seq.owner == old_owner {
                        seq.owner = Some((name.to_string(), to.clone()));
                    }
                }
            }
            AlterTable::AlterColumnType { column, ty } => {
                let idx = schema.require_column(&column)?;
                let mut partners = schema
                    .foreign_keys()
                    .filter(|(_, fk)| fk.column == column)
                    .map(|(_, fk)| self.column_type(&schema, &fk.parent_table, &fk.parent_column))
                    .collect::<DbResult<Vec<_>>>()?;
                for r in self.referencing(name).into_iter().filter(|r| r.fk.parent_column == column) {
                    partners.push(self.column_type(&schema, &r.child_table, &r.fk.column)?);
                }
                if partners.iter().any(|p| p.family() != ty.family()) {
                    return Err(DbError::InvalidDefinition(format!(
                        "column \"{}\" takes part in a foreign key and cannot change to {}",
                        column, ty
                    )));
                }
                schema.columns[idx].default = match schema.columns[idx].default.take() {
                    Some(ColumnDefault::Value(v)) => Some(ColumnDefault::Value(ty.cast(&column, v)?)),
                    Some(default) => Some(self.check_default(name, &column, ty, &default)?),
                    None => None,
                };
                schema.columns[idx].ty = ty;
                for (_, expr) in schema.checks() {
                    schema.check_condition(expr)?;
                }
            }
            AlterTable::SetDefault { column, default } => {
                let idx = schema.require_column(&column)?;
                let checked = self.check_default(name, &column, schema.columns[idx].ty, &default)?;
                schema.columns[idx].default = Some(checked);
            }
            AlterTable::DropDefault(column) => {
                let idx = schema.require_column(&column)?;
                schema.columns[idx].default = None;
            }
            AlterTable::SetNotNull(column) => {
                let idx = schema.require_column(&column)?;
                schema.columns[idx].not_null = true;
            }
            AlterTable::DropNotNull(column) => {
                let idx = schema.require_column(&column)?;
                schema.columns[idx].not_null = false;
            }
            AlterTable::AddConstraint(def) => {
                let resolved = self.resolve_constraint(&schema, def)?;
                Self::push_constraint(&mut schema, resolved)?;
            }
            AlterTable::DropConstraint(constraint) => {
                let pos = schema.constraints.iter().position(|c| c.name == constraint).ok_or_else(|| {
                    DbError::ConstraintViolation(format!(
                        "constraint \"{}\" of relation \"{}\" does not exist",
                        constraint, name
                    ))
                })?;
                let removed = schema.constraints.remove(pos);
                if let ConstraintKind::PrimaryKey { column } | ConstraintKind::Unique { column } = &removed.kind {
                    let still_unique = schema.is_unique_key(column);
                    let depended = self.referencing(name).into_iter().find(|r| {
                        r.fk.parent_column == *column && !(r.child_table == name && r.constraint == constraint)
                    });
                    if let (false, Some(r)) = (still_unique, depended) {
                        return Err(DbError::ConstraintViolation(format!(
                            "cannot drop constraint {} on table {} because constraint {} on table {} depends on it",
                            constraint, name, r.constraint, r.child_table
                        )));
                    }
                }
            }
            AlterTable::RenameTable(new_name) => {
                if self.tables.contains_key(&new_name) {
                    return Err(DbError::DuplicateTable(new_name));
                }
                self.tables.remove(name);
                schema.name = new_name.clone();
                for table in self.tables.values_mut().chain(std::iter::once(&mut schema)) {
                    for c in &mut table.constraints {
                        if let ConstraintKind::ForeignKey(fk) = &mut c.kind {
                            if fk.parent_table == name {
                                fk.parent_table = new_name.clone();
                            }
                        }
                    }
                }
                for seq in self.sequences.values_mut() {
                    if let Some((owner_table, _)) = &mut seq.owner {
                        if owner_table == name {
                            *owner_table = new_name.clone();
                        }
                    }
                }
                info!("table {} renamed to {}", name, new_name);
                self.tables.insert(new_name, schema);
                return Ok(());
            }
        }
        self.claim_sequences(&schema);
        self.tables.insert(name.to_string(), schema);
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> DbResult<TableSchema> {
        self.get_table(name)?;
        if let Some(r) = self.referencing(name).into_iter().find(|r| r.child_table != name) {
            return Err(DbError::ConstraintViolation(format!(
                "cannot drop table {} because constraint {} on table {} depends on it",
                name, r.constraint, r.child_table
            )));
        }
        self.sequences.retain(|_, s| !matches!(&s.owner, Some((t, _)) if t == name));
        info!("table {} dropped", name);
        self.tables.remove(name).ok_or_else(|| DbError::UnknownTable(name.to_string()))
    }

    pub fn create_sequence(&mut self, name: &str, start: i64, increment: i64) -> DbResult<()> {
        if self.sequences.contains_key(name) {
            return Err(DbError::DuplicateSequence(name.to_string()));
        }
        self.sequences.insert(name.to_string(), Sequence::new(name, start, increment)?);
        info!("sequence {} created (start {}, increment {})", name, start, increment);
        Ok(())
    }

    pub fn sequence(&self, name: &str) -> DbResult<&Sequence> {
        self.sequences.get(name).ok_or_else(|| DbError::UnknownSequence(name.to_string()))
    }

    pub fn next_sequence_value(&mut self, name: &str) -> DbResult<i64> {
        let next = self
            .sequences
            .get_mut(name)
            .ok_or_else(|| DbError::UnknownSequence(name.to_string()))?
            .advance()?;
        debug!("sequence {} -> {}", name, next);
        Ok(next)
    }

    pub fn drop_sequence(&mut self, name: &str) -> DbResult<()> {
        let seq = self.sequence(name)?;
        if let Some((table, column)) = &seq.owner {
            return Err(DbError::ConstraintViolation(format!(
                "cannot drop sequence {} because column {} of table {} requires it",
                name, column, table
            )));
        }
        self.sequences.remove(name);
        Ok(())
    }

    fn column_type(&self, current: &TableSchema, table: &str, column: &str) -> DbResult<ColumnType> {
        let schema = if table == current.name { current } else { self.get_table(table)? };
        let idx = schema.require_column(column)?;
        Ok(schema.columns[idx].ty)
    }

    fn build_column(&self, table: &str, def: &ColumnDef, new_sequences: &mut Vec<Sequence>) -> DbResult<Column> {
        let default = if def.generated {
            if !def.ty.is_integer() {
                return Err(DbError::InvalidDefinition(format!(
                    "generated column \"{}\" must have an integer type, not {}",
                    def.name, def.ty
                )));
            }
            if def.default.is_some() {
                return Err(DbError::InvalidDefinition(format!(
                    "both default and generated value specified for column \"{}\"",
                    def.name
                )));
            }
            let seq_name = format!("{}_{}_seq", table, def.name);
            if self.sequences.contains_key(&seq_name) || new_sequences.iter().any(|s| s.name == seq_name) {
                return Err(DbError::DuplicateSequence(seq_name));
            }
            let mut seq = Sequence::new(seq_name.clone(), sequence::DEFAULT_START, sequence::DEFAULT_INCREMENT)?;
            seq.owner = Some((table.to_string(), def.name.clone()));
            new_sequences.push(seq);
            Some(ColumnDefault::Sequence(seq_name))
        } else {
            match &def.default {
                Some(d) => Some(self.check_default(table, &def.name, def.ty, d)?),
                None => None,
            }
        };
        Ok(Column { name: def.name.clone(), ty: def.ty, not_null: def.not_null, default })
    }

    /// Validate a default against the column type it will feed.
    fn check_default(&self, table: &str, column: &str, ty: ColumnType, default: &ColumnDefault) -> DbResult<ColumnDefault> {
        let clock_fits = match default {
            ColumnDefault::Value(v) => return Ok(ColumnDefault::Value(ty.coerce(column, v.clone())?)),
            ColumnDefault::Sequence(name) => {
                let seq = self.sequence(name)?;
                if !ty.is_integer() {
                    return Err(DbError::InvalidDefinition(format!(
                        "column \"{}\" of type {} cannot draw from sequence \"{}\"",
                        column, ty, name
                    )));
                }
                if let Some((t, c)) = &seq.owner {
                    if t != table || c != column {
                        return Err(DbError::InvalidDefinition(format!(
                            "sequence \"{}\" is already owned by {}.{}",
                            name, t, c
                        )));
                    }
                }
                return Ok(default.clone());
            }
            ColumnDefault::CurrentDate => matches!(ty.family(), TypeFamily::Date | TypeFamily::Timestamp),
            ColumnDefault::CurrentTime => ty.family() == TypeFamily::Time,
            ColumnDefault::CurrentTimestamp => matches!(ty.family(), TypeFamily::Date | TypeFamily::Timestamp),
        };
        if !clock_fits {
            return Err(DbError::TypeMismatch {
                column: column.to_string(),
                expected: ty.to_string(),
                value: default.to_string(),
            });
        }
        Ok(default.clone())
    }

    /// Record `schema`'s columns as owners of the unowned sequences they
    /// draw from.
    fn claim_sequences(&mut self, schema: &TableSchema) {
        for col in &schema.columns {
            if let Some(ColumnDefault::Sequence(name)) = &col.default {
                if let Some(seq) = self.sequences.get_mut(name) {
                    if seq.owner.is_none() {
                        seq.owner = Some((schema.name.clone(), col.name.clone()));
                    }
                }
            }
        }
    }

    fn resolve_constraint(&self, schema: &TableSchema, def: ConstraintDef) -> DbResult<TableConstraint> {
        let kind = match def.spec {
            ConstraintSpec::PrimaryKey(column) => {
                schema.require_column(&column)?;
                if schema.primary_key().is_some() {
                    return Err(DbError::InvalidDefinition(format!(
                        "multiple primary keys for table \"{}\" are not allowed",
                        schema.name
                    )));
                }
                ConstraintKind::PrimaryKey { column }
            }
            ConstraintSpec::Unique(column) => {
                schema.require_column(&column)?;
                ConstraintKind::Unique { column }
            }
            ConstraintSpec::Check(source) => {
                let expr = Expr::parse(&source)?;
                for column in expr.columns() {
                    schema.require_column(column)?;
                }
                schema.check_condition(&expr)?;
                ConstraintKind::Check { expr }
            }
            ConstraintSpec::ForeignKey { column, parent_table, parent_column, on_delete } => {
                let child_idx = schema.require_column(&column)?;
                let parent = if parent_table == schema.name { schema } else { self.get_table(&parent_table)? };
                let parent_idx = parent.require_column(&parent_column)?;
                if !parent.is_unique_key(&parent_column) {
                    return Err(DbError::InvalidDefinition(format!(
                        "there is no unique constraint matching given keys for referenced table \"{}\"",
                        parent_table
                    )));
                }
                let child = &schema.columns[child_idx];
                let parent_ty = parent.columns[parent_idx].ty;
                if child.ty.family() != parent_ty.family() {
                    return Err(DbError::InvalidDefinition(format!(
                        "key columns \"{}\" and \"{}\" are of incompatible types: {} and {}",
                        column, parent_column, child.ty, parent_ty
                    )));
                }
                if on_delete == ReferentialAction::SetNull && child.not_null {
                    return Err(DbError::InvalidDefinition(format!(
                        "ON DELETE SET NULL needs nullable column \"{}\"",
                        column
                    )));
                }
                ConstraintKind::ForeignKey(ForeignKey { column, parent_table, parent_column, on_delete })
            }
        };
        let name = match def.name {
            Some(name) => name,
            None => Self::generate_name(schema, &kind),
        };
        Ok(TableConstraint { name, kind })
    }

    fn generate_name(schema: &TableSchema, kind: &ConstraintKind) -> String {
        let table = &schema.name;
        let base = match kind {
            ConstraintKind::PrimaryKey { .. } => format!("{}_pkey", table),
            ConstraintKind::Unique { column } => format!("{}_{}_key", table, column),
            ConstraintKind::ForeignKey(fk) => format!("{}_{}_fkey", table, fk.column),
            ConstraintKind::Check { expr } => match expr.columns().as_slice() {
                [column] => format!("{}_{}_check", table, column),
                _ => format!("{}_check", table),
            },
        };
        if schema.constraint(&base).is_none() {
            return base;
        }
        (1..)
            .map(|n| format!("{}{}", base, n))
            .find(|candidate| schema.constraint(candidate).is_none())
            .unwrap_or(base)
    }

    fn push_constraint(schema: &mut TableSchema, constraint: TableConstraint) -> DbResult<()> {
        if schema.constraint(&constraint.name).is_some() {
            return Err(DbError::InvalidDefinition(format!(
                "constraint \"{}\" for relation \"{}\" already exists",
                constraint.name, schema.name
            )));
        }
        schema.constraints.push(constraint);
        Ok(())
    }
}

fn rename_in_constraint(c: &mut TableConstraint, table: &str, from: &str, to: &str) {
    match &mut c.kind {
        ConstraintKind::PrimaryKey { column } | ConstraintKind::Unique { column } => {
            if column == from {
                *column = to.to_string();
            }
        }
        ConstraintKind::Check { expr } => expr.rename_column(from, to),
        ConstraintKind::ForeignKey(fk) => {
            if fk.column == from {
                fk.column = to.to_string();
            }
            if fk.parent_table == table && fk.parent_column == from {
                fk.parent_column = to.to_string();
            }
        }
    }
}
