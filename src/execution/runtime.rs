use log::debug;

use super::{Assigned, Assignments, Database};
use crate::catalog::{AlterTable, ReferentialAction, SchemaRow, TableDefinition, TableSchema};
use crate::constraints::default::DefaultConstraint;
use crate::constraints::foreign_key;
use crate::constraints::{ConstraintEnforcer, ValidationContext};
use crate::error::{DbError, DbResult};
use crate::sql::ast::Expr;
use crate::storage::cursor::RowCursor;
use crate::storage::row::{ColumnValue, Row, RowData};
use crate::storage::table::{RowId, TableStore};

pub fn execute_define(db: &mut Database, def: TableDefinition) -> DbResult<TableSchema> {
    let schema = db.catalog.define_table(def)?.clone();
    db.stores.insert(schema.name.clone(), TableStore::new());
    Ok(schema)
}

pub fn execute_drop(db: &mut Database, table: &str) -> DbResult<TableSchema> {
    let schema = db.catalog.drop_table(table)?;
    db.stores.remove(table);
    Ok(schema)
}

pub fn execute_alter(db: &mut Database, table: &str, change: AlterTable) -> DbResult<()> {
    let before = db.catalog.get_table(table)?.clone();
    db.catalog.alter_table(table, change.clone())?;

    let revalidate_rows = match change {
        AlterTable::RenameTable(new_name) => {
            let store = db.stores.remove(table).unwrap_or_default();
            db.stores.insert(new_name, store);
            return Ok(());
        }
        AlterTable::AddColumn(def) => {
            let after = db.catalog.get_table(table)?;
            let column = after.require_column(&def.name).map(|idx| after.columns[idx].clone())?;
            let mut store = db.store(table)?.clone();
            let catalog = &mut db.catalog;
            store.rewrite(|data| {
                let mut values = data.0.clone();
                values.push(DefaultConstraint::resolve(catalog, &column)?);
                Ok(RowData(values))
            })?;
            db.stores.insert(table.to_string(), store);
            true
        }
        AlterTable::DropColumn(column) => {
            let idx = before.require_column(&column)?;
            db.store_mut(table)?.rewrite(|data| {
                let mut values = data.0.clone();
                values.remove(idx);
                Ok(RowData(values))
            })?;
            false
        }
        AlterTable::AlterColumnType { column, ty } => {
            let idx = before.require_column(&column)?;
            db.store_mut(table)?.rewrite(|data| {
                let mut values = data.0.clone();
                values[idx] = ty.cast(&column, values[idx].clone())?;
                Ok(RowData(values))
            })?;
            true
        }
        AlterTable::SetNotNull(_) | AlterTable::AddConstraint(_) => true,
        _ => false,
    };
    if revalidate_rows {
        revalidate(db, table)?;
    }
    Ok(())
}

/// Run every stored row of `table` through the full constraint chain.
fn revalidate(db: &mut Database, table: &str) -> DbResult<()> {
    let schema = db.catalog.get_table(table)?.clone();
    let rows: Vec<(RowId, RowData)> = db.store(table)?.iter().map(|(id, data)| (id, data.clone())).collect();
    debug!("revalidating {} row(s) of {}", rows.len(), table);
    for (id, mut data) in rows {
        let ctx = ValidationContext::new(&db.catalog, &db.stores, &schema).with_row(id);
        ConstraintEnforcer::validate_row(&ctx, &mut data)?;
        db.store_mut(table)?.replace(id, data);
    }
    Ok(())
}

fn resolve_assignments<'a>(schema: &TableSchema, assignments: &'a Assignments) -> DbResult<Vec<(usize, &'a Assigned)>> {
    let mut resolved: Vec<(usize, &Assigned)> = Vec::with_capacity(assignments.len());
    for (column, value) in assignments.iter() {
        let idx = schema.require_column(column)?;
        if resolved.iter().any(|(i, _)| *i == idx) {
            return Err(DbError::InvalidDefinition(format!("column \"{}\" specified more than once", column)));
        }
        resolved.push((idx, value));
    }
    Ok(resolved)
}

pub fn execute_insert(db: &mut Database, table: &str, row: &Assignments) -> DbResult<Row> {
    let schema = db.catalog.get_table(table)?.clone();
    let assigned = resolve_assignments(&schema, row)?;

    let mut values = Vec::with_capacity(schema.columns.len());
    for (idx, column) in schema.columns.iter().enumerate() {
        let value = match assigned.iter().find(|(i, _)| *i == idx) {
            Some((_, Assigned::Value(v))) => v.clone(),
            Some((_, Assigned::Default)) | None => DefaultConstraint::resolve(&mut db.catalog, column)?,
        };
        values.push(value);
    }

    let mut data = RowData(values);
    let ctx = ValidationContext::new(&db.catalog, &db.stores, &schema);
    ConstraintEnforcer::validate_row(&ctx, &mut data)?;
    db.store_mut(table)?.insert(data.clone());
    Ok(Row::new(schema.column_names(), data))
}

/// Find the row whose primary key equals `key`.
fn locate(db: &Database, schema: &TableSchema, key: &ColumnValue) -> DbResult<RowId> {
    let idx = schema
        .primary_key_index()
        .ok_or_else(|| DbError::MissingPrimaryKey(schema.name.clone()))?;
    let column = &schema.columns[idx];
    let key = column.ty.coerce(&column.name, key.clone())?;
    db.store(&schema.name)?
        .find(idx, &key)
        .ok_or_else(|| DbError::RowNotFound { table: schema.name.clone(), key: key.to_string() })
}

pub fn execute_get(db: &Database, table: &str, key: &ColumnValue) -> DbResult<Row> {
    let schema = db.catalog.get_table(table)?;
    let id = locate(db, schema, key)?;
    let data = db.store(table)?.get(id).cloned().ok_or_else(|| DbError::RowNotFound {
        table: table.to_string(),
        key: key.to_string(),
    })?;
    Ok(Row::new(schema.column_names(), data))
}

pub fn execute_update(db: &mut Database, table: &str, key: &ColumnValue, changes: &Assignments) -> DbResult<Row> {
    let schema = db.catalog.get_table(table)?.clone();
    let assigned = resolve_assignments(&schema, changes)?;
    let id = locate(db, &schema, key)?;
    let data = update_row(db, &schema, id, &assigned)?;
    Ok(Row::new(schema.column_names(), data))
}

pub fn execute_update_where(db: &mut Database, table: &str, predicate: &str, changes: &Assignments) -> DbResult<usize> {
    let schema = db.catalog.get_table(table)?.clone();
    let assigned = resolve_assignments(&schema, changes)?;
    let ids = matching_rows(db, &schema, predicate)?;
    for id in &ids {
        update_row(db, &schema, *id, &assigned)?;
    }
    Ok(ids.len())
}

fn update_row(db: &mut Database, schema: &TableSchema, id: RowId, changes: &[(usize, &Assigned)]) -> DbResult<RowData> {
    let old = db.store(&schema.name)?.get(id).cloned().ok_or_else(|| DbError::RowNotFound {
        table: schema.name.clone(),
        key: id.to_string(),
    })?;
    let mut data = old.clone();
    for (idx, value) in changes {
        data.0[*idx] = match value {
            Assigned::Value(v) => v.clone(),
            Assigned::Default => DefaultConstraint::resolve(&mut db.catalog, &schema.columns[*idx])?,
        };
    }

    let changed: Vec<usize> = changes.iter().map(|(idx, _)| *idx).collect();
    let ctx = ValidationContext::new(&db.catalog, &db.stores, schema)
        .with_row(id)
        .with_changes(&changed);
    ConstraintEnforcer::validate_row(&ctx, &mut data)?;
    foreign_key::validate_parent_update(&ctx, &old, &data)?;
    db.store_mut(&schema.name)?.replace(id, data.clone());
    debug!("row {} of {} updated", id, schema.name);
    Ok(data)
}

pub fn execute_delete(db: &mut Database, table: &str, key: &ColumnValue) -> DbResult<Row> {
    let schema = db.catalog.get_table(table)?.clone();
    let id = locate(db, &schema, key)?;
    let data = delete_row(db, &schema, id)?;
    Ok(Row::new(schema.column_names(), data))
}

pub fn execute_delete_where(db: &mut Database, table: &str, predicate: &str) -> DbResult<usize> {
    let schema = db.catalog.get_table(table)?.clone();
    let mut deleted = 0;
    for id in matching_rows(db, &schema, predicate)? {
        // a cascade through a self reference may already have taken it
        if db.store(table)?.get(id).is_none() {
            continue;
        }
        delete_row(db, &schema, id)?;
        deleted += 1;
    }
    Ok(deleted)
}

fn delete_row(db: &mut Database, schema: &TableSchema, id: RowId) -> DbResult<RowData> {
    let data = db.store_mut(&schema.name)?.remove(id).ok_or_else(|| DbError::RowNotFound {
        table: schema.name.clone(),
        key: id.to_string(),
    })?;
    debug!("row {} of {} deleted", id, schema.name);

    for r in db.catalog.referencing(&schema.name) {
        if r.fk.on_delete == ReferentialAction::NoAction {
            continue;
        }
        let value = data.get(schema.require_column(&r.fk.parent_column)?);
        let ids = {
            let ctx = ValidationContext::new(&db.catalog, &db.stores, schema);
            foreign_key::dependents(&ctx, &r, value)?
        };
        let child = db.catalog.get_table(&r.child_table)?.clone();
        match r.fk.on_delete {
            ReferentialAction::Cascade => {
                for child_id in ids {
                    if db.store(&child.name)?.get(child_id).is_some() {
                        delete_row(db, &child, child_id)?;
                    }
                }
            }
            ReferentialAction::SetNull => {
                let idx = child.require_column(&r.fk.column)?;
                let null = Assigned::Value(ColumnValue::Null);
                for child_id in ids {
                    if db.store(&child.name)?.get(child_id).is_some() {
                        update_row(db, &child, child_id, &[(idx, &null)])?;
                    }
                }
            }
            ReferentialAction::NoAction => {}
        }
    }

    let ctx = ValidationContext::new(&db.catalog, &db.stores, schema);
    ConstraintEnforcer::validate_delete(&ctx, &data)?;
    Ok(data)
}

/// Ids of rows for which `predicate` is TRUE, in insertion order.
fn matching_rows(db: &Database, schema: &TableSchema, predicate: &str) -> DbResult<Vec<RowId>> {
    let expr = Expr::parse(predicate)?;
    for column in expr.columns() {
        schema.require_column(column)?;
    }
    schema.check_condition(&expr)?;
    let mut ids = Vec::new();
    for (id, data) in db.store(&schema.name)?.iter() {
        if expr.truth(&SchemaRow { schema, data })? == Some(true) {
            ids.push(id);
        }
    }
    Ok(ids)
}

pub fn execute_scan(db: &Database, table: &str) -> DbResult<RowCursor> {
    let schema = db.catalog.get_table(table)?;
    Ok(RowCursor::new(schema.column_names(), db.store(table)?.snapshot()))
}

/// `a | b | c` rendering of a row, as the demo prints it.
pub fn format_row(row: &Row) -> String {
    row.values().iter().map(ToString::to_string).collect::<Vec<_>>().join(" | ")
}

pub fn format_header(schema: &TableSchema) -> String {
    schema.header()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnDef, ConstraintDef};
    use crate::storage::row::ColumnType;

    fn db_with_people() -> Database {
        let mut db = Database::default();
        execute_define(
            &mut db,
            TableDefinition::new("people")
                .column(ColumnDef::new("id", ColumnType::Integer).generated().primary_key())
                .column(ColumnDef::new("name", ColumnType::Text).not_null()),
        )
        .unwrap();
        db
    }

    #[test]
    fn format_row_simple() {
        let mut db = db_with_people();
        let row = execute_insert(&mut db, "people", &Assignments::new().set("name", "bob")).unwrap();
        assert_eq!(format_row(&row), "1 | bob");
        assert_eq!(format_header(db.catalog.get_table("people").unwrap()), "id INTEGER | name TEXT");
    }

    #[test]
    fn duplicate_assignment_rejected() {
        let mut db = db_with_people();
        let row = Assignments::new().set("name", "a").set("name", "b");
        let err = execute_insert(&mut db, "people", &row).unwrap_err();
        assert!(matches!(err, DbError::InvalidDefinition(_)));
    }

    #[test]
    fn alter_to_text_renders_values() {
        let mut db = db_with_people();
        execute_insert(&mut db, "people", &Assignments::new().set("name", "a")).unwrap();
        execute_alter(&mut db, "people", AlterTable::AddColumn(ColumnDef::new("age", ColumnType::Integer).default(7)))
            .unwrap();
        execute_alter(&mut db, "people", AlterTable::alter_type("age", ColumnType::Varchar(Some(3)))).unwrap();
        let row = execute_get(&db, "people", &ColumnValue::Integer(1)).unwrap();
        assert_eq!(row.get("age"), Some(&ColumnValue::Text("7".into())));
    }

    #[test]
    fn failing_revalidation_reports_violation() {
        let mut db = db_with_people();
        execute_insert(&mut db, "people", &Assignments::new().set("name", "a")).unwrap();
        execute_insert(&mut db, "people", &Assignments::new().set("name", "a")).unwrap();
        let err = execute_alter(&mut db, "people", AlterTable::AddConstraint(ConstraintDef::unique("name"))).unwrap_err();
        assert!(matches!(err, DbError::UniqueConstraintViolation { .. }));
    }
}
