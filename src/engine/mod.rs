use log::{debug, info, warn};
use parking_lot::RwLock;

use crate::catalog::{AlterTable, TableDefinition, TableSchema};
use crate::error::DbResult;
use crate::execution::runtime::{
    execute_alter, execute_define, execute_delete, execute_delete_where, execute_drop, execute_get, execute_insert,
    execute_scan, execute_update, execute_update_where,
};
use crate::execution::{Changes, Database, NewRow};
use crate::storage::cursor::RowCursor;
use crate::storage::row::{ColumnValue, Row};

/// Thread-safe front door to the store.
///
/// Writers are serialized by one lock. Each mutation runs against a staged
/// copy of the database that replaces the live one only when every check
/// passes, so a failed call changes nothing, sequences included. Readers
/// see the state left by the last completed mutation.
#[derive(Debug, Default)]
pub struct Engine {
    state: RwLock<Database>,
}

impl Engine {
    pub fn new() -> Self {
        Engine::default()
    }

    fn mutate<T>(&self, op: &str, f: impl FnOnce(&mut Database) -> DbResult<T>) -> DbResult<T> {
        let mut state = self.state.write();
        let mut staged = state.clone();
        match f(&mut staged) {
            Ok(out) => {
                *state = staged;
                Ok(out)
            }
            Err(e) => {
                warn!("{} rejected: {}", op, e);
                Err(e)
            }
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Database) -> DbResult<T>) -> DbResult<T> {
        f(&self.state.read())
    }

    pub fn define_table(&self, def: TableDefinition) -> DbResult<TableSchema> {
        let name = def.name.clone();
        self.mutate(&format!("CREATE TABLE {}", name), |db| execute_define(db, def))
    }

    pub fn alter_table(&self, table: &str, change: AlterTable) -> DbResult<()> {
        self.mutate(&format!("ALTER TABLE {}", table), |db| execute_alter(db, table, change))?;
        info!("table {} altered", table);
        Ok(())
    }

    pub fn drop_table(&self, table: &str) -> DbResult<()> {
        self.mutate(&format!("DROP TABLE {}", table), |db| execute_drop(db, table))?;
        Ok(())
    }

    pub fn get_table(&self, table: &str) -> DbResult<TableSchema> {
        self.read(|db| db.catalog.get_table(table).cloned())
    }

    pub fn list_tables(&self) -> Vec<String> {
        self.state.read().catalog.list_tables()
    }

    pub fn create_sequence(&self, name: &str, start: i64, increment: i64) -> DbResult<()> {
        self.mutate(&format!("CREATE SEQUENCE {}", name), |db| {
            db.catalog.create_sequence(name, start, increment)
        })
    }

    pub fn drop_sequence(&self, name: &str) -> DbResult<()> {
        self.mutate(&format!("DROP SEQUENCE {}", name), |db| db.catalog.drop_sequence(name))
    }

    /// `nextval`: advance the sequence and return the new value.
    pub fn next_value(&self, sequence: &str) -> DbResult<i64> {
        self.mutate(&format!("nextval({})", sequence), |db| db.catalog.next_sequence_value(sequence))
    }

    /// `currval`: the last value handed out, `None` before the first.
    pub fn current_value(&self, sequence: &str) -> DbResult<Option<i64>> {
        self.read(|db| Ok(db.catalog.sequence(sequence)?.current()))
    }

    /// Insert one row and return it as stored, defaults resolved.
    pub fn insert(&self, table: &str, row: NewRow) -> DbResult<Row> {
        let row = self.mutate(&format!("INSERT INTO {}", table), |db| execute_insert(db, table, &row))?;
        debug!("inserted into {}: {}", table, row);
        Ok(row)
    }

    /// Insert every row or none of them.
    pub fn insert_many(&self, table: &str, rows: Vec<NewRow>) -> DbResult<Vec<Row>> {
        self.mutate(&format!("INSERT INTO {}", table), |db| {
            rows.iter().map(|row| execute_insert(db, table, row)).collect()
        })
    }

    pub fn get(&self, table: &str, key: impl Into<ColumnValue>) -> DbResult<Row> {
        let key = key.into();
        self.read(|db| execute_get(db, table, &key))
    }

    pub fn update(&self, table: &str, key: impl Into<ColumnValue>, changes: Changes) -> DbResult<Row> {
        let key = key.into();
        self.mutate(&format!("UPDATE {}", table), |db| execute_update(db, table, &key, &changes))
    }

    pub fn delete(&self, table: &str, key: impl Into<ColumnValue>) -> DbResult<Row> {
        let key = key.into();
        self.mutate(&format!("DELETE FROM {}", table), |db| execute_delete(db, table, &key))
    }

    /// Update every row for which `predicate` is true. Returns the count.
    pub fn update_where(&self, table: &str, predicate: &str, changes: Changes) -> DbResult<usize> {
        let updated = self.mutate(&format!("UPDATE {}", table), |db| {
            execute_update_where(db, table, predicate, &changes)
        })?;
        debug!("updated {} row(s) of {}", updated, table);
        Ok(updated)
    }

    pub fn delete_where(&self, table: &str, predicate: &str) -> DbResult<usize> {
        let deleted = self.mutate(&format!("DELETE FROM {}", table), |db| execute_delete_where(db, table, predicate))?;
        debug!("deleted {} row(s) from {}", deleted, table);
        Ok(deleted)
    }

    /// Cursor over a snapshot of the table taken now. Later writes are not
    /// visible through it.
    pub fn scan(&self, table: &str) -> DbResult<RowCursor> {
        self.read(|db| execute_scan(db, table))
    }

    pub fn row_count(&self, table: &str) -> DbResult<usize> {
        self.read(|db| Ok(db.store(table)?.len()))
    }
}
