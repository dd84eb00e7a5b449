pub mod catalog;
pub mod constraints;
pub mod engine;
pub mod error;
pub mod execution;
pub mod sql;
pub mod storage;

pub use catalog::{
    AlterTable, ColumnDef, ColumnDefault, ConstraintDef, ReferentialAction, TableDefinition, TableSchema,
};
pub use engine::Engine;
pub use error::{DbError, DbResult, ErrorKind};
pub use execution::{Assigned, Assignments, Changes, NewRow};
pub use storage::{ColumnType, ColumnValue, Row, RowCursor};
