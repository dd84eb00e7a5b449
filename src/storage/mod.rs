pub mod cursor;
pub mod row;
pub mod table;

pub use cursor::RowCursor;
pub use row::{ColumnType, ColumnValue, IndexKey, Row, RowData, TypeFamily};
pub use table::{RowId, TableStore};
