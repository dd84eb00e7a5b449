use thiserror::Error;

/// Coarse classification of a [`DbError`], handy for matching in callers
/// that do not care about the offending column or value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DuplicateTable,
    UnknownTable,
    UnknownColumn,
    NullConstraintViolation,
    UniqueConstraintViolation,
    CheckConstraintViolation,
    ForeignKeyViolation,
    RowNotFound,
    TypeMismatch,
    ConstraintViolation,
    DuplicateSequence,
    UnknownSequence,
    MissingPrimaryKey,
    InvalidDefinition,
    Parse,
    Evaluation,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DbError {
    #[error("relation \"{0}\" already exists")]
    DuplicateTable(String),
    #[error("relation \"{0}\" does not exist")]
    UnknownTable(String),
    #[error("column \"{column}\" of relation \"{table}\" does not exist")]
    UnknownColumn { table: String, column: String },
    #[error("null value in column \"{column}\" of relation \"{table}\" violates not-null constraint")]
    NullConstraintViolation { table: String, column: String },
    #[error("duplicate key value violates unique constraint \"{constraint}\": ({column})=({value}) already exists")]
    UniqueConstraintViolation {
        table: String,
        constraint: String,
        column: String,
        value: String,
    },
    #[error("new row for relation \"{table}\" violates check constraint \"{constraint}\": ({columns})=({values})")]
    CheckConstraintViolation {
        table: String,
        constraint: String,
        /// Columns the check mentions, comma separated.
        columns: String,
        /// Their values in the rejected row.
        values: String,
    },
    #[error("{table} violates foreign key constraint \"{constraint}\": {detail}")]
    ForeignKeyViolation {
        table: String,
        constraint: String,
        detail: String,
    },
    #[error("no row in \"{table}\" with key {key}")]
    RowNotFound { table: String, key: String },
    #[error("value {value} does not fit column \"{column}\" of type {expected}")]
    TypeMismatch {
        column: String,
        expected: String,
        value: String,
    },
    #[error("{0}")]
    ConstraintViolation(String),
    #[error("sequence \"{0}\" already exists")]
    DuplicateSequence(String),
    #[error("sequence \"{0}\" does not exist")]
    UnknownSequence(String),
    #[error("relation \"{0}\" has no primary key")]
    MissingPrimaryKey(String),
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("evaluation error: {0}")]
    Evaluation(String),
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::DuplicateTable(_) => ErrorKind::DuplicateTable,
            DbError::UnknownTable(_) => ErrorKind::UnknownTable,
            DbError::UnknownColumn { .. } => ErrorKind::UnknownColumn,
            DbError::NullConstraintViolation { .. } => ErrorKind::NullConstraintViolation,
            DbError::UniqueConstraintViolation { .. } => ErrorKind::UniqueConstraintViolation,
            DbError::CheckConstraintViolation { .. } => ErrorKind::CheckConstraintViolation,
            DbError::ForeignKeyViolation { .. } => ErrorKind::ForeignKeyViolation,
            DbError::RowNotFound { .. } => ErrorKind::RowNotFound,
            DbError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            DbError::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            DbError::DuplicateSequence(_) => ErrorKind::DuplicateSequence,
            DbError::UnknownSequence(_) => ErrorKind::UnknownSequence,
            DbError::MissingPrimaryKey(_) => ErrorKind::MissingPrimaryKey,
            DbError::InvalidDefinition(_) => ErrorKind::InvalidDefinition,
            DbError::Parse(_) => ErrorKind::Parse,
            DbError::Evaluation(_) => ErrorKind::Evaluation,
        }
    }

    pub(crate) fn unknown_column(table: &str, column: &str) -> Self {
        DbError::UnknownColumn { table: table.to_string(), column: column.to_string() }
    }

    pub(crate) fn not_null(table: &str, column: &str) -> Self {
        DbError::NullConstraintViolation { table: table.to_string(), column: column.to_string() }
    }
}

pub type DbResult<T> = Result<T, DbError>;
