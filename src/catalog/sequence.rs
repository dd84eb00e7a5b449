use crate::error::{DbError, DbResult};

pub const DEFAULT_START: i64 = 1;
pub const DEFAULT_INCREMENT: i64 = 1;

/// Monotonic integer generator, optionally owned by one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub name: String,
    pub start: i64,
    pub increment: i64,
    current: Option<i64>,
    /// `(table, column)` whose default draws from this sequence.
    pub owner: Option<(String, String)>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, start: i64, increment: i64) -> DbResult<Self> {
        let name = name.into();
        if increment == 0 {
            return Err(DbError::InvalidDefinition(format!("INCREMENT of sequence \"{}\" must not be zero", name)));
        }
        Ok(Sequence { name, start, increment, current: None, owner: None })
    }

    pub fn current(&self) -> Option<i64> {
        self.current
    }

    pub fn peek_next(&self) -> DbResult<i64> {
        match self.current {
            None => Ok(self.start),
            Some(c) => c.checked_add(self.increment).ok_or_else(|| {
                DbError::ConstraintViolation(format!("nextval: reached limit of sequence \"{}\"", self.name))
            }),
        }
    }

    pub fn advance(&mut self) -> DbResult<i64> {
        let next = self.peek_next()?;
        self.current = Some(next);
        Ok(next)
    }
}
