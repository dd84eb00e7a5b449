use chrono::Local;

use crate::error::{DbError, DbResult};
use crate::storage::row::{ColumnValue, TypeFamily};

pub struct FunctionEvaluator;

/// Argument and result families of a built-in function. `args` is empty for
/// the clock functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub args: &'static [TypeFamily],
    pub returns: TypeFamily,
}

impl FunctionEvaluator {
    pub fn signature(name: &str) -> Option<Signature> {
        let (args, returns): (&'static [TypeFamily], TypeFamily) = match name.to_uppercase().as_str() {
            "CURRENT_TIMESTAMP" | "NOW" => (&[], TypeFamily::Timestamp),
            "CURRENT_DATE" => (&[], TypeFamily::Date),
            "CURRENT_TIME" => (&[], TypeFamily::Time),
            "LENGTH" | "CHAR_LENGTH" => (&[TypeFamily::Text], TypeFamily::Numeric),
            "UPPER" | "LOWER" | "TRIM" => (&[TypeFamily::Text], TypeFamily::Text),
            "ABS" => (&[TypeFamily::Numeric], TypeFamily::Numeric),
            _ => return None,
        };
        Some(Signature { args, returns })
    }

    pub fn evaluate_function(name: &str, args: &[ColumnValue]) -> DbResult<ColumnValue> {
        let upper = name.to_uppercase();
        match upper.as_str() {
            "CURRENT_TIMESTAMP" | "NOW" => {
                Self::arity(&upper, args, 0)?;
                Ok(ColumnValue::Timestamp(Local::now().naive_local()))
            }
            "CURRENT_DATE" => {
                Self::arity(&upper, args, 0)?;
                Ok(ColumnValue::Date(Local::now().date_naive()))
            }
            "CURRENT_TIME" => {
                Self::arity(&upper, args, 0)?;
                Ok(ColumnValue::Time(Local::now().time()))
            }
            "LENGTH" | "CHAR_LENGTH" => {
                Self::arity(&upper, args, 1)?;
                Self::text_fn(&upper, &args[0], |s| ColumnValue::Integer(s.chars().count() as i64))
            }
            "UPPER" => {
                Self::arity(&upper, args, 1)?;
                Self::text_fn(&upper, &args[0], |s| ColumnValue::Text(s.to_uppercase()))
            }
            "LOWER" => {
                Self::arity(&upper, args, 1)?;
                Self::text_fn(&upper, &args[0], |s| ColumnValue::Text(s.to_lowercase()))
            }
            "TRIM" => {
                Self::arity(&upper, args, 1)?;
                Self::text_fn(&upper, &args[0], |s| ColumnValue::Text(s.trim().to_string()))
            }
            "ABS" => {
                Self::arity(&upper, args, 1)?;
                match &args[0] {
                    ColumnValue::Null => Ok(ColumnValue::Null),
                    ColumnValue::Integer(i) => i
                        .checked_abs()
                        .map(ColumnValue::Integer)
                        .ok_or_else(|| DbError::Evaluation("integer out of range".into())),
                    ColumnValue::Numeric(d) => Ok(ColumnValue::Numeric(d.abs())),
                    ColumnValue::Float(f) => Ok(ColumnValue::Float(f.abs())),
                    other => Err(Self::bad_argument(&upper, other)),
                }
            }
            _ => Err(DbError::Evaluation(format!("function {} does not exist", upper))),
        }
    }

    fn arity(name: &str, args: &[ColumnValue], expected: usize) -> DbResult<()> {
        if args.len() != expected {
            return Err(DbError::Evaluation(format!(
                "function {} expects {} argument(s), got {}",
                name,
                expected,
                args.len()
            )));
        }
        Ok(())
    }

    fn text_fn(name: &str, arg: &ColumnValue, f: impl Fn(&str) -> ColumnValue) -> DbResult<ColumnValue> {
        if arg.is_null() {
            return Ok(ColumnValue::Null);
        }
        arg.text_semantics().map(f).ok_or_else(|| Self::bad_argument(name, arg))
    }

    fn bad_argument(name: &str, arg: &ColumnValue) -> DbError {
        DbError::Evaluation(format!("function {}({}) does not exist", name, arg.type_name()))
    }
}
