use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DbError, DbResult};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 3] = ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    SmallInt,
    Integer,
    BigInt,
    /// Exact decimal. `precision: None` is an unconstrained NUMERIC.
    Numeric { precision: Option<u32>, scale: u32 },
    Real,
    Double,
    /// Fixed length, blank padded.
    Char(usize),
    Varchar(Option<usize>),
    Text,
    Date,
    Time,
    Timestamp,
    Boolean,
}

/// Groups of types whose values can be compared with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Numeric,
    Text,
    Date,
    Time,
    Timestamp,
    Boolean,
}

impl ColumnType {
    /// Parse a type name such as `INTEGER`, `NUMERIC(10,2)` or
    /// `CHARACTER VARYING(50)`.
    pub fn parse(s: &str) -> DbResult<Self> {
        crate::sql::parser::parse_column_type(s)
    }

    pub fn family(&self) -> TypeFamily {
        match self {
            ColumnType::SmallInt
            | ColumnType::Integer
            | ColumnType::BigInt
            | ColumnType::Numeric { .. }
            | ColumnType::Real
            | ColumnType::Double => TypeFamily::Numeric,
            ColumnType::Char(_) | ColumnType::Varchar(_) | ColumnType::Text => TypeFamily::Text,
            ColumnType::Date => TypeFamily::Date,
            ColumnType::Time => TypeFamily::Time,
            ColumnType::Timestamp => TypeFamily::Timestamp,
            ColumnType::Boolean => TypeFamily::Boolean,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt)
    }

    /// Conversion used when a column changes type: like [`coerce`], except
    /// that any value may become text by rendering it.
    ///
    /// [`coerce`]: ColumnType::coerce
    pub fn cast(&self, column: &str, value: ColumnValue) -> DbResult<ColumnValue> {
        let value = match value {
            ColumnValue::Char(s) => ColumnValue::Text(s.trim_end_matches(' ').to_string()),
            ColumnValue::Null | ColumnValue::Text(_) => value,
            other if self.family() == TypeFamily::Text => ColumnValue::Text(other.to_string()),
            other => other,
        };
        self.coerce(column, value)
    }

    /// Convert `value` into this type, enforcing ranges, lengths and
    /// precision. NULL passes through untouched.
    pub fn coerce(&self, column: &str, value: ColumnValue) -> DbResult<ColumnValue> {
        if value.is_null() {
            return Ok(ColumnValue::Null);
        }
        let mismatch = |value: &ColumnValue| DbError::TypeMismatch {
            column: column.to_string(),
            expected: self.to_string(),
            value: value.to_string(),
        };
        match self {
            ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt => {
                let i = match &value {
                    ColumnValue::Integer(i) => Some(*i),
                    ColumnValue::Numeric(d) if d.fract().is_zero() => d.to_i64(),
                    ColumnValue::Float(f) if f.is_finite() && f.fract() == 0.0 => f.to_i64(),
                    ColumnValue::Text(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| mismatch(&value))?;
                let (min, max) = match self {
                    ColumnType::SmallInt => (i16::MIN as i64, i16::MAX as i64),
                    ColumnType::Integer => (i32::MIN as i64, i32::MAX as i64),
                    _ => (i64::MIN, i64::MAX),
                };
                if !(min..=max).contains(&i) {
                    return Err(mismatch(&value));
                }
                Ok(ColumnValue::Integer(i))
            }
            ColumnType::Numeric { precision, scale } => {
                let d = match &value {
                    ColumnValue::Integer(i) => Some(Decimal::from(*i)),
                    ColumnValue::Numeric(d) => Some(*d),
                    ColumnValue::Float(f) => Decimal::from_f64(*f),
                    ColumnValue::Text(s) => Decimal::from_str(s.trim()).ok(),
                    _ => None,
                }
                .ok_or_else(|| mismatch(&value))?;
                let Some(precision) = precision else {
                    return Ok(ColumnValue::Numeric(d));
                };
                let mut rounded = d.round_dp_with_strategy(*scale, RoundingStrategy::MidpointAwayFromZero);
                // display with the declared scale, `5` as `5.00`
                rounded.rescale(*scale);
                let integral = rounded.trunc().abs();
                let digits = if integral.is_zero() { 0 } else { integral.to_string().len() as u32 };
                if digits > precision.saturating_sub(*scale) {
                    return Err(mismatch(&value));
                }
                Ok(ColumnValue::Numeric(rounded))
            }
            ColumnType::Real | ColumnType::Double => {
                let f = match &value {
                    ColumnValue::Integer(i) => Some(*i as f64),
                    ColumnValue::Numeric(d) => d.to_f64(),
                    ColumnValue::Float(f) => Some(*f),
                    ColumnValue::Text(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| mismatch(&value))?;
                if *self == ColumnType::Real {
                    let narrowed = f as f32;
                    if narrowed.is_infinite() && f.is_finite() {
                        return Err(mismatch(&value));
                    }
                    return Ok(ColumnValue::Float(narrowed as f64));
                }
                Ok(ColumnValue::Float(f))
            }
            ColumnType::Char(len) => {
                let s = value.as_text().ok_or_else(|| mismatch(&value))?;
                let s = fit_length(s, *len).ok_or_else(|| mismatch(&value))?;
                let padding = len - s.chars().count();
                Ok(ColumnValue::Char(format!("{}{}", s, " ".repeat(padding))))
            }
            ColumnType::Varchar(limit) => {
                let s = value.as_text().ok_or_else(|| mismatch(&value))?;
                match limit {
                    Some(len) => Ok(ColumnValue::Text(fit_length(s, *len).ok_or_else(|| mismatch(&value))?.to_string())),
                    None => Ok(ColumnValue::Text(s.to_string())),
                }
            }
            ColumnType::Text => {
                let s = value.as_text().ok_or_else(|| mismatch(&value))?;
                Ok(ColumnValue::Text(s.to_string()))
            }
            ColumnType::Date => match &value {
                ColumnValue::Date(d) => Ok(ColumnValue::Date(*d)),
                ColumnValue::Timestamp(ts) => Ok(ColumnValue::Date(ts.date())),
                ColumnValue::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                    .map(ColumnValue::Date)
                    .map_err(|_| mismatch(&value)),
                _ => Err(mismatch(&value)),
            },
            ColumnType::Time => match &value {
                ColumnValue::Time(t) => Ok(ColumnValue::Time(*t)),
                ColumnValue::Timestamp(ts) => Ok(ColumnValue::Time(ts.time())),
                ColumnValue::Text(s) => TIME_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveTime::parse_from_str(s.trim(), fmt).ok())
                    .map(ColumnValue::Time)
                    .ok_or_else(|| mismatch(&value)),
                _ => Err(mismatch(&value)),
            },
            ColumnType::Timestamp => match &value {
                ColumnValue::Timestamp(ts) => Ok(ColumnValue::Timestamp(*ts)),
                ColumnValue::Date(d) => d
                    .and_hms_opt(0, 0, 0)
                    .map(ColumnValue::Timestamp)
                    .ok_or_else(|| mismatch(&value)),
                ColumnValue::Text(s) => {
                    let s = s.trim();
                    TIMESTAMP_FORMATS
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                        .or_else(|| {
                            NaiveDate::parse_from_str(s, DATE_FORMAT)
                                .ok()
                                .and_then(|d| d.and_hms_opt(0, 0, 0))
                        })
                        .map(ColumnValue::Timestamp)
                        .ok_or_else(|| mismatch(&value))
                }
                _ => Err(mismatch(&value)),
            },
            ColumnType::Boolean => match &value {
                ColumnValue::Boolean(b) => Ok(ColumnValue::Boolean(*b)),
                ColumnValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "t" | "true" | "y" | "yes" | "on" | "1" => Ok(ColumnValue::Boolean(true)),
                    "f" | "false" | "n" | "no" | "off" | "0" => Ok(ColumnValue::Boolean(false)),
                    _ => Err(mismatch(&value)),
                },
                _ => Err(mismatch(&value)),
            },
        }
    }
}

/// Trim `s` to `len` characters when only blanks would be cut off.
fn fit_length(s: &str, len: usize) -> Option<&str> {
    match s.char_indices().nth(len) {
        None => Some(s),
        Some((cut, _)) if s[cut..].chars().all(|c| c == ' ') => Some(&s[..cut]),
        Some(_) => None,
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::SmallInt => write!(f, "SMALLINT"),
            ColumnType::Integer => write!(f, "INTEGER"),
            ColumnType::BigInt => write!(f, "BIGINT"),
            ColumnType::Numeric { precision: None, .. } => write!(f, "NUMERIC"),
            ColumnType::Numeric { precision: Some(p), scale } => write!(f, "NUMERIC({},{})", p, scale),
            ColumnType::Real => write!(f, "REAL"),
            ColumnType::Double => write!(f, "DOUBLE PRECISION"),
            ColumnType::Char(len) => write!(f, "CHAR({})", len),
            ColumnType::Varchar(None) => write!(f, "VARCHAR"),
            ColumnType::Varchar(Some(len)) => write!(f, "VARCHAR({})", len),
            ColumnType::Text => write!(f, "TEXT"),
            ColumnType::Date => write!(f, "DATE"),
            ColumnType::Time => write!(f, "TIME"),
            ColumnType::Timestamp => write!(f, "TIMESTAMP"),
            ColumnType::Boolean => write!(f, "BOOLEAN"),
        }
    }
}

impl FromStr for ColumnType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnType::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Integer(i64),
    Numeric(Decimal),
    Float(f64),
    Text(String),
    /// Blank-padded CHAR(n) contents.
    Char(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Boolean(bool),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// Text content, with CHAR padding left in place.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(s) | ColumnValue::Char(s) => Some(s),
            _ => None,
        }
    }

    /// Text content with CHAR semantics applied: trailing blanks of a
    /// CHAR value are insignificant.
    pub fn text_semantics(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(s) => Some(s),
            ColumnValue::Char(s) => Some(s.trim_end_matches(' ')),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ColumnValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ColumnValue::Integer(i) => Some(Decimal::from(*i)),
            ColumnValue::Numeric(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Integer(i) => Some(*i as f64),
            ColumnValue::Numeric(d) => d.to_f64(),
            ColumnValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnValue::Null => "NULL",
            ColumnValue::Integer(_) => "INTEGER",
            ColumnValue::Numeric(_) => "NUMERIC",
            ColumnValue::Float(_) => "DOUBLE PRECISION",
            ColumnValue::Text(_) => "TEXT",
            ColumnValue::Char(_) => "CHAR",
            ColumnValue::Date(_) => "DATE",
            ColumnValue::Time(_) => "TIME",
            ColumnValue::Timestamp(_) => "TIMESTAMP",
            ColumnValue::Boolean(_) => "BOOLEAN",
        }
    }

    /// SQL comparison. `None` when either side is NULL or the two values
    /// are not comparable.
    pub fn compare(&self, other: &ColumnValue) -> Option<Ordering> {
        use ColumnValue::*;
        match (self, other) {
            (Null, _) | (_, Null) => None,
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Integer(_) | Numeric(_), Integer(_) | Numeric(_)) => {
                Some(self.as_decimal()?.cmp(&other.as_decimal()?))
            }
            (Float(_), Integer(_) | Numeric(_) | Float(_)) | (Integer(_) | Numeric(_), Float(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            (Text(_) | Char(_), Text(_) | Char(_)) => {
                Some(self.text_semantics()?.cmp(other.text_semantics()?))
            }
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (Date(a), Timestamp(b)) => a.and_hms_opt(0, 0, 0).map(|a| a.cmp(b)),
            (Timestamp(a), Date(b)) => b.and_hms_opt(0, 0, 0).map(|b| a.cmp(&b)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Hashable identity used by uniqueness and key lookups.
    pub fn index_key(&self) -> Option<IndexKey> {
        Some(match self {
            ColumnValue::Null => return None,
            ColumnValue::Integer(i) => IndexKey::Integer(*i),
            ColumnValue::Numeric(d) => numeric_key(*d),
            // finite floats share keys with equal integers and decimals
            ColumnValue::Float(f) => match Decimal::from_f64(*f) {
                Some(d) if f.is_finite() => numeric_key(d),
                _ => IndexKey::Float((*f + 0.0).to_bits()),
            },
            ColumnValue::Text(_) | ColumnValue::Char(_) => {
                IndexKey::Text(self.text_semantics()?.to_string())
            }
            ColumnValue::Date(d) => IndexKey::Date(*d),
            ColumnValue::Time(t) => IndexKey::Time(*t),
            ColumnValue::Timestamp(ts) => IndexKey::Timestamp(*ts),
            ColumnValue::Boolean(b) => IndexKey::Boolean(*b),
        })
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Null => write!(f, "NULL"),
            ColumnValue::Integer(i) => write!(f, "{}", i),
            ColumnValue::Numeric(d) => write!(f, "{}", d),
            ColumnValue::Float(v) => write!(f, "{}", v),
            ColumnValue::Text(s) | ColumnValue::Char(s) => write!(f, "{}", s),
            ColumnValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            ColumnValue::Time(t) => write!(f, "{}", t),
            ColumnValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            ColumnValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

macro_rules! column_value_from {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),* $(,)?) => {
        $(impl From<$ty> for ColumnValue {
            fn from(v: $ty) -> Self {
                ColumnValue::$variant(v $(as $cast)?)
            }
        })*
    };
}

column_value_from! {
    i16 => Integer as i64,
    i32 => Integer as i64,
    i64 => Integer,
    f32 => Float as f64,
    f64 => Float,
    bool => Boolean,
    Decimal => Numeric,
    String => Text,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
}

impl From<&str> for ColumnValue {
    fn from(v: &str) -> Self {
        ColumnValue::Text(v.to_string())
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ColumnValue::Null, Into::into)
    }
}

fn numeric_key(d: Decimal) -> IndexKey {
    match d.fract().is_zero().then(|| d.to_i64()).flatten() {
        Some(i) => IndexKey::Integer(i),
        None => IndexKey::Numeric(d.normalize()),
    }
}

/// Canonical, hashable form of a non-null value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Integer(i64),
    Numeric(Decimal),
    Float(u64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Boolean(bool),
}

/// Values of one row, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowData(pub Vec<ColumnValue>);

impl RowData {
    pub fn get(&self, idx: usize) -> &ColumnValue {
        self.0.get(idx).unwrap_or(&ColumnValue::Null)
    }
}

/// A materialized row handed out to callers: values plus the column names
/// they belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    data: RowData,
}

impl Row {
    pub fn new(columns: Arc<[String]>, data: RowData) -> Self {
        Row { columns, data }
    }

    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| self.data.get(idx))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[ColumnValue] {
        &self.data.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.columns.iter().map(String::as_str).zip(self.data.0.iter())
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vals: Vec<String> = self.data.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", vals.join(" | "))
    }
}
