use std::cmp::Ordering;

use crate::error::{DbError, DbResult};
use crate::sql::ast::{BinaryOp, Expr};
use crate::sql::functions::FunctionEvaluator;
use crate::storage::row::{ColumnValue, Row};

/// Source of column values for expression evaluation.
pub trait RowContext {
    fn value(&self, column: &str) -> Option<&ColumnValue>;
}

impl RowContext for Row {
    fn value(&self, column: &str) -> Option<&ColumnValue> {
        self.get(column)
    }
}

impl Expr {
    /// Evaluate to a value, using SQL NULL propagation.
    pub fn evaluate(&self, row: &dyn RowContext) -> DbResult<ColumnValue> {
        match self {
            Expr::Column(name) => row
                .value(name)
                .cloned()
                .ok_or_else(|| DbError::Evaluation(format!("column \"{}\" does not exist", name))),
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Binary { op: BinaryOp::And, left, right } => {
                let l = left.truth(row)?;
                if l == Some(false) {
                    return Ok(ColumnValue::Boolean(false));
                }
                Ok(match (l, right.truth(row)?) {
                    (_, Some(false)) => ColumnValue::Boolean(false),
                    (Some(true), Some(true)) => ColumnValue::Boolean(true),
                    _ => ColumnValue::Null,
                })
            }
            Expr::Binary { op: BinaryOp::Or, left, right } => {
                let l = left.truth(row)?;
                if l == Some(true) {
                    return Ok(ColumnValue::Boolean(true));
                }
                Ok(match (l, right.truth(row)?) {
                    (_, Some(true)) => ColumnValue::Boolean(true),
                    (Some(false), Some(false)) => ColumnValue::Boolean(false),
                    _ => ColumnValue::Null,
                })
            }
            Expr::Binary { op, left, right } => {
                let l = left.evaluate(row)?;
                let r = right.evaluate(row)?;
                if op.is_comparison() {
                    compare(*op, &l, &r)
                } else if *op == BinaryOp::Concat {
                    concat(&l, &r)
                } else {
                    arithmetic(*op, &l, &r)
                }
            }
            Expr::Not(e) => Ok(e.truth(row)?.map_or(ColumnValue::Null, |b| ColumnValue::Boolean(!b))),
            Expr::Negate(e) => match e.evaluate(row)? {
                ColumnValue::Null => Ok(ColumnValue::Null),
                ColumnValue::Integer(i) => i.checked_neg().map(ColumnValue::Integer).ok_or_else(overflow),
                ColumnValue::Numeric(d) => Ok(ColumnValue::Numeric(-d)),
                ColumnValue::Float(f) => Ok(ColumnValue::Float(-f)),
                other => Err(DbError::Evaluation(format!("cannot negate {}", other.type_name()))),
            },
            Expr::IsNull { expr, negated } => {
                Ok(ColumnValue::Boolean(expr.evaluate(row)?.is_null() != *negated))
            }
            Expr::Between { expr, low, high, negated } => {
                let v = expr.evaluate(row)?;
                let lo = compare(BinaryOp::GtEq, &v, &low.evaluate(row)?)?;
                let hi = compare(BinaryOp::LtEq, &v, &high.evaluate(row)?)?;
                let inside = match (lo, hi) {
                    (ColumnValue::Boolean(false), _) | (_, ColumnValue::Boolean(false)) => Some(false),
                    (ColumnValue::Boolean(true), ColumnValue::Boolean(true)) => Some(true),
                    _ => None,
                };
                Ok(negate_if(inside, *negated))
            }
            Expr::InList { expr, list, negated } => {
                let v = expr.evaluate(row)?;
                if v.is_null() {
                    return Ok(ColumnValue::Null);
                }
                let mut saw_null = false;
                for item in list {
                    match compare(BinaryOp::Eq, &v, &item.evaluate(row)?)? {
                        ColumnValue::Boolean(true) => return Ok(ColumnValue::Boolean(!*negated)),
                        ColumnValue::Null => saw_null = true,
                        _ => {}
                    }
                }
                Ok(negate_if(if saw_null { None } else { Some(false) }, *negated))
            }
            Expr::Like { expr, pattern, negated } => {
                let v = expr.evaluate(row)?;
                let p = pattern.evaluate(row)?;
                if v.is_null() || p.is_null() {
                    return Ok(ColumnValue::Null);
                }
                match (v.text_semantics(), p.text_semantics()) {
                    (Some(text), Some(pat)) => {
                        let text: Vec<char> = text.chars().collect();
                        let pat: Vec<char> = pat.chars().collect();
                        Ok(negate_if(Some(like_match(&text, &pat)), *negated))
                    }
                    _ => Err(DbError::Evaluation(format!(
                        "operator does not exist: {} LIKE {}",
                        v.type_name(),
                        p.type_name()
                    ))),
                }
            }
            Expr::Function { name, args } => {
                let vals = args.iter().map(|a| a.evaluate(row)).collect::<DbResult<Vec<_>>>()?;
                FunctionEvaluator::evaluate_function(name, &vals)
            }
        }
    }

    /// Evaluate as a condition: `Some(true)`, `Some(false)` or `None` for
    /// unknown.
    pub fn truth(&self, row: &dyn RowContext) -> DbResult<Option<bool>> {
        match self.evaluate(row)? {
            ColumnValue::Boolean(b) => Ok(Some(b)),
            ColumnValue::Null => Ok(None),
            other => Err(DbError::Evaluation(format!(
                "argument of condition must be type boolean, not type {}",
                other.type_name()
            ))),
        }
    }
}

fn negate_if(v: Option<bool>, negated: bool) -> ColumnValue {
    match v {
        Some(b) => ColumnValue::Boolean(b != negated),
        None => ColumnValue::Null,
    }
}

fn overflow() -> DbError {
    DbError::Evaluation("numeric value out of range".into())
}

fn compare(op: BinaryOp, l: &ColumnValue, r: &ColumnValue) -> DbResult<ColumnValue> {
    if l.is_null() || r.is_null() {
        return Ok(ColumnValue::Null);
    }
    let ord = l.compare(r).ok_or_else(|| {
        DbError::Evaluation(format!(
            "operator does not exist: {} {} {}",
            l.type_name(),
            op.as_str(),
            r.type_name()
        ))
    })?;
    let result = match op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::NotEq => ord != Ordering::Equal,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::LtEq => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::GtEq => ord != Ordering::Less,
        _ => unreachable!("not a comparison operator"),
    };
    Ok(ColumnValue::Boolean(result))
}

fn concat(l: &ColumnValue, r: &ColumnValue) -> DbResult<ColumnValue> {
    if l.is_null() || r.is_null() {
        return Ok(ColumnValue::Null);
    }
    let text = |v: &ColumnValue| v.text_semantics().map(str::to_string).unwrap_or_else(|| v.to_string());
    Ok(ColumnValue::Text(format!("{}{}", text(l), text(r))))
}

fn arithmetic(op: BinaryOp, l: &ColumnValue, r: &ColumnValue) -> DbResult<ColumnValue> {
    use ColumnValue::*;
    if l.is_null() || r.is_null() {
        return Ok(Null);
    }
    let division_by_zero = || DbError::Evaluation("division by zero".into());
    match (l, r) {
        (Integer(a), Integer(b)) => {
            let res = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                BinaryOp::Mul => a.checked_mul(*b),
                BinaryOp::Div if *b == 0 => return Err(division_by_zero()),
                BinaryOp::Div => a.checked_div(*b),
                _ => unreachable!("not an arithmetic operator"),
            };
            res.map(Integer).ok_or_else(overflow)
        }
        (Float(_), Integer(_) | Numeric(_) | Float(_)) | (Integer(_) | Numeric(_), Float(_)) => {
            let (a, b) = (l.as_f64().ok_or_else(overflow)?, r.as_f64().ok_or_else(overflow)?);
            let res = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div if b == 0.0 => return Err(division_by_zero()),
                BinaryOp::Div => a / b,
                _ => unreachable!("not an arithmetic operator"),
            };
            Ok(Float(res))
        }
        (Integer(_) | Numeric(_), Integer(_) | Numeric(_)) => {
            let (a, b) = (l.as_decimal().ok_or_else(overflow)?, r.as_decimal().ok_or_else(overflow)?);
            let res = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div if b.is_zero() => return Err(division_by_zero()),
                BinaryOp::Div => a.checked_div(b),
                _ => unreachable!("not an arithmetic operator"),
            };
            res.map(Numeric).ok_or_else(overflow)
        }
        _ => Err(DbError::Evaluation(format!(
            "operator does not exist: {} {} {}",
            l.type_name(),
            op.as_str(),
            r.type_name()
        ))),
    }
}

/// SQL LIKE with `%` (any run) and `_` (any single character).
fn like_match(text: &[char], pattern: &[char]) -> bool {
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if let Some((bp, bt)) = backtrack {
            p = bp + 1;
            t = bt + 1;
            backtrack = Some((bp, bt + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::row::RowData;
    use rust_decimal::Decimal;

    fn row(pairs: &[(&str, ColumnValue)]) -> Row {
        let cols: Vec<String> = pairs.iter().map(|(c, _)| c.to_string()).collect();
        let vals = pairs.iter().map(|(_, v)| v.clone()).collect();
        Row::new(Arc::from(cols), RowData(vals))
    }

    fn truth(src: &str, r: &Row) -> Option<bool> {
        Expr::parse(src).unwrap().truth(r).unwrap()
    }

    #[test]
    fn three_valued_logic() {
        let r = row(&[("a", ColumnValue::Null), ("b", ColumnValue::Integer(1))]);
        assert_eq!(truth("a > 0", &r), None);
        assert_eq!(truth("a > 0 AND b = 2", &r), Some(false));
        assert_eq!(truth("a > 0 OR b = 1", &r), Some(true));
        assert_eq!(truth("NOT (a > 0)", &r), None);
        assert_eq!(truth("a IS NULL", &r), Some(true));
        assert_eq!(truth("b IN (2, NULL)", &r), None);
        assert_eq!(truth("b NOT IN (2, 3)", &r), Some(true));
    }

    #[test]
    fn numeric_comparisons_across_types() {
        let r = row(&[("price", ColumnValue::Numeric(Decimal::new(1999, 2)))]);
        assert_eq!(truth("price > 19", &r), Some(true));
        assert_eq!(truth("price * 2 = 39.98", &r), Some(true));
        assert_eq!(truth("price BETWEEN 10 AND 20", &r), Some(true));
    }

    #[test]
    fn like_patterns() {
        let r = row(&[("email", ColumnValue::Text("amit@example.com".into()))]);
        assert_eq!(truth("email LIKE '%@%.com'", &r), Some(true));
        assert_eq!(truth("email LIKE 'a_it%'", &r), Some(true));
        assert_eq!(truth("email NOT LIKE '%@%'", &r), Some(false));
        assert_eq!(truth("email LIKE 'amit'", &r), Some(false));
    }

    #[test]
    fn evaluation_errors() {
        let r = row(&[("name", ColumnValue::Text("x".into())), ("n", ColumnValue::Integer(1))]);
        assert!(Expr::parse("name > 1").unwrap().truth(&r).is_err());
        assert!(Expr::parse("n / 0 = 1").unwrap().truth(&r).is_err());
        assert!(Expr::parse("missing = 1").unwrap().truth(&r).is_err());
        assert!(Expr::parse("n + 1").unwrap().truth(&r).is_err());
    }
}
