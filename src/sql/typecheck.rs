//! Static typing of expressions against a table's column types, so that a
//! CHECK or WHERE clause that can never evaluate is rejected up front.

use crate::error::{DbError, DbResult};
use crate::sql::ast::{BinaryOp, Expr};
use crate::sql::functions::FunctionEvaluator;
use crate::storage::row::{ColumnValue, TypeFamily};

/// `None` stands for an untyped NULL, which fits anywhere.
type Family = Option<TypeFamily>;

fn literal_family(v: &ColumnValue) -> Family {
    match v {
        ColumnValue::Null => None,
        ColumnValue::Integer(_) | ColumnValue::Numeric(_) | ColumnValue::Float(_) => Some(TypeFamily::Numeric),
        ColumnValue::Text(_) | ColumnValue::Char(_) => Some(TypeFamily::Text),
        ColumnValue::Date(_) => Some(TypeFamily::Date),
        ColumnValue::Time(_) => Some(TypeFamily::Time),
        ColumnValue::Timestamp(_) => Some(TypeFamily::Timestamp),
        ColumnValue::Boolean(_) => Some(TypeFamily::Boolean),
    }
}

fn comparable(a: Family, b: Family) -> bool {
    use TypeFamily::*;
    match (a, b) {
        (None, _) | (_, None) => true,
        (Some(Date | Timestamp), Some(Date | Timestamp)) => true,
        (Some(a), Some(b)) => a == b,
    }
}

fn family_name(family: Family) -> String {
    family.map_or_else(|| "unknown".to_string(), |f| format!("{:?}", f).to_lowercase())
}

fn expect(expr: &Expr, got: Family, want: TypeFamily) -> DbResult<()> {
    match got {
        Some(family) if family != want => Err(DbError::InvalidDefinition(format!(
            "{} is of type {} but {} is required",
            expr,
            family_name(got),
            family_name(Some(want))
        ))),
        _ => Ok(()),
    }
}

fn expect_comparable(op: &str, left: Family, right: Family) -> DbResult<()> {
    if comparable(left, right) {
        return Ok(());
    }
    Err(DbError::InvalidDefinition(format!(
        "operator does not exist: {} {} {}",
        family_name(left),
        op,
        family_name(right)
    )))
}

impl Expr {
    /// Result family of the expression. `column` resolves a column name to
    /// its family.
    pub fn infer_type(&self, column: &dyn Fn(&str) -> DbResult<TypeFamily>) -> DbResult<Family> {
        let boolean = Some(TypeFamily::Boolean);
        Ok(match self {
            Expr::Column(c) => Some(column(c)?),
            Expr::Literal(v) => literal_family(v),
            Expr::Binary { op, left, right } => {
                let (l, r) = (left.infer_type(column)?, right.infer_type(column)?);
                match op {
                    BinaryOp::And | BinaryOp::Or => {
                        expect(left, l, TypeFamily::Boolean)?;
                        expect(right, r, TypeFamily::Boolean)?;
                        boolean
                    }
                    BinaryOp::Concat => Some(TypeFamily::Text),
                    op if op.is_comparison() => {
                        expect_comparable(op.as_str(), l, r)?;
                        boolean
                    }
                    _ => {
                        expect(left, l, TypeFamily::Numeric)?;
                        expect(right, r, TypeFamily::Numeric)?;
                        Some(TypeFamily::Numeric)
                    }
                }
            }
            Expr::Not(e) => {
                expect(e, e.infer_type(column)?, TypeFamily::Boolean)?;
                boolean
            }
            Expr::Negate(e) => {
                expect(e, e.infer_type(column)?, TypeFamily::Numeric)?;
                Some(TypeFamily::Numeric)
            }
            Expr::IsNull { expr, .. } => {
                expr.infer_type(column)?;
                boolean
            }
            Expr::Between { expr, low, high, .. } => {
                let v = expr.infer_type(column)?;
                expect_comparable(">=", v, low.infer_type(column)?)?;
                expect_comparable("<=", v, high.infer_type(column)?)?;
                boolean
            }
            Expr::InList { expr, list, .. } => {
                let v = expr.infer_type(column)?;
                for item in list {
                    expect_comparable("=", v, item.infer_type(column)?)?;
                }
                boolean
            }
            Expr::Like { expr, pattern, .. } => {
                expect(expr, expr.infer_type(column)?, TypeFamily::Text)?;
                expect(pattern, pattern.infer_type(column)?, TypeFamily::Text)?;
                boolean
            }
            Expr::Function { name, args } => {
                let sig = FunctionEvaluator::signature(name)
                    .ok_or_else(|| DbError::InvalidDefinition(format!("function {} does not exist", name)))?;
                if sig.args.len() != args.len() {
                    return Err(DbError::InvalidDefinition(format!(
                        "function {} expects {} argument(s), got {}",
                        name,
                        sig.args.len(),
                        args.len()
                    )));
                }
                for (arg, want) in args.iter().zip(sig.args) {
                    expect(arg, arg.infer_type(column)?, *want)?;
                }
                Some(sig.returns)
            }
        })
    }

    /// Reject expressions that cannot be used as a condition: ill-typed
    /// operands, unknown functions, or a non-boolean result.
    pub fn check_condition(&self, column: &dyn Fn(&str) -> DbResult<TypeFamily>) -> DbResult<()> {
        let result = self.infer_type(column)?;
        if result.is_some_and(|f| f != TypeFamily::Boolean) {
            return Err(DbError::InvalidDefinition(format!(
                "argument of condition must be type boolean, not type {}",
                family_name(result)
            )));
        }
        Ok(())
    }
}
