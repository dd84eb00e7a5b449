use std::fmt;

use crate::storage::row::ColumnValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Concat,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Concat => "||",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq
        )
    }
}

/// Scalar expression used by CHECK constraints and row predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(ColumnValue),
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Not(Box<Expr>),
    Negate(Box<Expr>),
    IsNull { expr: Box<Expr>, negated: bool },
    Between { expr: Box<Expr>, low: Box<Expr>, high: Box<Expr>, negated: bool },
    InList { expr: Box<Expr>, list: Vec<Expr>, negated: bool },
    Like { expr: Box<Expr>, pattern: Box<Expr>, negated: bool },
    Function { name: String, args: Vec<Expr> },
}

impl Expr {
    pub fn parse(input: &str) -> crate::error::DbResult<Expr> {
        crate::sql::parser::parse_expression(input)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary { op, left: Box::new(left), right: Box::new(right) }
    }

    /// Column names referenced anywhere in the expression, in first-seen
    /// order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Literal(_) => {}
            Expr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Not(e) | Expr::Negate(e) | Expr::IsNull { expr: e, .. } => e.collect_columns(out),
            Expr::Between { expr, low, high, .. } => {
                expr.collect_columns(out);
                low.collect_columns(out);
                high.collect_columns(out);
            }
            Expr::InList { expr, list, .. } => {
                expr.collect_columns(out);
                for e in list {
                    e.collect_columns(out);
                }
            }
            Expr::Like { expr, pattern, .. } => {
                expr.collect_columns(out);
                pattern.collect_columns(out);
            }
            Expr::Function { args, .. } => {
                for a in args {
                    a.collect_columns(out);
                }
            }
        }
    }

    pub fn references(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    pub fn rename_column(&mut self, from: &str, to: &str) {
        match self {
            Expr::Column(name) => {
                if name == from {
                    *name = to.to_string();
                }
            }
            Expr::Literal(_) => {}
            Expr::Binary { left, right, .. } => {
                left.rename_column(from, to);
                right.rename_column(from, to);
            }
            Expr::Not(e) | Expr::Negate(e) | Expr::IsNull { expr: e, .. } => e.rename_column(from, to),
            Expr::Between { expr, low, high, .. } => {
                expr.rename_column(from, to);
                low.rename_column(from, to);
                high.rename_column(from, to);
            }
            Expr::InList { expr, list, .. } => {
                expr.rename_column(from, to);
                for e in list {
                    e.rename_column(from, to);
                }
            }
            Expr::Like { expr, pattern, .. } => {
                expr.rename_column(from, to);
                pattern.rename_column(from, to);
            }
            Expr::Function { args, .. } => {
                for a in args {
                    a.rename_column(from, to);
                }
            }
        }
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &ColumnValue) -> fmt::Result {
    match value {
        ColumnValue::Null | ColumnValue::Integer(_) | ColumnValue::Numeric(_) | ColumnValue::Float(_) => {
            write!(f, "{}", value)
        }
        ColumnValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        other => write!(f, "'{}'", other.to_string().replace('\'', "''")),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = |negated: &bool| if *negated { "NOT " } else { "" };
        match self {
            Expr::Column(name) => write!(f, "{}", name),
            Expr::Literal(v) => write_literal(f, v),
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op.as_str(), right),
            Expr::Not(e) => write!(f, "NOT {}", e),
            Expr::Negate(e) => write!(f, "-{}", e),
            Expr::IsNull { expr, negated } => write!(f, "{} IS {}NULL", expr, not(negated)),
            Expr::Between { expr, low, high, negated } => {
                write!(f, "{} {}BETWEEN {} AND {}", expr, not(negated), low, high)
            }
            Expr::InList { expr, list, negated } => {
                let items: Vec<String> = list.iter().map(ToString::to_string).collect();
                write!(f, "{} {}IN ({})", expr, not(negated), items.join(", "))
            }
            Expr::Like { expr, pattern, negated } => write!(f, "{} {}LIKE {}", expr, not(negated), pattern),
            Expr::Function { name, args } if args.is_empty() && name.starts_with("CURRENT_") => {
                write!(f, "{}", name)
            }
            Expr::Function { name, args } => {
                let items: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "{}({})", name, items.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_columns_once() {
        let e = Expr::parse("salary > 0 AND salary < bonus * 10").unwrap();
        assert_eq!(e.columns(), vec!["salary", "bonus"]);
        assert!(e.references("bonus"));
        assert!(!e.references("name"));
    }

    #[test]
    fn rename_rewrites_every_reference() {
        let mut e = Expr::parse("qty > 0 AND qty IS NOT NULL").unwrap();
        e.rename_column("qty", "quantity");
        assert_eq!(e.columns(), vec!["quantity"]);
    }

    #[test]
    fn display_round_trips_through_parser() {
        let src = "status IN ('active', 'on''hold') AND LENGTH(code) = 5";
        let e = Expr::parse(src).unwrap();
        assert_eq!(Expr::parse(&e.to_string()).unwrap(), e);
    }
}
