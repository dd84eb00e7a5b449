//! `nom` parsers for the two textual inputs the engine accepts: column type
//! names and scalar expressions (CHECK bodies and row predicates).

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use lazy_static::lazy_static;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit0, digit1, multispace0, multispace1, none_of, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value},
    multi::{fold_many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
};
use rust_decimal::Decimal;

use crate::error::{DbError, DbResult};
use crate::sql::ast::{BinaryOp, Expr};
use crate::storage::row::{ColumnType, ColumnValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeName {
    SmallInt,
    Integer,
    BigInt,
    Numeric,
    Real,
    Double,
    Char,
    Varchar,
    Text,
    Date,
    Time,
    Timestamp,
    Boolean,
}

lazy_static! {
    static ref TYPE_NAMES: HashMap<&'static str, TypeName> = {
        let mut m = HashMap::new();
        for name in ["SMALLINT", "INT2"] {
            m.insert(name, TypeName::SmallInt);
        }
        for name in ["INTEGER", "INT", "INT4"] {
            m.insert(name, TypeName::Integer);
        }
        for name in ["BIGINT", "INT8"] {
            m.insert(name, TypeName::BigInt);
        }
        for name in ["NUMERIC", "DECIMAL", "DEC"] {
            m.insert(name, TypeName::Numeric);
        }
        for name in ["REAL", "FLOAT4"] {
            m.insert(name, TypeName::Real);
        }
        for name in ["DOUBLE PRECISION", "DOUBLE", "FLOAT8", "FLOAT"] {
            m.insert(name, TypeName::Double);
        }
        for name in ["CHAR", "CHARACTER", "BPCHAR"] {
            m.insert(name, TypeName::Char);
        }
        for name in ["VARCHAR", "CHARACTER VARYING", "CHAR VARYING"] {
            m.insert(name, TypeName::Varchar);
        }
        m.insert("TEXT", TypeName::Text);
        m.insert("DATE", TypeName::Date);
        m.insert("TIME", TypeName::Time);
        for name in ["TIMESTAMP", "DATETIME"] {
            m.insert(name, TypeName::Timestamp);
        }
        for name in ["BOOLEAN", "BOOL"] {
            m.insert(name, TypeName::Boolean);
        }
        m
    };

    static ref RESERVED: HashSet<&'static str> = [
        "AND", "OR", "NOT", "IS", "NULL", "BETWEEN", "IN", "LIKE", "TRUE", "FALSE",
    ]
    .into_iter()
    .collect();
}

/// Numeric precision ceiling of the decimal representation.
const MAX_NUMERIC_PRECISION: u32 = 28;

fn parse_failure(what: &str, input: &str, err: nom::Err<nom::error::Error<&str>>) -> DbError {
    let at = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.input,
        nom::Err::Incomplete(_) => "",
    };
    if at.is_empty() {
        DbError::Parse(format!("unexpected end of {} '{}'", what, input))
    } else {
        DbError::Parse(format!("invalid {} '{}' near '{}'", what, input, at))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A keyword that is not the prefix of a longer identifier.
fn keyword<'a>(kw: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    preceded(multispace0, terminated(tag_no_case(kw), not(satisfy(is_ident_char))))
}

fn symbol<'a>(s: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    preceded(multispace0, tag(s))
}

// ---- column types ----------------------------------------------------------

fn type_words(input: &str) -> IResult<&str, String> {
    map(
        separated_list1(multispace1, take_while1(|c: char| c.is_ascii_alphanumeric())),
        |words: Vec<&str>| words.join(" ").to_ascii_uppercase(),
    )
    .parse(input)
}

fn type_params(input: &str) -> IResult<&str, Vec<u32>> {
    delimited(
        symbol("("),
        separated_list1(symbol(","), preceded(multispace0, map_res(digit1, |s: &str| s.parse::<u32>()))),
        symbol(")"),
    )
    .parse(input)
}

pub fn parse_column_type(input: &str) -> DbResult<ColumnType> {
    let (_, (words, params)) = all_consuming(delimited(
        multispace0,
        pair(type_words, opt(type_params)),
        multispace0,
    ))
    .parse(input)
    .map_err(|e| parse_failure("type", input, e))?;

    let name = *TYPE_NAMES
        .get(words.as_str())
        .ok_or_else(|| DbError::Parse(format!("unknown type '{}'", words)))?;
    let params = params.unwrap_or_default();
    let bad = || DbError::Parse(format!("invalid modifiers for type '{}'", input.trim()));

    let ty = match (name, params.as_slice()) {
        (TypeName::SmallInt, []) => ColumnType::SmallInt,
        (TypeName::Integer, []) => ColumnType::Integer,
        (TypeName::BigInt, []) => ColumnType::BigInt,
        (TypeName::Real, []) => ColumnType::Real,
        (TypeName::Double, []) => ColumnType::Double,
        (TypeName::Text, []) => ColumnType::Text,
        (TypeName::Date, []) => ColumnType::Date,
        (TypeName::Time, []) => ColumnType::Time,
        (TypeName::Timestamp, []) => ColumnType::Timestamp,
        (TypeName::Boolean, []) => ColumnType::Boolean,
        (TypeName::Numeric, []) => ColumnType::Numeric { precision: None, scale: 0 },
        (TypeName::Numeric, [p]) => ColumnType::Numeric { precision: Some(*p), scale: 0 },
        (TypeName::Numeric, [p, s]) => ColumnType::Numeric { precision: Some(*p), scale: *s },
        (TypeName::Char, []) => ColumnType::Char(1),
        (TypeName::Char, [n]) => ColumnType::Char(*n as usize),
        (TypeName::Varchar, []) => ColumnType::Varchar(None),
        (TypeName::Varchar, [n]) => ColumnType::Varchar(Some(*n as usize)),
        _ => return Err(bad()),
    };
    match ty {
        ColumnType::Numeric { precision: Some(p), scale } if p == 0 || p > MAX_NUMERIC_PRECISION || scale > p => {
            Err(bad())
        }
        ColumnType::Char(0) | ColumnType::Varchar(Some(0)) => Err(bad()),
        ty => Ok(ty),
    }
}

// ---- expressions -----------------------------------------------------------

pub fn parse_expression(input: &str) -> DbResult<Expr> {
    let (_, expr) = all_consuming(terminated(or_expr, multispace0))
        .parse(input)
        .map_err(|e| parse_failure("expression", input, e))?;
    Ok(expr)
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = and_expr(input)?;
    fold_many0(
        preceded(keyword("OR"), and_expr),
        move || first.clone(),
        |acc, rhs| Expr::binary(BinaryOp::Or, acc, rhs),
    )
    .parse(input)
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = not_expr(input)?;
    fold_many0(
        preceded(keyword("AND"), not_expr),
        move || first.clone(),
        |acc, rhs| Expr::binary(BinaryOp::And, acc, rhs),
    )
    .parse(input)
}

fn not_expr(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(keyword("NOT"), not_expr), |e| Expr::Not(Box::new(e))),
        predicate,
    ))
    .parse(input)
}

fn comparison_op(input: &str) -> IResult<&str, BinaryOp> {
    preceded(
        multispace0,
        alt((
            value(BinaryOp::LtEq, tag("<=")),
            value(BinaryOp::NotEq, tag("<>")),
            value(BinaryOp::NotEq, tag("!=")),
            value(BinaryOp::GtEq, tag(">=")),
            value(BinaryOp::Lt, tag("<")),
            value(BinaryOp::Gt, tag(">")),
            value(BinaryOp::Eq, tag("=")),
        )),
    )
    .parse(input)
}

fn predicate(input: &str) -> IResult<&str, Expr> {
    let (input, left) = additive(input)?;

    if let Ok((rest, op)) = comparison_op(input) {
        let (rest, right) = additive(rest)?;
        return Ok((rest, Expr::binary(op, left, right)));
    }

    if let Ok((rest, negated)) = preceded(keyword("IS"), map(opt(keyword("NOT")), |n| n.is_some())).parse(input) {
        let (rest, _) = keyword("NULL").parse(rest)?;
        return Ok((rest, Expr::IsNull { expr: Box::new(left), negated }));
    }

    let (after_not, negated) = match keyword("NOT").parse(input) {
        Ok((rest, _)) => (rest, true),
        Err(_) => (input, false),
    };

    if let Ok((rest, _)) = keyword("BETWEEN").parse(after_not) {
        let (rest, low) = additive(rest)?;
        let (rest, _) = keyword("AND").parse(rest)?;
        let (rest, high) = additive(rest)?;
        let expr = Expr::Between { expr: Box::new(left), low: Box::new(low), high: Box::new(high), negated };
        return Ok((rest, expr));
    }

    if let Ok((rest, _)) = keyword("IN").parse(after_not) {
        let (rest, list) = delimited(symbol("("), separated_list1(symbol(","), or_expr), symbol(")")).parse(rest)?;
        return Ok((rest, Expr::InList { expr: Box::new(left), list, negated }));
    }

    if let Ok((rest, _)) = keyword("LIKE").parse(after_not) {
        let (rest, pattern) = additive(rest)?;
        return Ok((rest, Expr::Like { expr: Box::new(left), pattern: Box::new(pattern), negated }));
    }

    Ok((input, left))
}

fn additive(input: &str) -> IResult<&str, Expr> {
    let (input, first) = multiplicative(input)?;
    fold_many0(
        pair(
            alt((
                value(BinaryOp::Concat, symbol("||")),
                value(BinaryOp::Add, symbol("+")),
                value(BinaryOp::Sub, symbol("-")),
            )),
            multiplicative,
        ),
        move || first.clone(),
        |acc, (op, rhs)| Expr::binary(op, acc, rhs),
    )
    .parse(input)
}

fn multiplicative(input: &str) -> IResult<&str, Expr> {
    let (input, first) = unary(input)?;
    fold_many0(
        pair(alt((value(BinaryOp::Mul, symbol("*")), value(BinaryOp::Div, symbol("/")))), unary),
        move || first.clone(),
        |acc, (op, rhs)| Expr::binary(op, acc, rhs),
    )
    .parse(input)
}

fn unary(input: &str) -> IResult<&str, Expr> {
    alt((map(preceded(symbol("-"), unary), |e| Expr::Negate(Box::new(e))), primary)).parse(input)
}

fn primary(input: &str) -> IResult<&str, Expr> {
    preceded(
        multispace0,
        alt((
            delimited(char('('), or_expr, symbol(")")),
            map(number, Expr::Literal),
            map(string_literal, |s| Expr::Literal(ColumnValue::Text(s))),
            value(Expr::Literal(ColumnValue::Null), keyword("NULL")),
            value(Expr::Literal(ColumnValue::Boolean(true)), keyword("TRUE")),
            value(Expr::Literal(ColumnValue::Boolean(false)), keyword("FALSE")),
            function_call,
            map(identifier, Expr::Column),
        )),
    )
    .parse(input)
}

fn number(input: &str) -> IResult<&str, ColumnValue> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit0)))),
        |s: &str| -> Result<ColumnValue, rust_decimal::Error> {
            if !s.contains('.') {
                if let Ok(i) = s.parse::<i64>() {
                    return Ok(ColumnValue::Integer(i));
                }
            }
            Decimal::from_str(s).map(ColumnValue::Numeric)
        },
    )
    .parse(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('\''),
        fold_many0(
            alt((value('\'', tag("''")), none_of("'"))),
            String::new,
            |mut s, c| {
                s.push(c);
                s
            },
        ),
        char('\''),
    )
    .parse(input)
}

fn bare_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(is_ident_start), take_while(is_ident_char))).parse(input)
}

fn identifier(input: &str) -> IResult<&str, String> {
    alt((
        map(delimited(char('"'), take_while1(|c: char| c != '"'), char('"')), str::to_string),
        map_res(bare_identifier, |s: &str| {
            if RESERVED.contains(s.to_ascii_uppercase().as_str()) {
                Err(())
            } else {
                Ok(s.to_string())
            }
        }),
    ))
    .parse(input)
}

fn function_call(input: &str) -> IResult<&str, Expr> {
    alt((
        map(
            alt((keyword("CURRENT_TIMESTAMP"), keyword("CURRENT_DATE"), keyword("CURRENT_TIME"))),
            |name| Expr::Function { name: name.to_ascii_uppercase(), args: Vec::new() },
        ),
        map(
            pair(
                bare_identifier,
                delimited(symbol("("), separated_list0(symbol(","), or_expr), symbol(")")),
            ),
            |(name, args)| Expr::Function { name: name.to_ascii_uppercase(), args },
        ),
    ))
    .parse(input)
}
