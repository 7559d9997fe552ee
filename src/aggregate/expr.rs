use crate::errors::DbError;
use crate::query::{as_f64_num, get_path, is_num};
use bson::{Bson, Document as BsonDocument};

use super::types::Expr;

pub(crate) fn truthy_number(v: &Bson) -> bool {
    is_num(v) && as_f64_num(v) != 0.0
}

/// Evaluate `expr` against `doc`. `None` means the value is missing, which
/// `$project` drops; arithmetic over a missing or null operand yields `null`.
///
/// # Errors
/// Returns an error for non-numeric arithmetic operands and division by zero.
pub fn eval_expr(expr: &Expr, doc: &BsonDocument) -> Result<Option<Bson>, DbError> {
    Ok(match expr {
        Expr::Field(path) => get_path(doc, path).cloned(),
        Expr::Literal(v) => Some(v.clone()),
        Expr::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval_expr(item, doc)?.unwrap_or(Bson::Null));
            }
            Some(Bson::Array(out))
        }
        Expr::Object(fields) => {
            let mut out = BsonDocument::new();
            for (k, e) in fields {
                if let Some(v) = eval_expr(e, doc)? {
                    out.insert(k.clone(), v);
                }
            }
            Some(Bson::Document(out))
        }
        Expr::Add(args) => fold(args, doc, Bson::Int32(0), "$add", Op::Add)?,
        Expr::Multiply(args) => fold(args, doc, Bson::Int32(1), "$multiply", Op::Mul)?,
        Expr::Subtract(a, b) => binary(a, b, doc, "$subtract", Op::Sub)?,
        Expr::Divide(a, b) => binary(a, b, doc, "$divide", Op::Div)?,
        Expr::Mod(a, b) => binary(a, b, doc, "$mod", Op::Mod)?,
    })
}

#[derive(Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

fn fold(args: &[Expr], doc: &BsonDocument, init: Bson, name: &str, op: Op) -> Result<Option<Bson>, DbError> {
    let mut acc = init;
    for a in args {
        match eval_expr(a, doc)? {
            None | Some(Bson::Null | Bson::Undefined) => return Ok(Some(Bson::Null)),
            Some(v) => acc = arith(&acc, &v, name, op)?,
        }
    }
    Ok(Some(acc))
}

fn binary(a: &Expr, b: &Expr, doc: &BsonDocument, name: &str, op: Op) -> Result<Option<Bson>, DbError> {
    let (Some(x), Some(y)) = (eval_expr(a, doc)?, eval_expr(b, doc)?) else {
        return Ok(Some(Bson::Null));
    };
    if matches!(x, Bson::Null | Bson::Undefined) || matches!(y, Bson::Null | Bson::Undefined) {
        return Ok(Some(Bson::Null));
    }
    arith(&x, &y, name, op).map(Some)
}

fn as_int(x: &Bson) -> Option<i64> {
    match x {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        _ => None,
    }
}

/// Numeric arithmetic with the server's widening rules: int32 op int32 stays
/// int32 when it fits, integers widen to int64, anything with a double is a double.
fn arith(x: &Bson, y: &Bson, name: &str, op: Op) -> Result<Bson, DbError> {
    if !is_num(x) || !is_num(y) {
        return Err(DbError::query(format!("{name} only supports numeric types, not {x} and {y}")));
    }
    let zero_divisor = || as_f64_num(y) == 0.0;
    if matches!(op, Op::Div | Op::Mod) && zero_divisor() {
        return Err(DbError::query(format!("{name} by zero")));
    }
    if !matches!(op, Op::Div)
        && let (Some(a), Some(b)) = (as_int(x), as_int(y))
    {
        let out = match op {
            Op::Add => a.checked_add(b),
            Op::Sub => a.checked_sub(b),
            Op::Mul => a.checked_mul(b),
            Op::Mod => a.checked_rem(b),
            Op::Div => None,
        };
        if let Some(out) = out {
            let both_i32 = matches!((x, y), (Bson::Int32(_), Bson::Int32(_)));
            return Ok(match i32::try_from(out) {
                Ok(small) if both_i32 => Bson::Int32(small),
                _ => Bson::Int64(out),
            });
        }
        // overflow falls through to double arithmetic
    }
    let (a, b) = (as_f64_num(x), as_f64_num(y));
    Ok(Bson::Double(match op {
        Op::Add => a + b,
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div => a / b,
        Op::Mod => a % b,
    }))
}

/// `$sum`-style addition that silently skips non-numeric values.
pub(crate) fn sum_numbers(acc: &Bson, v: &Bson) -> Bson {
    if is_num(v) {
        arith(acc, v, "$sum", Op::Add).unwrap_or_else(|_| acc.clone())
    } else {
        acc.clone()
    }
}
