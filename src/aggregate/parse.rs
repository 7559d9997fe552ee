use crate::errors::DbError;
use crate::query::{parse_filter, parse_sort};
use crate::utils::json::parse_json_to_bson_documents;
use crate::utils::num::{bson_as_i64, i64_to_usize};
use bson::{Bson, Document as BsonDocument};

use super::types::{Accumulator, Expr, Pipeline, ProjectField, Stage};

const MAX_STAGES: usize = 100;

/// # Errors
/// Returns `QueryError` for unknown stages or malformed stage arguments.
pub fn parse_pipeline(stages: &[BsonDocument]) -> Result<Pipeline, DbError> {
    if stages.len() > MAX_STAGES {
        return Err(DbError::query(format!("pipeline has more than {MAX_STAGES} stages")));
    }
    let stages = stages.iter().map(parse_stage).collect::<Result<_, _>>()?;
    Ok(Pipeline { stages })
}

/// # Errors
/// Returns an error if the JSON is not an array of stage documents.
pub fn parse_pipeline_json(json: &str) -> Result<Pipeline, DbError> {
    parse_pipeline(&parse_json_to_bson_documents(json)?)
}

fn parse_stage(doc: &BsonDocument) -> Result<Stage, DbError> {
    let mut it = doc.iter();
    let (Some((name, arg)), None) = (it.next(), it.next()) else {
        return Err(DbError::query("a pipeline stage must have exactly one field"));
    };
    match name.as_str() {
        "$match" => Ok(Stage::Match(parse_filter(expect_doc(name, arg)?)?)),
        "$group" => parse_group(expect_doc(name, arg)?),
        "$sort" => {
            let spec = parse_sort(expect_doc(name, arg)?)?;
            if spec.is_empty() {
                return Err(DbError::query("$sort stage must have at least one sort key"));
            }
            Ok(Stage::Sort(spec))
        }
        "$limit" => match bson_as_i64(arg).and_then(i64_to_usize) {
            Some(n) if n > 0 => Ok(Stage::Limit(n)),
            _ => Err(DbError::query(format!("$limit must be a positive integer, got {arg}"))),
        },
        "$skip" => bson_as_i64(arg)
            .and_then(i64_to_usize)
            .map(Stage::Skip)
            .ok_or_else(|| DbError::query(format!("$skip must be a non-negative integer, got {arg}"))),
        "$project" => parse_project(expect_doc(name, arg)?),
        "$count" => match arg {
            Bson::String(s) if !s.is_empty() && !s.starts_with('$') && !s.contains('.') => {
                Ok(Stage::Count(s.clone()))
            }
            _ => Err(DbError::query("$count requires a non-empty field name without '$' or '.'")),
        },
        other => Err(DbError::query(format!("unrecognized pipeline stage name: {other}"))),
    }
}

fn expect_doc<'a>(stage: &str, arg: &'a Bson) -> Result<&'a BsonDocument, DbError> {
    match arg {
        Bson::Document(d) => Ok(d),
        _ => Err(DbError::query(format!("{stage} expects a document"))),
    }
}

fn parse_group(spec: &BsonDocument) -> Result<Stage, DbError> {
    let id = spec
        .get("_id")
        .ok_or_else(|| DbError::query("a group specification must include an _id"))?;
    let id = parse_expr(id)?;
    let mut accumulators = Vec::new();
    for (field, acc) in spec {
        if field == "_id" {
            continue;
        }
        if field.contains('.') {
            return Err(DbError::query(format!("group field '{field}' must not contain '.'")));
        }
        let acc_doc = expect_doc(field, acc)?;
        let mut it = acc_doc.iter();
        let (Some((op, operand)), None) = (it.next(), it.next()) else {
            return Err(DbError::query(format!("group field '{field}' must specify one accumulator")));
        };
        let expr = parse_expr(operand)?;
        let acc = match op.as_str() {
            "$sum" => Accumulator::Sum(expr),
            "$avg" => Accumulator::Avg(expr),
            "$min" => Accumulator::Min(expr),
            "$max" => Accumulator::Max(expr),
            "$first" => Accumulator::First(expr),
            "$last" => Accumulator::Last(expr),
            "$push" => Accumulator::Push(expr),
            other => return Err(DbError::query(format!("unknown group operator {other}"))),
        };
        accumulators.push((field.clone(), acc));
    }
    Ok(Stage::Group { id, accumulators })
}

fn parse_project(spec: &BsonDocument) -> Result<Stage, DbError> {
    if spec.is_empty() {
        return Err(DbError::query("$project requires at least one output field"));
    }
    let mut fields = Vec::with_capacity(spec.len());
    for (field, value) in spec {
        let pf = match value {
            Bson::Boolean(true) => ProjectField::Include,
            Bson::Boolean(false) => ProjectField::Exclude,
            Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => {
                if super::expr::truthy_number(value) { ProjectField::Include } else { ProjectField::Exclude }
            }
            other => ProjectField::Computed(parse_expr(other)?),
        };
        fields.push((field.clone(), pf));
    }
    let includes = fields
        .iter()
        .any(|(f, p)| f != "_id" && !matches!(p, ProjectField::Exclude));
    let excludes = fields.iter().any(|(f, p)| f != "_id" && matches!(p, ProjectField::Exclude));
    if includes && excludes {
        return Err(DbError::query("cannot mix inclusion and exclusion in $project"));
    }
    Ok(Stage::Project(fields))
}

/// Parse an aggregation expression.
///
/// # Errors
/// Returns an error for unknown operators, variables, or wrong operand counts.
pub fn parse_expr(v: &Bson) -> Result<Expr, DbError> {
    match v {
        Bson::String(s) if s.starts_with("$$") => {
            Err(DbError::query(format!("variables are not supported: {s}")))
        }
        Bson::String(s) if s.starts_with('$') => {
            let path = &s[1..];
            if path.is_empty() {
                return Err(DbError::query("'$' is not a valid field path"));
            }
            Ok(Expr::Field(path.to_string()))
        }
        Bson::Array(items) => Ok(Expr::Array(items.iter().map(parse_expr).collect::<Result<_, _>>()?)),
        Bson::Document(d) => parse_expr_doc(d),
        other => Ok(Expr::Literal(other.clone())),
    }
}

fn parse_expr_doc(d: &BsonDocument) -> Result<Expr, DbError> {
    let first = d.keys().next();
    let Some(op) = first.filter(|k| k.starts_with('$')) else {
        let fields = d
            .iter()
            .map(|(k, v)| Ok((k.clone(), parse_expr(v)?)))
            .collect::<Result<Vec<_>, DbError>>()?;
        return Ok(Expr::Object(fields));
    };
    if d.len() != 1 {
        return Err(DbError::query(format!("an expression object with {op} must have one field")));
    }
    let operand = d.get(op).unwrap_or(&Bson::Null);
    if op == "$literal" {
        return Ok(Expr::Literal(operand.clone()));
    }
    let args: Vec<Expr> = match operand {
        Bson::Array(items) => items.iter().map(parse_expr).collect::<Result<_, _>>()?,
        single => vec![parse_expr(single)?],
    };
    let binary = |args: Vec<Expr>| -> Result<(Box<Expr>, Box<Expr>), DbError> {
        let [a, b]: [Expr; 2] = args
            .try_into()
            .map_err(|_| DbError::query(format!("{op} takes exactly 2 arguments")))?;
        Ok((Box::new(a), Box::new(b)))
    };
    match op.as_str() {
        "$add" => Ok(Expr::Add(args)),
        "$multiply" => Ok(Expr::Multiply(args)),
        "$subtract" => binary(args).map(|(a, b)| Expr::Subtract(a, b)),
        "$divide" => binary(args).map(|(a, b)| Expr::Divide(a, b)),
        "$mod" => binary(args).map(|(a, b)| Expr::Mod(a, b)),
        other => Err(DbError::query(format!("unrecognized expression operator {other}"))),
    }
}
