use crate::errors::DbError;
use crate::utils::json::parse_json_to_bson_document;
use bson::{Bson, Document as BsonDocument};

use super::types::{
    CmpOp, Filter, MAX_FILTER_DEPTH, MAX_IN_SET, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS, Order,
    Projection, SortSpec, UpdateDoc,
};

/// Parse a shell-style filter document.
///
/// `{}` matches everything, `{field: value}` is equality, `{field: {$op: v}}`
/// applies operators, and sibling keys are AND-ed together.
///
/// # Errors
/// Returns `QueryError` for unknown operators or malformed operands.
pub fn parse_filter(doc: &BsonDocument) -> Result<Filter, DbError> {
    parse_filter_at(doc, 0)
}

fn parse_filter_at(doc: &BsonDocument, depth: usize) -> Result<Filter, DbError> {
    if depth > MAX_FILTER_DEPTH {
        return Err(DbError::query("filter nested too deeply"));
    }
    let mut clauses = Vec::with_capacity(doc.len());
    for (key, value) in doc {
        match key.as_str() {
            "$and" => clauses.push(Filter::And(parse_filter_list(key, value, depth)?)),
            "$or" => clauses.push(Filter::Or(parse_filter_list(key, value, depth)?)),
            "$nor" => clauses.push(Filter::Not(Box::new(Filter::Or(parse_filter_list(
                key, value, depth,
            )?)))),
            k if k.starts_with('$') => {
                return Err(DbError::query(format!("unknown top-level operator {k}")));
            }
            path => clauses.push(parse_field_clause(path, value)?),
        }
    }
    Ok(match clauses.len() {
        0 => Filter::True,
        1 => clauses.remove(0),
        _ => Filter::And(clauses),
    })
}

fn parse_filter_list(op: &str, value: &Bson, depth: usize) -> Result<Vec<Filter>, DbError> {
    let Bson::Array(items) = value else {
        return Err(DbError::query(format!("{op} expects an array")));
    };
    if items.is_empty() {
        return Err(DbError::query(format!("{op} expects a non-empty array")));
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => parse_filter_at(d, depth + 1),
            _ => Err(DbError::query(format!("{op} entries must be documents"))),
        })
        .collect()
}

fn is_operator_doc(d: &BsonDocument) -> bool {
    d.keys().next().is_some_and(|k| k.starts_with('$'))
}

fn parse_field_clause(path: &str, value: &Bson) -> Result<Filter, DbError> {
    let ops = match value {
        Bson::Document(d) if is_operator_doc(d) => d,
        _ => return Ok(Filter::Cmp { path: path.to_string(), op: CmpOp::Eq, value: value.clone() }),
    };
    let mut out = Vec::with_capacity(ops.len());
    for (op, operand) in ops {
        out.push(parse_operator(path, op, operand)?);
    }
    Ok(if out.len() == 1 { out.remove(0) } else { Filter::And(out) })
}

fn parse_operator(path: &str, op: &str, operand: &Bson) -> Result<Filter, DbError> {
    let path = path.to_string();
    let cmp = |op: CmpOp| -> Result<Filter, DbError> {
        Ok(Filter::Cmp { path: path.clone(), op, value: operand.clone() })
    };
    match op {
        "$eq" => cmp(CmpOp::Eq),
        "$ne" => cmp(CmpOp::Ne),
        "$gt" => cmp(CmpOp::Gt),
        "$gte" => cmp(CmpOp::Gte),
        "$lt" => cmp(CmpOp::Lt),
        "$lte" => cmp(CmpOp::Lte),
        "$in" | "$nin" => {
            let Bson::Array(values) = operand else {
                return Err(DbError::query(format!("{op} expects an array")));
            };
            let values: Vec<Bson> = values.iter().take(MAX_IN_SET).cloned().collect();
            Ok(if op == "$in" { Filter::In { path, values } } else { Filter::Nin { path, values } })
        }
        "$exists" => Ok(Filter::Exists { path, exists: truthy(operand) }),
        "$not" => match operand {
            Bson::Document(d) if is_operator_doc(d) => {
                Ok(Filter::Not(Box::new(parse_field_clause(&path, operand)?)))
            }
            _ => Err(DbError::query("$not expects an operator document")),
        },
        #[cfg(feature = "regex")]
        "$regex" => match operand {
            Bson::String(pattern) => {
                Ok(Filter::Regex { path, pattern: pattern.clone(), case_insensitive: false })
            }
            Bson::RegularExpression(re) => Ok(Filter::Regex {
                path,
                pattern: re.pattern.to_string(),
                case_insensitive: re.options.to_string().contains('i'),
            }),
            _ => Err(DbError::query("$regex expects a string")),
        },
        other => Err(DbError::query(format!("unknown operator {other}"))),
    }
}

fn truthy(v: &Bson) -> bool {
    match v {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(d) => *d != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

/// Parse a projection document. An empty document means "all fields".
///
/// # Errors
/// Returns an error when inclusion and exclusion are mixed (other than `_id`).
pub fn parse_projection(doc: &BsonDocument) -> Result<Option<Projection>, DbError> {
    if doc.is_empty() {
        return Ok(None);
    }
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    let mut id_flag = None;
    for (field, flag) in doc.iter().take(MAX_PROJECTION_FIELDS) {
        let on = match flag {
            Bson::Boolean(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => truthy(flag),
            other => {
                return Err(DbError::query(format!(
                    "projection value for '{field}' must be 0/1 or a boolean, got {other}"
                )));
            }
        };
        if field == "_id" {
            id_flag = Some(on);
        } else if on {
            include.push(field.clone());
        } else {
            exclude.push(field.clone());
        }
    }
    if !include.is_empty() && !exclude.is_empty() {
        return Err(DbError::query("cannot mix inclusion and exclusion in a projection"));
    }
    if !include.is_empty() {
        return Ok(Some(Projection::Include { fields: include, include_id: id_flag.unwrap_or(true) }));
    }
    match id_flag {
        Some(false) => exclude.push("_id".to_string()),
        // `{_id: 1}` alone keeps only `_id`
        Some(true) if exclude.is_empty() => {
            return Ok(Some(Projection::Include { fields: Vec::new(), include_id: true }));
        }
        _ => {}
    }
    Ok(Some(Projection::Exclude { fields: exclude }))
}

/// Parse a sort document, keeping key order: `{price: -1, title: 1}`.
///
/// # Errors
/// Returns an error for directions other than `1`/`-1`.
pub fn parse_sort(doc: &BsonDocument) -> Result<Vec<SortSpec>, DbError> {
    if doc.len() > MAX_SORT_FIELDS {
        return Err(DbError::query(format!("sort spec too long: {}", doc.len())));
    }
    doc.iter()
        .map(|(field, dir)| {
            let order = match dir {
                Bson::Int32(1) | Bson::Int64(1) => Order::Asc,
                Bson::Int32(-1) | Bson::Int64(-1) => Order::Desc,
                Bson::Double(d) if *d > 0.0 => Order::Asc,
                Bson::Double(d) if *d < 0.0 => Order::Desc,
                other => {
                    return Err(DbError::query(format!(
                        "sort direction for '{field}' must be 1 or -1, got {other}"
                    )));
                }
            };
            Ok(SortSpec { field: field.clone(), order })
        })
        .collect()
}

/// Parse an update document made of `$set`, `$inc`, `$mul` and `$unset`.
///
/// # Errors
/// Returns an error for replacement-style documents, unknown operators and
/// non-numeric `$inc`/`$mul` operands.
pub fn parse_update(doc: &BsonDocument) -> Result<UpdateDoc, DbError> {
    if doc.is_empty() {
        return Err(DbError::query("update document must not be empty"));
    }
    let mut out = UpdateDoc::default();
    for (op, fields) in doc {
        let Bson::Document(fields) = fields else {
            if op.starts_with('$') {
                return Err(DbError::query(format!("{op} expects a document")));
            }
            return Err(DbError::query("update document must only contain update operators"));
        };
        match op.as_str() {
            "$set" => out.set.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone()))),
            "$inc" | "$mul" => {
                for (k, v) in fields {
                    if !matches!(v, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) {
                        return Err(DbError::query(format!("{op} requires numeric")));
                    }
                    let target = if op == "$inc" { &mut out.inc } else { &mut out.mul };
                    target.push((k.clone(), v.clone()));
                }
            }
            "$unset" => out.unset.extend(fields.keys().cloned()),
            k if k.starts_with('$') => {
                return Err(DbError::query(format!("unknown update operator {k}")));
            }
            _ => return Err(DbError::query("update document must only contain update operators")),
        }
    }
    Ok(out)
}

/// # Errors
/// Returns an error if the JSON string cannot be parsed into a filter.
pub fn parse_filter_json(json: &str) -> Result<Filter, DbError> {
    parse_filter(&parse_json_to_bson_document(json)?)
}

/// # Errors
/// Returns an error if the JSON string cannot be parsed into an update.
pub fn parse_update_json(json: &str) -> Result<UpdateDoc, DbError> {
    parse_update(&parse_json_to_bson_document(json)?)
}
