use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::types::{CmpOp, Filter, MAX_IN_SET, MAX_PATH_DEPTH, MAX_SORT_FIELDS, Order, Projection, SortSpec};

pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::In { path, values } => is_in_set(get_path(doc, path), values),
        Filter::Nin { path, values } => !is_in_set(get_path(doc, path), values),
        Filter::Cmp { path, op, value } => eval_cmp(get_path(doc, path), *op, value),
        #[cfg(feature = "regex")]
        Filter::Regex { path, pattern, case_insensitive } => {
            if let Some(Bson::String(s)) = get_path(doc, path) {
                let mut re = regex::RegexBuilder::new(pattern);
                re.case_insensitive(*case_insensitive);
                re.build().is_ok_and(|r| r.is_match(s))
            } else {
                false
            }
        }
    }
}

fn eval_cmp(field: Option<&Bson>, op: CmpOp, value: &Bson) -> bool {
    match op {
        CmpOp::Eq => matches_eq(field, value),
        CmpOp::Ne => !matches_eq(field, value),
        _ => {
            let Some(v) = field else { return false };
            let test = |x: &Bson| {
                if !same_bracket(x, value) {
                    return false;
                }
                let c = compare_bson(x, value);
                match op {
                    CmpOp::Gt => c == Ordering::Greater,
                    CmpOp::Gte => c != Ordering::Less,
                    CmpOp::Lt => c == Ordering::Less,
                    CmpOp::Lte => c != Ordering::Greater,
                    CmpOp::Eq | CmpOp::Ne => unreachable!("handled above"),
                }
            };
            match v {
                Bson::Array(items) if !matches!(value, Bson::Array(_)) => items.iter().any(test),
                other => test(other),
            }
        }
    }
}

/// Equality as the shell sees it: `null` matches a missing field, numbers
/// compare by value, and an array field matches if any element does.
fn matches_eq(field: Option<&Bson>, value: &Bson) -> bool {
    match field {
        None => matches!(value, Bson::Null),
        Some(Bson::Array(items)) if !matches!(value, Bson::Array(_)) => {
            items.iter().any(|x| values_equal(x, value))
        }
        Some(v) => values_equal(v, value),
    }
}

#[must_use]
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    if is_num(a) && is_num(b) {
        return as_f64_num(a) == as_f64_num(b);
    }
    a == b
}

fn is_in_set(v: Option<&Bson>, set: &[Bson]) -> bool {
    set.iter().take(MAX_IN_SET).any(|x| matches_eq(v, x))
}

/// Resolve a dotted path such as `meta.rating` inside nested documents.
#[must_use]
pub fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut parts = path.split('.');
    let mut cur = doc.get(parts.next()?)?;
    for (depth, part) in parts.enumerate() {
        if depth + 1 >= MAX_PATH_DEPTH {
            return None;
        }
        match cur {
            Bson::Document(d) => cur = d.get(part)?,
            _ => return None,
        }
    }
    Some(cur)
}

pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &[SortSpec]) -> Ordering {
    for s in sort.iter().take(MAX_SORT_FIELDS) {
        let ord = match (get_path(a, &s.field), get_path(b, &s.field)) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(x), None) => compare_bson(x, &Bson::Null),
            (None, Some(y)) => compare_bson(&Bson::Null, y),
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if s.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

pub(crate) fn is_num(x: &Bson) -> bool {
    matches!(x, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_))
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn as_f64_num(x: &Bson) -> f64 {
    match x {
        Bson::Int32(i) => f64::from(*i),
        Bson::Int64(i) => *i as f64,
        Bson::Double(f) => *f,
        Bson::Decimal128(d) => d.to_string().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Total order over BSON values: numbers by value, strings lexically, other
/// types by their canonical type rank.
pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    if is_num(a) && is_num(b) {
        return as_f64_num(a).total_cmp(&as_f64_num(b));
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Array(x), Bson::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let c = compare_bson(l, r);
                if c != Ordering::Equal {
                    return c;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn same_bracket(a: &Bson, b: &Bson) -> bool {
    type_rank(a) == type_rank(b)
}

fn type_rank(v: &Bson) -> u8 {
    use bson::Bson as T;
    match v {
        T::MinKey => 0,
        T::Null | T::Undefined => 1,
        T::Int32(_) | T::Int64(_) | T::Double(_) | T::Decimal128(_) => 2,
        T::String(_) | T::Symbol(_) => 3,
        T::Document(_) => 4,
        T::Array(_) => 5,
        T::Binary(_) => 6,
        T::ObjectId(_) => 7,
        T::Boolean(_) => 8,
        T::DateTime(_) => 9,
        T::Timestamp(_) => 10,
        T::RegularExpression(_) => 11,
        T::DbPointer(_) => 12,
        T::JavaScriptCode(_) => 13,
        T::JavaScriptCodeWithScope(_) => 14,
        T::MaxKey => 255,
    }
}

#[must_use]
pub fn project_fields(doc: &BsonDocument, projection: &Projection) -> BsonDocument {
    match projection {
        Projection::Include { fields, include_id } => {
            let mut out = BsonDocument::new();
            if *include_id && let Some(id) = doc.get("_id") {
                out.insert("_id", id.clone());
            }
            let paths: Vec<&str> = fields.iter().map(String::as_str).filter(|f| *f != "_id").collect();
            for (k, v) in include_paths(doc, &paths) {
                out.insert(k, v);
            }
            out
        }
        Projection::Exclude { fields } => {
            let mut out = doc.clone();
            for f in fields {
                remove_path(&mut out, f);
            }
            out
        }
    }
}

/// Keeps only `paths` (dotted paths reach into subdocuments), in stored order.
fn include_paths(doc: &BsonDocument, paths: &[&str]) -> BsonDocument {
    let mut out = BsonDocument::new();
    for (k, v) in doc {
        if paths.contains(&k.as_str()) {
            out.insert(k.clone(), v.clone());
            continue;
        }
        let nested: Vec<&str> = paths
            .iter()
            .filter_map(|p| p.strip_prefix(k.as_str()).and_then(|rest| rest.strip_prefix('.')))
            .collect();
        if nested.is_empty() {
            continue;
        }
        if let Bson::Document(sub) = v {
            let picked = include_paths(sub, &nested);
            if !picked.is_empty() {
                out.insert(k.clone(), picked);
            }
        }
    }
    out
}

/// Writes `value` at a dotted path, creating intermediate subdocuments and
/// replacing non-document values in the way.
pub fn insert_path(doc: &mut BsonDocument, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(doc.get(head), Some(Bson::Document(_))) {
                doc.insert(head, BsonDocument::new());
            }
            if let Some(Bson::Document(sub)) = doc.get_mut(head) {
                insert_path(sub, rest, value);
            }
        }
    }
}

/// Removes the value at a dotted path. Returns whether anything was removed.
pub fn remove_path(doc: &mut BsonDocument, path: &str) -> bool {
    match path.split_once('.') {
        None => doc.remove(path).is_some(),
        Some((head, rest)) => match doc.get_mut(head) {
            Some(Bson::Document(sub)) => remove_path(sub, rest),
            _ => false,
        },
    }
}
