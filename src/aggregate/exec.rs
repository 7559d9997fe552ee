use crate::collection::Collection;
use crate::errors::DbError;
use crate::query::{self, FindOptions, compare_bson, compare_docs, eval_filter, is_num, as_f64_num};
use crate::utils::num::u128_to_u64_saturating;
use bson::{Bson, Document as BsonDocument};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use super::expr::{eval_expr, sum_numbers};
use super::types::{Accumulator, Expr, Pipeline, ProjectField, Stage};

/// Runs `pipeline` over the collection in natural order. A leading `$match`
/// goes through the query planner so it can use an index.
///
/// # Errors
/// Returns an error when an expression cannot be evaluated.
pub fn aggregate(col: &Collection, pipeline: &Pipeline) -> Result<Vec<BsonDocument>, DbError> {
    let start = Instant::now();
    let (mut docs, rest) = match pipeline.stages.split_first() {
        Some((Stage::Match(filter), rest)) => {
            (query::find_docs(col, filter, &FindOptions::default()).into_bson(), rest)
        }
        _ => (col.get_all_documents().into_iter().map(|d| d.data).collect(), &pipeline.stages[..]),
    };
    for stage in rest {
        docs = run_stage(stage, docs)?;
    }
    crate::devlog!(
        "{{\"bench\":\"aggregate\",\"collection\":\"{}\",\"stages\":{},\"duration_ms\":{},\"result_count\":{}}}",
        col.name_str(),
        pipeline.stages.len(),
        u128_to_u64_saturating(start.elapsed().as_millis()),
        docs.len()
    );
    Ok(docs)
}

/// Runs one stage over an in-memory document stream.
///
/// # Errors
/// Returns an error when an expression cannot be evaluated.
pub fn run_stage(stage: &Stage, mut docs: Vec<BsonDocument>) -> Result<Vec<BsonDocument>, DbError> {
    Ok(match stage {
        Stage::Match(filter) => {
            docs.retain(|d| eval_filter(d, filter));
            docs
        }
        Stage::Group { id, accumulators } => group(docs, id, accumulators)?,
        Stage::Sort(spec) => {
            docs.sort_by(|a, b| compare_docs(a, b, spec));
            docs
        }
        Stage::Limit(n) => {
            docs.truncate(*n);
            docs
        }
        Stage::Skip(n) => {
            docs.drain(..(*n).min(docs.len()));
            docs
        }
        Stage::Project(fields) => docs.iter().map(|d| project(d, fields)).collect::<Result<_, _>>()?,
        Stage::Count(field) => {
            if docs.is_empty() {
                Vec::new()
            } else {
                let n = i64::try_from(docs.len()).unwrap_or(i64::MAX);
                let count = i32::try_from(n).map_or(Bson::Int64(n), Bson::Int32);
                let mut out = BsonDocument::new();
                out.insert(field.clone(), count);
                vec![out]
            }
        }
    })
}

fn project(doc: &BsonDocument, fields: &[(String, ProjectField)]) -> Result<BsonDocument, DbError> {
    let id_spec = fields.iter().find(|(f, _)| f == "_id").map(|(_, p)| p);
    let inclusion = if fields.iter().any(|(f, _)| f != "_id") {
        fields.iter().any(|(f, p)| f != "_id" && !matches!(p, ProjectField::Exclude))
    } else {
        !matches!(id_spec, Some(ProjectField::Exclude))
    };
    if !inclusion {
        let mut out = doc.clone();
        for (f, _) in fields {
            query::remove_path(&mut out, f);
        }
        return Ok(out);
    }
    let mut out = BsonDocument::new();
    match id_spec {
        Some(ProjectField::Exclude) => {}
        Some(ProjectField::Computed(e)) => {
            if let Some(v) = eval_expr(e, doc)? {
                out.insert("_id", v);
            }
        }
        Some(ProjectField::Include) | None => {
            if let Some(v) = doc.get("_id") {
                out.insert("_id", v.clone());
            }
        }
    }
    for (f, p) in fields.iter().filter(|(f, _)| f != "_id") {
        let value = match p {
            ProjectField::Include => query::get_path(doc, f).cloned(),
            ProjectField::Computed(e) => eval_expr(e, doc)?,
            ProjectField::Exclude => None,
        };
        if let Some(v) = value {
            query::insert_path(&mut out, f, v);
        }
    }
    Ok(out)
}

enum AccState {
    Sum(Bson),
    Avg { total: f64, count: u64 },
    Min(Option<Bson>),
    Max(Option<Bson>),
    First(Option<Bson>),
    Last(Bson),
    Push(Vec<Bson>),
}

impl AccState {
    fn new(acc: &Accumulator) -> Self {
        match acc {
            Accumulator::Sum(_) => Self::Sum(Bson::Int32(0)),
            Accumulator::Avg(_) => Self::Avg { total: 0.0, count: 0 },
            Accumulator::Min(_) => Self::Min(None),
            Accumulator::Max(_) => Self::Max(None),
            Accumulator::First(_) => Self::First(None),
            Accumulator::Last(_) => Self::Last(Bson::Null),
            Accumulator::Push(_) => Self::Push(Vec::new()),
        }
    }

    fn feed(&mut self, v: Option<Bson>) {
        let present = v.as_ref().filter(|x| !matches!(x, Bson::Null | Bson::Undefined));
        match self {
            Self::Sum(acc) => {
                if let Some(x) = present {
                    *acc = sum_numbers(acc, x);
                }
            }
            Self::Avg { total, count } => {
                if let Some(x) = present.filter(|x| is_num(x)) {
                    *total += as_f64_num(x);
                    *count += 1;
                }
            }
            Self::Min(cur) => keep_extreme(cur, present, Ordering::Less),
            Self::Max(cur) => keep_extreme(cur, present, Ordering::Greater),
            Self::First(cur) => {
                if cur.is_none() {
                    *cur = Some(v.unwrap_or(Bson::Null));
                }
            }
            Self::Last(cur) => *cur = v.unwrap_or(Bson::Null),
            Self::Push(items) => {
                if let Some(x) = v {
                    items.push(x);
                }
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(self) -> Bson {
        match self {
            Self::Sum(v) | Self::Last(v) => v,
            Self::Avg { total, count } => {
                if count == 0 { Bson::Null } else { Bson::Double(total / count as f64) }
            }
            Self::Min(v) | Self::Max(v) | Self::First(v) => v.unwrap_or(Bson::Null),
            Self::Push(items) => Bson::Array(items),
        }
    }
}

fn keep_extreme(cur: &mut Option<Bson>, candidate: Option<&Bson>, want: Ordering) {
    if let Some(x) = candidate
        && cur.as_ref().is_none_or(|c| compare_bson(x, c) == want)
    {
        *cur = Some(x.clone());
    }
}

fn accumulator_expr(acc: &Accumulator) -> &Expr {
    match acc {
        Accumulator::Sum(e)
        | Accumulator::Avg(e)
        | Accumulator::Min(e)
        | Accumulator::Max(e)
        | Accumulator::First(e)
        | Accumulator::Last(e)
        | Accumulator::Push(e) => e,
    }
}

/// Hashable identity of a group key. Numbers compare by value at any depth,
/// so `0`, `-0.0` and `0i64` share a group, as do `{a: 1}` and `{a: 1.0}`.
#[derive(Debug, PartialEq, Eq, Hash)]
enum GroupKey {
    Num(OrderedFloat<f64>),
    Doc(Vec<(String, GroupKey)>),
    Array(Vec<GroupKey>),
    Other(String),
}

impl GroupKey {
    fn of(key: &Bson) -> Self {
        match key {
            v if is_num(v) => {
                let f = as_f64_num(v);
                Self::Num(OrderedFloat(if f == 0.0 { 0.0 } else { f }))
            }
            Bson::Document(d) => Self::Doc(d.iter().map(|(k, v)| (k.clone(), Self::of(v))).collect()),
            Bson::Array(items) => Self::Array(items.iter().map(Self::of).collect()),
            other => Self::Other(format!("{other:?}")),
        }
    }
}

/// Groups in first-seen order.
fn group(
    docs: Vec<BsonDocument>,
    id: &Expr,
    accumulators: &[(String, Accumulator)],
) -> Result<Vec<BsonDocument>, DbError> {
    let mut slots: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(Bson, Vec<AccState>)> = Vec::new();
    for doc in &docs {
        let key = eval_expr(id, doc)?.unwrap_or(Bson::Null);
        let slot = *slots.entry(GroupKey::of(&key)).or_insert_with(|| {
            groups.push((key, accumulators.iter().map(|(_, a)| AccState::new(a)).collect()));
            groups.len() - 1
        });
        for ((_, acc), state) in accumulators.iter().zip(groups[slot].1.iter_mut()) {
            state.feed(eval_expr(accumulator_expr(acc), doc)?);
        }
    }
    Ok(groups
        .into_iter()
        .map(|(key, states)| {
            let mut out = BsonDocument::new();
            out.insert("_id", key);
            for ((name, _), state) in accumulators.iter().zip(states) {
                out.insert(name.clone(), state.finish());
            }
            out
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::parse_pipeline;
    use bson::doc;

    fn run(stages: &[BsonDocument], docs: Vec<BsonDocument>) -> Vec<BsonDocument> {
        let p = parse_pipeline(stages).unwrap();
        let mut docs = docs;
        for s in &p.stages {
            docs = run_stage(s, docs).unwrap();
        }
        docs
    }

    #[test]
    fn avg_per_group_in_first_seen_order() {
        let out = run(
            &[doc! {"$group": {"_id": "$genre", "avgPrice": {"$avg": "$price"}}}],
            vec![
                doc! {"genre": "Fiction", "price": 10},
                doc! {"genre": "Poetry", "price": 4.0},
                doc! {"genre": "Fiction", "price": 15},
                doc! {"genre": "Fiction"},
            ],
        );
        assert_eq!(out, vec![
            doc! {"_id": "Fiction", "avgPrice": 12.5},
            doc! {"_id": "Poetry", "avgPrice": 4.0},
        ]);
    }

    #[test]
    fn numeric_keys_merge_across_types() {
        let out = run(
            &[doc! {"$group": {"_id": "$y", "n": {"$sum": 1}}}],
            vec![doc! {"y": 1990}, doc! {"y": 1990i64}, doc! {"y": 1990.0}],
        );
        assert_eq!(out, vec![doc! {"_id": 1990, "n": 3}]);
    }

    #[test]
    fn min_max_first_last_push() {
        let out = run(
            &[doc! {"$group": {"_id": null, "lo": {"$min": "$p"}, "hi": {"$max": "$p"}, "f": {"$first": "$p"}, "l": {"$last": "$p"}, "all": {"$push": "$p"}}}],
            vec![doc! {"p": 3}, doc! {"p": 1}, doc! {}, doc! {"p": 2}],
        );
        assert_eq!(out, vec![doc! {"_id": null, "lo": 1, "hi": 3, "f": 3, "l": 2, "all": [3, 1, 2]}]);
    }

    #[test]
    fn project_exclusion_and_id_handling() {
        let d = doc! {"_id": 1, "title": "Emma", "price": 5};
        assert_eq!(run(&[doc! {"$project": {"price": 0}}], vec![d.clone()]), vec![doc! {"_id": 1, "title": "Emma"}]);
        assert_eq!(run(&[doc! {"$project": {"title": 1, "_id": 0}}], vec![d.clone()]), vec![doc! {"title": "Emma"}]);
        assert_eq!(run(&[doc! {"$project": {"_id": 0}}], vec![d]), vec![doc! {"title": "Emma", "price": 5}]);
    }

    #[test]
    fn skip_limit_count() {
        let docs: Vec<BsonDocument> = (0..5).map(|i| doc! {"i": i}).collect();
        let out = run(&[doc! {"$skip": 1}, doc! {"$limit": 2}], docs.clone());
        assert_eq!(out, vec![doc! {"i": 1}, doc! {"i": 2}]);
        assert_eq!(run(&[doc! {"$count": "total"}], docs), vec![doc! {"total": 5}]);
        assert!(run(&[doc! {"$count": "total"}], Vec::new()).is_empty());
    }
}
