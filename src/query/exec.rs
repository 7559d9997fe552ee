use crate::collection::Collection;
use crate::document::Document;
use crate::errors::DbError;
use crate::index::{IndexScan, key_from_bson};
use crate::types::DocumentId;
use crate::utils::num::{u128_to_u64_saturating, usize_to_u64};
use bson::{Bson, Document as BsonDocument};
use std::time::Instant;

use super::cursor::Cursor;
use super::eval::{as_f64_num, compare_docs, eval_filter, is_num, project_fields, remove_path};
use super::explain::{ExecutionStats, ExplainReport, PlanStage, QueryPlanner};
use super::types::{CmpOp, DeleteReport, Filter, FindOptions, UpdateDoc, UpdateReport};

struct IndexPlan {
    name: String,
    key_pattern: BsonDocument,
    scan: IndexScan,
}

/// Top-level equality predicates usable for an index probe.
fn equality_predicates(filter: &Filter) -> Vec<(&str, &Bson)> {
    match filter {
        Filter::Cmp { path, op: CmpOp::Eq, value } => vec![(path.as_str(), value)],
        Filter::And(fs) => fs.iter().flat_map(|f| equality_predicates(f)).collect(),
        _ => Vec::new(),
    }
}

/// Picks the index whose leading keys are covered by the longest run of
/// equality predicates; ties go to the index created first.
fn plan_index_scan(col: &Collection, filter: &Filter) -> Option<IndexPlan> {
    let preds = equality_predicates(filter);
    if preds.is_empty() {
        return None;
    }
    let value_for = |field: &str| {
        preds
            .iter()
            .find(|&&(p, v)| p == field && key_from_bson(Some(v)).is_some())
            .map(|&(_, v)| v.clone())
    };
    let mut mgr = col.indexes.write();
    let mut best: Option<(usize, Vec<Bson>)> = None;
    for (i, idx) in mgr.indexes.iter().enumerate() {
        let values: Vec<Bson> =
            idx.spec.keys.iter().map_while(|(field, _)| value_for(field.as_str())).collect();
        if !values.is_empty() && best.as_ref().is_none_or(|(_, b)| values.len() > b.len()) {
            best = Some((i, values));
        }
    }
    let (i, values) = best?;
    let idx = &mut mgr.indexes[i];
    let scan = idx.lookup_prefix_eq(&values)?;
    Some(IndexPlan { name: idx.name.clone(), key_pattern: idx.spec.key_pattern(), scan })
}

/// Candidate ids in natural order, plus the leaf plan stage that produced them.
fn candidates(col: &Collection, filter: &Filter) -> (Vec<DocumentId>, PlanStage, usize) {
    match plan_index_scan(col, filter) {
        Some(plan) => {
            let pos = col.natural_positions();
            let mut ids = plan.scan.ids;
            ids.sort_by_key(|id| pos.get(id).copied().unwrap_or(usize::MAX));
            let leaf = PlanStage::Fetch {
                input_stage: Box::new(PlanStage::IxScan {
                    index_name: plan.name,
                    key_pattern: plan.key_pattern,
                }),
            };
            (ids, leaf, plan.scan.keys_examined)
        }
        None => (col.list_ids(), PlanStage::CollScan, 0),
    }
}

struct FindRun {
    docs: Vec<Document>,
    plan: PlanStage,
    keys_examined: usize,
    docs_examined: usize,
    elapsed_ms: u64,
}

fn run_find(col: &Collection, filter: &Filter, opts: &FindOptions) -> FindRun {
    let start = Instant::now();
    let (ids, mut plan, keys_examined) = candidates(col, filter);
    let used_index = plan.index_name().is_some();
    let mut docs_examined = 0usize;
    let mut docs: Vec<Document> = ids
        .iter()
        .filter_map(|id| col.find_document(id))
        .filter(|d| {
            docs_examined += 1;
            eval_filter(&d.data, filter)
        })
        .collect();

    if let Some(sort) = opts.sort.as_ref().filter(|s| !s.is_empty()) {
        docs.sort_by(|a, b| compare_docs(&a.data, &b.data, sort));
        let mut pattern = BsonDocument::new();
        for s in sort {
            pattern.insert(s.field.clone(), s.order.as_i32());
        }
        plan = PlanStage::Sort { sort_pattern: pattern, input_stage: Box::new(plan) };
    }

    let skip = opts.skip.unwrap_or(0);
    if skip > 0 {
        docs.drain(..skip.min(docs.len()));
        plan = PlanStage::Skip { skip_amount: usize_to_u64(skip), input_stage: Box::new(plan) };
    }
    if let Some(limit) = opts.limit.filter(|l| *l > 0) {
        docs.truncate(limit);
        plan = PlanStage::Limit { limit_amount: usize_to_u64(limit), input_stage: Box::new(plan) };
    }
    if let Some(projection) = &opts.projection {
        for d in &mut docs {
            d.data = project_fields(&d.data, projection);
        }
        plan = PlanStage::Projection { input_stage: Box::new(plan) };
    }

    let elapsed_ms = u128_to_u64_saturating(start.elapsed().as_millis());
    crate::devlog!(
        "{{\"bench\":\"query\",\"op\":\"find\",\"collection\":\"{}\",\"duration_ms\":{},\"used_index\":{},\"docs_examined\":{},\"result_count\":{},\"limit\":{},\"skip\":{}}}",
        col.name_str(),
        elapsed_ms,
        used_index,
        docs_examined,
        docs.len(),
        opts.limit.unwrap_or(0),
        skip
    );
    FindRun { docs, plan, keys_examined, docs_examined, elapsed_ms }
}

pub fn find_docs(col: &Collection, filter: &Filter, opts: &FindOptions) -> Cursor {
    Cursor::new(run_find(col, filter, opts).docs)
}

/// Runs the query and reports the chosen plan, `explain("executionStats")` style.
pub fn explain_find(col: &Collection, filter: &Filter, opts: &FindOptions) -> ExplainReport {
    let run = run_find(col, filter, opts);
    let report = ExplainReport {
        query_planner: QueryPlanner {
            namespace: col.name_str(),
            parsed_query: filter.to_string(),
            winning_plan: run.plan,
        },
        execution_stats: ExecutionStats {
            execution_success: true,
            n_returned: usize_to_u64(run.docs.len()),
            execution_time_millis: run.elapsed_ms,
            total_keys_examined: usize_to_u64(run.keys_examined),
            total_docs_examined: usize_to_u64(run.docs_examined),
        },
    };
    log::info!(
        target: "bookquery::metrics",
        "{}",
        serde_json::json!({
            "event": "explain",
            "collection": report.query_planner.namespace,
            "stage": report.query_planner.winning_plan.leaf().name(),
            "n_returned": report.execution_stats.n_returned,
            "docs_examined": report.execution_stats.total_docs_examined,
        })
    );
    report
}

#[must_use]
pub fn count_docs(col: &Collection, filter: &Filter) -> usize {
    let start = Instant::now();
    let n = matching_ids(col, filter).len();
    crate::devlog!(
        "{{\"bench\":\"query\",\"op\":\"count\",\"collection\":\"{}\",\"duration_ms\":{},\"result_count\":{}}}",
        col.name_str(),
        u128_to_u64_saturating(start.elapsed().as_millis()),
        n
    );
    n
}

fn matching_ids(col: &Collection, filter: &Filter) -> Vec<DocumentId> {
    let (ids, _, _) = candidates(col, filter);
    ids.into_iter()
        .filter(|id| col.find_document(id).is_some_and(|d| eval_filter(&d.data, filter)))
        .collect()
}

fn first_matching_id(col: &Collection, filter: &Filter) -> Option<DocumentId> {
    let (ids, _, _) = candidates(col, filter);
    ids.into_iter().find(|id| col.find_document(id).is_some_and(|d| eval_filter(&d.data, filter)))
}

fn update_ids(
    col: &Collection,
    ids: Vec<DocumentId>,
    update: &UpdateDoc,
) -> Result<UpdateReport, DbError> {
    let mut report = UpdateReport::default();
    for id in ids {
        if let Some(mut doc) = col.find_document(&id) {
            report.matched += 1;
            if apply_update(&mut doc, update)? {
                report.modified += 1;
                col.update_document(&id, doc);
            }
        }
    }
    Ok(report)
}

/// # Errors
/// Returns an error when the update cannot be applied to a matched document.
pub fn update_many(
    col: &Collection,
    filter: &Filter,
    update: &UpdateDoc,
) -> Result<UpdateReport, DbError> {
    let start = Instant::now();
    let report = update_ids(col, matching_ids(col, filter), update)?;
    crate::devlog!(
        "{{\"bench\":\"query\",\"op\":\"update_many\",\"collection\":\"{}\",\"duration_ms\":{},\"matched\":{},\"modified\":{}}}",
        col.name_str(),
        u128_to_u64_saturating(start.elapsed().as_millis()),
        report.matched,
        report.modified
    );
    Ok(report)
}

/// Updates the first match in natural order. Zero matches is not an error.
///
/// # Errors
/// Returns an error when the update cannot be applied to the matched document.
pub fn update_one(
    col: &Collection,
    filter: &Filter,
    update: &UpdateDoc,
) -> Result<UpdateReport, DbError> {
    let ids = first_matching_id(col, filter).into_iter().collect();
    let report = update_ids(col, ids, update)?;
    crate::devlog!(
        "{{\"bench\":\"query\",\"op\":\"update_one\",\"collection\":\"{}\",\"matched\":{},\"modified\":{}}}",
        col.name_str(),
        report.matched,
        report.modified
    );
    Ok(report)
}

pub fn delete_many(col: &Collection, filter: &Filter) -> DeleteReport {
    let start = Instant::now();
    let deleted = matching_ids(col, filter)
        .iter()
        .filter(|id| col.delete_document(id))
        .count();
    let report = DeleteReport { deleted: usize_to_u64(deleted) };
    crate::devlog!(
        "{{\"bench\":\"query\",\"op\":\"delete_many\",\"collection\":\"{}\",\"duration_ms\":{},\"deleted\":{}}}",
        col.name_str(),
        u128_to_u64_saturating(start.elapsed().as_millis()),
        report.deleted
    );
    report
}

pub fn delete_one(col: &Collection, filter: &Filter) -> DeleteReport {
    let deleted = first_matching_id(col, filter).is_some_and(|id| col.delete_document(&id));
    crate::devlog!(
        "{{\"bench\":\"query\",\"op\":\"delete_one\",\"collection\":\"{}\",\"deleted\":{}}}",
        col.name_str(),
        u64::from(deleted)
    );
    DeleteReport { deleted: u64::from(deleted) }
}

fn traverse_to_parent<'a>(
    root: &'a mut BsonDocument,
    path: &str,
) -> Result<(&'a mut BsonDocument, String), DbError> {
    let mut cur = root;
    let mut iter = path.split('.').peekable();
    while let Some(seg) = iter.next() {
        if iter.peek().is_none() {
            return Ok((cur, seg.to_string()));
        }
        if !cur.contains_key(seg) {
            cur.insert(seg.to_string(), BsonDocument::new());
        }
        cur = match cur.get_mut(seg) {
            Some(Bson::Document(d)) => d,
            Some(other) => {
                return Err(DbError::query(format!(
                    "cannot create field in element {{{seg}: {other}}}"
                )));
            }
            None => unreachable!("inserted above"),
        };
    }
    Err(DbError::query("empty update path"))
}

fn get_path_owned(root: &BsonDocument, path: &str) -> Option<Bson> {
    super::eval::get_path(root, path).cloned()
}

fn set_path(root: &mut BsonDocument, path: &str, value: Bson) -> Result<bool, DbError> {
    let (parent, last) = traverse_to_parent(root, path)?;
    let old = parent.insert(last, value.clone());
    Ok(old.as_ref() != Some(&value))
}

#[derive(Clone, Copy)]
enum Arith {
    Inc,
    Mul,
}

fn combine(op: Arith, cur: &Bson, by: &Bson) -> Result<Bson, DbError> {
    let name = match op {
        Arith::Inc => "$inc",
        Arith::Mul => "$mul",
    };
    if !is_num(cur) {
        return Err(DbError::query(format!("cannot apply {name} to a value of non-numeric type")));
    }
    let int = |x: &Bson| match x {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        _ => None,
    };
    if let (Some(a), Some(b)) = (int(cur), int(by)) {
        let out = match op {
            Arith::Inc => a.checked_add(b),
            Arith::Mul => a.checked_mul(b),
        }
        .ok_or_else(|| DbError::query(format!("{name} overflowed a 64-bit integer")))?;
        let both_i32 = matches!((cur, by), (Bson::Int32(_), Bson::Int32(_)));
        return Ok(match i32::try_from(out) {
            Ok(small) if both_i32 => Bson::Int32(small),
            _ => Bson::Int64(out),
        });
    }
    let (a, b) = (as_f64_num(cur), as_f64_num(by));
    Ok(Bson::Double(match op {
        Arith::Inc => a + b,
        Arith::Mul => a * b,
    }))
}

fn zero_like(v: &Bson) -> Bson {
    match v {
        Bson::Int32(_) => Bson::Int32(0),
        Bson::Int64(_) => Bson::Int64(0),
        _ => Bson::Double(0.0),
    }
}

/// Applies `$set`, `$inc`, `$mul` and `$unset` in that order. Returns whether the document changed.
///
/// # Errors
/// Returns an error when `_id` would change, a path crosses a non-document value,
/// or arithmetic targets a non-numeric field.
pub fn apply_update(doc: &mut Document, upd: &UpdateDoc) -> Result<bool, DbError> {
    let mut data = doc.data.clone();
    let original_id = data.get("_id").cloned();
    let mut changed = false;
    for (k, v) in &upd.set {
        changed |= set_path(&mut data, k, v.clone())?;
    }
    for (k, by) in &upd.inc {
        let newv = match get_path_owned(&data, k) {
            Some(cur) => combine(Arith::Inc, &cur, by)?,
            None => by.clone(),
        };
        changed |= set_path(&mut data, k, newv)?;
    }
    for (k, by) in &upd.mul {
        let newv = match get_path_owned(&data, k) {
            Some(cur) => combine(Arith::Mul, &cur, by)?,
            None => zero_like(by),
        };
        changed |= set_path(&mut data, k, newv)?;
    }
    for k in &upd.unset {
        changed |= remove_path(&mut data, k);
    }
    if data.get("_id").cloned() != original_id {
        return Err(DbError::query("performing an update on the path '_id' would modify the immutable field '_id'"));
    }
    if changed {
        doc.update(data);
    }
    Ok(changed)
}
