mod cursor;
mod eval;
mod exec;
mod explain;
mod parse;
mod types;

pub use cursor::Cursor;
pub use eval::{
    compare_bson, compare_docs, eval_filter, get_path, insert_path, project_fields, remove_path, values_equal,
};
pub(crate) use eval::{as_f64_num, is_num};
pub use exec::{
    apply_update, count_docs, delete_many, delete_one, explain_find, find_docs, update_many,
    update_one,
};
pub use explain::{ExecutionStats, ExplainReport, PlanStage, QueryPlanner};
pub use parse::{
    parse_filter, parse_filter_json, parse_projection, parse_sort, parse_update, parse_update_json,
};
pub use types::{
    CmpOp, DeleteReport, Filter, FindOptions, Order, Projection, SortSpec, UpdateDoc, UpdateReport,
};
