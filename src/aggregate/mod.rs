//! Aggregation pipelines: `$match`, `$group`, `$sort`, `$limit`, `$skip`,
//! `$project` and `$count` over a collection's documents.

mod exec;
mod expr;
mod parse;
mod types;

pub use exec::{aggregate, run_stage};
pub use expr::eval_expr;
pub use parse::{parse_expr, parse_pipeline, parse_pipeline_json};
pub use types::{Accumulator, Expr, Pipeline, ProjectField, Stage};
