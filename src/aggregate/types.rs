use crate::query::{Filter, SortSpec};
use bson::Bson;

/// Aggregation expression, evaluated against one document.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `"$published_year"`
    Field(String),
    Literal(Bson),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Add(Vec<Expr>),
    Multiply(Vec<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
    Divide(Box<Expr>, Box<Expr>),
    Mod(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Sum(Expr),
    Avg(Expr),
    Min(Expr),
    Max(Expr),
    First(Expr),
    Last(Expr),
    Push(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectField {
    Include,
    Exclude,
    Computed(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Group { id: Expr, accumulators: Vec<(String, Accumulator)> },
    Sort(Vec<SortSpec>),
    Limit(usize),
    Skip(usize),
    Project(Vec<(String, ProjectField)>),
    Count(String),
}

impl Stage {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Match(_) => "$match",
            Self::Group { .. } => "$group",
            Self::Sort(_) => "$sort",
            Self::Limit(_) => "$limit",
            Self::Skip(_) => "$skip",
            Self::Project(_) => "$project",
            Self::Count(_) => "$count",
        }
    }
}

/// Ordered list of stages; each consumes the previous stage's output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}
