use bson::Bson;
use serde::{Deserialize, Serialize};

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 32;
pub(crate) const MAX_PROJECTION_FIELDS: usize = 64;
pub(crate) const MAX_FILTER_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

/// Which fields a query returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Only the listed fields; `_id` too unless `include_id` is false.
    Include { fields: Vec<String>, include_id: bool },
    /// Everything except the listed fields.
    Exclude { fields: Vec<String> },
}

/// Options for `find_docs`.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub projection: Option<Projection>,
    pub sort: Option<Vec<SortSpec>>,
    pub skip: Option<usize>,
    /// `Some(0)` behaves like `None`.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Cmp { path: String, op: CmpOp, value: Bson },
    #[cfg(feature = "regex")]
    Regex { path: String, pattern: String, case_insensitive: bool },
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UpdateDoc {
    pub set: Vec<(String, Bson)>,
    pub inc: Vec<(String, Bson)>,
    pub mul: Vec<(String, Bson)>,
    pub unset: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub deleted: u64,
}

impl std::fmt::Display for CmpOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
        })
    }
}

fn write_joined(f: &mut std::fmt::Formatter<'_>, op: &str, parts: &[Filter]) -> std::fmt::Result {
    write!(f, "{{{op}: [")?;
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{p}")?;
    }
    f.write_str("]}")
}

fn write_values(f: &mut std::fmt::Formatter<'_>, values: &[Bson]) -> std::fmt::Result {
    f.write_str("[")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{v}")?;
    }
    f.write_str("]")
}

/// Shell-like rendering used for `parsedQuery` in explain output.
impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => f.write_str("{}"),
            Self::And(parts) => write_joined(f, "$and", parts),
            Self::Or(parts) => write_joined(f, "$or", parts),
            Self::Not(inner) => write!(f, "{{$not: {inner}}}"),
            Self::Exists { path, exists } => write!(f, "{{{path}: {{$exists: {exists}}}}}"),
            Self::In { path, values } => {
                write!(f, "{{{path}: {{$in: ")?;
                write_values(f, values)?;
                f.write_str("}}")
            }
            Self::Nin { path, values } => {
                write!(f, "{{{path}: {{$nin: ")?;
                write_values(f, values)?;
                f.write_str("}}")
            }
            Self::Cmp { path, op, value } => write!(f, "{{{path}: {{{op}: {value}}}}}"),
            #[cfg(feature = "regex")]
            Self::Regex { path, pattern, .. } => write!(f, "{{{path}: {{$regex: /{pattern}/}}}}"),
        }
    }
}
