use bson::Document as BsonDocument;
use serde::Serialize;

/// One node of the winning plan tree, shaped like the server's explain output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage")]
pub enum PlanStage {
    #[serde(rename = "COLLSCAN")]
    CollScan,
    #[serde(rename = "IXSCAN", rename_all = "camelCase")]
    IxScan { index_name: String, key_pattern: BsonDocument },
    #[serde(rename = "FETCH", rename_all = "camelCase")]
    Fetch { input_stage: Box<PlanStage> },
    #[serde(rename = "SORT", rename_all = "camelCase")]
    Sort { sort_pattern: BsonDocument, input_stage: Box<PlanStage> },
    #[serde(rename = "SKIP", rename_all = "camelCase")]
    Skip { skip_amount: u64, input_stage: Box<PlanStage> },
    #[serde(rename = "LIMIT", rename_all = "camelCase")]
    Limit { limit_amount: u64, input_stage: Box<PlanStage> },
    #[serde(rename = "PROJECTION_SIMPLE", rename_all = "camelCase")]
    Projection { input_stage: Box<PlanStage> },
}

impl PlanStage {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CollScan => "COLLSCAN",
            Self::IxScan { .. } => "IXSCAN",
            Self::Fetch { .. } => "FETCH",
            Self::Sort { .. } => "SORT",
            Self::Skip { .. } => "SKIP",
            Self::Limit { .. } => "LIMIT",
            Self::Projection { .. } => "PROJECTION_SIMPLE",
        }
    }

    #[must_use]
    pub fn input(&self) -> Option<&Self> {
        match self {
            Self::CollScan | Self::IxScan { .. } => None,
            Self::Fetch { input_stage }
            | Self::Sort { input_stage, .. }
            | Self::Skip { input_stage, .. }
            | Self::Limit { input_stage, .. }
            | Self::Projection { input_stage } => Some(input_stage.as_ref()),
        }
    }

    /// The leaf stage: `COLLSCAN` or `IXSCAN`.
    #[must_use]
    pub fn leaf(&self) -> &Self {
        let mut cur = self;
        while let Some(next) = cur.input() {
            cur = next;
        }
        cur
    }

    /// Name of the index the plan reads, if any.
    #[must_use]
    pub fn index_name(&self) -> Option<&str> {
        match self.leaf() {
            Self::IxScan { index_name, .. } => Some(index_name.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlanner {
    pub namespace: String,
    pub parsed_query: String,
    pub winning_plan: PlanStage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub execution_success: bool,
    pub n_returned: u64,
    pub execution_time_millis: u64,
    pub total_keys_examined: u64,
    pub total_docs_examined: u64,
}

/// `explain("executionStats")` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainReport {
    pub query_planner: QueryPlanner,
    pub execution_stats: ExecutionStats,
}

impl ExplainReport {
    /// # Errors
    /// Returns an error if the report cannot be serialized.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn serializes_like_the_shell() {
        let plan = PlanStage::Fetch {
            input_stage: Box::new(PlanStage::IxScan {
                index_name: "title_1".into(),
                key_pattern: doc! {"title": 1},
            }),
        };
        let report = ExplainReport {
            query_planner: QueryPlanner {
                namespace: "test.books".into(),
                parsed_query: "{title: {$eq: \"1984\"}}".into(),
                winning_plan: plan,
            },
            execution_stats: ExecutionStats {
                execution_success: true,
                n_returned: 1,
                execution_time_millis: 0,
                total_keys_examined: 1,
                total_docs_examined: 1,
            },
        };
        let v = report.to_json().unwrap();
        assert_eq!(v["queryPlanner"]["winningPlan"]["stage"], "FETCH");
        assert_eq!(v["queryPlanner"]["winningPlan"]["inputStage"]["stage"], "IXSCAN");
        assert_eq!(v["queryPlanner"]["winningPlan"]["inputStage"]["indexName"], "title_1");
        assert_eq!(v["executionStats"]["totalDocsExamined"], 1);
        assert_eq!(report.query_planner.winning_plan.index_name(), Some("title_1"));
    }
}
