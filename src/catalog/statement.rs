use crate::aggregate::{Pipeline, aggregate, parse_pipeline};
use crate::collection::Collection;
use crate::errors::DbError;
use crate::index::IndexSpec;
use crate::query::{
    self, DeleteReport, ExplainReport, Filter, FindOptions, UpdateDoc, UpdateReport,
    parse_filter, parse_projection, parse_sort, parse_update,
};
use crate::utils::json::bson_document_to_json;
use bson::Document as BsonDocument;

/// One literal shell statement against the `books` collection.
///
/// Arguments are kept as the literal documents and parsed when the statement
/// is validated or run.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Find {
        filter: BsonDocument,
        projection: Option<BsonDocument>,
        sort: Option<BsonDocument>,
        skip: Option<usize>,
        limit: Option<usize>,
    },
    UpdateOne { filter: BsonDocument, update: BsonDocument },
    DeleteOne { filter: BsonDocument },
    Aggregate { pipeline: Vec<BsonDocument> },
    CreateIndex { keys: BsonDocument },
    /// `find(filter).explain("executionStats")`
    Explain { filter: BsonDocument },
}

/// What running a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Documents(Vec<BsonDocument>),
    Updated(UpdateReport),
    Deleted(DeleteReport),
    IndexCreated(String),
    Explained(ExplainReport),
}

impl Outcome {
    #[must_use]
    pub fn documents(&self) -> Option<&[BsonDocument]> {
        match self {
            Self::Documents(d) => Some(d),
            _ => None,
        }
    }

    /// JSON rendering: documents as an array, reports in the server's acknowledgement shape.
    ///
    /// # Errors
    /// Returns an error if a report cannot be serialized.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        Ok(match self {
            Self::Documents(docs) => {
                serde_json::Value::Array(docs.iter().map(bson_document_to_json).collect())
            }
            Self::Updated(r) => serde_json::json!({
                "acknowledged": true, "matchedCount": r.matched, "modifiedCount": r.modified
            }),
            Self::Deleted(r) => serde_json::json!({"acknowledged": true, "deletedCount": r.deleted}),
            Self::IndexCreated(name) => serde_json::Value::String(name.clone()),
            Self::Explained(report) => report.to_json()?,
        })
    }
}

/// Parsed form of a statement, ready to execute.
enum Prepared {
    Find(Filter, FindOptions),
    UpdateOne(Filter, UpdateDoc),
    DeleteOne(Filter),
    Aggregate(Pipeline),
    CreateIndex(IndexSpec),
    Explain(Filter),
}

impl Statement {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Find { .. } => "find",
            Self::UpdateOne { .. } => "updateOne",
            Self::DeleteOne { .. } => "deleteOne",
            Self::Aggregate { .. } => "aggregate",
            Self::CreateIndex { .. } => "createIndex",
            Self::Explain { .. } => "explain",
        }
    }

    /// Whether running the statement changes the collection or its indexes.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::UpdateOne { .. } | Self::DeleteOne { .. } | Self::CreateIndex { .. })
    }

    fn prepare(&self) -> Result<Prepared, DbError> {
        Ok(match self {
            Self::Find { filter, projection, sort, skip, limit } => {
                let opts = FindOptions {
                    projection: match projection {
                        Some(p) => parse_projection(p)?,
                        None => None,
                    },
                    sort: sort.as_ref().map(parse_sort).transpose()?,
                    skip: *skip,
                    limit: *limit,
                };
                Prepared::Find(parse_filter(filter)?, opts)
            }
            Self::UpdateOne { filter, update } => {
                Prepared::UpdateOne(parse_filter(filter)?, parse_update(update)?)
            }
            Self::DeleteOne { filter } => Prepared::DeleteOne(parse_filter(filter)?),
            Self::Aggregate { pipeline } => Prepared::Aggregate(parse_pipeline(pipeline)?),
            Self::CreateIndex { keys } => Prepared::CreateIndex(IndexSpec::from_document(keys)?),
            Self::Explain { filter } => Prepared::Explain(parse_filter(filter)?),
        })
    }

    /// Checks that every document in the statement parses.
    ///
    /// # Errors
    /// Returns the first parse error.
    pub fn validate(&self) -> Result<(), DbError> {
        self.prepare().map(|_| ())
    }

    /// Executes the statement against `col`. A filter that matches nothing is
    /// a successful zero-count result, not an error.
    ///
    /// # Errors
    /// Returns an error if the statement does not parse or cannot be applied.
    pub fn run(&self, col: &Collection) -> Result<Outcome, DbError> {
        let outcome = match self.prepare()? {
            Prepared::Find(filter, opts) => {
                Outcome::Documents(query::find_docs(col, &filter, &opts).into_bson())
            }
            Prepared::UpdateOne(filter, update) => {
                Outcome::Updated(query::update_one(col, &filter, &update)?)
            }
            Prepared::DeleteOne(filter) => Outcome::Deleted(query::delete_one(col, &filter)),
            Prepared::Aggregate(pipeline) => Outcome::Documents(aggregate(col, &pipeline)?),
            Prepared::CreateIndex(spec) => {
                let name = spec.default_name();
                col.create_index_named(&name, spec)?;
                Outcome::IndexCreated(name)
            }
            Prepared::Explain(filter) => {
                Outcome::Explained(query::explain_find(col, &filter, &FindOptions::default()))
            }
        };
        log::debug!("ran {} on {}", self.kind(), col.name_str());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use bson::doc;

    #[test]
    fn zero_match_update_is_ok() {
        let col = Collection::new("books".into());
        col.insert_document(Document::new(doc! {"author": "Harper Lee", "price": 12}));
        let st = Statement::UpdateOne {
            filter: doc! {"autor": "Harper Lee"},
            update: doc! {"$set": {"price": 15}},
        };
        let out = st.run(&col).unwrap();
        assert_eq!(out, Outcome::Updated(UpdateReport { matched: 0, modified: 0 }));
        assert_eq!(
            out.to_json().unwrap(),
            serde_json::json!({"acknowledged": true, "matchedCount": 0, "modifiedCount": 0})
        );
    }

    #[test]
    fn invalid_statements_fail_validation() {
        let st = Statement::Find {
            filter: doc! {"price": {"$bogus": 1}},
            projection: None,
            sort: None,
            skip: None,
            limit: None,
        };
        assert!(st.validate().is_err());
        assert!(Statement::CreateIndex { keys: doc! {} }.validate().is_err());
    }
}
