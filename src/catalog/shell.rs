//! Mongo shell rendering of catalog statements.

use super::statement::Statement;
use bson::{Bson, Document as BsonDocument};

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn render_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        serde_json::Value::String(key.to_string()).to_string()
    }
}

/// Renders a BSON value as a shell literal: `{ genre: "Adventure" }`.
#[must_use]
pub fn render_value(value: &Bson) -> String {
    match value {
        Bson::Document(d) => render_document(d),
        Bson::Array(items) => {
            let inner: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", inner.join(", "))
        }
        Bson::String(s) => serde_json::Value::String(s.clone()).to_string(),
        Bson::Int32(i) => i.to_string(),
        Bson::Int64(i) => i.to_string(),
        Bson::Double(f) => f.to_string(),
        Bson::Boolean(b) => b.to_string(),
        Bson::Null => "null".to_string(),
        Bson::ObjectId(oid) => format!("ObjectId(\"{oid}\")"),
        other => other.clone().into_relaxed_extjson().to_string(),
    }
}

#[must_use]
pub fn render_document(doc: &BsonDocument) -> String {
    if doc.is_empty() {
        return "{}".to_string();
    }
    let fields: Vec<String> =
        doc.iter().map(|(k, v)| format!("{}: {}", render_key(k), render_value(v))).collect();
    format!("{{ {} }}", fields.join(", "))
}

impl Statement {
    /// The statement as it would be typed into a mongo shell against `collection`.
    #[must_use]
    pub fn to_shell(&self, collection: &str) -> String {
        let target = format!("db.{collection}");
        match self {
            Self::Find { filter, projection, sort, skip, limit } => {
                let mut out = match (filter.is_empty(), projection) {
                    (_, Some(p)) => {
                        format!("{target}.find({}, {})", render_document(filter), render_document(p))
                    }
                    (true, None) => format!("{target}.find()"),
                    (false, None) => format!("{target}.find({})", render_document(filter)),
                };
                if let Some(s) = sort {
                    out.push_str(&format!(".sort({})", render_document(s)));
                }
                if let Some(n) = skip {
                    out.push_str(&format!(".skip({n})"));
                }
                if let Some(n) = limit {
                    out.push_str(&format!(".limit({n})"));
                }
                out.push(';');
                out
            }
            Self::UpdateOne { filter, update } => format!(
                "{target}.updateOne({}, {});",
                render_document(filter),
                render_document(update)
            ),
            Self::DeleteOne { filter } => {
                format!("{target}.deleteOne({});", render_document(filter))
            }
            Self::Aggregate { pipeline } => {
                let stages: Vec<String> =
                    pipeline.iter().map(|s| format!("  {},", render_document(s))).collect();
                format!("{target}.aggregate([\n{}\n]);", stages.join("\n"))
            }
            Self::CreateIndex { keys } => {
                format!("{target}.createIndex({});", render_document(keys))
            }
            Self::Explain { filter } => format!(
                "{target}.find({}).explain(\"executionStats\");",
                render_document(filter)
            ),
        }
    }
}
