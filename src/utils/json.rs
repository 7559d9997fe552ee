use crate::errors::DbError;
use bson::{Bson, Document as BsonDocument};

/// Convert a `serde_json::Value` that must be an object into a `bson::Document`.
///
/// # Errors
/// Returns `DbError::Bson` when the value is not an object or has no BSON representation.
pub fn json_value_to_bson_document(val: &serde_json::Value) -> Result<BsonDocument, DbError> {
    let obj = val.as_object().ok_or_else(|| DbError::Bson("expected JSON object".into()))?;
    BsonDocument::try_from(obj.clone()).map_err(|e| DbError::Bson(e.to_string()))
}

/// Parse a JSON string into a `bson::Document`. The JSON must be a top-level object.
///
/// # Errors
/// Returns an error on malformed JSON or a non-object top level.
pub fn parse_json_to_bson_document(json: &str) -> Result<BsonDocument, DbError> {
    let val: serde_json::Value = serde_json::from_str(json)?;
    json_value_to_bson_document(&val)
}

/// Parse a JSON array of objects, e.g. an aggregation pipeline.
///
/// # Errors
/// Returns an error on malformed JSON, a non-array top level or non-object elements.
pub fn parse_json_to_bson_documents(json: &str) -> Result<Vec<BsonDocument>, DbError> {
    let val: serde_json::Value = serde_json::from_str(json)?;
    let arr = val.as_array().ok_or_else(|| DbError::Bson("expected JSON array".into()))?;
    arr.iter().map(json_value_to_bson_document).collect()
}

/// Relaxed extended JSON rendering, as printed by the shell.
#[must_use]
pub fn bson_document_to_json(doc: &BsonDocument) -> serde_json::Value {
    Bson::Document(doc.clone()).into_relaxed_extjson()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_to_bson_success() {
        let d = parse_json_to_bson_document("{\"a\":1,\"b\":\"x\"}").unwrap();
        assert_eq!(d.get_i32("a").unwrap(), 1);
        assert_eq!(d.get_str("b").unwrap(), "x");
    }

    #[test]
    fn keys_keep_their_written_order() {
        let d = parse_json_to_bson_document(r#"{"price": 1, "author": -1, "meta": {"z": 1, "a": 2}}"#).unwrap();
        let keys: Vec<&str> = d.keys().map(String::as_str).collect();
        assert_eq!(keys, ["price", "author", "meta"]);
        let inner: Vec<&str> = d.get_document("meta").unwrap().keys().map(String::as_str).collect();
        assert_eq!(inner, ["z", "a"]);

        let stages = parse_json_to_bson_documents(r#"[{"$sort": {"genre": 1, "avgPrice": -1}}]"#).unwrap();
        let sort_keys: Vec<&str> = stages[0].get_document("$sort").unwrap().keys().map(String::as_str).collect();
        assert_eq!(sort_keys, ["genre", "avgPrice"]);
    }

    #[test]
    fn json_to_bson_rejects_array() {
        let e = parse_json_to_bson_document("[1,2,3]").unwrap_err();
        assert!(matches!(e, DbError::Bson(_)));
    }

    #[test]
    fn pipeline_arrays_parse() {
        let stages = parse_json_to_bson_documents(r#"[{"$limit": 1}, {"$skip": 2}]"#).unwrap();
        assert_eq!(stages.len(), 2);
        assert!(parse_json_to_bson_documents(r#"[1]"#).is_err());
    }

    #[test]
    fn renders_relaxed_json() {
        let v = bson_document_to_json(&bson::doc! {"title": "Emma", "price": 9.5});
        assert_eq!(v, serde_json::json!({"title": "Emma", "price": 9.5}));
    }
}
