use crate::document::types::Metadata;
use crate::types::DocumentId;
use bson::oid::ObjectId;
use bson::{Bson, Document as BsonDocument};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: BsonDocument,
    pub metadata: Metadata,
}

impl Document {
    /// Wraps `data`, assigning a fresh `ObjectId` to `_id` when the caller did not supply one.
    #[must_use]
    pub fn new(data: BsonDocument) -> Self {
        Self { id: DocumentId::new(), data: with_object_id(data), metadata: Metadata::new() }
    }

    /// The user-visible `_id` value.
    #[must_use]
    pub fn object_id(&self) -> Option<&Bson> {
        self.data.get("_id")
    }

    pub fn update(&mut self, new_data: BsonDocument) {
        self.data = new_data;
        self.metadata.updated_at = Utc::now();
    }
}

fn with_object_id(data: BsonDocument) -> BsonDocument {
    if data.contains_key("_id") {
        return data;
    }
    // _id leads, matching server-side insert behavior
    let mut out = BsonDocument::new();
    out.insert("_id", ObjectId::new());
    for (k, v) in data {
        out.insert(k, v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn assigns_object_id_first() {
        let d = Document::new(doc! {"title": "1984"});
        let keys: Vec<&String> = d.data.keys().collect();
        assert_eq!(keys[0], "_id");
        assert!(matches!(d.object_id(), Some(Bson::ObjectId(_))));
    }

    #[test]
    fn keeps_supplied_id() {
        let d = Document::new(doc! {"_id": 7, "title": "Emma"});
        assert_eq!(d.object_id(), Some(&Bson::Int32(7)));
    }

    #[test]
    fn update_bumps_timestamp() {
        let mut d = Document::new(doc! {"x": 1});
        let before = d.metadata.updated_at;
        d.update(doc! {"x": 2});
        assert!(d.metadata.updated_at >= before);
        assert_eq!(d.data.get_i32("x").unwrap(), 2);
    }
}
