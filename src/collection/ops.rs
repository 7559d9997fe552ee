use super::core::Collection;
use crate::document::Document;
use crate::index::{index_insert_all, index_remove_all};
use crate::types::DocumentId;

fn log_audit(op: &str, collection: &str, doc_id: &DocumentId) {
    let line = serde_json::json!({
        "ts": chrono::Utc::now().to_rfc3339(), "op": op, "collection": collection, "doc_id": doc_id.to_string()
    });
    log::info!(target: "bookquery::audit", "{line}");
}

impl Collection {
    pub fn insert_document(&self, document: Document) -> DocumentId {
        let _guard = self.build_lock.read();
        let doc_id = document.id.clone();
        index_insert_all(&mut self.indexes.write(), &document.data, &doc_id);
        {
            let mut store = self.store.write();
            store.order.push(doc_id.clone());
            store.docs.insert(doc_id.clone(), document);
        }
        log_audit("insert", &self.name_str(), &doc_id);
        doc_id
    }

    pub fn insert_many<I>(&self, documents: I) -> Vec<DocumentId>
    where
        I: IntoIterator<Item = Document>,
    {
        documents.into_iter().map(|d| self.insert_document(d)).collect()
    }

    #[must_use]
    pub fn find_document(&self, id: &DocumentId) -> Option<Document> {
        self.store.read().docs.get(id).cloned()
    }

    /// Replaces the stored document, keeping its id. Returns false if `id` is unknown.
    pub fn update_document(&self, id: &DocumentId, new_document: Document) -> bool {
        let _guard = self.build_lock.read();
        let mut new_doc_same_id = new_document;
        new_doc_same_id.id = id.clone();
        let old = {
            let mut store = self.store.write();
            let Some(slot) = store.docs.get_mut(id) else {
                return false;
            };
            std::mem::replace(slot, new_doc_same_id.clone())
        };
        let mut mgr = self.indexes.write();
        index_remove_all(&mut mgr, &old.data, id);
        index_insert_all(&mut mgr, &new_doc_same_id.data, id);
        drop(mgr);
        log_audit("update", &self.name_str(), id);
        true
    }

    pub fn delete_document(&self, id: &DocumentId) -> bool {
        let _guard = self.build_lock.read();
        let old = {
            let mut store = self.store.write();
            let Some(old) = store.docs.remove(id) else {
                return false;
            };
            store.order.retain(|x| x != id);
            old
        };
        index_remove_all(&mut self.indexes.write(), &old.data, id);
        log_audit("delete", &self.name_str(), id);
        true
    }

    /// All documents in natural order.
    #[must_use]
    pub fn get_all_documents(&self) -> Vec<Document> {
        let store = self.store.read();
        store.order.iter().filter_map(|id| store.docs.get(id).cloned()).collect()
    }

    /// Return only the IDs of all documents without cloning each document.
    #[must_use]
    pub fn list_ids(&self) -> Vec<DocumentId> {
        self.store.read().order.clone()
    }

    /// Position of each id in natural order, for restoring order after an index scan.
    pub(crate) fn natural_positions(&self) -> std::collections::HashMap<DocumentId, usize> {
        self.store.read().order.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect()
    }

    pub fn clear(&self) {
        let _guard = self.build_lock.write();
        let mut store = self.store.write();
        let mut mgr = self.indexes.write();
        for (id, doc) in &store.docs {
            index_remove_all(&mut mgr, &doc.data, id);
        }
        store.order.clear();
        store.docs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn keeps_natural_order_across_deletes() {
        let col = Collection::new("books".into());
        let ids = col.insert_many(vec![
            Document::new(doc! {"n": 1}),
            Document::new(doc! {"n": 2}),
            Document::new(doc! {"n": 3}),
        ]);
        assert!(col.delete_document(&ids[1]));
        assert!(!col.delete_document(&ids[1]));
        let ns: Vec<i32> =
            col.get_all_documents().iter().map(|d| d.data.get_i32("n").unwrap()).collect();
        assert_eq!(ns, vec![1, 3]);
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn update_keeps_id_and_reports_unknown() {
        let col = Collection::new("books".into());
        let id = col.insert_document(Document::new(doc! {"n": 1}));
        assert!(col.update_document(&id, Document::new(doc! {"n": 5})));
        assert_eq!(col.find_document(&id).unwrap().data.get_i32("n").unwrap(), 5);
        assert!(!col.update_document(&DocumentId::new(), Document::new(doc! {})));
    }

    #[test]
    fn clear_empties_store() {
        let col = Collection::new("books".into());
        col.insert_document(Document::new(doc! {"n": 1}));
        col.clear();
        assert!(col.is_empty());
    }
}
