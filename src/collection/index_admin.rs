use super::core::Collection;
use crate::errors::DbError;
use crate::index::{IndexDescriptor, IndexSpec};
use bson::Document as BsonDocument;

impl Collection {
    /// `createIndex(keys)`: builds the index from the current documents and
    /// returns its name. Re-creating an identical index is a no-op.
    ///
    /// # Errors
    /// Returns an error for malformed key patterns or a conflicting index of the same name.
    pub fn create_index(&self, keys: &BsonDocument) -> Result<String, DbError> {
        let spec = IndexSpec::from_document(keys)?;
        let name = spec.default_name();
        self.create_index_named(&name, spec)?;
        Ok(name)
    }

    /// # Errors
    /// Returns `IndexConflict` if `name` exists with a different key pattern.
    pub fn create_index_named(&self, name: &str, spec: IndexSpec) -> Result<(), DbError> {
        let _wguard = self.build_lock.write();
        let mut mgr = self.indexes.write();
        if !mgr.create_index(name, spec)? {
            log::debug!("index {name} already exists on {}", self.name_str());
            return Ok(());
        }
        // offline build: rebuild from current documents
        let start = std::time::Instant::now();
        let store = self.store.read();
        if let Some(idx) = mgr.get_mut(name) {
            for id in &store.order {
                if let Some(doc) = store.docs.get(id) {
                    idx.insert(&doc.data, id);
                }
            }
            idx.stats.build_time_ms = start.elapsed().as_millis();
            log::info!(
                target: "bookquery::metrics",
                "{}",
                serde_json::json!({"event": "index_build", "collection": self.name_str(), "index": name, "entries": idx.stats.entries, "build_time_ms": crate::utils::num::u128_to_u64_saturating(idx.stats.build_time_ms)})
            );
        }
        Ok(())
    }

    /// # Errors
    /// Returns `NoSuchIndex` when no index has that name.
    pub fn drop_index(&self, name: &str) -> Result<(), DbError> {
        let _wguard = self.build_lock.write();
        if self.indexes.write().drop_index(name) {
            Ok(())
        } else {
            Err(DbError::NoSuchIndex(name.to_string()))
        }
    }

    #[must_use]
    pub fn list_indexes(&self) -> Vec<IndexDescriptor> {
        self.indexes.read().descriptors()
    }
}
