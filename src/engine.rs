use crate::collection::Collection;
use crate::errors::DbError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory registry of named collections.
#[derive(Debug, Default)]
pub struct Engine {
    pub(crate) collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns `CollectionAlreadyExists` if the name is taken.
    pub fn create_collection(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        let mut cols = self.collections.write();
        if cols.contains_key(name) {
            return Err(DbError::CollectionAlreadyExists(name.to_string()));
        }
        let col = Arc::new(Collection::new(name.to_string()));
        cols.insert(name.to_string(), Arc::clone(&col));
        log::info!(target: "bookquery::audit", "{}", serde_json::json!({"op": "create_collection", "collection": name}));
        Ok(col)
    }

    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    /// Returns the named collection, creating it on first use like the shell does.
    pub fn get_or_create_collection(&self, name: &str) -> Arc<Collection> {
        if let Some(col) = self.get_collection(name) {
            return col;
        }
        let mut cols = self.collections.write();
        Arc::clone(
            cols.entry(name.to_string())
                .or_insert_with(|| Arc::new(Collection::new(name.to_string()))),
        )
    }

    pub fn delete_collection(&self, name: &str) -> bool {
        let removed = self.collections.write().remove(name).is_some();
        if removed {
            log::info!(target: "bookquery::audit", "{}", serde_json::json!({"op": "drop_collection", "collection": name}));
        }
        removed
    }

    /// Collection names, sorted.
    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// # Errors
    /// `NoSuchCollection` if `old` is missing, `CollectionAlreadyExists` if `new` is taken.
    pub fn rename_collection(&self, old: &str, new: &str) -> Result<(), DbError> {
        let mut cols = self.collections.write();
        if cols.contains_key(new) {
            return Err(DbError::CollectionAlreadyExists(new.to_string()));
        }
        let col = cols.remove(old).ok_or_else(|| DbError::NoSuchCollection(old.to_string()))?;
        col.set_name(new.to_string());
        cols.insert(new.to_string(), col);
        log::info!(target: "bookquery::audit", "{}", serde_json::json!({"op": "rename_collection", "from": old, "to": new}));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_get_rename_delete() {
        let engine = Engine::new();
        engine.create_collection("books").unwrap();
        assert!(matches!(
            engine.create_collection("books"),
            Err(DbError::CollectionAlreadyExists(_))
        ));
        engine.rename_collection("books", "library").unwrap();
        assert!(engine.get_collection("books").is_none());
        assert_eq!(engine.get_collection("library").unwrap().name_str(), "library");
        assert!(matches!(
            engine.rename_collection("missing", "x"),
            Err(DbError::NoSuchCollection(_))
        ));
        assert!(engine.delete_collection("library"));
        assert!(!engine.delete_collection("library"));
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let engine = Engine::new();
        let a = engine.get_or_create_collection("books");
        let b = engine.get_or_create_collection("books");
        assert!(Arc::ptr_eq(&a, &b));
        engine.get_or_create_collection("authors");
        assert_eq!(engine.list_collection_names(), ["authors", "books"]);
    }
}
