use crate::document::Document;
use crate::index::IndexManager;
use crate::types::DocumentId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Documents in natural (insertion) order.
#[derive(Debug, Default)]
pub(crate) struct Store {
    pub(crate) order: Vec<DocumentId>,
    pub(crate) docs: HashMap<DocumentId, Document>,
}

pub struct Collection {
    pub name: Arc<RwLock<String>>,
    pub(crate) store: RwLock<Store>,
    pub indexes: RwLock<IndexManager>,
    pub(crate) build_lock: RwLock<()>,
}

impl Collection {
    #[must_use]
    pub fn new(name: String) -> Self {
        Self {
            name: Arc::new(RwLock::new(name)),
            store: RwLock::new(Store::default()),
            indexes: RwLock::new(IndexManager::new()),
            build_lock: RwLock::new(()),
        }
    }

    pub fn set_name(&self, new_name: String) {
        *self.name.write() = new_name;
    }

    /// Returns the collection's name as a String (cloned), hiding the `RwLock`.
    pub fn name_str(&self) -> String {
        self.name.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.read().order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name_str())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
