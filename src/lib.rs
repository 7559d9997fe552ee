//! Literal MongoDB-style statements over a `books` collection, with an
//! in-memory executor so each one can be run against fixture data.

pub mod aggregate;
pub mod catalog;
pub mod cli;
pub mod collection;
pub mod config;
pub mod document;
pub mod engine;
#[path = "utils/errors.rs"]
pub mod errors;
pub mod fixtures;
pub mod index;
pub mod query;
pub mod types;
pub mod utils;

pub use utils::logger;

use crate::aggregate::Pipeline;
use crate::catalog::Outcome;
use crate::collection::Collection;
use crate::engine::Engine;
use crate::errors::DbError;
use crate::query::{Cursor, DeleteReport, ExplainReport, Filter, FindOptions, UpdateDoc, UpdateReport};
use bson::Document as BsonDocument;
use std::sync::Arc;

/// Façade over an [`Engine`] addressing collections by name.
#[derive(Debug, Default)]
pub struct Database {
    engine: Arc<Engine>,
}

impl Database {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A database holding `name` seeded with the built-in sample books.
    ///
    /// # Errors
    /// Returns an error if the sample books cannot be converted.
    pub fn with_sample_books(name: &str) -> Result<Self, DbError> {
        let db = Self::new();
        let col = db.engine.get_or_create_collection(name);
        fixtures::seed_collection(&col, fixtures::books_to_documents(&fixtures::sample_books())?);
        Ok(db)
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// # Errors
    /// Returns `CollectionAlreadyExists` if the name is taken.
    pub fn create_collection(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        self.engine.create_collection(name)
    }

    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.engine.get_collection(name)
    }

    pub fn delete_collection(&self, name: &str) -> bool {
        self.engine.delete_collection(name)
    }

    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        self.engine.list_collection_names()
    }

    /// # Errors
    /// See [`Engine::rename_collection`].
    pub fn rename_collection(&self, old: &str, new: &str) -> Result<(), DbError> {
        self.engine.rename_collection(old, new)
    }

    fn collection(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        self.engine.get_collection(name).ok_or_else(|| DbError::NoSuchCollection(name.to_string()))
    }

    // --- Query API (façade over query and aggregate modules) ---

    /// # Errors
    /// `NoSuchCollection` if the collection does not exist.
    pub fn find(&self, collection: &str, filter: &Filter, opts: &FindOptions) -> Result<Cursor, DbError> {
        let col = self.collection(collection)?;
        Ok(query::find_docs(&col, filter, opts))
    }

    /// # Errors
    /// `NoSuchCollection` if the collection does not exist.
    pub fn count(&self, collection: &str, filter: &Filter) -> Result<usize, DbError> {
        let col = self.collection(collection)?;
        Ok(query::count_docs(&col, filter))
    }

    /// # Errors
    /// `NoSuchCollection`, or an update that cannot be applied.
    pub fn update_one(&self, collection: &str, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, DbError> {
        let col = self.collection(collection)?;
        query::update_one(&col, filter, update)
    }

    /// # Errors
    /// `NoSuchCollection`, or an update that cannot be applied.
    pub fn update_many(&self, collection: &str, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, DbError> {
        let col = self.collection(collection)?;
        query::update_many(&col, filter, update)
    }

    /// # Errors
    /// `NoSuchCollection` if the collection does not exist.
    pub fn delete_one(&self, collection: &str, filter: &Filter) -> Result<DeleteReport, DbError> {
        let col = self.collection(collection)?;
        Ok(query::delete_one(&col, filter))
    }

    /// # Errors
    /// `NoSuchCollection` if the collection does not exist.
    pub fn delete_many(&self, collection: &str, filter: &Filter) -> Result<DeleteReport, DbError> {
        let col = self.collection(collection)?;
        Ok(query::delete_many(&col, filter))
    }

    /// # Errors
    /// `NoSuchCollection`, or a stage that fails at run time.
    pub fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<BsonDocument>, DbError> {
        let col = self.collection(collection)?;
        aggregate::aggregate(&col, pipeline)
    }

    /// # Errors
    /// `NoSuchCollection` if the collection does not exist.
    pub fn explain(&self, collection: &str, filter: &Filter, opts: &FindOptions) -> Result<ExplainReport, DbError> {
        let col = self.collection(collection)?;
        Ok(query::explain_find(&col, filter, opts))
    }

    /// Runs a named catalog statement against `collection`.
    ///
    /// # Errors
    /// `NoSuchStatement`, `NoSuchCollection`, or the statement's own failure.
    pub fn run_statement(&self, collection: &str, name: &str) -> Result<Outcome, DbError> {
        let entry =
            catalog::find_entry(name).ok_or_else(|| DbError::NoSuchStatement(name.to_string()))?;
        let col = self.collection(collection)?;
        entry.statement.run(&col)
    }
}

/// Initializes logging from `BOOKQUERY_LOG_*` environment variables.
///
/// # Errors
/// Returns an error if the log directory cannot be prepared.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::configure_from_env()
}
