use super::runner::OutputMode;
use crate::config::AppConfig;
use crate::errors::DbError;
use crate::fixtures;
use bson::Document as BsonDocument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Catalog names grouped by section.
    List,
    /// Shell rendering of one statement.
    Show { name: String },
    /// Run one statement against a freshly seeded collection.
    Run { name: String },
    /// Run every statement, each against its own freshly seeded collection.
    RunAll,
    Find {
        filter_json: String,
        project: Option<String>,
        sort: Option<String>,
        skip: Option<usize>,
        limit: Option<usize>,
    },
    Aggregate { pipeline_json: String },
    /// One page of the collection in natural order, 1-based.
    Page { page: usize },
}

/// Everything a command needs besides the engine.
#[derive(Debug, Clone)]
pub struct Settings {
    pub collection: String,
    pub fixtures: Vec<BsonDocument>,
    pub page_size: usize,
    pub mode: OutputMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collection: crate::config::DEFAULT_COLLECTION.to_string(),
            fixtures: fixtures::books_to_documents(&fixtures::sample_books()).unwrap_or_default(),
            page_size: crate::config::DEFAULT_PAGE_SIZE,
            mode: OutputMode::Plain,
        }
    }
}

impl Settings {
    /// Loads the configured fixture file, or the built-in sample set.
    ///
    /// # Errors
    /// Returns an error if the fixture file cannot be loaded.
    pub fn from_config(cfg: &AppConfig, mode: OutputMode) -> Result<Self, DbError> {
        let fixtures = match &cfg.fixtures {
            Some(path) => fixtures::load_books(path)?,
            None => fixtures::books_to_documents(&fixtures::sample_books())?,
        };
        Ok(Self {
            collection: cfg.collection_name().to_string(),
            fixtures,
            page_size: cfg.page_size(),
            mode,
        })
    }
}
