use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A value with no BSON document form, e.g. a JSON scalar where an object is expected.
    #[error("BSON: {0}")]
    Bson(String),

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed TOML config file.
    #[error("Config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),

    #[error("Collection already exists: {0}")]
    CollectionAlreadyExists(String),

    #[error("Catalog statement not found: {0}")]
    NoSuchStatement(String),

    #[error("Index conflict: {0}")]
    IndexConflict(String),

    #[error("Index not found: {0}")]
    NoSuchIndex(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Fixture error: {0}")]
    Fixture(String),
}

impl DbError {
    pub(crate) fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let e = DbError::NoSuchCollection("books".into());
        assert_eq!(e.to_string(), "Collection not found: books");
        let e = DbError::query("unknown operator $foo");
        assert!(e.to_string().starts_with("Query error:"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: DbError = io.into();
        assert!(matches!(e, DbError::Io(_)));
    }

    #[test]
    fn toml_errors_become_config_errors() {
        let bad: Result<toml::Table, _> = toml::from_str("page_size = ");
        let e: DbError = bad.unwrap_err().into();
        assert!(matches!(e, DbError::Config(_)));
        assert!(e.to_string().starts_with("Config:"));
    }
}
