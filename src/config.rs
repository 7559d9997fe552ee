//! Application configuration.
//!
//! Precedence: CLI > environment > config files > defaults. Config files are
//! read in order: `--config`, `BOOKQUERY_CONFIG`, `<config_dir>/bookquery.toml`,
//! `./bookquery.toml`; earlier files win per field. The first two are named by
//! the user and must load; the discovered ones are skipped when broken.

use crate::errors::DbError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_COLLECTION: &str = "books";
pub const DEFAULT_PAGE_SIZE: usize = 5;
const FILE_NAME: &str = "bookquery.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Fixture file to seed from; the built-in sample set when absent.
    pub fixtures: Option<PathBuf>,
    pub collection: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub page_size: Option<usize>,
}

impl AppConfig {
    #[must_use]
    pub fn collection_name(&self) -> &str {
        self.collection.as_deref().unwrap_or(DEFAULT_COLLECTION)
    }

    /// Page size, never zero.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size.filter(|n| *n > 0).unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Fills fields still unset from `other`.
    pub fn merge_missing(&mut self, other: Self) {
        if self.fixtures.is_none() {
            self.fixtures = other.fixtures;
        }
        if self.collection.is_none() {
            self.collection = other.collection;
        }
        if self.log_dir.is_none() {
            self.log_dir = other.log_dir;
        }
        if self.log_level.is_none() {
            self.log_level = other.log_level;
        }
        if self.page_size.is_none() {
            self.page_size = other.page_size;
        }
    }

    /// # Errors
    /// Returns an error if the file cannot be read or is not valid TOML for this struct.
    pub fn from_file(path: &Path) -> Result<Self, DbError> {
        let s = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&s)?)
    }

    /// Settings taken from `BOOKQUERY_*` variables, read through `env`.
    pub fn from_env(env: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            fixtures: env("BOOKQUERY_FIXTURES").map(PathBuf::from),
            collection: env("BOOKQUERY_COLLECTION"),
            log_dir: env("BOOKQUERY_LOG_DIR").map(PathBuf::from),
            log_level: env("BOOKQUERY_LOG_LEVEL"),
            page_size: env("BOOKQUERY_PAGE_SIZE").and_then(|s| s.trim().parse().ok()),
        }
    }

    /// Resolves the effective configuration against the process environment.
    ///
    /// # Errors
    /// See [`AppConfig::load_with_env`].
    pub fn load(cli_config: Option<&Path>, cli: Self) -> Result<Resolved, DbError> {
        Self::load_with_env(cli_config, cli, |k| std::env::var(k).ok())
    }

    /// Resolves the effective configuration. `cli` holds values given on the
    /// command line.
    ///
    /// # Errors
    /// Returns an error when a file named by `cli_config` or `BOOKQUERY_CONFIG`
    /// is missing or malformed.
    pub fn load_with_env(
        cli_config: Option<&Path>,
        cli: Self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Resolved, DbError> {
        resolve(cli_config, cli, env, &search_paths())
    }
}

fn resolve(
    cli_config: Option<&Path>,
    cli: AppConfig,
    env: impl Fn(&str) -> Option<String>,
    discovered: &[PathBuf],
) -> Result<Resolved, DbError> {
    let mut config = cli;
    config.merge_missing(AppConfig::from_env(&env));
    if let Some(explicit) = cli_config {
        config.merge_missing(AppConfig::from_file(explicit)?);
    }
    if let Some(named) = env("BOOKQUERY_CONFIG") {
        config.merge_missing(AppConfig::from_file(Path::new(&named))?);
    }
    let mut warnings = Vec::new();
    for p in discovered.iter().filter(|p| p.exists()) {
        match AppConfig::from_file(p) {
            Ok(file_cfg) => config.merge_missing(file_cfg),
            Err(e) => warnings.push(format!("ignoring config file {}: {e}", p.display())),
        }
    }
    Ok(Resolved { config, warnings })
}

/// Outcome of [`AppConfig::load`]. `warnings` name the discovered files that
/// were skipped; log them once the logger is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub config: AppConfig,
    pub warnings: Vec<String>,
}

/// Discovered config file locations, in precedence order.
#[must_use]
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs_next::config_dir() {
        paths.push(dir.join(FILE_NAME));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join(FILE_NAME));
    }
    paths
}
