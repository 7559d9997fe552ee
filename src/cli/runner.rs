use crate::aggregate::{aggregate, parse_pipeline_json};
use crate::catalog::{self, Outcome, Section};
use crate::collection::Collection;
use crate::engine::Engine;
use crate::errors::DbError;
use crate::fixtures::seed_collection;
use crate::query::{self, FindOptions, parse_filter_json, parse_projection, parse_sort};
use crate::utils::json::parse_json_to_bson_document;
use std::io::Write;
use std::sync::Arc;

use super::command::{Command, Settings};
use super::util::write_documents;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Plain,
    Json,
}

/// Runs `cmd` with default settings: the built-in sample books in `books`.
///
/// # Errors
/// Returns an error if the command fails or output cannot be written.
pub fn run<W: Write>(engine: &Engine, cmd: Command, out: &mut W) -> Result<(), Box<dyn std::error::Error>> {
    run_with(engine, &Settings::default(), cmd, out)
}

/// Drops and re-seeds the working collection.
fn fresh_collection(engine: &Engine, settings: &Settings) -> Arc<Collection> {
    engine.delete_collection(&settings.collection);
    let col = engine.get_or_create_collection(&settings.collection);
    seed_collection(&col, settings.fixtures.iter().cloned());
    col
}

/// The working collection, seeded on first use.
fn seeded_collection(engine: &Engine, settings: &Settings) -> Arc<Collection> {
    let col = engine.get_or_create_collection(&settings.collection);
    if col.is_empty() {
        seed_collection(&col, settings.fixtures.iter().cloned());
    }
    col
}

fn write_outcome<W: Write>(
    out: &mut W,
    outcome: &Outcome,
    mode: OutputMode,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Outcome::Documents(docs) = outcome {
        write_documents(out, docs, mode)?;
        return Ok(());
    }
    let json = outcome.to_json()?;
    match mode {
        OutputMode::Json => writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?,
        OutputMode::Plain | OutputMode::Human => writeln!(out, "{json}")?,
    }
    Ok(())
}

/// # Errors
/// Returns an error if the command fails or output cannot be written.
pub fn run_with<W: Write>(
    engine: &Engine,
    settings: &Settings,
    cmd: Command,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error>> {
    let mode = settings.mode;
    match cmd {
        Command::List => {
            let entries = catalog::catalog();
            match mode {
                OutputMode::Json => {
                    let list: Vec<serde_json::Value> = entries
                        .iter()
                        .map(|e| {
                            serde_json::json!({
                                "name": e.name,
                                "section": e.section,
                                "kind": e.statement.kind(),
                                "description": e.description,
                            })
                        })
                        .collect();
                    writeln!(out, "{}", serde_json::to_string_pretty(&list)?)?;
                }
                OutputMode::Plain => {
                    for e in entries {
                        writeln!(out, "{}\t{}", e.name, e.statement.kind())?;
                    }
                }
                OutputMode::Human => {
                    let mut current: Option<Section> = None;
                    for e in entries {
                        if current != Some(e.section) {
                            writeln!(out, "# {}", e.section)?;
                            current = Some(e.section);
                        }
                        writeln!(out, "  {:<24} {}", e.name, e.description)?;
                    }
                }
            }
            Ok(())
        }
        Command::Show { name } => {
            let entry = catalog::find_entry(&name).ok_or(DbError::NoSuchStatement(name))?;
            let shell = entry.statement.to_shell(&settings.collection);
            match mode {
                OutputMode::Json => {
                    let json = serde_json::json!({"name": entry.name, "shell": shell});
                    writeln!(out, "{json}")?;
                }
                OutputMode::Plain => writeln!(out, "{shell}")?,
                OutputMode::Human => writeln!(out, "// {}\n{shell}", entry.description)?,
            }
            Ok(())
        }
        Command::Run { name } => {
            let entry = catalog::find_entry(&name).ok_or(DbError::NoSuchStatement(name))?;
            let col = fresh_collection(engine, settings);
            let outcome = entry.statement.run(&col)?;
            write_outcome(out, &outcome, mode)
        }
        Command::RunAll => {
            let mut results = Vec::new();
            for entry in catalog::catalog() {
                let col = fresh_collection(engine, settings);
                let outcome = entry.statement.run(&col)?;
                match mode {
                    OutputMode::Json => {
                        results.push(serde_json::json!({"name": entry.name, "result": outcome.to_json()?}));
                    }
                    OutputMode::Plain | OutputMode::Human => {
                        writeln!(out, "== {} ==", entry.name)?;
                        write_outcome(out, &outcome, mode)?;
                    }
                }
            }
            if mode == OutputMode::Json {
                writeln!(out, "{}", serde_json::to_string_pretty(&results)?)?;
            }
            Ok(())
        }
        Command::Find { filter_json, project, sort, skip, limit } => {
            let col = seeded_collection(engine, settings);
            let filter = parse_filter_json(&filter_json)?;
            let projection = match project {
                Some(p) => parse_projection(&parse_json_to_bson_document(&p)?)?,
                None => None,
            };
            let sort = match sort {
                Some(s) => Some(parse_sort(&parse_json_to_bson_document(&s)?)?),
                None => None,
            };
            let opts = FindOptions { projection, sort, skip, limit };
            let docs = query::find_docs(&col, &filter, &opts).into_bson();
            write_documents(out, &docs, mode)?;
            Ok(())
        }
        Command::Aggregate { pipeline_json } => {
            let col = seeded_collection(engine, settings);
            let pipeline = parse_pipeline_json(&pipeline_json)?;
            let docs = aggregate(&col, &pipeline)?;
            write_documents(out, &docs, mode)?;
            Ok(())
        }
        Command::Page { page } => {
            if page == 0 {
                return Err(DbError::query("page numbers start at 1").into());
            }
            let col = seeded_collection(engine, settings);
            let opts = FindOptions {
                skip: Some((page - 1).saturating_mul(settings.page_size)),
                limit: Some(settings.page_size),
                ..FindOptions::default()
            };
            let docs = query::find_docs(&col, &query::Filter::True, &opts).into_bson();
            write_documents(out, &docs, mode)?;
            Ok(())
        }
    }
}
