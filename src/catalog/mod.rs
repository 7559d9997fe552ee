//! The assignment's statements over the `books` collection, as runnable values.

mod entries;
mod shell;
mod statement;

pub use entries::{CatalogEntry, Section, catalog, find_entry, section};
pub use shell::{render_document, render_value};
pub use statement::{Outcome, Statement};
