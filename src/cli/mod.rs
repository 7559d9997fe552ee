//! Programmatic command surface shared by the `bookquery` binary and tests.

mod command;
mod runner;
mod util;

pub use command::{Command, Settings};
pub use runner::{OutputMode, run, run_with};
