//! Utility modules: dev bench lines, JSON/BSON conversion, logger, numeric helpers.
pub mod devlog;
pub mod json;
pub mod logger;
pub mod num;
// errors are exposed at crate root via #[path] to a file in this folder.
