mod core;
mod types;

pub use self::core::Document;
pub use types::Metadata;
