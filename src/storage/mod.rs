mod document;
mod memory;
mod repository;
mod sqlite;

pub use document::*;
pub use memory::*;
pub use repository::*;
pub use sqlite::*;

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");
