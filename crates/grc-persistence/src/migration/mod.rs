//! Revision-chain schema migrations for the SQLite store.

pub mod revisions;
pub mod schema_migrator;

pub use revisions::{history, heads, Revision, REVISIONS};
pub use schema_migrator::{SchemaMigrator, BASE, HEAD};
