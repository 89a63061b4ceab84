//! Storage for the GRC dataset: a JSON file or a migrated SQLite database,
//! both with multi-instance conflict detection.

pub mod conflict;
pub mod migration;
pub mod serialization;
pub mod store;
pub mod traits;

pub use conflict::*;
pub use migration::*;
pub use serialization::*;
pub use store::*;
pub use traits::*;
