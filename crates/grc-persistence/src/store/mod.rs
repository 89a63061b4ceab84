pub mod atomic_writer;
pub mod json_file_store;
pub mod sqlite_store;

pub use atomic_writer::AtomicWriter;
pub use json_file_store::JsonFileStore;
pub use sqlite_store::SqliteStore;

use std::path::Path;

/// Opens a SQLite store for `.db`/`.sqlite`/`.sqlite3` paths and a JSON store otherwise.
pub fn open_store(path: &Path) -> Box<dyn crate::PersistenceStore> {
    let is_sqlite = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "db" | "sqlite" | "sqlite3"))
        .unwrap_or(false);
    if is_sqlite {
        Box::new(SqliteStore::new(path))
    } else {
        Box::new(JsonFileStore::new(path))
    }
}
