//! CSV import and export.
//!
//! A file holds one block per object type. Each block starts with an
//! `Object type` line of column descriptions, followed by the object type name
//! with the column names and then one line per object.

pub mod base;
pub mod base_block;
pub mod exportables;
pub mod hooks;
pub mod import_helper;
pub mod models;
pub mod records;

pub use base::{ExportConverter, ImportConverter, PRIORITY_COLUMNS};
pub use base_block::{ExportBlockConverter, ImportBlockConverter};
pub use exportables::{get_exportables, ColumnDefinition, ObjectType};
pub use hooks::{ImportHooks, LoggingImportHooks};
pub use import_helper::{extract_relevant_data, read_csv_data, split_blocks, CsvStringBuilder};
pub use models::{BlockInfo, ExportQuery, FieldSelection, ImportJob, MailData, ObjectRef};
