//! Block converters: one block of a CSV file, holding objects of one type.

use std::collections::{BTreeSet, HashMap};

use super::exportables::{ColumnDefinition, ObjectType, DELETE_KEY};
use super::models::{BlockInfo, FieldSelection, ObjectRef};
use super::records::{parse_bool, Record};
use crate::dataset::Dataset;

enum RowOutcome {
    Created(ObjectRef),
    Updated(ObjectRef),
    Deleted(ObjectRef),
    Unchanged,
    Ignored,
}

pub struct ImportBlockConverter {
    pub object_type: Option<ObjectType>,
    pub class_name: String,
    pub offset: usize,
    pub ignore: bool,
    pub revision_ids: Vec<ObjectRef>,
    raw_headers: Vec<String>,
    rows: Vec<Vec<String>>,
    csv_lines: Vec<usize>,
    /// Accepted columns as `(cell index, column)`, in header order.
    headers: Vec<(usize, &'static ColumnDefinition)>,
    info: BlockInfo,
}

impl ImportBlockConverter {
    pub fn new(
        object_type: Option<ObjectType>,
        class_name: String,
        raw_headers: Vec<String>,
        rows: Vec<Vec<String>>,
        offset: usize,
        csv_lines: Vec<usize>,
    ) -> Self {
        let name = object_type
            .map(|t| t.name().to_string())
            .unwrap_or_else(|| class_name.clone());
        Self {
            object_type,
            class_name,
            offset,
            ignore: false,
            revision_ids: Vec::new(),
            raw_headers,
            rows,
            csv_lines,
            headers: Vec::new(),
            info: BlockInfo {
                name,
                ..Default::default()
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// File line of the object type name, where block messages point.
    fn header_line(&self) -> usize {
        self.offset + 2
    }

    fn row_line(&self, row_index: usize) -> usize {
        self.csv_lines
            .get(row_index)
            .copied()
            .unwrap_or(self.offset + 3 + row_index)
    }

    /// Validates the object type and the header line, marking the block ignored
    /// on any block error.
    pub fn check_block_restrictions(&mut self) {
        let line = self.header_line();
        let Some(object_type) = self.object_type else {
            self.info.block_errors.push(format!(
                "Line {}: Unknown object type '{}'. The block will be ignored.",
                line, self.class_name
            ));
            self.ignore = true;
            return;
        };

        let mut seen = BTreeSet::new();
        for (index, raw) in self.raw_headers.iter().enumerate() {
            let header = raw.trim();
            if header.is_empty() {
                continue;
            }
            match object_type.column_for_header(header) {
                None => self.info.block_warnings.push(format!(
                    "Line {}: Attribute '{}' does not exist. Column will be ignored.",
                    line, header
                )),
                Some(column) if !seen.insert(column.key) => {
                    self.info.block_errors.push(format!(
                        "Line {}: Duplicate column name '{}'. The block will be ignored.",
                        line, header
                    ));
                    self.ignore = true;
                }
                Some(column) => self.headers.push((index, column)),
            }
        }

        let missing: Vec<&str> = object_type
            .columns()
            .iter()
            .filter(|c| c.mandatory && !seen.contains(c.key))
            .map(|c| c.display_name)
            .collect();
        if !missing.is_empty() {
            self.info.block_errors.push(format!(
                "Line {}: Missing mandatory column {}, when adding object. The block will be ignored.",
                line,
                missing.join(", ")
            ));
            self.ignore = true;
        }

        if self.ignore {
            tracing::warn!(block = %self.info.name, line, "Block ignored");
        }
    }

    /// Priority columns first, then the rest in header order.
    fn ordered_columns(&self, priority_columns: &[&str]) -> Vec<(usize, &'static ColumnDefinition)> {
        let mut ordered: Vec<(usize, &'static ColumnDefinition)> = priority_columns
            .iter()
            .filter_map(|key| self.headers.iter().find(|(_, c)| c.key == *key).copied())
            .collect();
        for header in &self.headers {
            if !priority_columns.contains(&header.1.key) {
                ordered.push(*header);
            }
        }
        ordered
    }

    /// Applies every row to `data`. Changed objects are collected into
    /// `revision_ids` when `collect_revisions` is set. `seen_keys` maps key
    /// values already used in this import to their file line.
    pub fn import_csv_data(
        &mut self,
        data: &mut Dataset,
        priority_columns: &[&str],
        collect_revisions: bool,
        seen_keys: &mut HashMap<String, usize>,
    ) {
        let Some(object_type) = self.object_type else {
            return;
        };
        if self.ignore {
            return;
        }

        let columns = self.ordered_columns(priority_columns);
        let rows = std::mem::take(&mut self.rows);

        for (row_index, row) in rows.iter().enumerate() {
            let line = self.row_line(row_index);
            self.info.rows += 1;
            let outcome = self.import_row(data, object_type, &columns, row, line, seen_keys);
            let changed = match outcome {
                RowOutcome::Created(object) => {
                    self.info.created += 1;
                    Some(object)
                }
                RowOutcome::Updated(object) => {
                    self.info.updated += 1;
                    Some(object)
                }
                RowOutcome::Deleted(object) => {
                    self.info.deleted += 1;
                    Some(object)
                }
                RowOutcome::Unchanged => None,
                RowOutcome::Ignored => {
                    self.info.ignored += 1;
                    None
                }
            };
            if let (Some(object), true) = (changed, collect_revisions) {
                self.revision_ids.push(object);
            }
        }
        self.rows = rows;

        tracing::debug!(
            block = %self.info.name,
            rows = self.info.rows,
            created = self.info.created,
            updated = self.info.updated,
            deleted = self.info.deleted,
            ignored = self.info.ignored,
            "Block imported"
        );
    }

    fn import_row(
        &mut self,
        data: &mut Dataset,
        object_type: ObjectType,
        columns: &[(usize, &'static ColumnDefinition)],
        row: &[String],
        line: usize,
        seen_keys: &mut HashMap<String, usize>,
    ) -> RowOutcome {
        let cell = |index: usize| row.get(index).map(|v| v.trim()).unwrap_or("");

        for (index, column) in columns {
            if column.mandatory && cell(*index).is_empty() {
                self.info.row_errors.push(format!(
                    "Line {}: Field '{}' is required. The line will be ignored.",
                    line, column.display_name
                ));
                return RowOutcome::Ignored;
            }
        }

        let key_column = object_type.key_column();
        let key_value = columns
            .iter()
            .find(|(_, c)| c.key == key_column.key)
            .map(|(index, _)| cell(*index))
            .unwrap_or("");

        if !key_value.is_empty() {
            let normalized = key_value.to_lowercase();
            if let Some(previous) = seen_keys.get(&normalized) {
                self.info.row_errors.push(format!(
                    "Line {}: Field '{}' has the same value '{}' as line {}. The line will be ignored.",
                    line, key_column.display_name, key_value, previous
                ));
                return RowOutcome::Ignored;
            }
            seen_keys.insert(normalized, line);
        }

        let existing = if key_value.is_empty() {
            None
        } else {
            Record::find(data, object_type, key_value)
        };

        let delete_cell = columns
            .iter()
            .find(|(_, c)| c.key == DELETE_KEY)
            .map(|(index, _)| cell(*index))
            .unwrap_or("");
        if !delete_cell.is_empty() {
            match parse_bool(delete_cell) {
                Ok(true) => return self.delete_row(data, object_type, existing, line),
                Ok(false) => {}
                Err(message) => self.info.row_warnings.push(format!(
                    "Line {}: Field 'Delete' has invalid value. {}. The value will be ignored.",
                    line, message
                )),
            }
        }

        let is_new = existing.is_none();
        let mut record = match existing {
            Some(record) => record,
            None => match Record::create(data, object_type, key_value) {
                Some(record) => record,
                None => {
                    self.info.row_errors.push(format!(
                        "Line {}: {} '{}' does not exist and cannot be created by import. The line will be ignored.",
                        line,
                        object_type.name(),
                        key_value
                    ));
                    return RowOutcome::Ignored;
                }
            },
        };

        let mut changed = false;
        for (index, column) in columns {
            let value = cell(*index);
            if value.is_empty() || column.key == key_column.key || column.key == DELETE_KEY || column.read_only {
                continue;
            }
            match record.set_value(data, column.key, value) {
                Ok(updated) => changed |= updated,
                Err(message) => self.info.row_warnings.push(format!(
                    "Line {}: Field '{}' has invalid value. {}. The value will be ignored.",
                    line, column.display_name, message
                )),
            }
        }

        if let Err(message) = record.validate() {
            self.info.row_errors.push(format!(
                "Line {}: {}. The line will be ignored.",
                line, message
            ));
            return RowOutcome::Ignored;
        }

        let object = ObjectRef::new(object_type.name(), record.id());
        if is_new {
            if key_value.is_empty() {
                let generated = record.get_value(data, key_column.key);
                seen_keys.insert(generated.to_lowercase(), line);
            }
            record.store(data);
            RowOutcome::Created(object)
        } else if changed {
            record.store(data);
            RowOutcome::Updated(object)
        } else {
            RowOutcome::Unchanged
        }
    }

    fn delete_row(
        &mut self,
        data: &mut Dataset,
        object_type: ObjectType,
        existing: Option<Record>,
        line: usize,
    ) -> RowOutcome {
        match existing {
            Some(record) if Record::delete(data, object_type, record.id()) => {
                RowOutcome::Deleted(ObjectRef::new(object_type.name(), record.id()))
            }
            _ => {
                self.info.row_warnings.push(format!(
                    "Line {}: Object does not exist, so it cannot be deleted. The line will be ignored.",
                    line
                ));
                RowOutcome::Ignored
            }
        }
    }

    pub fn get_info(&self) -> BlockInfo {
        self.info.clone()
    }
}

/// Writes objects of one type as a CSV block.
pub struct ExportBlockConverter {
    pub object_type: ObjectType,
    pub object_ids: Vec<i64>,
    fields: Vec<&'static ColumnDefinition>,
    rows: usize,
}

impl ExportBlockConverter {
    pub fn new(object_type: ObjectType, fields: &FieldSelection, object_ids: Vec<i64>) -> Self {
        let fields = match fields {
            FieldSelection::All => object_type
                .columns()
                .iter()
                .filter(|c| c.key != DELETE_KEY)
                .collect(),
            FieldSelection::Keys(keys) => {
                let mut selected: Vec<&'static ColumnDefinition> = Vec::new();
                for key in keys {
                    match object_type
                        .column(key.trim())
                        .or_else(|| object_type.column_for_header(key))
                    {
                        Some(column) if !selected.contains(&column) => selected.push(column),
                        Some(_) => {}
                        None => tracing::warn!(
                            object_type = object_type.name(),
                            field = %key,
                            "Unknown export field ignored"
                        ),
                    }
                }
                selected
            }
        };
        Self {
            object_type,
            object_ids,
            fields,
            rows: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.object_type.name()
    }

    pub fn block_width(&self) -> usize {
        self.fields.len()
    }

    /// Description line and display name line, without the leading cell.
    pub fn generate_csv_header(&self) -> [Vec<String>; 2] {
        [
            self.fields.iter().map(|c| c.description.to_string()).collect(),
            self.fields.iter().map(|c| c.header()).collect(),
        ]
    }

    /// One line per requested id, in request order. Missing ids are skipped.
    pub fn generate_row_data(&mut self, data: &Dataset) -> Vec<Vec<String>> {
        let mut lines = Vec::new();
        for id in &self.object_ids {
            match Record::load(data, self.object_type, *id) {
                Some(record) => lines.push(
                    self.fields
                        .iter()
                        .map(|c| record.get_value(data, c.key))
                        .collect(),
                ),
                None => tracing::warn!(object_type = self.name(), id, "Export object not found"),
            }
        }
        self.rows = lines.len();
        lines
    }

    pub fn get_info(&self) -> BlockInfo {
        BlockInfo {
            name: self.name().to_string(),
            rows: self.rows,
            ..Default::default()
        }
    }
}
