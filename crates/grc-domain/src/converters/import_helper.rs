//! Reading CSV files into lines and splitting them into object blocks.

use grc_core::{GrcError, GrcResult};

/// First cell of the line that opens a block.
pub const BLOCK_MARKER: &str = "Object type";

/// A block as `(offset, lines, csv_lines)`: `offset` is the 0-based index of the
/// marker line and `csv_lines` holds the 1-based file line of each kept line.
pub type DataBlock = (usize, Vec<Vec<String>>, Vec<usize>);

/// Parses CSV text into lines of cells. Index `i` of the result is file line
/// `i + 1`; lines swallowed by multi-line cells or skipped by the reader come
/// back as empty lines.
pub fn read_csv_data(content: &str) -> GrcResult<Vec<Vec<String>>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut lines: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| GrcError::Serialization(format!("Invalid CSV: {}", e)))?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(lines.len() + 1);
        while lines.len() + 1 < line {
            lines.push(Vec::new());
        }
        lines.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(lines)
}

fn is_empty_line(line: &[String]) -> bool {
    line.iter().all(|cell| cell.trim().is_empty())
}

fn is_block_start(line: &[String]) -> bool {
    line.first()
        .map(|cell| cell.trim().eq_ignore_ascii_case(BLOCK_MARKER))
        .unwrap_or(false)
}

/// Splits lines into blocks, each starting at an `Object type` line.
///
/// Empty lines are dropped, lines before the first block are ignored and blocks
/// without an object type line are skipped.
pub fn split_blocks(csv_data: &[Vec<String>]) -> Vec<DataBlock> {
    let mut blocks: Vec<DataBlock> = Vec::new();
    let mut current: Option<DataBlock> = None;

    for (index, line) in csv_data.iter().enumerate() {
        if is_block_start(line) {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            current = Some((index, Vec::new(), Vec::new()));
        }
        if is_empty_line(line) {
            continue;
        }
        if let Some((_, data, csv_lines)) = current.as_mut() {
            data.push(line.clone());
            csv_lines.push(index + 1);
        }
    }
    if let Some(block) = current {
        blocks.push(block);
    }

    blocks.retain(|(_, data, _)| data.len() >= 2);
    blocks
}

/// Drops the `Object type` line and the leading cell of every remaining line.
///
/// Returns `(raw_headers, rows)`.
pub fn extract_relevant_data(data: &[Vec<String>]) -> (Vec<String>, Vec<Vec<String>>) {
    let tail = |line: &Vec<String>| line.iter().skip(1).cloned().collect::<Vec<String>>();
    let raw_headers = data.get(1).map(tail).unwrap_or_default();
    let rows = data.iter().skip(2).map(tail).collect();
    (raw_headers, rows)
}

/// Accumulates lines padded to a fixed width and renders them as CSV.
pub struct CsvStringBuilder {
    table_width: usize,
    lines: Vec<Vec<String>>,
}

impl CsvStringBuilder {
    pub fn new(table_width: usize) -> Self {
        Self {
            table_width,
            lines: Vec::new(),
        }
    }

    pub fn append_line(&mut self, mut line: Vec<String>) {
        if line.len() < self.table_width {
            line.resize(self.table_width, String::new());
        }
        self.lines.push(line);
    }

    pub fn get_csv_string(&self) -> GrcResult<String> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for line in &self.lines {
            writer
                .write_record(line)
                .map_err(|e| GrcError::Serialization(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| GrcError::Serialization(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| GrcError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_read_keeps_file_line_numbers() {
        let content = "Object type,,\nPerson,Email*,Name\n,\"a@example.com\",\"Ann\nMarie\"\n,b@example.com,Bob\n";
        let lines = read_csv_data(content).unwrap();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[2], line(&["", "a@example.com", "Ann\nMarie"]));
        assert!(lines[3].is_empty());
        assert_eq!(lines[4], line(&["", "b@example.com", "Bob"]));
    }

    #[test]
    fn test_read_strips_bom() {
        let lines = read_csv_data("\u{feff}Object type,\nLabel,Title*\n").unwrap();
        assert_eq!(lines[0][0], "Object type");
    }

    #[test]
    fn test_split_blocks() {
        let data = vec![
            line(&["garbage", ""]),
            line(&["Object type", ""]),
            line(&["Person", "Email*"]),
            line(&["", "a@example.com"]),
            line(&["", ""]),
            line(&["", ""]),
            line(&["object type", ""]),
            line(&["Label", "Title*"]),
            line(&["", ""]),
            line(&["Object type", ""]),
        ];
        let blocks = split_blocks(&data);

        assert_eq!(blocks.len(), 2);
        let (offset, lines, csv_lines) = &blocks[0];
        assert_eq!(*offset, 1);
        assert_eq!(lines.len(), 3);
        assert_eq!(csv_lines, &vec![2, 3, 4]);

        let (offset, lines, csv_lines) = &blocks[1];
        assert_eq!(*offset, 6);
        assert_eq!(lines.len(), 2);
        assert_eq!(csv_lines, &vec![7, 8]);
    }

    #[test]
    fn test_extract_relevant_data() {
        let data = vec![
            line(&["Object type", "", ""]),
            line(&["Person", "Email*", "Name"]),
            line(&["", "a@example.com", "Ann"]),
        ];
        let (headers, rows) = extract_relevant_data(&data);
        assert_eq!(headers, line(&["Email*", "Name"]));
        assert_eq!(rows, vec![line(&["a@example.com", "Ann"])]);
    }

    #[test]
    fn test_csv_string_builder_pads_lines() {
        let mut builder = CsvStringBuilder::new(3);
        builder.append_line(line(&["Object type", "Title"]));
        builder.append_line(line(&["", "Needs, quoting"]));
        builder.append_line(Vec::new());
        assert_eq!(
            builder.get_csv_string().unwrap(),
            "Object type,Title,\n,\"Needs, quoting\",\n,,\n"
        );
    }
}
