//! Data passed into and returned from the converters.

use serde::{Deserialize, Serialize};

/// The import job a CSV file belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportJob {
    /// File name shown to the user.
    pub title: String,
    #[serde(default)]
    pub user_email: Option<String>,
}

impl ImportJob {
    pub fn new(title: impl Into<String>, user_email: Option<String>) -> Self {
        Self {
            title: title.into(),
            user_email,
        }
    }
}

/// Reference to an object changed by an import.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_type: String,
    pub id: i64,
}

impl ObjectRef {
    pub fn new(object_type: &str, id: i64) -> Self {
        Self {
            object_type: object_type.to_string(),
            id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailData {
    pub filename: String,
    pub user_email: String,
}

/// Outcome of one block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub name: String,
    pub rows: usize,
    pub created: usize,
    pub updated: usize,
    pub ignored: usize,
    pub deleted: usize,
    pub block_errors: Vec<String>,
    pub block_warnings: Vec<String>,
    pub row_errors: Vec<String>,
    pub row_warnings: Vec<String>,
}

/// Which columns an export block contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFields", into = "RawFields")]
pub enum FieldSelection {
    #[default]
    All,
    Keys(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawFields {
    Keyword(String),
    Keys(Vec<String>),
}

impl TryFrom<RawFields> for FieldSelection {
    type Error = String;

    fn try_from(raw: RawFields) -> Result<Self, Self::Error> {
        match raw {
            RawFields::Keyword(word) if word.eq_ignore_ascii_case("all") => Ok(FieldSelection::All),
            RawFields::Keyword(word) => Err(format!("expected \"all\" or a list of fields, got \"{}\"", word)),
            RawFields::Keys(keys) => Ok(FieldSelection::Keys(keys)),
        }
    }
}

impl From<FieldSelection> for RawFields {
    fn from(fields: FieldSelection) -> Self {
        match fields {
            FieldSelection::All => RawFields::Keyword("all".to_string()),
            FieldSelection::Keys(keys) => RawFields::Keys(keys),
        }
    }
}

/// Objects of one type to export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportQuery {
    pub object_name: String,
    #[serde(default)]
    pub ids: Vec<i64>,
    #[serde(default)]
    pub fields: FieldSelection,
}

impl ExportQuery {
    pub fn new(object_name: impl Into<String>, ids: Vec<i64>) -> Self {
        Self {
            object_name: object_name.into(),
            ids,
            fields: FieldSelection::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_query_fields_parse() {
        let queries: Vec<ExportQuery> = serde_json::from_str(
            r#"[
                {"object_name": "Person", "ids": [1, 2]},
                {"object_name": "Label", "ids": [3], "fields": "all"},
                {"object_name": "Workflow", "ids": [], "fields": ["title", "unit"]}
            ]"#,
        )
        .unwrap();

        assert_eq!(queries[0].fields, FieldSelection::All);
        assert_eq!(queries[1].fields, FieldSelection::All);
        assert_eq!(
            queries[2].fields,
            FieldSelection::Keys(vec!["title".into(), "unit".into()])
        );
    }

    #[test]
    fn test_unknown_field_keyword_rejected() {
        let result: Result<ExportQuery, _> =
            serde_json::from_str(r#"{"object_name": "Person", "fields": "some"}"#);
        assert!(result.is_err());
    }
}
