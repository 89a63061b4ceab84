use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ContextId;
use crate::person::PersonId;

pub type LabelId = i64;

pub const MAX_TITLE_LENGTH: usize = 250;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub title: String,
    pub context_id: Option<ContextId>,
    pub modified_by_id: Option<PersonId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Label {
    pub const TYPE_NAME: &'static str = "Label";

    pub fn new(id: LabelId, title: String, context_id: Option<ContextId>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            context_id,
            modified_by_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate_title(title: &str) -> Result<(), String> {
        let title = title.trim();
        if title.is_empty() {
            return Err("Label title must not be empty".to_string());
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(format!(
                "Label title is longer than {} characters",
                MAX_TITLE_LENGTH
            ));
        }
        Ok(())
    }
}
