use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::WorkflowId;

pub type CycleId = i64;

/// One run of a workflow. Tasks of a cycle that is no longer current live in
/// the workflow history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,
    pub slug: String,
    pub title: String,
    pub workflow_id: WorkflowId,
    pub is_current: bool,
    pub is_verification_needed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cycle {
    pub const TYPE_NAME: &'static str = "Cycle";
    pub const SLUG_PREFIX: &'static str = "CYCLE";

    pub fn new(id: CycleId, workflow_id: WorkflowId, title: String, is_verification_needed: bool) -> Self {
        let now = Utc::now();
        Self {
            id,
            slug: format!("{}-{}", Self::SLUG_PREFIX, id),
            title,
            workflow_id,
            is_current: true,
            is_verification_needed,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn end(&mut self) {
        self.is_current = false;
        self.updated_at = Utc::now();
    }
}
