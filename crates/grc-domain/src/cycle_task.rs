use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cycle::{Cycle, CycleId};
use crate::field_update::FieldUpdate;
use crate::person::PersonId;
use crate::workflow::Workflow;

pub type CycleTaskId = i64;

pub const TASK_ASSIGNEES: &str = "Task Assignees";
pub const TASK_SECONDARY_ASSIGNEES: &str = "Task Secondary Assignees";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Assigned,
    #[serde(rename = "In Progress")]
    InProgress,
    Finished,
    Declined,
    Verified,
    Deprecated,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Assigned,
        TaskStatus::InProgress,
        TaskStatus::Finished,
        TaskStatus::Declined,
        TaskStatus::Verified,
        TaskStatus::Deprecated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Assigned => "Assigned",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Finished => "Finished",
            TaskStatus::Declined => "Declined",
            TaskStatus::Verified => "Verified",
            TaskStatus::Deprecated => "Deprecated",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        TaskStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().replace(' ', "").to_ascii_lowercase() == normalized)
            .ok_or_else(|| format!("Unknown status '{}'", s.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role_name: String,
    pub person_id: PersonId,
}

/// A workflow task instance due on `end_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleTaskGroupObjectTask {
    pub id: CycleTaskId,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub cycle_id: CycleId,
    pub status: TaskStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: NaiveDate,
    pub finished_date: Option<DateTime<Utc>>,
    pub verified_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub access_control: Vec<RoleAssignment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CycleTaskGroupObjectTask {
    pub const TYPE_NAME: &'static str = "CycleTaskGroupObjectTask";
    pub const SLUG_PREFIX: &'static str = "CYCLETASK";

    pub fn new(id: CycleTaskId, cycle_id: CycleId, title: String, end_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id,
            slug: format!("{}-{}", Self::SLUG_PREFIX, id),
            title,
            description: None,
            cycle_id,
            status: TaskStatus::Assigned,
            start_date: None,
            end_date,
            finished_date: None,
            verified_date: None,
            access_control: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get_person_ids_for_rolename(&self, role_name: &str) -> Vec<PersonId> {
        self.access_control
            .iter()
            .filter(|assignment| assignment.role_name.eq_ignore_ascii_case(role_name))
            .map(|assignment| assignment.person_id)
            .collect()
    }

    pub fn add_person_to_role(&mut self, role_name: &str, person_id: PersonId) {
        let exists = self.access_control.iter().any(|assignment| {
            assignment.person_id == person_id && assignment.role_name.eq_ignore_ascii_case(role_name)
        });
        if !exists {
            self.access_control.push(RoleAssignment {
                role_name: role_name.to_string(),
                person_id,
            });
            self.updated_at = Utc::now();
        }
    }

    /// Replaces everyone holding `role_name` with `person_ids`.
    pub fn set_people_for_role(&mut self, role_name: &str, person_ids: &[PersonId]) {
        self.access_control
            .retain(|assignment| !assignment.role_name.eq_ignore_ascii_case(role_name));
        for person_id in person_ids {
            self.add_person_to_role(role_name, *person_id);
        }
        self.updated_at = Utc::now();
    }

    pub fn remove_person(&mut self, person_id: PersonId) {
        self.access_control
            .retain(|assignment| assignment.person_id != person_id);
    }

    pub fn update_status(&mut self, status: TaskStatus) {
        let now = Utc::now();
        match status {
            TaskStatus::Finished => self.finished_date = Some(now),
            TaskStatus::Verified => {
                if self.finished_date.is_none() {
                    self.finished_date = Some(now);
                }
                self.verified_date = Some(now);
            }
            TaskStatus::Assigned | TaskStatus::InProgress | TaskStatus::Declined => {
                self.finished_date = None;
                self.verified_date = None;
            }
            TaskStatus::Deprecated => {}
        }
        self.status = status;
        self.updated_at = now;
    }

    pub fn update(&mut self, updates: CycleTaskUpdate) {
        if let Some(title) = updates.title {
            self.title = title;
        }
        updates.description.apply_to(&mut self.description);
        updates.start_date.apply_to(&mut self.start_date);
        if let Some(end_date) = updates.end_date {
            self.end_date = end_date;
        }
        if let Some(status) = updates.status {
            self.update_status(status);
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update for a cycle task
#[derive(Debug, Clone, Default)]
pub struct CycleTaskUpdate {
    pub title: Option<String>,
    pub description: FieldUpdate<String>,
    pub status: Option<TaskStatus>,
    pub start_date: FieldUpdate<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// A cycle task together with the cycle and workflow it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct CycleTaskView<'a> {
    pub task: &'a CycleTaskGroupObjectTask,
    pub cycle: &'a Cycle,
    pub workflow: &'a Workflow,
}

impl<'a> CycleTaskView<'a> {
    pub fn is_verification_needed(&self) -> bool {
        self.cycle.is_verification_needed
    }

    /// Tasks of an ended cycle are shown on the workflow's history tab.
    pub fn is_in_history(&self) -> bool {
        !self.cycle.is_current
    }

    pub fn is_done(&self) -> bool {
        match self.task.status {
            TaskStatus::Verified => true,
            TaskStatus::Finished => !self.is_verification_needed(),
            _ => false,
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.task.end_date < today && !self.is_done()
    }

    pub fn workflow_archived(&self) -> bool {
        self.workflow.workflow_archived()
    }
}
