use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::person::PersonId;

pub type CalendarEventId = i64;

/// Notification for one attendee about everything due on `due_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: CalendarEventId,
    pub external_event_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub attendee_id: PersonId,
    pub modified_by_id: Option<PersonId>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    pub const TYPE_NAME: &'static str = "CalendarEvent";

    pub fn new(id: CalendarEventId, title: String, due_date: NaiveDate, attendee_id: PersonId) -> Self {
        let now = Utc::now();
        Self {
            id,
            external_event_id: None,
            title,
            description: None,
            due_date,
            attendee_id,
            modified_by_id: None,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true when the description actually changed.
    pub fn update_description(&mut self, description: String) -> bool {
        if self.description.as_deref() == Some(description.as_str()) {
            return false;
        }
        self.description = Some(description);
        self.updated_at = Utc::now();
        true
    }
}
