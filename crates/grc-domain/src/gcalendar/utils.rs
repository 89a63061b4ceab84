use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::calendar_event::CalendarEvent;
use crate::dataset::Dataset;
use crate::person::PersonId;
use crate::relationship::Relationship;

pub type RelatedMapping = BTreeMap<i64, BTreeSet<i64>>;

/// Builds `left_id -> {right_id}` and `right_id -> {left_id}` maps from every
/// relationship linking the two types, whichever side is the source.
pub fn get_related_mapping(
    data: &Dataset,
    left_type: &str,
    right_type: &str,
) -> (RelatedMapping, RelatedMapping) {
    let mut left_mapping = RelatedMapping::new();
    let mut right_mapping = RelatedMapping::new();
    for relationship in &data.relationships {
        if let Some((left_id, right_id)) = relationship.ids_for(left_type, right_type) {
            left_mapping.entry(left_id).or_default().insert(right_id);
            right_mapping.entry(right_id).or_default().insert(left_id);
        }
    }
    (left_mapping, right_mapping)
}

pub fn get_event_by_date_and_attendee(
    data: &Dataset,
    attendee_id: PersonId,
    due_date: NaiveDate,
) -> Option<&CalendarEvent> {
    data.calendar_events
        .iter()
        .find(|event| event.attendee_id == attendee_id && event.due_date == due_date)
}

pub fn get_relationship<'a>(
    data: &'a Dataset,
    left_id: i64,
    left_model_name: &str,
    right_id: i64,
    right_model_name: &str,
) -> Option<&'a Relationship> {
    data.get_relationship(left_model_name, left_id, right_model_name, right_id)
}

/// Link to the task dashboard filtered to tasks due on `due_date` (`MM/DD/YYYY`).
pub fn get_active_cycle_tasks_url(url_root: &str, due_date: &str) -> String {
    let root = if url_root.ends_with('/') {
        url_root.to_string()
    } else {
        format!("{}/", url_root)
    };
    format!(
        "{}dashboard#!task&query=%22task%20due%20date%22%3D{}",
        root,
        due_date.replace('/', "%2F")
    )
}
