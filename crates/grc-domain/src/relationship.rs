use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type RelationshipId = i64;

/// Generic link between two objects identified by type name and id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub source_type: String,
    pub source_id: i64,
    pub destination_type: String,
    pub destination_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Relationship {
    pub fn new(
        id: RelationshipId,
        source_type: &str,
        source_id: i64,
        destination_type: &str,
        destination_id: i64,
    ) -> Self {
        Self {
            id,
            source_type: source_type.to_string(),
            source_id,
            destination_type: destination_type.to_string(),
            destination_id,
            created_at: Utc::now(),
        }
    }

    /// Matches the pair regardless of which side is the source.
    pub fn connects(&self, left_type: &str, left_id: i64, right_type: &str, right_id: i64) -> bool {
        let forward = self.source_type == left_type
            && self.source_id == left_id
            && self.destination_type == right_type
            && self.destination_id == right_id;
        let backward = self.source_type == right_type
            && self.source_id == right_id
            && self.destination_type == left_type
            && self.destination_id == left_id;
        forward || backward
    }

    pub fn involves(&self, object_type: &str, id: i64) -> bool {
        (self.source_type == object_type && self.source_id == id)
            || (self.destination_type == object_type && self.destination_id == id)
    }

    /// The `(left_id, right_id)` pair when this relationship links the two types.
    pub fn ids_for(&self, left_type: &str, right_type: &str) -> Option<(i64, i64)> {
        if self.source_type == left_type && self.destination_type == right_type {
            Some((self.source_id, self.destination_id))
        } else if self.source_type == right_type && self.destination_type == left_type {
            Some((self.destination_id, self.source_id))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connects_either_direction() {
        let rel = Relationship::new(1, "CycleTaskGroupObjectTask", 5, "CalendarEvent", 9);
        assert!(rel.connects("CycleTaskGroupObjectTask", 5, "CalendarEvent", 9));
        assert!(rel.connects("CalendarEvent", 9, "CycleTaskGroupObjectTask", 5));
        assert!(!rel.connects("CalendarEvent", 5, "CycleTaskGroupObjectTask", 9));
    }

    #[test]
    fn test_ids_for() {
        let rel = Relationship::new(1, "CalendarEvent", 9, "CycleTaskGroupObjectTask", 5);
        assert_eq!(
            rel.ids_for("CycleTaskGroupObjectTask", "CalendarEvent"),
            Some((5, 9))
        );
        assert_eq!(rel.ids_for("Person", "CalendarEvent"), None);
    }
}
