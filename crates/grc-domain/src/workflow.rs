use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type WorkflowId = i64;

/// Repeat unit of a recurring workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Day,
    Week,
    Month,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Day => "day",
            Unit::Week => "week",
            Unit::Month => "month",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Unit::Day),
            "week" | "weekly" => Ok(Unit::Week),
            "month" | "monthly" => Ok(Unit::Month),
            other => Err(format!("Unknown unit '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub unit: Option<Unit>,
    pub repeat_every: Option<u32>,
    pub recurrences: bool,
    pub next_cycle_start_date: Option<NaiveDate>,
    pub is_verification_needed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    pub const TYPE_NAME: &'static str = "Workflow";
    pub const SLUG_PREFIX: &'static str = "WORKFLOW";

    pub fn new(id: WorkflowId, title: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            slug: Self::slug_for(id),
            title,
            description: None,
            unit: None,
            repeat_every: None,
            recurrences: false,
            next_cycle_start_date: None,
            is_verification_needed: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn slug_for(number: i64) -> String {
        format!("{}-{}", Self::SLUG_PREFIX, number)
    }

    /// A repeating workflow whose recurrence was switched off while a next
    /// cycle was still scheduled.
    pub fn workflow_archived(&self) -> bool {
        self.unit.is_some() && !self.recurrences && self.next_cycle_start_date.is_some()
    }

    pub fn set_schedule(&mut self, unit: Unit, repeat_every: u32, next_cycle_start_date: NaiveDate) {
        self.unit = Some(unit);
        self.repeat_every = Some(repeat_every);
        self.next_cycle_start_date = Some(next_cycle_start_date);
        self.recurrences = true;
        self.updated_at = Utc::now();
    }

    pub fn archive(&mut self) {
        self.recurrences = false;
        self.updated_at = Utc::now();
    }
}
