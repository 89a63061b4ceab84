//! Calendar notifications for workflow tasks.
//!
//! Builds one calendar event per attendee and due date, links it to every
//! eligible task due that day, and keeps the event description listing
//! those tasks.

pub mod builder;
pub mod utils;

pub use builder::{CalendarBuildSummary, CalendarEventBuilder};
