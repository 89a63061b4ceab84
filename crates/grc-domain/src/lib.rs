pub mod calendar_event;
pub mod context;
pub mod converters;
pub mod cycle;
pub mod cycle_task;
pub mod dataset;
pub mod field_update;
pub mod gcalendar;
pub mod label;
pub mod person;
pub mod relationship;
pub mod workflow;

pub use calendar_event::{CalendarEvent, CalendarEventId};
pub use context::{Context, ContextId};
pub use cycle::{Cycle, CycleId};
pub use cycle_task::{
    CycleTaskGroupObjectTask, CycleTaskId, CycleTaskUpdate, CycleTaskView, RoleAssignment,
    TaskStatus, TASK_ASSIGNEES, TASK_SECONDARY_ASSIGNEES,
};
pub use dataset::Dataset;
pub use field_update::FieldUpdate;
pub use gcalendar::{CalendarBuildSummary, CalendarEventBuilder};
pub use label::{Label, LabelId};
pub use person::{Person, PersonId};
pub use relationship::{Relationship, RelationshipId};
pub use workflow::{Unit, Workflow, WorkflowId};
