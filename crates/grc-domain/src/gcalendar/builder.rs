use chrono::NaiveDate;
use grc_core::AppConfig;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;

use super::utils::{self, RelatedMapping};
use crate::calendar_event::{CalendarEvent, CalendarEventId};
use crate::cycle_task::{
    CycleTaskGroupObjectTask, CycleTaskId, CycleTaskView, TaskStatus, TASK_ASSIGNEES,
    TASK_SECONDARY_ASSIGNEES,
};
use crate::dataset::Dataset;
use crate::person::PersonId;

pub const TASK_DESCRIPTION_HEADER: &str = "You have due tasks for today.\n";
pub const TASK_DESCRIPTION_SUMMARY: &str = "Please click on the link below to review \
and take action on your task(s) due today.\n<a href='{link}'>Link</a>";
pub const TASK_TITLE: &str = "Your tasks are due today";

const TASK_TYPE: &str = CycleTaskGroupObjectTask::TYPE_NAME;
const EVENT_TYPE: &str = CalendarEvent::TYPE_NAME;

/// Counts of what a build changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CalendarBuildSummary {
    pub tasks_processed: usize,
    pub events_created: usize,
    pub relationships_created: usize,
    pub relationships_deleted: usize,
    pub descriptions_updated: usize,
}

/// Eligibility and attendees of one task, computed before any mutation.
struct TaskPlan {
    task_id: CycleTaskId,
    end_date: NaiveDate,
    eligible: bool,
    person_ids: BTreeSet<PersonId>,
}

/// Creates and removes calendar events for cycle tasks.
pub struct CalendarEventBuilder {
    task_mappings: RelatedMapping,
    event_mappings: RelatedMapping,
    /// `(id, title)` of every task in load order.
    tasks: Vec<(CycleTaskId, String)>,
    title_prefix: String,
    url_root: String,
    summary: CalendarBuildSummary,
}

impl CalendarEventBuilder {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            task_mappings: RelatedMapping::new(),
            event_mappings: RelatedMapping::new(),
            tasks: Vec::new(),
            title_prefix: config.notification_title_prefix(),
            url_root: config.url_root(),
            summary: CalendarBuildSummary::default(),
        }
    }

    pub fn event_title(&self) -> String {
        format!("{}{}", self.title_prefix, TASK_TITLE)
    }

    /// Builds calendar events based on cycle tasks. The caller persists `data`.
    pub fn build_cycle_tasks(&mut self, data: &mut Dataset, today: NaiveDate) -> CalendarBuildSummary {
        let _span = tracing::info_span!("build_cycle_tasks", %today).entered();
        let started = Instant::now();
        self.summary = CalendarBuildSummary::default();

        self.preload_data(data);
        self.generate_events(data, today);
        self.generate_event_descriptions(data);

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generated events for cycle tasks"
        );
        tracing::info!(
            tasks = self.summary.tasks_processed,
            events_created = self.summary.events_created,
            relationships_created = self.summary.relationships_created,
            relationships_deleted = self.summary.relationships_deleted,
            descriptions_updated = self.summary.descriptions_updated,
            "Calendar events built"
        );
        self.summary.clone()
    }

    fn preload_data(&mut self, data: &Dataset) {
        let (task_mappings, event_mappings) = utils::get_related_mapping(data, TASK_TYPE, EVENT_TYPE);
        self.task_mappings = task_mappings;
        self.event_mappings = event_mappings;
        self.tasks = data
            .cycle_tasks
            .iter()
            .map(|task| (task.id, task.title.clone()))
            .collect();
    }

    fn generate_events(&mut self, data: &mut Dataset, today: NaiveDate) {
        let plans: Vec<TaskPlan> = data
            .cycle_tasks
            .iter()
            .map(|task| {
                let eligible = match data.cycle_task_view(task) {
                    Some(view) => Self::should_create_event_for(&view, today),
                    None => {
                        tracing::warn!(
                            task_id = task.id,
                            cycle_id = task.cycle_id,
                            "Cycle task has no cycle or workflow, skipping events"
                        );
                        false
                    }
                };
                TaskPlan {
                    task_id: task.id,
                    end_date: task.end_date,
                    eligible,
                    person_ids: Self::get_task_persons_ids_to_notify(task),
                }
            })
            .collect();

        for plan in plans {
            self.generate_events_for_task(data, plan);
        }
    }

    fn generate_events_for_task(&mut self, data: &mut Dataset, plan: TaskPlan) {
        self.summary.tasks_processed += 1;
        let mut events_ids = self
            .task_mappings
            .get(&plan.task_id)
            .cloned()
            .unwrap_or_default();

        if plan.eligible {
            for person_id in &plan.person_ids {
                let existing = utils::get_event_by_date_and_attendee(data, *person_id, plan.end_date)
                    .map(|event| event.id);
                match existing {
                    None => {
                        self.create_event_with_relationship(data, plan.task_id, plan.end_date, *person_id);
                    }
                    Some(event_id) => {
                        self.create_event_relationship(data, plan.task_id, event_id);
                        events_ids.remove(&event_id);
                    }
                }
            }
        }

        for event_id in events_ids {
            self.delete_event_relationship(data, event_id, plan.task_id);
        }
    }

    /// Union of assignees and secondary assignees.
    fn get_task_persons_ids_to_notify(task: &CycleTaskGroupObjectTask) -> BTreeSet<PersonId> {
        [TASK_ASSIGNEES, TASK_SECONDARY_ASSIGNEES]
            .iter()
            .flat_map(|role| task.get_person_ids_for_rolename(role))
            .collect()
    }

    fn delete_event_relationship(&mut self, data: &mut Dataset, event_id: CalendarEventId, task_id: CycleTaskId) {
        let relationship_id = utils::get_relationship(data, event_id, EVENT_TYPE, task_id, TASK_TYPE)
            .map(|relationship| relationship.id);
        if let Some(relationship_id) = relationship_id {
            data.delete_relationship(relationship_id);
            self.summary.relationships_deleted += 1;
            if let Some(events) = self.task_mappings.get_mut(&task_id) {
                events.remove(&event_id);
            }
            if let Some(tasks) = self.event_mappings.get_mut(&event_id) {
                tasks.remove(&task_id);
            }
        }
    }

    fn create_event_with_relationship(
        &mut self,
        data: &mut Dataset,
        task_id: CycleTaskId,
        due_date: NaiveDate,
        person_id: PersonId,
    ) -> CalendarEventId {
        let mut event = CalendarEvent::new(
            data.next_calendar_event_id(),
            self.event_title(),
            due_date,
            person_id,
        );
        event.modified_by_id = Some(person_id);
        let event_id = event.id;
        data.calendar_events.push(event);
        data.add_relationship(TASK_TYPE, task_id, EVENT_TYPE, event_id);

        self.summary.events_created += 1;
        self.summary.relationships_created += 1;
        self.task_mappings.entry(task_id).or_default().insert(event_id);
        self.event_mappings.entry(event_id).or_default().insert(task_id);
        event_id
    }

    fn create_event_relationship(&mut self, data: &mut Dataset, task_id: CycleTaskId, event_id: CalendarEventId) {
        if utils::get_relationship(data, event_id, EVENT_TYPE, task_id, TASK_TYPE).is_none() {
            data.add_relationship(TASK_TYPE, task_id, EVENT_TYPE, event_id);
            self.summary.relationships_created += 1;
            self.task_mappings.entry(task_id).or_default().insert(event_id);
            self.event_mappings.entry(event_id).or_default().insert(task_id);
        }
    }

    /// Calendar events are not created for:
    /// - deprecated cycle tasks,
    /// - verified cycle tasks (with verification flow),
    /// - finished cycle tasks (without verification flow),
    /// - tasks of an ended cycle (history tab),
    /// - overdue cycle tasks,
    /// - cycle tasks of archived workflows.
    pub fn should_create_event_for(task: &CycleTaskView<'_>, today: NaiveDate) -> bool {
        let status = task.task.status;
        let conditions = [
            matches!(status, TaskStatus::Deprecated | TaskStatus::Verified),
            status == TaskStatus::Finished && !task.is_verification_needed(),
            task.is_in_history(),
            task.is_overdue(today),
            task.workflow_archived(),
        ];
        !conditions.iter().any(|condition| *condition)
    }

    fn generate_event_descriptions(&mut self, data: &mut Dataset) {
        let event_ids: Vec<CalendarEventId> = data.calendar_events.iter().map(|e| e.id).collect();
        for event_id in event_ids {
            let Some(task_ids) = self.event_mappings.get(&event_id) else {
                continue;
            };
            let Some(event) = data.calendar_event_mut(event_id) else {
                continue;
            };
            let description = self.description_for_event(event.due_date, task_ids);
            if event.update_description(description) {
                self.summary.descriptions_updated += 1;
            }
        }
    }

    fn description_for_event(&self, due_date: NaiveDate, task_ids: &BTreeSet<CycleTaskId>) -> String {
        let titles: Vec<String> = self
            .tasks
            .iter()
            .filter(|(id, _)| task_ids.contains(id))
            .map(|(_, title)| format!("- {}", title))
            .collect();
        let link = utils::get_active_cycle_tasks_url(
            &self.url_root,
            &due_date.format("%m/%d/%Y").to_string(),
        );
        format!(
            "{}{}\n{}",
            TASK_DESCRIPTION_HEADER,
            titles.join("\n"),
            TASK_DESCRIPTION_SUMMARY.replace("{link}", &link)
        )
    }
}
