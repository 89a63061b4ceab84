//! In-memory dataset holding every persisted object.
//!
//! Stores load a `Dataset`, commands and converters mutate it, and the store
//! writes it back. Ids are integers allocated per table.

use chrono::NaiveDate;
use grc_core::{GrcError, GrcResult};
use serde::{Deserialize, Serialize};

use crate::calendar_event::{CalendarEvent, CalendarEventId};
use crate::context::{Context, ContextId};
use crate::cycle::{Cycle, CycleId};
use crate::cycle_task::{CycleTaskGroupObjectTask, CycleTaskId, CycleTaskView};
use crate::label::{Label, LabelId};
use crate::person::{Person, PersonId};
use crate::relationship::{Relationship, RelationshipId};
use crate::workflow::{Workflow, WorkflowId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub contexts: Vec<Context>,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub workflows: Vec<Workflow>,
    #[serde(default)]
    pub cycles: Vec<Cycle>,
    #[serde(default)]
    pub cycle_tasks: Vec<CycleTaskGroupObjectTask>,
    #[serde(default)]
    pub calendar_events: Vec<CalendarEvent>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

fn next_id<T>(items: &[T], id: impl Fn(&T) -> i64) -> i64 {
    items.iter().map(id).max().unwrap_or(0) + 1
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    // Lookups

    pub fn context(&self, id: ContextId) -> Option<&Context> {
        self.contexts.iter().find(|c| c.id == id)
    }

    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.people.iter().find(|p| p.id == id)
    }

    pub fn person_by_email(&self, email: &str) -> Option<&Person> {
        let email = email.trim();
        self.people.iter().find(|p| p.email.eq_ignore_ascii_case(email))
    }

    pub fn workflow(&self, id: WorkflowId) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.id == id)
    }

    pub fn workflow_mut(&mut self, id: WorkflowId) -> Option<&mut Workflow> {
        self.workflows.iter_mut().find(|w| w.id == id)
    }

    pub fn workflow_by_slug(&self, slug: &str) -> Option<&Workflow> {
        self.workflows
            .iter()
            .find(|w| w.slug.eq_ignore_ascii_case(slug.trim()))
    }

    pub fn cycle(&self, id: CycleId) -> Option<&Cycle> {
        self.cycles.iter().find(|c| c.id == id)
    }

    pub fn cycle_mut(&mut self, id: CycleId) -> Option<&mut Cycle> {
        self.cycles.iter_mut().find(|c| c.id == id)
    }

    pub fn cycle_by_slug(&self, slug: &str) -> Option<&Cycle> {
        self.cycles
            .iter()
            .find(|c| c.slug.eq_ignore_ascii_case(slug.trim()))
    }

    pub fn cycle_task(&self, id: CycleTaskId) -> Option<&CycleTaskGroupObjectTask> {
        self.cycle_tasks.iter().find(|t| t.id == id)
    }

    pub fn cycle_task_mut(&mut self, id: CycleTaskId) -> Option<&mut CycleTaskGroupObjectTask> {
        self.cycle_tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn cycle_task_by_slug(&self, slug: &str) -> Option<&CycleTaskGroupObjectTask> {
        self.cycle_tasks
            .iter()
            .find(|t| t.slug.eq_ignore_ascii_case(slug.trim()))
    }

    pub fn calendar_event(&self, id: CalendarEventId) -> Option<&CalendarEvent> {
        self.calendar_events.iter().find(|e| e.id == id)
    }

    pub fn calendar_event_mut(&mut self, id: CalendarEventId) -> Option<&mut CalendarEvent> {
        self.calendar_events.iter_mut().find(|e| e.id == id)
    }

    pub fn label(&self, id: LabelId) -> Option<&Label> {
        self.labels.iter().find(|l| l.id == id)
    }

    pub fn label_by_title(&self, title: &str) -> Option<&Label> {
        let title = title.trim();
        self.labels
            .iter()
            .find(|l| l.title.trim().eq_ignore_ascii_case(title))
    }

    /// Resolves the cycle and workflow of a task; `None` when either is missing.
    pub fn cycle_task_view<'a>(
        &'a self,
        task: &'a CycleTaskGroupObjectTask,
    ) -> Option<CycleTaskView<'a>> {
        let cycle = self.cycle(task.cycle_id)?;
        let workflow = self.workflow(cycle.workflow_id)?;
        Some(CycleTaskView {
            task,
            cycle,
            workflow,
        })
    }

    // Id allocation

    pub fn next_context_id(&self) -> ContextId {
        next_id(&self.contexts, |c| c.id)
    }

    pub fn next_person_id(&self) -> PersonId {
        next_id(&self.people, |p| p.id)
    }

    pub fn next_workflow_id(&self) -> WorkflowId {
        next_id(&self.workflows, |w| w.id)
    }

    pub fn next_cycle_id(&self) -> CycleId {
        next_id(&self.cycles, |c| c.id)
    }

    pub fn next_cycle_task_id(&self) -> CycleTaskId {
        next_id(&self.cycle_tasks, |t| t.id)
    }

    pub fn next_calendar_event_id(&self) -> CalendarEventId {
        next_id(&self.calendar_events, |e| e.id)
    }

    pub fn next_relationship_id(&self) -> RelationshipId {
        next_id(&self.relationships, |r| r.id)
    }

    pub fn next_label_id(&self) -> LabelId {
        next_id(&self.labels, |l| l.id)
    }

    /// First free generated workflow code, counting up from the next id.
    /// Imported codes can already hold `WORKFLOW-<next id>`.
    pub fn next_workflow_slug(&self) -> String {
        let mut number = self.next_workflow_id();
        loop {
            let slug = Workflow::slug_for(number);
            if self.workflow_by_slug(&slug).is_none() {
                return slug;
            }
            number += 1;
        }
    }

    // Creation

    pub fn add_context(&mut self, name: String) -> Context {
        let context = Context::new(self.next_context_id(), name);
        self.contexts.push(context.clone());
        context
    }

    pub fn add_person(&mut self, email: String, name: String) -> GrcResult<Person> {
        let email = email.trim().to_string();
        if !Person::is_valid_email(&email) {
            return Err(GrcError::Validation(format!("Invalid email '{}'", email)));
        }
        if self.person_by_email(&email).is_some() {
            return Err(GrcError::Validation(format!(
                "Person with email '{}' already exists",
                email
            )));
        }
        let person = Person::new(self.next_person_id(), email, name);
        self.people.push(person.clone());
        Ok(person)
    }

    pub fn add_workflow(&mut self, title: String) -> GrcResult<Workflow> {
        if title.trim().is_empty() {
            return Err(GrcError::Validation("Workflow title is required".into()));
        }
        let mut workflow = Workflow::new(self.next_workflow_id(), title);
        workflow.slug = self.next_workflow_slug();
        self.workflows.push(workflow.clone());
        Ok(workflow)
    }

    pub fn add_cycle(&mut self, workflow_id: WorkflowId, title: String) -> GrcResult<Cycle> {
        let workflow = self
            .workflow(workflow_id)
            .ok_or_else(|| GrcError::NotFound(format!("Workflow {}", workflow_id)))?;
        let cycle = Cycle::new(
            self.next_cycle_id(),
            workflow_id,
            title,
            workflow.is_verification_needed,
        );
        self.cycles.push(cycle.clone());
        Ok(cycle)
    }

    pub fn add_cycle_task(
        &mut self,
        cycle_id: CycleId,
        title: String,
        end_date: NaiveDate,
    ) -> GrcResult<CycleTaskGroupObjectTask> {
        if self.cycle(cycle_id).is_none() {
            return Err(GrcError::NotFound(format!("Cycle {}", cycle_id)));
        }
        if title.trim().is_empty() {
            return Err(GrcError::Validation("Task title is required".into()));
        }
        let task = CycleTaskGroupObjectTask::new(self.next_cycle_task_id(), cycle_id, title, end_date);
        self.cycle_tasks.push(task.clone());
        Ok(task)
    }

    pub fn add_label(&mut self, title: String, context_id: Option<ContextId>) -> GrcResult<Label> {
        Label::validate_title(&title).map_err(GrcError::Validation)?;
        if let Some(context_id) = context_id {
            if self.context(context_id).is_none() {
                return Err(GrcError::NotFound(format!("Context {}", context_id)));
            }
        }
        if self.label_by_title(&title).is_some() {
            return Err(GrcError::Validation(format!(
                "Label '{}' already exists",
                title.trim()
            )));
        }
        let label = Label::new(self.next_label_id(), title.trim().to_string(), context_id);
        self.labels.push(label.clone());
        Ok(label)
    }

    // Relationships

    pub fn get_relationship(
        &self,
        left_type: &str,
        left_id: i64,
        right_type: &str,
        right_id: i64,
    ) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find(|r| r.connects(left_type, left_id, right_type, right_id))
    }

    pub fn add_relationship(
        &mut self,
        source_type: &str,
        source_id: i64,
        destination_type: &str,
        destination_id: i64,
    ) -> RelationshipId {
        let id = self.next_relationship_id();
        self.relationships.push(Relationship::new(
            id,
            source_type,
            source_id,
            destination_type,
            destination_id,
        ));
        id
    }

    pub fn delete_relationship(&mut self, id: RelationshipId) -> bool {
        let before = self.relationships.len();
        self.relationships.retain(|r| r.id != id);
        before != self.relationships.len()
    }

    fn delete_relationships_for(&mut self, object_type: &str, id: i64) {
        self.relationships.retain(|r| !r.involves(object_type, id));
    }

    // Deletion

    pub fn delete_person(&mut self, id: PersonId) -> bool {
        let before = self.people.len();
        self.people.retain(|p| p.id != id);
        if before == self.people.len() {
            return false;
        }
        for task in &mut self.cycle_tasks {
            task.remove_person(id);
        }
        let event_ids: Vec<CalendarEventId> = self
            .calendar_events
            .iter()
            .filter(|e| e.attendee_id == id)
            .map(|e| e.id)
            .collect();
        for event_id in event_ids {
            self.delete_calendar_event(event_id);
        }
        self.delete_relationships_for(Person::TYPE_NAME, id);
        true
    }

    pub fn delete_calendar_event(&mut self, id: CalendarEventId) -> bool {
        let before = self.calendar_events.len();
        self.calendar_events.retain(|e| e.id != id);
        self.delete_relationships_for(CalendarEvent::TYPE_NAME, id);
        before != self.calendar_events.len()
    }

    pub fn delete_cycle_task(&mut self, id: CycleTaskId) -> bool {
        let before = self.cycle_tasks.len();
        self.cycle_tasks.retain(|t| t.id != id);
        self.delete_relationships_for(CycleTaskGroupObjectTask::TYPE_NAME, id);
        before != self.cycle_tasks.len()
    }

    /// Removes the workflow with all of its cycles and their tasks.
    pub fn delete_workflow(&mut self, id: WorkflowId) -> bool {
        let before = self.workflows.len();
        self.workflows.retain(|w| w.id != id);
        if before == self.workflows.len() {
            return false;
        }
        let cycle_ids: Vec<CycleId> = self
            .cycles
            .iter()
            .filter(|c| c.workflow_id == id)
            .map(|c| c.id)
            .collect();
        let task_ids: Vec<CycleTaskId> = self
            .cycle_tasks
            .iter()
            .filter(|t| cycle_ids.contains(&t.cycle_id))
            .map(|t| t.id)
            .collect();
        for task_id in task_ids {
            self.delete_cycle_task(task_id);
        }
        self.cycles.retain(|c| c.workflow_id != id);
        self.delete_relationships_for(Workflow::TYPE_NAME, id);
        true
    }

    pub fn delete_label(&mut self, id: LabelId) -> bool {
        let before = self.labels.len();
        self.labels.retain(|l| l.id != id);
        self.delete_relationships_for(Label::TYPE_NAME, id);
        before != self.labels.len()
    }
}
