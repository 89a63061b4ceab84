//! Reading and writing column values of the importable objects.

use chrono::{NaiveDate, Utc};
use std::collections::BTreeSet;

use super::exportables::ObjectType;
use crate::cycle_task::{CycleTaskGroupObjectTask, TaskStatus, TASK_ASSIGNEES, TASK_SECONDARY_ASSIGNEES};
use crate::dataset::Dataset;
use crate::label::Label;
use crate::person::{Person, PersonId};
use crate::workflow::{Unit, Workflow};

pub const DATE_FORMAT: &str = "%m/%d/%Y";
const DATE_FORMATS: &[&str] = &[DATE_FORMAT, "%Y-%m-%d"];

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value.trim(), format).ok())
        .ok_or_else(|| format!("'{}' is not a valid date", value.trim()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        other => Err(format!("'{}' is not one of: yes, no", other)),
    }
}

fn format_bool(value: bool) -> String {
    let text = if value { "yes" } else { "no" };
    text.to_string()
}

/// Splits a multi-person cell and resolves each email.
fn parse_people(data: &Dataset, value: &str) -> Result<BTreeSet<PersonId>, String> {
    value
        .split(['\n', ',', ';'])
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(|email| {
            data.person_by_email(email)
                .map(|person| person.id)
                .ok_or_else(|| format!("Person with email '{}' does not exist", email))
        })
        .collect()
}

fn format_people(data: &Dataset, ids: &[PersonId]) -> String {
    ids.iter()
        .filter_map(|id| data.person(*id))
        .map(|person| person.email.clone())
        .collect::<Vec<_>>()
        .join("\n")
}

fn set_if_changed<T: PartialEq>(field: &mut T, value: T) -> bool {
    if *field == value {
        false
    } else {
        *field = value;
        true
    }
}

/// A working copy of one object while a row is applied to it.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Person(Person),
    Workflow(Workflow),
    CycleTask(CycleTaskGroupObjectTask),
    Label(Label),
}

impl Record {
    pub fn load(data: &Dataset, object_type: ObjectType, id: i64) -> Option<Record> {
        match object_type {
            ObjectType::Person => data.person(id).cloned().map(Record::Person),
            ObjectType::Workflow => data.workflow(id).cloned().map(Record::Workflow),
            ObjectType::CycleTask => data.cycle_task(id).cloned().map(Record::CycleTask),
            ObjectType::Label => data.label(id).cloned().map(Record::Label),
        }
    }

    /// Looks an object up by the value of its key column.
    pub fn find(data: &Dataset, object_type: ObjectType, key_value: &str) -> Option<Record> {
        match object_type {
            ObjectType::Person => data.person_by_email(key_value).cloned().map(Record::Person),
            ObjectType::Workflow => data.workflow_by_slug(key_value).cloned().map(Record::Workflow),
            ObjectType::CycleTask => data
                .cycle_task_by_slug(key_value)
                .cloned()
                .map(Record::CycleTask),
            ObjectType::Label => data.label_by_title(key_value).cloned().map(Record::Label),
        }
    }

    /// A new, not yet stored object. An empty workflow code gets a generated one.
    pub fn create(data: &Dataset, object_type: ObjectType, key_value: &str) -> Option<Record> {
        let key_value = key_value.trim().to_string();
        match object_type {
            ObjectType::Person => Some(Record::Person(Person::new(
                data.next_person_id(),
                key_value,
                String::new(),
            ))),
            ObjectType::Workflow => {
                let mut workflow = Workflow::new(data.next_workflow_id(), String::new());
                workflow.slug = if key_value.is_empty() {
                    data.next_workflow_slug()
                } else {
                    key_value
                };
                Some(Record::Workflow(workflow))
            }
            ObjectType::CycleTask => None,
            ObjectType::Label => Some(Record::Label(Label::new(data.next_label_id(), key_value, None))),
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Record::Person(person) => person.id,
            Record::Workflow(workflow) => workflow.id,
            Record::CycleTask(task) => task.id,
            Record::Label(label) => label.id,
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            Record::Person(_) => ObjectType::Person,
            Record::Workflow(_) => ObjectType::Workflow,
            Record::CycleTask(_) => ObjectType::CycleTask,
            Record::Label(_) => ObjectType::Label,
        }
    }

    /// Cell value of `key` as written on export.
    pub fn get_value(&self, data: &Dataset, key: &str) -> String {
        match self {
            Record::Person(person) => match key {
                "email" => person.email.clone(),
                "name" => person.name.clone(),
                _ => String::new(),
            },
            Record::Workflow(workflow) => match key {
                "slug" => workflow.slug.clone(),
                "title" => workflow.title.clone(),
                "description" => workflow.description.clone().unwrap_or_default(),
                "unit" => workflow.unit.map(|u| u.to_string()).unwrap_or_default(),
                "repeat_every" => workflow.repeat_every.map(|r| r.to_string()).unwrap_or_default(),
                "is_verification_needed" => format_bool(workflow.is_verification_needed),
                _ => String::new(),
            },
            Record::CycleTask(task) => match key {
                "slug" => task.slug.clone(),
                "title" => task.title.clone(),
                "description" => task.description.clone().unwrap_or_default(),
                "status" => task.status.to_string(),
                "start_date" => task.start_date.map(format_date).unwrap_or_default(),
                "end_date" => format_date(task.end_date),
                "assignees" => format_people(data, &task.get_person_ids_for_rolename(TASK_ASSIGNEES)),
                "secondary_assignees" => format_people(
                    data,
                    &task.get_person_ids_for_rolename(TASK_SECONDARY_ASSIGNEES),
                ),
                "cycle" => data
                    .cycle(task.cycle_id)
                    .map(|cycle| cycle.slug.clone())
                    .unwrap_or_default(),
                "workflow" => data
                    .cycle(task.cycle_id)
                    .and_then(|cycle| data.workflow(cycle.workflow_id))
                    .map(|workflow| workflow.slug.clone())
                    .unwrap_or_default(),
                _ => String::new(),
            },
            Record::Label(label) => match key {
                "title" => label.title.clone(),
                _ => String::new(),
            },
        }
    }

    /// Writes a non-empty cell value into the working copy.
    ///
    /// Returns whether the object changed; the error is a warning for the
    /// value, which is then ignored.
    pub fn set_value(&mut self, data: &Dataset, key: &str, value: &str) -> Result<bool, String> {
        let value = value.trim();
        match self {
            Record::Person(person) => match key {
                "name" => Ok(set_if_changed(&mut person.name, value.to_string())),
                _ => Ok(false),
            },
            Record::Workflow(workflow) => match key {
                "title" => Ok(set_if_changed(&mut workflow.title, value.to_string())),
                "description" => Ok(set_if_changed(&mut workflow.description, Some(value.to_string()))),
                "unit" => {
                    let unit: Unit = value.parse()?;
                    Ok(set_if_changed(&mut workflow.unit, Some(unit)))
                }
                "repeat_every" => {
                    let repeat_every: u32 = value
                        .parse()
                        .map_err(|_| format!("'{}' is not a positive number", value))?;
                    if repeat_every == 0 {
                        return Err("Repeat Every must be greater than 0".to_string());
                    }
                    Ok(set_if_changed(&mut workflow.repeat_every, Some(repeat_every)))
                }
                "is_verification_needed" => {
                    let needed = parse_bool(value)?;
                    Ok(set_if_changed(&mut workflow.is_verification_needed, needed))
                }
                _ => Ok(false),
            },
            Record::CycleTask(task) => match key {
                "title" => Ok(set_if_changed(&mut task.title, value.to_string())),
                "description" => Ok(set_if_changed(&mut task.description, Some(value.to_string()))),
                "status" => {
                    let status: TaskStatus = value.parse()?;
                    if task.status == status {
                        return Ok(false);
                    }
                    task.update_status(status);
                    Ok(true)
                }
                "start_date" => {
                    let date = parse_date(value)?;
                    Ok(set_if_changed(&mut task.start_date, Some(date)))
                }
                "end_date" => {
                    let date = parse_date(value)?;
                    Ok(set_if_changed(&mut task.end_date, date))
                }
                "assignees" | "secondary_assignees" => {
                    let role = if key == "assignees" {
                        TASK_ASSIGNEES
                    } else {
                        TASK_SECONDARY_ASSIGNEES
                    };
                    let people = parse_people(data, value)?;
                    let current: BTreeSet<PersonId> =
                        task.get_person_ids_for_rolename(role).into_iter().collect();
                    if current == people {
                        return Ok(false);
                    }
                    let people: Vec<PersonId> = people.into_iter().collect();
                    task.set_people_for_role(role, &people);
                    Ok(true)
                }
                _ => Ok(false),
            },
            Record::Label(_) => Ok(false),
        }
    }

    /// Checks the whole object before it is stored.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Record::Person(person) if !Person::is_valid_email(&person.email) => {
                Err(format!("'{}' is not a valid email", person.email))
            }
            Record::Workflow(workflow) if workflow.title.trim().is_empty() => {
                Err("Workflow title is required".to_string())
            }
            Record::CycleTask(task) if task.title.trim().is_empty() => {
                Err("Task title is required".to_string())
            }
            Record::Label(label) => Label::validate_title(&label.title),
            _ => Ok(()),
        }
    }

    /// Replaces the stored object with this copy, or adds it when new.
    pub fn store(self, data: &mut Dataset) {
        let now = Utc::now();
        match self {
            Record::Person(mut person) => {
                person.updated_at = now;
                replace_or_push(&mut data.people, person, |p| p.id);
            }
            Record::Workflow(mut workflow) => {
                workflow.updated_at = now;
                replace_or_push(&mut data.workflows, workflow, |w| w.id);
            }
            Record::CycleTask(mut task) => {
                task.updated_at = now;
                replace_or_push(&mut data.cycle_tasks, task, |t| t.id);
            }
            Record::Label(mut label) => {
                label.updated_at = now;
                replace_or_push(&mut data.labels, label, |l| l.id);
            }
        }
    }

    pub fn delete(data: &mut Dataset, object_type: ObjectType, id: i64) -> bool {
        match object_type {
            ObjectType::Person => data.delete_person(id),
            ObjectType::Workflow => data.delete_workflow(id),
            ObjectType::CycleTask => data.delete_cycle_task(id),
            ObjectType::Label => data.delete_label(id),
        }
    }
}

fn replace_or_push<T>(items: &mut Vec<T>, item: T, id: impl Fn(&T) -> i64) {
    let item_id = id(&item);
    match items.iter_mut().find(|existing| id(existing) == item_id) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> (Dataset, i64) {
        let mut data = Dataset::new();
        data.add_person("ann@example.com".into(), "Ann".into()).unwrap();
        data.add_person("bob@example.com".into(), "Bob".into()).unwrap();
        let workflow = data.add_workflow("Quarterly".into()).unwrap();
        let cycle = data.add_cycle(workflow.id, "Q4".into()).unwrap();
        let task = data
            .add_cycle_task(cycle.id, "Review".into(), NaiveDate::from_ymd_opt(2026, 10, 20).unwrap())
            .unwrap();
        (data, task.id)
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        assert_eq!(parse_date("10/20/2026"), Ok(expected));
        assert_eq!(parse_date(" 2026-10-20 "), Ok(expected));
        assert!(parse_date("20.10.2026").is_err());
        assert_eq!(format_date(expected), "10/20/2026");
    }

    #[test]
    fn test_cycle_task_values() {
        let (data, task_id) = dataset();
        let mut record = Record::load(&data, ObjectType::CycleTask, task_id).unwrap();

        assert_eq!(record.set_value(&data, "status", "in progress"), Ok(true));
        assert_eq!(record.set_value(&data, "status", "In Progress"), Ok(false));
        assert_eq!(
            record.set_value(&data, "assignees", "ann@example.com\nBOB@example.com"),
            Ok(true)
        );
        assert!(record
            .set_value(&data, "secondary_assignees", "nobody@example.com")
            .is_err());
        assert_eq!(record.set_value(&data, "end_date", "10/20/2026"), Ok(false));

        assert_eq!(record.get_value(&data, "status"), "In Progress");
        assert_eq!(
            record.get_value(&data, "assignees"),
            "ann@example.com\nbob@example.com"
        );
        assert_eq!(record.get_value(&data, "cycle"), "CYCLE-1");
        assert_eq!(record.get_value(&data, "workflow"), "WORKFLOW-1");
    }

    #[test]
    fn test_workflow_invalid_values() {
        let (data, _) = dataset();
        let mut record = Record::find(&data, ObjectType::Workflow, "workflow-1").unwrap();
        assert!(record.set_value(&data, "unit", "year").is_err());
        assert!(record.set_value(&data, "repeat_every", "0").is_err());
        assert!(record.set_value(&data, "is_verification_needed", "maybe").is_err());
        assert_eq!(record.set_value(&data, "is_verification_needed", "no"), Ok(true));
        assert_eq!(record.get_value(&data, "is_verification_needed"), "no");
    }

    #[test]
    fn test_create_and_store() {
        let (mut data, _) = dataset();
        assert!(Record::create(&data, ObjectType::CycleTask, "CYCLETASK-9").is_none());

        let record = Record::create(&data, ObjectType::Workflow, "").unwrap();
        assert!(record.validate().is_err());

        let mut record = Record::create(&data, ObjectType::Workflow, "WF-CUSTOM").unwrap();
        record.set_value(&data, "title", "Annual").unwrap();
        record.validate().unwrap();
        let id = record.id();
        record.store(&mut data);

        let stored = data.workflow(id).unwrap();
        assert_eq!(stored.slug, "WF-CUSTOM");
        assert_eq!(stored.title, "Annual");
    }
}
