//! Object types that can be imported from and exported to CSV.

use std::collections::BTreeMap;
use std::fmt;

use crate::cycle_task::CycleTaskGroupObjectTask;
use crate::label::Label;
use crate::person::Person;
use crate::workflow::Workflow;

/// One CSV column of an object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub key: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub mandatory: bool,
    pub unique: bool,
    /// Exported but never written on import.
    pub read_only: bool,
}

impl ColumnDefinition {
    const fn new(key: &'static str, display_name: &'static str) -> Self {
        Self {
            key,
            display_name,
            description: "",
            mandatory: false,
            unique: false,
            read_only: false,
        }
    }

    const fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    const fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Header cell as written on export, `*` marking mandatory columns.
    pub fn header(&self) -> String {
        if self.mandatory {
            format!("{}*", self.display_name)
        } else {
            self.display_name.to_string()
        }
    }

    /// Whether a header cell refers to this column, ignoring case and a trailing `*`.
    pub fn matches_header(&self, header: &str) -> bool {
        let header = header.trim().trim_end_matches('*').trim();
        header.eq_ignore_ascii_case(self.display_name) || header.eq_ignore_ascii_case(self.key)
    }
}

pub const DELETE_KEY: &str = "delete";

const DELETE: ColumnDefinition = ColumnDefinition::new(DELETE_KEY, "Delete")
    .describe("Allowed values are:\nyes\nno");

const PERSON_COLUMNS: &[ColumnDefinition] = &[
    ColumnDefinition::new("email", "Email").mandatory().unique(),
    ColumnDefinition::new("name", "Name"),
    DELETE,
];

const WORKFLOW_COLUMNS: &[ColumnDefinition] = &[
    ColumnDefinition::new("slug", "Code")
        .unique()
        .describe("Leave empty to generate a new code"),
    ColumnDefinition::new("title", "Title").mandatory(),
    ColumnDefinition::new("description", "Description"),
    ColumnDefinition::new("unit", "Unit").describe("Allowed values are:\nday\nweek\nmonth"),
    ColumnDefinition::new("repeat_every", "Repeat Every"),
    ColumnDefinition::new("is_verification_needed", "Need Verification")
        .describe("Allowed values are:\nyes\nno"),
    DELETE,
];

const CYCLE_TASK_COLUMNS: &[ColumnDefinition] = &[
    ColumnDefinition::new("slug", "Code").mandatory().unique(),
    ColumnDefinition::new("title", "Summary").mandatory(),
    ColumnDefinition::new("description", "Task Description"),
    ColumnDefinition::new("status", "State").describe(
        "Allowed values are:\nAssigned\nIn Progress\nFinished\nDeclined\nVerified\nDeprecated",
    ),
    ColumnDefinition::new("start_date", "Start Date").describe("Format is MM/DD/YYYY"),
    ColumnDefinition::new("end_date", "Due Date").describe("Format is MM/DD/YYYY"),
    ColumnDefinition::new("assignees", "Task Assignees")
        .describe("Multiple values are allowed.\nDelimiter is 'line break'."),
    ColumnDefinition::new("secondary_assignees", "Task Secondary Assignees")
        .describe("Multiple values are allowed.\nDelimiter is 'line break'."),
    ColumnDefinition::new("cycle", "Cycle").read_only(),
    ColumnDefinition::new("workflow", "Workflow").read_only(),
    DELETE,
];

const LABEL_COLUMNS: &[ColumnDefinition] = &[
    ColumnDefinition::new("title", "Title").mandatory().unique(),
    DELETE,
];

/// Importable and exportable object types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Person,
    Workflow,
    CycleTask,
    Label,
}

impl ObjectType {
    pub const ALL: [ObjectType; 4] = [
        ObjectType::Person,
        ObjectType::Workflow,
        ObjectType::CycleTask,
        ObjectType::Label,
    ];

    /// Model name, as written in the second line of a block.
    pub fn name(&self) -> &'static str {
        match self {
            ObjectType::Person => Person::TYPE_NAME,
            ObjectType::Workflow => Workflow::TYPE_NAME,
            ObjectType::CycleTask => CycleTaskGroupObjectTask::TYPE_NAME,
            ObjectType::Label => Label::TYPE_NAME,
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            ObjectType::CycleTask => &["cycle task", "cycle task group object task"],
            _ => &[],
        }
    }

    pub fn columns(&self) -> &'static [ColumnDefinition] {
        match self {
            ObjectType::Person => PERSON_COLUMNS,
            ObjectType::Workflow => WORKFLOW_COLUMNS,
            ObjectType::CycleTask => CYCLE_TASK_COLUMNS,
            ObjectType::Label => LABEL_COLUMNS,
        }
    }

    /// Column that identifies an existing object.
    pub fn key_column(&self) -> &'static ColumnDefinition {
        let key = match self {
            ObjectType::Person => "email",
            ObjectType::Workflow | ObjectType::CycleTask => "slug",
            ObjectType::Label => "title",
        };
        self.column(key).unwrap_or(&self.columns()[0])
    }

    pub fn column(&self, key: &str) -> Option<&'static ColumnDefinition> {
        self.columns().iter().find(|c| c.key == key)
    }

    pub fn column_for_header(&self, header: &str) -> Option<&'static ColumnDefinition> {
        self.columns().iter().find(|c| c.matches_header(header))
    }

    /// Whether import may create new objects of this type.
    pub fn can_create(&self) -> bool {
        !matches!(self, ObjectType::CycleTask)
    }

    /// Case-insensitive lookup by model name or alias.
    pub fn from_name(name: &str) -> Option<ObjectType> {
        get_exportables().get(&name.trim().to_lowercase()).copied()
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lowercased model names and aliases mapped to their object type.
pub fn get_exportables() -> BTreeMap<String, ObjectType> {
    let mut exportables = BTreeMap::new();
    for object_type in ObjectType::ALL {
        exportables.insert(object_type.name().to_lowercase(), object_type);
        for alias in object_type.aliases() {
            exportables.insert(alias.to_string(), object_type);
        }
    }
    exportables
}
