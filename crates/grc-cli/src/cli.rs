use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "grc")]
#[command(about = "GRC workflow backend: CSV import/export, task notifications, schema migrations", long_about = None)]
#[command(version, long_version = LONG_VERSION)]
pub struct Cli {
    /// Path to the data file; .db/.sqlite/.sqlite3 use SQLite, anything else JSON (or set GRC_FILE)
    #[arg(long, short, global = true, value_name = "FILE", env = "GRC_FILE")]
    pub file: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Person operations
    Person(PersonCommand),
    /// Workflow operations
    Workflow(WorkflowCommand),
    /// Cycle operations
    Cycle(CycleCommand),
    /// Cycle task operations
    Task(TaskCommand),
    /// Label operations
    Label(LabelCommand),
    /// Calendar notification events
    Calendar(CalendarCommand),
    /// Import objects from a block CSV file
    Import(ImportArgs),
    /// Export objects as block CSV
    Export(ExportArgs),
    /// Schema migrations of a SQLite data file
    Migrate(MigrateCommand),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// Person commands
#[derive(Args)]
pub struct PersonCommand {
    #[command(subcommand)]
    pub action: PersonAction,
}

#[derive(Subcommand)]
pub enum PersonAction {
    /// Create a new person
    Create {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        name: String,
    },
    /// List all people
    List,
}

// Workflow commands
#[derive(Args)]
pub struct WorkflowCommand {
    #[command(subcommand)]
    pub action: WorkflowAction,
}

#[derive(Subcommand)]
pub enum WorkflowAction {
    /// Create a new workflow
    Create(WorkflowCreateArgs),
    /// List all workflows
    List,
    /// Stop the recurrence of a workflow
    Archive {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Args)]
pub struct WorkflowCreateArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    /// Repeat unit: day, week or month
    #[arg(long, requires = "repeat_every")]
    pub unit: Option<String>,
    #[arg(long, requires = "unit")]
    pub repeat_every: Option<u32>,
    /// Start date of the next cycle (YYYY-MM-DD), defaults to today
    #[arg(long, requires = "unit")]
    pub next_cycle_start_date: Option<NaiveDate>,
    /// Skip the verification step for tasks of this workflow
    #[arg(long)]
    pub no_verification: bool,
}

// Cycle commands
#[derive(Args)]
pub struct CycleCommand {
    #[command(subcommand)]
    pub action: CycleAction,
}

#[derive(Subcommand)]
pub enum CycleAction {
    /// Start a new cycle of a workflow
    Create {
        #[arg(long)]
        workflow_id: i64,
        #[arg(long)]
        title: String,
    },
    /// Mark a cycle as no longer current
    End {
        #[arg(long)]
        id: i64,
    },
}

// Task commands
#[derive(Args)]
pub struct TaskCommand {
    #[command(subcommand)]
    pub action: TaskAction,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new cycle task
    Create {
        #[arg(long)]
        cycle_id: i64,
        #[arg(long)]
        title: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: NaiveDate,
    },
    /// List cycle tasks
    List {
        #[arg(long)]
        cycle_id: Option<i64>,
    },
    /// Update a cycle task
    Update(TaskUpdateArgs),
    /// Add a person to a task role
    Assign {
        #[arg(long)]
        id: i64,
        /// Email of the assignee
        #[arg(long)]
        email: String,
        /// Assign as secondary assignee
        #[arg(long)]
        secondary: bool,
    },
}

#[derive(Args)]
pub struct TaskUpdateArgs {
    #[arg(long)]
    pub id: i64,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, conflicts_with = "description")]
    pub clear_description: bool,
    /// Assigned, In Progress, Finished, Declined, Verified or Deprecated
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub start: Option<NaiveDate>,
    #[arg(long)]
    pub due: Option<NaiveDate>,
}

// Label commands
#[derive(Args)]
pub struct LabelCommand {
    #[command(subcommand)]
    pub action: LabelAction,
}

#[derive(Subcommand)]
pub enum LabelAction {
    /// Create a new label
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        context_id: Option<i64>,
    },
    /// List all labels
    List,
}

// Calendar commands
#[derive(Args)]
pub struct CalendarCommand {
    #[command(subcommand)]
    pub action: CalendarAction,
}

#[derive(Subcommand)]
pub enum CalendarAction {
    /// Create, link and describe calendar events for active cycle tasks
    Build {
        /// Date to evaluate overdue tasks against (YYYY-MM-DD), defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// List calendar events
    List,
}

#[derive(Args)]
pub struct ImportArgs {
    /// CSV file to import
    #[arg(long)]
    pub csv: String,
    /// Validate and report without changing any data
    #[arg(long)]
    pub dry_run: bool,
    /// Email of the user running the import
    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Args)]
pub struct ExportArgs {
    /// JSON list of queries, e.g. '[{"object_name": "Label", "ids": [1, 2]}]'
    #[arg(long)]
    pub query: String,
    /// Indexes of the queries to include in the output (default: all)
    #[arg(long, value_delimiter = ',')]
    pub exportable: Vec<usize>,
    /// Write the CSV to a file instead of returning it in the response
    #[arg(long)]
    pub output: Option<String>,
}

// Migrate commands
#[derive(Args)]
pub struct MigrateCommand {
    #[command(subcommand)]
    pub action: MigrateAction,
}

#[derive(Subcommand)]
pub enum MigrateAction {
    /// Upgrade to a later revision
    Upgrade {
        #[arg(long, default_value = "head")]
        revision: String,
    },
    /// Revert to an earlier revision
    Downgrade {
        #[arg(long)]
        revision: String,
    },
    /// Show the applied revision
    Current,
    /// Show the newest revisions
    Heads,
    /// List all revisions, oldest first
    History,
}
