use crate::migration::{SchemaMigrator, HEAD};
use crate::serialization::JsonSerializer;
use crate::traits::{PersistenceMetadata, PersistenceStore, Serializer, StoreSnapshot, FORMAT_VERSION};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use grc_core::{GrcError, GrcResult};
use grc_domain::{
    CalendarEvent, Context, Cycle, CycleTaskGroupObjectTask, Dataset, Label, Person, Relationship,
    RoleAssignment, Workflow,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite, SqliteConnection};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn db_err(e: sqlx::Error) -> GrcError {
    GrcError::Database(e.to_string())
}

fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

fn parse_datetime(value: &str) -> GrcResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| GrcError::Serialization(format!("Invalid timestamp '{}': {}", value, e)))
}

fn parse_optional_datetime(value: Option<String>) -> GrcResult<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_datetime).transpose()
}

fn format_date(value: &NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str) -> GrcResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| GrcError::Serialization(format!("Invalid date '{}': {}", value, e)))
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> GrcResult<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(column).map_err(db_err)
}

/// SQLite-backed store. Each save syncs the whole dataset into typed
/// tables inside one transaction.
pub struct SqliteStore {
    path: PathBuf,
    instance_id: Uuid,
    pool: tokio::sync::OnceCell<Pool<Sqlite>>,
    last_known_metadata: Mutex<Option<PersistenceMetadata>>,
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_instance_id(path, Uuid::new_v4())
    }

    pub fn with_instance_id(path: impl AsRef<Path>, instance_id: Uuid) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            instance_id,
            pool: tokio::sync::OnceCell::new(),
            last_known_metadata: Mutex::new(None),
        }
    }

    /// Connects on first use and brings the schema up to the newest revision.
    async fn get_pool(&self) -> GrcResult<&Pool<Sqlite>> {
        self.pool
            .get_or_try_init(|| async {
                let options =
                    SqliteConnectOptions::from_str(&format!("sqlite://{}", self.path.display()))
                        .map_err(db_err)?
                        .create_if_missing(true)
                        .foreign_keys(true);

                let pool = SqlitePoolOptions::new()
                    .max_connections(5)
                    .connect_with(options)
                    .await
                    .map_err(db_err)?;

                let applied = SchemaMigrator::new(pool.clone()).upgrade(HEAD).await?;
                if !applied.is_empty() {
                    tracing::info!(revisions = ?applied, path = %self.path.display(), "Applied schema migrations");
                }
                Ok(pool)
            })
            .await
    }

    fn lock_metadata(&self) -> MutexGuard<'_, Option<PersistenceMetadata>> {
        self.last_known_metadata
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn read_metadata(&self, pool: &Pool<Sqlite>) -> GrcResult<Option<PersistenceMetadata>> {
        let row: Option<(String, String, i64)> =
            sqlx::query_as("SELECT instance_id, saved_at, format_version FROM metadata WHERE id = 1")
                .fetch_optional(pool)
                .await
                .map_err(db_err)?;

        row.map(|(instance_id, saved_at, format_version)| {
            Ok(PersistenceMetadata {
                format_version: u32::try_from(format_version)
                    .map_err(|e| GrcError::Serialization(e.to_string()))?,
                instance_id: Uuid::parse_str(&instance_id)
                    .map_err(|e| GrcError::Serialization(e.to_string()))?,
                saved_at: parse_datetime(&saved_at)?,
            })
        })
        .transpose()
    }

    /// Fails when another instance saved since our last load or save.
    async fn check_conflict(&self, pool: &Pool<Sqlite>) -> GrcResult<()> {
        let Some(current) = self.read_metadata(pool).await? else {
            return Ok(());
        };
        let guard = self.lock_metadata();
        if let Some(ref last_known) = *guard {
            if current.instance_id != last_known.instance_id || current.saved_at != last_known.saved_at {
                return Err(GrcError::ConflictDetected {
                    path: self.path.display().to_string(),
                    source: None,
                });
            }
        }
        Ok(())
    }

    async fn load_dataset(&self, pool: &Pool<Sqlite>) -> GrcResult<Dataset> {
        let mut data = Dataset::new();

        for row in sqlx::query("SELECT id, name FROM contexts ORDER BY id")
            .fetch_all(pool)
            .await
            .map_err(db_err)?
        {
            data.contexts.push(Context::new(get(&row, "id")?, get(&row, "name")?));
        }

        for row in sqlx::query("SELECT id, email, name, created_at, updated_at FROM people ORDER BY id")
            .fetch_all(pool)
            .await
            .map_err(db_err)?
        {
            data.people.push(row_to_person(&row)?);
        }

        for row in sqlx::query(
            "SELECT id, slug, title, description, unit, repeat_every, recurrences,
                    next_cycle_start_date, is_verification_needed, created_at, updated_at
             FROM workflows ORDER BY id",
        )
        .fetch_all(pool)
        .await
        .map_err(db_err)?
        {
            data.workflows.push(row_to_workflow(&row)?);
        }

        for row in sqlx::query(
            "SELECT id, slug, title, workflow_id, is_current, is_verification_needed, created_at, updated_at
             FROM cycles ORDER BY id",
        )
        .fetch_all(pool)
        .await
        .map_err(db_err)?
        {
            data.cycles.push(row_to_cycle(&row)?);
        }

        for row in sqlx::query(
            "SELECT id, slug, title, description, cycle_id, status, start_date, end_date,
                    finished_date, verified_date, created_at, updated_at
             FROM cycle_task_group_object_tasks ORDER BY id",
        )
        .fetch_all(pool)
        .await
        .map_err(db_err)?
        {
            data.cycle_tasks.push(row_to_cycle_task(&row)?);
        }

        for row in sqlx::query(
            "SELECT object_id, role_name, person_id FROM access_control_people
             ORDER BY object_id, position",
        )
        .fetch_all(pool)
        .await
        .map_err(db_err)?
        {
            let object_id: i64 = get(&row, "object_id")?;
            if let Some(task) = data.cycle_tasks.iter_mut().find(|t| t.id == object_id) {
                task.access_control.push(RoleAssignment {
                    role_name: get(&row, "role_name")?,
                    person_id: get(&row, "person_id")?,
                });
            }
        }

        for row in sqlx::query(
            "SELECT id, external_event_id, title, description, due_date, attendee_id,
                    modified_by_id, last_synced_at, created_at, updated_at
             FROM calendar_events ORDER BY id",
        )
        .fetch_all(pool)
        .await
        .map_err(db_err)?
        {
            data.calendar_events.push(row_to_calendar_event(&row)?);
        }

        for row in sqlx::query(
            "SELECT id, source_type, source_id, destination_type, destination_id, created_at
             FROM relationships ORDER BY id",
        )
        .fetch_all(pool)
        .await
        .map_err(db_err)?
        {
            data.relationships.push(Relationship {
                id: get(&row, "id")?,
                source_type: get(&row, "source_type")?,
                source_id: get(&row, "source_id")?,
                destination_type: get(&row, "destination_type")?,
                destination_id: get(&row, "destination_id")?,
                created_at: parse_datetime(&get::<String>(&row, "created_at")?)?,
            });
        }

        for row in sqlx::query(
            "SELECT id, title, context_id, modified_by_id, created_at, updated_at FROM labels ORDER BY id",
        )
        .fetch_all(pool)
        .await
        .map_err(db_err)?
        {
            data.labels.push(Label {
                id: get(&row, "id")?,
                title: get(&row, "title")?,
                context_id: get(&row, "context_id")?,
                modified_by_id: get(&row, "modified_by_id")?,
                created_at: parse_datetime(&get::<String>(&row, "created_at")?)?,
                updated_at: parse_datetime(&get::<String>(&row, "updated_at")?)?,
            });
        }

        Ok(data)
    }

    /// Deletes rows whose id is no longer present in `incoming`.
    async fn sync_table(
        conn: &mut SqliteConnection,
        table: &str,
        incoming: impl Iterator<Item = i64>,
    ) -> GrcResult<usize> {
        let incoming_ids: HashSet<i64> = incoming.collect();
        let existing_ids: Vec<i64> = sqlx::query(&format!("SELECT id FROM {}", table))
            .fetch_all(&mut *conn)
            .await
            .map_err(db_err)?
            .iter()
            .map(|row| get::<i64>(row, "id"))
            .collect::<GrcResult<_>>()?;

        let mut deleted = 0;
        for id in existing_ids.into_iter().filter(|id| !incoming_ids.contains(id)) {
            sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table))
                .bind(id)
                .execute(&mut *conn)
                .await
                .map_err(db_err)?;
            deleted += 1;
        }
        if deleted > 0 {
            tracing::debug!(table, deleted, "Removed stale rows");
        }
        Ok(deleted)
    }

    async fn write_dataset(conn: &mut SqliteConnection, data: &Dataset) -> GrcResult<()> {
        // Children before parents.
        Self::sync_table(conn, "relationships", data.relationships.iter().map(|r| r.id)).await?;
        Self::sync_table(conn, "calendar_events", data.calendar_events.iter().map(|e| e.id)).await?;
        Self::sync_table(conn, "labels", data.labels.iter().map(|l| l.id)).await?;
        Self::sync_table(conn, "cycle_task_group_object_tasks", data.cycle_tasks.iter().map(|t| t.id))
            .await?;
        Self::sync_table(conn, "cycles", data.cycles.iter().map(|c| c.id)).await?;
        Self::sync_table(conn, "workflows", data.workflows.iter().map(|w| w.id)).await?;
        Self::sync_table(conn, "people", data.people.iter().map(|p| p.id)).await?;
        Self::sync_table(conn, "contexts", data.contexts.iter().map(|c| c.id)).await?;

        for context in &data.contexts {
            sqlx::query(
                "INSERT INTO contexts (id, name) VALUES (?, ?)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            )
            .bind(context.id)
            .bind(&context.name)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
        }

        for person in &data.people {
            sqlx::query(
                "INSERT INTO people (id, email, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    email = excluded.email,
                    name = excluded.name,
                    updated_at = excluded.updated_at",
            )
            .bind(person.id)
            .bind(&person.email)
            .bind(&person.name)
            .bind(format_datetime(&person.created_at))
            .bind(format_datetime(&person.updated_at))
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
        }

        for workflow in &data.workflows {
            sqlx::query(
                "INSERT INTO workflows (id, slug, title, description, unit, repeat_every, recurrences,
                                        next_cycle_start_date, is_verification_needed, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    slug = excluded.slug,
                    title = excluded.title,
                    description = excluded.description,
                    unit = excluded.unit,
                    repeat_every = excluded.repeat_every,
                    recurrences = excluded.recurrences,
                    next_cycle_start_date = excluded.next_cycle_start_date,
                    is_verification_needed = excluded.is_verification_needed,
                    updated_at = excluded.updated_at",
            )
            .bind(workflow.id)
            .bind(&workflow.slug)
            .bind(&workflow.title)
            .bind(&workflow.description)
            .bind(workflow.unit.map(|u| u.as_str()))
            .bind(workflow.repeat_every.map(i64::from))
            .bind(workflow.recurrences)
            .bind(workflow.next_cycle_start_date.as_ref().map(format_date))
            .bind(workflow.is_verification_needed)
            .bind(format_datetime(&workflow.created_at))
            .bind(format_datetime(&workflow.updated_at))
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
        }

        for cycle in &data.cycles {
            sqlx::query(
                "INSERT INTO cycles (id, slug, title, workflow_id, is_current, is_verification_needed,
                                     created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    slug = excluded.slug,
                    title = excluded.title,
                    workflow_id = excluded.workflow_id,
                    is_current = excluded.is_current,
                    is_verification_needed = excluded.is_verification_needed,
                    updated_at = excluded.updated_at",
            )
            .bind(cycle.id)
            .bind(&cycle.slug)
            .bind(&cycle.title)
            .bind(cycle.workflow_id)
            .bind(cycle.is_current)
            .bind(cycle.is_verification_needed)
            .bind(format_datetime(&cycle.created_at))
            .bind(format_datetime(&cycle.updated_at))
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
        }

        for task in &data.cycle_tasks {
            sqlx::query(
                "INSERT INTO cycle_task_group_object_tasks (id, slug, title, description, cycle_id, status,
                        start_date, end_date, finished_date, verified_date, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    slug = excluded.slug,
                    title = excluded.title,
                    description = excluded.description,
                    cycle_id = excluded.cycle_id,
                    status = excluded.status,
                    start_date = excluded.start_date,
                    end_date = excluded.end_date,
                    finished_date = excluded.finished_date,
                    verified_date = excluded.verified_date,
                    updated_at = excluded.updated_at",
            )
            .bind(task.id)
            .bind(&task.slug)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.cycle_id)
            .bind(task.status.as_str())
            .bind(task.start_date.as_ref().map(format_date))
            .bind(format_date(&task.end_date))
            .bind(task.finished_date.as_ref().map(format_datetime))
            .bind(task.verified_date.as_ref().map(format_datetime))
            .bind(format_datetime(&task.created_at))
            .bind(format_datetime(&task.updated_at))
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;

            sqlx::query("DELETE FROM access_control_people WHERE object_id = ?")
                .bind(task.id)
                .execute(&mut *conn)
                .await
                .map_err(db_err)?;
            for (position, assignment) in task.access_control.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO access_control_people (object_id, role_name, person_id, position)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(task.id)
                .bind(&assignment.role_name)
                .bind(assignment.person_id)
                .bind(position as i64)
                .execute(&mut *conn)
                .await
                .map_err(db_err)?;
            }
        }

        for event in &data.calendar_events {
            sqlx::query(
                "INSERT INTO calendar_events (id, external_event_id, title, description, due_date,
                        attendee_id, modified_by_id, last_synced_at, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    external_event_id = excluded.external_event_id,
                    title = excluded.title,
                    description = excluded.description,
                    due_date = excluded.due_date,
                    attendee_id = excluded.attendee_id,
                    modified_by_id = excluded.modified_by_id,
                    last_synced_at = excluded.last_synced_at,
                    updated_at = excluded.updated_at",
            )
            .bind(event.id)
            .bind(&event.external_event_id)
            .bind(&event.title)
            .bind(&event.description)
            .bind(format_date(&event.due_date))
            .bind(event.attendee_id)
            .bind(event.modified_by_id)
            .bind(event.last_synced_at.as_ref().map(format_datetime))
            .bind(format_datetime(&event.created_at))
            .bind(format_datetime(&event.updated_at))
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
        }

        for relationship in &data.relationships {
            sqlx::query(
                "INSERT INTO relationships (id, source_type, source_id, destination_type, destination_id, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    source_type = excluded.source_type,
                    source_id = excluded.source_id,
                    destination_type = excluded.destination_type,
                    destination_id = excluded.destination_id",
            )
            .bind(relationship.id)
            .bind(&relationship.source_type)
            .bind(relationship.source_id)
            .bind(&relationship.destination_type)
            .bind(relationship.destination_id)
            .bind(format_datetime(&relationship.created_at))
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
        }

        for label in &data.labels {
            sqlx::query(
                "INSERT INTO labels (id, title, context_id, modified_by_id, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    context_id = excluded.context_id,
                    modified_by_id = excluded.modified_by_id,
                    updated_at = excluded.updated_at",
            )
            .bind(label.id)
            .bind(&label.title)
            .bind(label.context_id)
            .bind(label.modified_by_id)
            .bind(format_datetime(&label.created_at))
            .bind(format_datetime(&label.updated_at))
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
        }

        Ok(())
    }
}

fn row_to_person(row: &SqliteRow) -> GrcResult<Person> {
    Ok(Person {
        id: get(row, "id")?,
        email: get(row, "email")?,
        name: get(row, "name")?,
        created_at: parse_datetime(&get::<String>(row, "created_at")?)?,
        updated_at: parse_datetime(&get::<String>(row, "updated_at")?)?,
    })
}

fn row_to_workflow(row: &SqliteRow) -> GrcResult<Workflow> {
    let unit = get::<Option<String>>(row, "unit")?
        .map(|u| u.parse().map_err(GrcError::Serialization))
        .transpose()?;
    let repeat_every = get::<Option<i64>>(row, "repeat_every")?
        .map(|n| u32::try_from(n).map_err(|e| GrcError::Serialization(e.to_string())))
        .transpose()?;
    Ok(Workflow {
        id: get(row, "id")?,
        slug: get(row, "slug")?,
        title: get(row, "title")?,
        description: get(row, "description")?,
        unit,
        repeat_every,
        recurrences: get(row, "recurrences")?,
        next_cycle_start_date: get::<Option<String>>(row, "next_cycle_start_date")?
            .as_deref()
            .map(parse_date)
            .transpose()?,
        is_verification_needed: get(row, "is_verification_needed")?,
        created_at: parse_datetime(&get::<String>(row, "created_at")?)?,
        updated_at: parse_datetime(&get::<String>(row, "updated_at")?)?,
    })
}

fn row_to_cycle(row: &SqliteRow) -> GrcResult<Cycle> {
    Ok(Cycle {
        id: get(row, "id")?,
        slug: get(row, "slug")?,
        title: get(row, "title")?,
        workflow_id: get(row, "workflow_id")?,
        is_current: get(row, "is_current")?,
        is_verification_needed: get(row, "is_verification_needed")?,
        created_at: parse_datetime(&get::<String>(row, "created_at")?)?,
        updated_at: parse_datetime(&get::<String>(row, "updated_at")?)?,
    })
}

fn row_to_cycle_task(row: &SqliteRow) -> GrcResult<CycleTaskGroupObjectTask> {
    Ok(CycleTaskGroupObjectTask {
        id: get(row, "id")?,
        slug: get(row, "slug")?,
        title: get(row, "title")?,
        description: get(row, "description")?,
        cycle_id: get(row, "cycle_id")?,
        status: get::<String>(row, "status")?
            .parse()
            .map_err(GrcError::Serialization)?,
        start_date: get::<Option<String>>(row, "start_date")?
            .as_deref()
            .map(parse_date)
            .transpose()?,
        end_date: parse_date(&get::<String>(row, "end_date")?)?,
        finished_date: parse_optional_datetime(get(row, "finished_date")?)?,
        verified_date: parse_optional_datetime(get(row, "verified_date")?)?,
        access_control: Vec::new(),
        created_at: parse_datetime(&get::<String>(row, "created_at")?)?,
        updated_at: parse_datetime(&get::<String>(row, "updated_at")?)?,
    })
}

fn row_to_calendar_event(row: &SqliteRow) -> GrcResult<CalendarEvent> {
    Ok(CalendarEvent {
        id: get(row, "id")?,
        external_event_id: get(row, "external_event_id")?,
        title: get(row, "title")?,
        description: get(row, "description")?,
        due_date: parse_date(&get::<String>(row, "due_date")?)?,
        attendee_id: get(row, "attendee_id")?,
        modified_by_id: get(row, "modified_by_id")?,
        last_synced_at: parse_optional_datetime(get(row, "last_synced_at")?)?,
        created_at: parse_datetime(&get::<String>(row, "created_at")?)?,
        updated_at: parse_datetime(&get::<String>(row, "updated_at")?)?,
    })
}

#[async_trait]
impl PersistenceStore for SqliteStore {
    async fn save(&self, mut snapshot: StoreSnapshot) -> GrcResult<PersistenceMetadata> {
        let pool = self.get_pool().await?;
        self.check_conflict(pool).await?;

        snapshot.metadata.instance_id = self.instance_id;
        snapshot.metadata.saved_at = Utc::now();
        snapshot.metadata.format_version = FORMAT_VERSION;

        let data: Dataset = JsonSerializer.deserialize(&snapshot.data)?;

        let mut tx = pool.begin().await.map_err(db_err)?;
        Self::write_dataset(&mut *tx, &data).await?;
        sqlx::query(
            "INSERT INTO metadata (id, instance_id, saved_at, format_version)
             VALUES (1, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                instance_id = excluded.instance_id,
                saved_at = excluded.saved_at,
                format_version = excluded.format_version",
        )
        .bind(self.instance_id.to_string())
        .bind(format_datetime(&snapshot.metadata.saved_at))
        .bind(i64::from(FORMAT_VERSION))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;

        *self.lock_metadata() = Some(snapshot.metadata.clone());

        tracing::info!(path = %self.path.display(), "Saved to SQLite database");
        Ok(snapshot.metadata)
    }

    async fn load(&self) -> GrcResult<(StoreSnapshot, PersistenceMetadata)> {
        let pool = self.get_pool().await?;

        let metadata = self
            .read_metadata(pool)
            .await?
            .unwrap_or_else(|| PersistenceMetadata::new(self.instance_id));
        if metadata.format_version != FORMAT_VERSION {
            return Err(GrcError::Serialization(format!(
                "Unsupported format version: {}",
                metadata.format_version
            )));
        }

        let data = self.load_dataset(pool).await?;
        let snapshot = StoreSnapshot {
            data: JsonSerializer.serialize(&data)?,
            metadata: metadata.clone(),
        };

        *self.lock_metadata() = Some(metadata.clone());

        tracing::info!(path = %self.path.display(), "Loaded from SQLite database");
        Ok((snapshot, metadata))
    }

    async fn exists(&self) -> bool {
        self.path.exists()
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
