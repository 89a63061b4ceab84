use grc_core::{GrcError, GrcResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

use super::revisions::{history, Revision};

const VERSION_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS alembic_version (version_num VARCHAR(32) NOT NULL PRIMARY KEY)";

pub const HEAD: &str = "head";
pub const BASE: &str = "base";

fn db_err(e: sqlx::Error) -> GrcError {
    GrcError::Database(e.to_string())
}

/// Applies revisions to a SQLite database, tracking the current one in
/// `alembic_version`.
#[derive(Debug, Clone)]
pub struct SchemaMigrator {
    pool: Pool<Sqlite>,
}

impl SchemaMigrator {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `path`.
    pub async fn connect(path: &Path) -> GrcResult<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .map_err(db_err)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(db_err)?;
        Ok(Self::new(pool))
    }

    async fn ensure_version_table(&self) -> GrcResult<()> {
        sqlx::query(VERSION_TABLE)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// The applied revision, `None` on an empty database.
    pub async fn current(&self) -> GrcResult<Option<String>> {
        self.ensure_version_table().await?;
        let row: Option<(String,)> = sqlx::query_as("SELECT version_num FROM alembic_version")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(|(version,)| version))
    }

    pub fn heads(&self) -> Vec<&'static str> {
        super::revisions::heads()
    }

    pub fn history(&self) -> GrcResult<Vec<&'static Revision>> {
        history()
    }

    /// Position of `target` in the chain; `base` is `None`, `head` the last revision.
    fn resolve(chain: &[&'static Revision], target: &str) -> GrcResult<Option<usize>> {
        match target {
            BASE => Ok(None),
            HEAD => Ok(chain.len().checked_sub(1)),
            _ => chain
                .iter()
                .position(|r| r.revision == target)
                .map(Some)
                .ok_or_else(|| GrcError::Migration(format!("Unknown revision '{}'", target))),
        }
    }

    async fn current_position(&self, chain: &[&'static Revision]) -> GrcResult<Option<usize>> {
        match self.current().await? {
            None => Ok(None),
            Some(current) => Self::resolve(chain, &current).map_err(|_| {
                GrcError::Migration(format!("Database is at unknown revision '{}'", current))
            }),
        }
    }

    /// Applies every revision after the current one up to `target`.
    /// Returns the applied revision ids.
    pub async fn upgrade(&self, target: &str) -> GrcResult<Vec<&'static str>> {
        let chain = history()?;
        let current = self.current_position(&chain).await?;
        let target = Self::resolve(&chain, target)?;
        if target < current {
            return Err(GrcError::Migration(
                "Target revision is older than the current one, use downgrade".into(),
            ));
        }

        let start = current.map(|i| i + 1).unwrap_or(0);
        let end = target.map(|i| i + 1).unwrap_or(0);
        let mut applied = Vec::new();
        for revision in &chain[start..end] {
            self.apply(revision.upgrade_sql, Some(revision.revision)).await?;
            tracing::info!(
                revision = revision.revision,
                description = revision.description,
                "Upgraded schema"
            );
            applied.push(revision.revision);
        }
        Ok(applied)
    }

    /// Reverts revisions newer than `target`, newest first.
    pub async fn downgrade(&self, target: &str) -> GrcResult<Vec<&'static str>> {
        let chain = history()?;
        let current = self.current_position(&chain).await?;
        let target = Self::resolve(&chain, target)?;
        if target > current {
            return Err(GrcError::Migration(
                "Target revision is newer than the current one, use upgrade".into(),
            ));
        }

        let start = target.map(|i| i + 1).unwrap_or(0);
        let end = current.map(|i| i + 1).unwrap_or(0);
        let mut reverted = Vec::new();
        for index in (start..end).rev() {
            let revision = chain[index];
            let previous = index.checked_sub(1).map(|i| chain[i].revision);
            self.apply(revision.downgrade_sql, previous).await?;
            tracing::info!(
                revision = revision.revision,
                description = revision.description,
                "Downgraded schema"
            );
            reverted.push(revision.revision);
        }
        Ok(reverted)
    }

    /// Runs `sql` and records `version` in one transaction.
    async fn apply(&self, sql: &str, version: Option<&str>) -> GrcResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        (&mut *tx)
            .execute(sqlx::raw_sql(sql))
            .await
            .map_err(|e| GrcError::Migration(e.to_string()))?;
        sqlx::query("DELETE FROM alembic_version")
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if let Some(version) = version {
            sqlx::query("INSERT INTO alembic_version (version_num) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
