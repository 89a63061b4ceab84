use crate::cli::MigrateAction;
use crate::output;
use grc_persistence::{open_store, SchemaMigrator};
use std::path::Path;

/// Runs against the database directly, so the store does not auto-upgrade first.
pub async fn handle(file_path: &str, action: MigrateAction) -> anyhow::Result<()> {
    let path = Path::new(file_path);
    if open_store(path).backend() != "sqlite" {
        return output::output_error(&format!(
            "Migrations need a SQLite data file (.db, .sqlite, .sqlite3): {}",
            file_path
        ));
    }
    let migrator = SchemaMigrator::connect(path).await?;

    match action {
        MigrateAction::Upgrade { revision } => {
            let applied = migrator.upgrade(&revision).await?;
            output::output_success(serde_json::json!({
                "applied": applied,
                "current": migrator.current().await?,
            }));
        }
        MigrateAction::Downgrade { revision } => {
            let reverted = migrator.downgrade(&revision).await?;
            output::output_success(serde_json::json!({
                "reverted": reverted,
                "current": migrator.current().await?,
            }));
        }
        MigrateAction::Current => {
            output::output_success(serde_json::json!({ "current": migrator.current().await? }));
        }
        MigrateAction::Heads => {
            output::output_list(migrator.heads());
        }
        MigrateAction::History => {
            let revisions: Vec<serde_json::Value> = migrator
                .history()?
                .into_iter()
                .map(|r| {
                    serde_json::json!({
                        "revision": r.revision,
                        "down_revision": r.down_revision,
                        "description": r.description,
                        "create_date": r.create_date,
                    })
                })
                .collect();
            output::output_list(revisions);
        }
    }
    Ok(())
}
