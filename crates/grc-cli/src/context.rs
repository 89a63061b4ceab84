use grc_core::{AppConfig, GrcResult};
use grc_domain::Dataset;
use grc_persistence::{open_store, PersistenceStore, StoreSnapshot};
use std::path::{Path, PathBuf};

/// Dataset loaded from the `--file` store plus the effective configuration.
pub struct CliContext {
    pub data: Dataset,
    pub config: AppConfig,
    path: PathBuf,
    store: Box<dyn PersistenceStore>,
}

impl CliContext {
    /// A missing file starts an empty dataset; the first save creates it.
    pub async fn load(file_path: &str, config: AppConfig) -> GrcResult<Self> {
        let path = PathBuf::from(file_path);
        let store = open_store(&path);

        let data = if store.exists().await {
            let (snapshot, metadata) = store.load().await?;
            tracing::debug!(
                backend = store.backend(),
                saved_by = %metadata.instance_id,
                "Loaded dataset"
            );
            snapshot.to_dataset()?
        } else {
            Dataset::new()
        };

        Ok(Self {
            data,
            config,
            path,
            store,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_sqlite(&self) -> bool {
        self.store.backend() == "sqlite"
    }

    pub async fn save(&self) -> GrcResult<()> {
        let snapshot = StoreSnapshot::from_dataset(&self.data, self.store.instance_id())?;
        self.store.save(snapshot).await?;
        Ok(())
    }
}
