use crate::conflict::FileMetadata;
use crate::store::atomic_writer::AtomicWriter;
use crate::traits::{PersistenceMetadata, PersistenceStore, StoreSnapshot, FORMAT_VERSION};
use grc_core::{GrcError, GrcResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// JSON file-based persistence store
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    instance_id: Uuid,
    /// File state as of our last load or save.
    last_seen: Mutex<Option<FileMetadata>>,
}

/// On-disk layout: the dataset wrapped with its metadata.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonEnvelope {
    pub version: u32,
    pub metadata: PersistenceMetadata,
    pub data: serde_json::Value,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_instance_id(path, Uuid::new_v4())
    }

    pub fn with_instance_id(path: impl AsRef<Path>, instance_id: Uuid) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            instance_id,
            last_seen: Mutex::new(None),
        }
    }

    fn lock_last_seen(&self) -> MutexGuard<'_, Option<FileMetadata>> {
        self.last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remember_file(&self) {
        *self.lock_last_seen() = FileMetadata::capture(&self.path).ok().flatten();
    }

    /// Fails when the file changed on disk since we last touched it.
    fn check_conflict(&self) -> GrcResult<()> {
        let last_seen = *self.lock_last_seen();
        if let Some(last_seen) = last_seen {
            if last_seen.has_changed(&self.path)? {
                return Err(GrcError::ConflictDetected {
                    path: self.path.display().to_string(),
                    source: None,
                });
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PersistenceStore for JsonFileStore {
    async fn save(&self, mut snapshot: StoreSnapshot) -> GrcResult<PersistenceMetadata> {
        self.check_conflict()?;

        snapshot.metadata.instance_id = self.instance_id;
        snapshot.metadata.saved_at = chrono::Utc::now();
        snapshot.metadata.format_version = FORMAT_VERSION;

        let data: serde_json::Value = serde_json::from_slice(&snapshot.data)
            .map_err(|e| GrcError::Serialization(e.to_string()))?;
        let envelope = JsonEnvelope {
            version: FORMAT_VERSION,
            metadata: snapshot.metadata.clone(),
            data,
        };
        let json_bytes =
            serde_json::to_vec_pretty(&envelope).map_err(|e| GrcError::Serialization(e.to_string()))?;

        AtomicWriter::write_atomic(&self.path, &json_bytes).await?;
        self.remember_file();

        tracing::info!(bytes = json_bytes.len(), path = %self.path.display(), "Saved JSON store");
        Ok(snapshot.metadata)
    }

    async fn load(&self) -> GrcResult<(StoreSnapshot, PersistenceMetadata)> {
        let file_bytes = AtomicWriter::read_all(&self.path).await?;
        let envelope: JsonEnvelope =
            serde_json::from_slice(&file_bytes).map_err(|e| GrcError::Serialization(e.to_string()))?;

        if envelope.version != FORMAT_VERSION {
            return Err(GrcError::Serialization(format!(
                "Unsupported format version: {}",
                envelope.version
            )));
        }

        let data = serde_json::to_vec(&envelope.data).map_err(|e| GrcError::Serialization(e.to_string()))?;
        let snapshot = StoreSnapshot {
            data,
            metadata: envelope.metadata.clone(),
        };
        self.remember_file();

        tracing::info!(bytes = file_bytes.len(), path = %self.path.display(), "Loaded JSON store");
        Ok((snapshot, envelope.metadata))
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
        "json"
    }
}
