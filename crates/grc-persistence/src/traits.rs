use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grc_core::GrcResult;
use grc_domain::Dataset;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::serialization::JsonSerializer;

/// Version of the persisted layout written by this build.
pub const FORMAT_VERSION: u32 = 1;

/// Metadata for persistence operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceMetadata {
    /// Version of the persistence format
    pub format_version: u32,
    /// ID of the instance that performed the save
    pub instance_id: Uuid,
    /// When this data was saved
    pub saved_at: DateTime<Utc>,
}

impl PersistenceMetadata {
    pub fn new(instance_id: Uuid) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            instance_id,
            saved_at: Utc::now(),
        }
    }
}

/// Point-in-time snapshot of all data that needs to be persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Serialized `Dataset`
    pub data: Vec<u8>,
    pub metadata: PersistenceMetadata,
}

impl StoreSnapshot {
    pub fn from_dataset(dataset: &Dataset, instance_id: Uuid) -> GrcResult<Self> {
        Ok(Self {
            data: JsonSerializer.serialize(dataset)?,
            metadata: PersistenceMetadata::new(instance_id),
        })
    }

    pub fn to_dataset(&self) -> GrcResult<Dataset> {
        JsonSerializer.deserialize(&self.data)
    }
}

/// Trait for abstract storage operations
/// Implementations handle different backend storage (file, database, etc.)
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Save a snapshot to the store
    async fn save(&self, snapshot: StoreSnapshot) -> GrcResult<PersistenceMetadata>;

    /// Load the current snapshot from the store
    async fn load(&self) -> GrcResult<(StoreSnapshot, PersistenceMetadata)>;

    async fn exists(&self) -> bool;

    fn path(&self) -> &Path;

    fn instance_id(&self) -> Uuid;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Trait for serialization/deserialization strategies
pub trait Serializer<T: Send + Sync>: Send + Sync {
    fn serialize(&self, data: &T) -> GrcResult<Vec<u8>>;

    fn deserialize(&self, bytes: &[u8]) -> GrcResult<T>;
}
