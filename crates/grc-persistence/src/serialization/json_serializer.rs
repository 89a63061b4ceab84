use crate::traits::Serializer;
use grc_core::{GrcError, GrcResult};

/// JSON serializer for domain models
pub struct JsonSerializer;

impl<T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync> Serializer<T>
    for JsonSerializer
{
    fn serialize(&self, data: &T) -> GrcResult<Vec<u8>> {
        serde_json::to_vec_pretty(data).map_err(|e| GrcError::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> GrcResult<T> {
        serde_json::from_slice(bytes).map_err(|e| GrcError::Serialization(e.to_string()))
    }
}
