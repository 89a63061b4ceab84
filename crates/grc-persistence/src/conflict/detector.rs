use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::SystemTime;

/// Modification time and size of a store file, used to notice writes made
/// by another process between our load and save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub modified_time: SystemTime,
    pub size: u64,
}

impl FileMetadata {
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            modified_time: metadata.modified()?,
            size: metadata.len(),
        })
    }

    /// Like `from_file`, but a missing file yields `None`.
    pub fn capture(path: &Path) -> std::io::Result<Option<Self>> {
        match Self::from_file(path) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// A file deleted since the capture counts as unchanged.
    pub fn has_changed(&self, path: &Path) -> std::io::Result<bool> {
        Ok(Self::capture(path)?.is_some_and(|current| current != *self))
    }
}
