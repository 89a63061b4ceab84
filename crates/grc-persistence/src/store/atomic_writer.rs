use grc_core::GrcResult;
use std::path::Path;
use tokio::fs;

/// Atomic file writer that prevents data corruption
/// Uses write-to-temp-file → atomic-rename pattern for safety
pub struct AtomicWriter;

impl AtomicWriter {
    /// Writes to a temporary file next to `path`, then renames it over `path`.
    pub async fn write_atomic(path: &Path, data: &[u8]) -> GrcResult<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
        let temp_file = tempfile::NamedTempFile::new_in(parent)?;
        let temp_path = temp_file.path().to_path_buf();

        fs::write(&temp_path, data).await?;
        fs::rename(&temp_path, path).await?;

        tracing::debug!(bytes = data.len(), path = %path.display(), "Atomic write");
        Ok(())
    }

    pub async fn read_all(path: &Path) -> GrcResult<Vec<u8>> {
        let data = fs::read(path).await?;
        tracing::debug!(bytes = data.len(), path = %path.display(), "Read file");
        Ok(data)
    }
}
