use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write snapshot '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Storage for the raw bytes of the last fetched feed.
pub trait SnapshotStore {
    /// Returns `Ok(None)` when no snapshot has been saved yet.
    fn load(&self) -> Result<Option<Vec<u8>>, SnapshotError>;

    /// Replaces the stored snapshot wholesale.
    fn save(&self, bytes: &[u8]) -> Result<(), SnapshotError>;
}

/// Snapshot kept in a single file on disk.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: std::io::Error) -> SnapshotError {
        SnapshotError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<Vec<u8>>, SnapshotError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No local snapshot yet");
                Ok(None)
            }
            Err(source) => Err(SnapshotError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Write-to-temp-then-rename, so the snapshot is never left truncated.
    fn save(&self, bytes: &[u8]) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
            }
        }

        let random_suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = self
            .path
            .with_extension(format!("tmp.{:016x}", random_suffix));

        let result = write_temp(&temp_path, bytes).and_then(|()| {
            // On Windows, rename fails if destination exists
            #[cfg(windows)]
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }
            std::fs::rename(&temp_path, &self.path)
        });

        if let Err(e) = result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(self.write_error(e));
        }

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "Snapshot saved");
        Ok(())
    }
}

fn write_temp(temp_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)?;
    temp_file.write_all(bytes)?;
    temp_file.sync_all()
}
