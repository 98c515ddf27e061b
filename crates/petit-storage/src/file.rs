use async_trait::async_trait;
use petit_core::{Alias, InfraError, Provider, Result, StorageError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Flat-file provider: one file per alias inside a directory.
///
/// A single read/write lock serializes every store against every read, for
/// all aliases. Aliases are reduced to their final path component before
/// being joined to the directory, so no alias can address a file outside it.
/// Unchecked aliases that share a final component (`a/b` and `b`) therefore
/// name the same record; aliases built with [`Alias::new`] never contain a
/// separator.
#[derive(Debug)]
pub struct FileProvider {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl FileProvider {
    /// Opens the provider, creating `dir` if it does not exist.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            InfraError::io(format!("failed to create directory {}: {e}", dir.display()))
        })?;
        debug!(dir = %dir.display(), "Opened flat-file storage");

        Ok(Self {
            dir,
            lock: RwLock::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file for `alias`, or `None` if the alias has no usable
    /// file name.
    fn path_for(&self, alias: &Alias) -> Option<PathBuf> {
        let name = Path::new(alias.as_str()).file_name()?;
        Some(self.dir.join(name))
    }
}

fn map_io_error(alias: &Alias, err: std::io::Error) -> StorageError {
    match err.kind() {
        ErrorKind::NotFound => StorageError::NotFound(alias.to_string()),
        ErrorKind::AlreadyExists => StorageError::AlreadyExists(alias.to_string()),
        _ => InfraError::io(format!("alias '{alias}': {err}")).into(),
    }
}

#[async_trait]
impl Provider for FileProvider {
    async fn get(&self, alias: &Alias) -> Result<String> {
        let Some(path) = self.path_for(alias) else {
            return Err(StorageError::NotFound(alias.to_string()));
        };

        let _guard = self.lock.read().await;
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| map_io_error(alias, e))?;
        Ok(content.trim().to_owned())
    }

    async fn exists(&self, alias: &Alias) -> Result<bool> {
        let Some(path) = self.path_for(alias) else {
            return Ok(false);
        };

        let _guard = self.lock.read().await;
        fs::try_exists(&path)
            .await
            .map_err(|e| map_io_error(alias, e))
    }

    async fn store(&self, target: &str, alias: &Alias) -> Result<()> {
        let path = self
            .path_for(alias)
            .ok_or_else(|| InfraError::invalid_data(format!("'{alias}' is not a valid file name")))?;

        let _guard = self.lock.write().await;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| map_io_error(alias, e))?;

        let written = async {
            file.write_all(target.trim().as_bytes()).await?;
            file.sync_all().await
        }
        .await;

        if let Err(err) = written {
            // Leave no half-written record behind.
            let _ = fs::remove_file(&path).await;
            return Err(map_io_error(alias, err));
        }

        trace!(alias = %alias, path = %path.display(), "Stored record on disk");
        Ok(())
    }
}
