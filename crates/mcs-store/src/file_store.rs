use std::{
    path::{Path, PathBuf, StripPrefixError},
    sync::Arc,
};

use tokio::{fs, io::AsyncWriteExt as _};
use tracing::{debug, error};

use crate::{
    error::{StoreError, StoreResult},
    media_path, Container, ValidPath,
};

async fn cleanup(path: &Path, error: std::io::Error) -> Result<(), std::io::Error> {
    error!("Failed to store file to tmp path {path:?}: {error}");
    fs::remove_file(path)
        .await
        .map_err(|e| error!("Failed to remove file {path:?}: {e}"))
        .ok();
    Err(error)
}

struct FileStoreInner {
    root: PathBuf,
}

/// Local media store - keeps uploaded images under a root directory,
/// one subdirectory per [`Container`], random file names.
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<FileStoreInner>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(FileStoreInner { root: root.into() }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    fn relative_path(&self, path: &impl AsRef<Path>) -> Result<PathBuf, StripPrefixError> {
        path.as_ref()
            .strip_prefix(&self.inner.root)
            .map(|p| p.to_path_buf())
    }

    /// Stores data under a fresh random name in the container,
    /// returns the relative path to keep on the owning record.
    pub async fn save(&self, container: Container, ext: &str, data: &[u8]) -> StoreResult<String> {
        let dest = media_path(container, ext)?;
        let final_path = self.inner.root.join(dest.as_ref());
        if let Some(parent_dir) = final_path.parent() {
            if !fs::try_exists(parent_dir).await? {
                fs::create_dir_all(parent_dir).await?;
            }
        }
        let tmp_path = final_path.with_extension("tmp");
        match fs::File::create(&tmp_path).await?.write_all(data).await {
            Ok(()) => {}
            Err(e) => {
                cleanup(&tmp_path, e).await?;
            }
        }
        fs::rename(&tmp_path, &final_path).await?;
        debug!("Stored {} bytes to {final_path:?}", data.len());
        // safe as we used root to create final_path
        let relative = self.relative_path(&final_path).unwrap();
        Ok(relative.to_string_lossy().to_string())
    }

    /// Deletes the previous file (if any) and stores a new one.
    pub async fn replace(
        &self,
        container: Container,
        ext: &str,
        data: &[u8],
        previous: Option<&str>,
    ) -> StoreResult<String> {
        if let Some(previous) = previous {
            self.delete(previous).await?;
        }
        self.save(container, ext, data).await
    }

    /// Removes a previously stored file by its relative path.
    /// Missing file is not an error - record may have outlived the file.
    pub async fn delete(&self, path: &str) -> StoreResult<()> {
        let path = ValidPath::new(path)?;
        let final_path = self.inner.root.join(path.as_ref());
        match fs::remove_file(&final_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("File already gone: {final_path:?}");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn size(&self, path: &str) -> StoreResult<u64> {
        let path = ValidPath::new(path)?;
        let final_path = self.inner.root.join(path.as_ref());
        let meta = fs::metadata(&final_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(path.as_ref().to_string())
            } else {
                StoreError::from(e)
            }
        })?;
        Ok(meta.len())
    }
}
