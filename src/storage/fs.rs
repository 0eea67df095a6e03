use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{BucketAddr, ObjectStore, StorageLocator};
use crate::error::{Error, Result};

/// Directory-backed object store for development and tests. Buckets are
/// directories under `{root}/{location}/{bucket}`, objects are files under
/// them, and "URLs" are `file://` paths.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn bucket_path(&self, bucket: &BucketAddr) -> PathBuf {
        self.root.join(&bucket.location).join(&bucket.bucket)
    }

    fn object_path(&self, cubby: &StorageLocator) -> PathBuf {
        self.bucket_path(&cubby.bucket_addr()).join(&cubby.key)
    }

    fn temp_path(&self) -> PathBuf {
        self.root.join("tmp").join(Uuid::new_v4().to_string())
    }
}

fn not_found(e: std::io::Error) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::NotFound
    } else {
        Error::Io(e)
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn create_bucket_if_absent(&self, bucket: &BucketAddr) -> Result<()> {
        fs::create_dir_all(self.bucket_path(bucket)).await?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &BucketAddr) -> Result<()> {
        match fs::remove_dir_all(self.bucket_path(bucket)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn list(
        &self,
        bucket: &BucketAddr,
        prefix: Option<&str>,
        max_keys: Option<usize>,
    ) -> Result<Vec<String>> {
        let base = self.bucket_path(bucket);
        let mut keys = Vec::new();
        let mut pending = vec![base.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::Io(e)),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(rel) = path.strip_prefix(&base) {
                    let key = rel.to_string_lossy().replace('\\', "/");
                    if prefix.is_none_or(|p| key.starts_with(p)) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        if let Some(max) = max_keys {
            keys.truncate(max);
        }
        Ok(keys)
    }

    async fn put(&self, cubby: &StorageLocator, data: &[u8]) -> Result<String> {
        // Write to a temp file and rename so readers never observe a
        // partial object.
        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(data).await?;
        temp_file.sync_all().await?;

        let final_path = self.object_path(cubby);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&temp_path, &final_path).await?;

        self.url(cubby, super::DEFAULT_URL_EXPIRY).await
    }

    async fn get(&self, cubby: &StorageLocator) -> Result<Vec<u8>> {
        fs::read(self.object_path(cubby)).await.map_err(not_found)
    }

    async fn exists(&self, cubby: &StorageLocator) -> Result<bool> {
        Ok(fs::try_exists(self.object_path(cubby)).await?)
    }

    async fn delete(&self, cubby: &StorageLocator) -> Result<()> {
        match fs::remove_file(self.object_path(cubby)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn size(&self, cubby: &StorageLocator) -> Result<i64> {
        let metadata = fs::metadata(self.object_path(cubby))
            .await
            .map_err(not_found)?;
        Ok(metadata.len() as i64)
    }

    async fn url(&self, cubby: &StorageLocator, _expiry: Duration) -> Result<String> {
        Ok(format!("file://{}", self.object_path(cubby).display()))
    }
}
