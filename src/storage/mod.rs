pub mod fs;
pub mod locator;
pub mod s3;

pub use fs::FsStore;
pub use locator::{BucketAddr, StorageLocator};
pub use s3::{S3Credentials, S3Store};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Registry URLs are long-lived by design; backends may clamp this to
/// whatever their signing scheme allows.
pub const DEFAULT_URL_EXPIRY: Duration = Duration::from_secs(3 * 52 * 7 * 24 * 60 * 60); // 3 years

/// A blob backend addressed by bucket/key. One implementation per locator
/// service (`s3`, or the filesystem stand-in for development and tests).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn create_bucket_if_absent(&self, bucket: &BucketAddr) -> Result<()>;
    async fn delete_bucket(&self, bucket: &BucketAddr) -> Result<()>;
    async fn list(
        &self,
        bucket: &BucketAddr,
        prefix: Option<&str>,
        max_keys: Option<usize>,
    ) -> Result<Vec<String>>;

    /// Uploads, overwriting any existing content. Returns a retrieval URL.
    async fn put(&self, cubby: &StorageLocator, data: &[u8]) -> Result<String>;
    async fn get(&self, cubby: &StorageLocator) -> Result<Vec<u8>>;
    async fn exists(&self, cubby: &StorageLocator) -> Result<bool>;
    /// Idempotent: deleting an absent object is not an error.
    async fn delete(&self, cubby: &StorageLocator) -> Result<()>;
    async fn size(&self, cubby: &StorageLocator) -> Result<i64>;
    async fn url(&self, cubby: &StorageLocator, expiry: Duration) -> Result<String>;
}

/// Handle to one bucket within a backend.
#[derive(Clone)]
pub struct Bucket {
    backend: Arc<dyn ObjectStore>,
    addr: BucketAddr,
}

impl Bucket {
    #[must_use]
    pub fn addr(&self) -> &BucketAddr {
        &self.addr
    }

    pub async fn create_if_absent(&self) -> Result<()> {
        self.backend.create_bucket_if_absent(&self.addr).await
    }

    pub async fn delete(&self) -> Result<()> {
        self.backend.delete_bucket(&self.addr).await
    }

    pub async fn list(&self, prefix: Option<&str>, max_keys: Option<usize>) -> Result<Vec<Cubby>> {
        let keys = self.backend.list(&self.addr, prefix, max_keys).await?;
        Ok(keys.into_iter().map(|key| self.cubby(&key, None)).collect())
    }

    #[must_use]
    pub fn cubby(&self, key: &str, content_type: Option<String>) -> Cubby {
        Cubby {
            backend: Arc::clone(&self.backend),
            locator: StorageLocator {
                service: self.addr.service.clone(),
                location: self.addr.location.clone(),
                bucket: self.addr.bucket.clone(),
                key: key.to_string(),
                content_type,
            },
        }
    }
}

/// Handle to one blob within a bucket.
#[derive(Clone)]
pub struct Cubby {
    backend: Arc<dyn ObjectStore>,
    locator: StorageLocator,
}

impl Cubby {
    #[must_use]
    pub fn locator(&self) -> &StorageLocator {
        &self.locator
    }

    /// Uploads `data`, overwriting existing content, and returns a
    /// retrieval URL.
    pub async fn store(&self, data: &[u8]) -> Result<String> {
        self.backend.put(&self.locator, data).await
    }

    pub async fn retrieve(&self) -> Result<Vec<u8>> {
        self.backend.get(&self.locator).await
    }

    pub async fn exists(&self) -> Result<bool> {
        self.backend.exists(&self.locator).await
    }

    pub async fn delete(&self) -> Result<()> {
        self.backend.delete(&self.locator).await
    }

    pub async fn size(&self) -> Result<i64> {
        self.backend.size(&self.locator).await
    }

    pub async fn url(&self, expiry: Duration) -> Result<String> {
        self.backend.url(&self.locator, expiry).await
    }
}

/// Where version artifacts land when no explicit cubby is supplied.
#[derive(Debug, Clone)]
pub struct StorageDefaults {
    pub service: String,
    pub location: String,
    pub bucket: String,
}

/// Maps locator services to backends and carries the configured defaults.
pub struct Storage {
    backends: HashMap<String, Arc<dyn ObjectStore>>,
    pub defaults: StorageDefaults,
}

impl Storage {
    #[must_use]
    pub fn new(defaults: StorageDefaults) -> Self {
        Self {
            backends: HashMap::new(),
            defaults,
        }
    }

    pub fn register(&mut self, service: &str, backend: Arc<dyn ObjectStore>) {
        self.backends.insert(service.to_string(), backend);
    }

    fn backend(&self, service: &str) -> Result<Arc<dyn ObjectStore>> {
        self.backends
            .get(service)
            .cloned()
            .ok_or_else(|| Error::InvalidArgument(format!("unknown storage service '{service}'")))
    }

    /// Resolves `service://location/bucket` to a bucket handle.
    pub fn bucket(&self, locator: &str) -> Result<Bucket> {
        let addr = BucketAddr::parse(locator)?;
        let backend = self.backend(&addr.service)?;
        Ok(Bucket { backend, addr })
    }

    /// Resolves an already-parsed locator to a cubby handle.
    pub fn cubby(&self, locator: &StorageLocator) -> Result<Cubby> {
        let backend = self.backend(&locator.service)?;
        Ok(Cubby {
            backend,
            locator: locator.clone(),
        })
    }

    /// The pinned locator for a version artifact at the configured default
    /// bucket: `{package_slug}/{package_slug}-{version}.zip`.
    #[must_use]
    pub fn default_artifact_locator(&self, package_slug: &str, version: &str) -> StorageLocator {
        StorageLocator {
            service: self.defaults.service.clone(),
            location: self.defaults.location.clone(),
            bucket: self.defaults.bucket.clone(),
            key: format!("{package_slug}/{package_slug}-{version}.zip"),
            content_type: Some("application/zip".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_storage(root: &std::path::Path) -> Storage {
        let mut storage = Storage::new(StorageDefaults {
            service: "s3".to_string(),
            location: "us-west-1".to_string(),
            bucket: "packages".to_string(),
        });
        storage.register("s3", Arc::new(FsStore::new(root)));
        storage
    }

    #[test]
    fn test_default_artifact_locator() {
        let temp = TempDir::new().unwrap();
        let storage = test_storage(temp.path());

        let locator = storage.default_artifact_locator("dog-bog", "1.0.0");
        assert_eq!(
            locator.to_string(),
            "s3://us-west-1/packages/dog-bog/dog-bog-1.0.0.zip"
        );
        assert_eq!(locator.content_type.as_deref(), Some("application/zip"));
    }

    #[test]
    fn test_unknown_service_rejected() {
        let temp = TempDir::new().unwrap();
        let storage = test_storage(temp.path());

        assert!(storage.bucket("alibaba://loc/bucket").is_err());
    }

    #[tokio::test]
    async fn test_cubby_round_trip_through_registry() {
        let temp = TempDir::new().unwrap();
        let storage = test_storage(temp.path());

        let bucket = storage.bucket("s3://us-west-1/packages").unwrap();
        bucket.create_if_absent().await.unwrap();

        let cubby = bucket.cubby("a/b.zip", Some("application/zip".to_string()));
        assert!(!cubby.exists().await.unwrap());

        let url = cubby.store(b"not a zip!").await.unwrap();
        assert!(!url.is_empty());
        assert!(cubby.exists().await.unwrap());
        assert_eq!(cubby.retrieve().await.unwrap(), b"not a zip!");
        assert_eq!(cubby.size().await.unwrap(), 10);

        let listed = bucket.list(Some("a/"), None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].locator().key, "a/b.zip");

        cubby.delete().await.unwrap();
        assert!(!cubby.exists().await.unwrap());
        // Idempotent delete.
        cubby.delete().await.unwrap();
    }
}
