use std::path::PathBuf;

use crate::storage::StorageDefaults;

/// Where uploaded artifacts go. Only the `s3` service exists; with
/// `storage_root` set the filesystem backend stands in for it, which is
/// how development and the integration tests run.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub location: String,
    pub bucket: String,
    /// Root directory for the filesystem backend. `None` means real S3,
    /// with credentials taken from the environment.
    pub storage_root: Option<PathBuf>,
    /// Custom S3 endpoint (path-style addressing), for S3-compatible
    /// stores.
    pub s3_endpoint: Option<String>,
}

impl StorageConfig {
    #[must_use]
    pub fn defaults(&self) -> StorageDefaults {
        StorageDefaults {
            service: "s3".to_string(),
            location: self.location.clone(),
            bucket: self.bucket.clone(),
        }
    }
}
