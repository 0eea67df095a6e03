use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Addresses a bucket as `service://location/bucket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketAddr {
    pub service: String,
    pub location: String,
    pub bucket: String,
}

impl BucketAddr {
    /// Parses `service://location/bucket`. Malformed locators fail here,
    /// not on first use.
    pub fn parse(locator: &str) -> Result<Self> {
        let (service, rest) = split_scheme(locator)?;
        let mut parts = rest.splitn(2, '/');
        let location = parts.next().unwrap_or_default();
        let bucket = parts.next().unwrap_or_default();

        if location.is_empty() || bucket.is_empty() || bucket.contains('/') {
            return Err(invalid(locator));
        }

        Ok(Self {
            service: service.to_string(),
            location: location.to_string(),
            bucket: bucket.to_string(),
        })
    }
}

impl fmt::Display for BucketAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.service, self.location, self.bucket)
    }
}

/// Addresses one blob (a "cubby") as `service://location/bucket/key...`,
/// plus an optional content type. Embedded by value in any entity that owns
/// a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLocator {
    pub service: String,
    pub location: String,
    pub bucket: String,
    pub key: String,
    pub content_type: Option<String>,
}

impl StorageLocator {
    pub fn parse(locator: &str, content_type: Option<String>) -> Result<Self> {
        let (service, rest) = split_scheme(locator)?;
        let mut parts = rest.splitn(3, '/');
        let location = parts.next().unwrap_or_default();
        let bucket = parts.next().unwrap_or_default();
        let key = parts.next().unwrap_or_default();

        if location.is_empty() || bucket.is_empty() || key.is_empty() {
            return Err(invalid(locator));
        }

        Ok(Self {
            service: service.to_string(),
            location: location.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type,
        })
    }

    #[must_use]
    pub fn bucket_addr(&self) -> BucketAddr {
        BucketAddr {
            service: self.service.clone(),
            location: self.location.clone(),
            bucket: self.bucket.clone(),
        }
    }
}

impl fmt::Display for StorageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}/{}/{}",
            self.service, self.location, self.bucket, self.key
        )
    }
}

fn split_scheme(locator: &str) -> Result<(&str, &str)> {
    let (service, rest) = locator.split_once("://").ok_or_else(|| invalid(locator))?;

    if service.is_empty()
        || !service
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(invalid(locator));
    }

    Ok((service, rest))
}

fn invalid(locator: &str) -> Error {
    Error::InvalidArgument(format!("invalid storage locator '{locator}'"))
}
