use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Version, slugify};
use crate::error::{Error, Result};
use crate::storage::StorageLocator;

/// Groups packages. The slug is derived from the display name at
/// construction, acts as the primary key, and is never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl Namespace {
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            slug: required_slug(name)?,
            name: name.to_string(),
            created_at: Utc::now(),
        })
    }
}

/// A named artifact line within a namespace. `(namespace_slug, slug)` is
/// unique; `path` is the derived `namespace/package` lookup key, computed
/// here at construction and stored as an indexed column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub namespace_slug: String,
    pub name: String,
    pub slug: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

impl Package {
    pub fn new(namespace: &Namespace, name: &str) -> Result<Self> {
        let slug = required_slug(name)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            namespace_slug: namespace.slug.clone(),
            name: name.to_string(),
            path: format!("{}/{}", namespace.slug, slug),
            slug,
            created_at: Utc::now(),
        })
    }
}

/// One uploaded artifact of a package. The version string is write-once;
/// the storage locator is embedded by value; `url` caches the lazily
/// generated retrieval URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageVersion {
    pub id: String,
    pub package_id: String,
    pub version: Version,
    pub locator: StorageLocator,
    pub local_path: Option<String>,
    pub run_command: Option<String>,
    pub test_command: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PackageVersion {
    #[must_use]
    pub fn new(package: &Package, version: Version, locator: StorageLocator) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            package_id: package.id.clone(),
            version,
            locator,
            local_path: None,
            run_command: None,
            test_command: None,
            url: None,
            created_at: Utc::now(),
        }
    }
}

/// A mutable named set of packages awaiting release assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl Suite {
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            slug: required_slug(name)?,
            name: name.to_string(),
            created_at: Utc::now(),
        })
    }
}

/// An immutable snapshot pairing packages with exactly one version each.
/// The version set is fixed once assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: String,
    pub title: Option<String>,
    pub suite_slug: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Release {
    #[must_use]
    pub fn new(title: Option<String>, suite_slug: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            suite_slug,
            created_at: Utc::now(),
        }
    }
}

/// A timestamped activation record pointing at a release. Construction
/// takes an offset-carrying datetime only; naive timestamps never get this
/// far because parsing rejects them first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledRelease {
    pub id: String,
    pub release_id: String,
    pub activates_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ScheduledRelease {
    #[must_use]
    pub fn new(release_id: &str, activates_at: DateTime<FixedOffset>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            release_id: release_id.to_string(),
            activates_at: activates_at.with_timezone(&Utc),
            created_at: Utc::now(),
        }
    }
}

fn required_slug(name: &str) -> Result<String> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "name '{name}' does not produce a usable identifier"
        )));
    }
    Ok(slug)
}
