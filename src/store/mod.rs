mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Restricts "current release" resolution to a candidate set.
#[derive(Debug, Clone, Copy)]
pub enum ReleaseScope<'a> {
    /// All scheduled releases.
    Global,
    /// Only releases belonging to the named suite.
    Suite(&'a str),
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Namespace operations
    fn create_namespace(&self, namespace: &Namespace) -> Result<()>;
    fn get_namespace(&self, slug: &str) -> Result<Option<Namespace>>;
    fn list_namespaces(&self) -> Result<Vec<Namespace>>;
    fn delete_namespace(&self, slug: &str) -> Result<bool>;

    // Package operations
    fn create_package(&self, package: &Package) -> Result<()>;
    fn get_package(&self, namespace_slug: &str, slug: &str) -> Result<Option<Package>>;
    fn get_package_by_id(&self, id: &str) -> Result<Option<Package>>;
    fn list_packages(&self, namespace_slug: &str) -> Result<Vec<Package>>;
    /// Resolves `namespace/package` paths to packages, returning matches
    /// only; unresolved paths are silently dropped. Callers needing strict
    /// validation diff the input against the result.
    fn lookup_paths(&self, paths: &[String]) -> Result<Vec<Package>>;
    fn delete_package(&self, id: &str) -> Result<bool>;

    // Version operations
    fn create_version(&self, version: &PackageVersion) -> Result<()>;
    fn get_version(&self, package_id: &str, version: &str) -> Result<Option<PackageVersion>>;
    fn list_versions(&self, package_id: &str) -> Result<Vec<PackageVersion>>;
    /// Updates the mutable metadata (local path, run/test commands, cached
    /// URL). The version string and locator are fixed at creation.
    fn update_version_metadata(&self, version: &PackageVersion) -> Result<()>;
    fn set_version_url(&self, id: &str, url: &str) -> Result<()>;
    fn delete_version(&self, id: &str) -> Result<bool>;

    // Suite operations
    fn create_suite(&self, suite: &Suite) -> Result<()>;
    fn get_suite(&self, slug: &str) -> Result<Option<Suite>>;
    fn list_suites(&self) -> Result<Vec<Suite>>;
    fn delete_suite(&self, slug: &str) -> Result<bool>;
    /// Replaces the suite's entire membership set in one transaction; a
    /// reader never observes a partially-updated set.
    fn set_suite_packages(&self, suite_slug: &str, package_ids: &[String]) -> Result<()>;
    fn list_suite_packages(&self, suite_slug: &str) -> Result<Vec<Package>>;

    // Release operations
    fn create_release(&self, release: &Release) -> Result<()>;
    fn get_release(&self, id: &str) -> Result<Option<Release>>;
    /// Associates versions with a release, replace semantics, one
    /// transaction. Two versions of the same package abort the whole set.
    fn set_release_versions(&self, release_id: &str, versions: &[PackageVersion]) -> Result<()>;
    fn list_release_versions(&self, release_id: &str) -> Result<Vec<PackageVersion>>;
    fn list_release_packages(&self, release_id: &str) -> Result<Vec<Package>>;

    // Scheduling and resolution
    fn create_scheduled_release(&self, scheduled: &ScheduledRelease) -> Result<()>;
    fn list_scheduled_releases(&self, release_id: &str) -> Result<Vec<ScheduledRelease>>;
    /// Among schedule entries with `activates_at <= now` within scope,
    /// returns the release of the latest entry (ties broken by entry id).
    fn current_release(&self, scope: ReleaseScope<'_>, now: DateTime<Utc>)
    -> Result<Option<Release>>;
}
