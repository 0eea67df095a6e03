use serde::{Deserialize, Serialize};

use crate::types::{Namespace, Package, PackageVersion, Suite};

#[derive(Debug, Serialize)]
pub struct NamespaceResponse {
    pub name: String,
    pub slug: String,
}

impl From<Namespace> for NamespaceResponse {
    fn from(namespace: Namespace) -> Self {
        Self {
            name: namespace.name,
            slug: namespace.slug,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PackageResponse {
    pub name: String,
    pub slug: String,
    pub path: String,
}

impl From<Package> for PackageResponse {
    fn from(package: Package) -> Self {
        Self {
            name: package.name,
            slug: package.slug,
            path: package.path,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PackageDetailResponse {
    pub name: String,
    pub slug: String,
    pub path: String,
    pub versions: Vec<VersionResponse>,
}

/// Wire form of a package version. `name` is the owning package's display
/// name; `remote` is the retrieval URL, generated lazily on first read.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
    pub remote: Option<String>,
    pub local: Option<String>,
    pub run: Option<String>,
    pub test: Option<String>,
}

impl VersionResponse {
    #[must_use]
    pub fn new(package_name: &str, version: &PackageVersion) -> Self {
        Self {
            name: package_name.to_string(),
            version: version.version.to_string(),
            remote: version.url.clone(),
            local: version.local_path.clone(),
            run: version.run_command.clone(),
            test: version.test_command.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuiteResponse {
    pub name: String,
    pub slug: String,
    pub packages: Vec<PackageResponse>,
}

impl SuiteResponse {
    #[must_use]
    pub fn new(suite: Suite, packages: Vec<Package>) -> Self {
        Self {
            name: suite.name,
            slug: suite.slug,
            packages: packages.into_iter().map(PackageResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ManifestResponse {
    pub id: String,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    pub packages: Vec<VersionResponse>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateReleaseRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub suite: Option<String>,
}

/// A `path@version` pair naming one package version of a release.
#[derive(Debug, Deserialize)]
pub struct ReleaseVersionRef {
    pub path: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleReleaseRequest {
    pub datetime: String,
}
