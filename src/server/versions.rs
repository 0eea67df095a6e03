use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use bytes::Bytes;
use serde_json::Value;

use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::VersionResponse;
use crate::server::response::{ApiError, ApiResult};
use crate::storage::DEFAULT_URL_EXPIRY;
use crate::types::{Package, PackageVersion, Version};

use super::packages::package_not_found;

/// Decoded multipart body of a version POST/PUT: the artifact plus the
/// mutable metadata fields.
#[derive(Default)]
struct VersionUpload {
    file: Option<(String, Bytes)>,
    local: Option<String>,
    run: Option<String>,
    test: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> ApiResult<VersionUpload> {
    let mut upload = VersionUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid_argument("Malformed Upload", e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::invalid_argument("Malformed Upload", e.to_string()))?;
                upload.file = Some((filename, data));
            }
            "local" | "run" | "test" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::invalid_argument("Malformed Upload", e.to_string()))?;
                match name.as_str() {
                    "local" => upload.local = Some(value),
                    "run" => upload.run = Some(value),
                    _ => upload.test = Some(value),
                }
            }
            "version" => return Err(Error::ReadOnly("version").into()),
            other => {
                return Err(ApiError::invalid_argument(
                    "Unknown Field",
                    format!("Unexpected field '{other}' in upload."),
                ));
            }
        }
    }

    Ok(upload)
}

fn version_not_found(version: &str, package_slug: &str) -> ApiError {
    ApiError::not_found(
        "Version Not Found",
        format!("No version {version} exists for package '{package_slug}'."),
    )
}

async fn lookup(
    state: &AppState,
    namespace_slug: &str,
    package_slug: &str,
) -> ApiResult<Package> {
    state
        .store
        .get_package(namespace_slug, package_slug)?
        .ok_or_else(|| package_not_found(namespace_slug, package_slug))
}

/// Builds the wire form of a version, generating and caching the retrieval
/// URL on first read.
pub(super) async fn version_response(
    state: &AppState,
    package: &Package,
    mut version: PackageVersion,
) -> ApiResult<VersionResponse> {
    if version.url.is_none() {
        let url = state
            .storage
            .cubby(&version.locator)?
            .url(DEFAULT_URL_EXPIRY)
            .await?;
        state.store.set_version_url(&version.id, &url)?;
        version.url = Some(url);
    }
    Ok(VersionResponse::new(&package.name, &version))
}

/// Deletes every stored artifact of a package. Rows are left to the
/// caller's delete cascade.
pub(super) async fn delete_version_blobs(state: &AppState, package_id: &str) -> ApiResult<()> {
    for version in state.store.list_versions(package_id)? {
        state.storage.cubby(&version.locator)?.delete().await?;
    }
    Ok(())
}

pub async fn get_version(
    State(state): State<Arc<AppState>>,
    Path((namespace_slug, package_slug, version_text)): Path<(String, String, String)>,
) -> ApiResult<Json<VersionResponse>> {
    let package = lookup(&state, &namespace_slug, &package_slug).await?;

    let Some(version) = state.store.get_version(&package.id, &version_text)? else {
        return Err(version_not_found(&version_text, &package_slug));
    };

    Ok(Json(version_response(&state, &package, version).await?))
}

pub async fn create_version(
    State(state): State<Arc<AppState>>,
    Path((namespace_slug, package_slug, version_text)): Path<(String, String, String)>,
    multipart: Multipart,
) -> ApiResult<Json<VersionResponse>> {
    let package = lookup(&state, &namespace_slug, &package_slug).await?;

    if state.store.get_version(&package.id, &version_text)?.is_some() {
        return Err(ApiError::already_exists(
            "Version Already Exists",
            format!(
                "A version {version_text} already exists for package '{package_slug}' \
                 (to update it, use PUT)."
            ),
        ));
    }

    let parsed = Version::parse(&version_text)?;
    let upload = read_upload(multipart).await?;

    let Some((filename, data)) = upload.file else {
        return Err(ApiError::file_missing(
            "The package must be provided as a .zip file in the request.",
        ));
    };
    if !filename.ends_with(".zip") {
        return Err(ApiError::file_missing(
            "The package must be provided as a .zip file in the request.",
        ));
    }

    let locator = state
        .storage
        .default_artifact_locator(&package.slug, &version_text);
    let url = state.storage.cubby(&locator)?.store(&data).await?;

    let mut version = PackageVersion::new(&package, parsed, locator);
    version.local_path = upload.local;
    version.run_command = upload.run;
    version.test_command = upload.test;
    version.url = Some(url);
    state.store.create_version(&version)?;

    Ok(Json(version_response(&state, &package, version).await?))
}

pub async fn update_version(
    State(state): State<Arc<AppState>>,
    Path((namespace_slug, package_slug, version_text)): Path<(String, String, String)>,
    multipart: Multipart,
) -> ApiResult<Json<VersionResponse>> {
    let package = lookup(&state, &namespace_slug, &package_slug).await?;
    let upload = read_upload(multipart).await?;

    let mut version = match state.store.get_version(&package.id, &version_text)? {
        Some(version) => version,
        None => {
            // Upsert: PUT on an absent version creates it. The artifact is
            // optional here; without one the locator simply has no blob yet.
            let parsed = Version::parse(&version_text)?;
            let locator = state
                .storage
                .default_artifact_locator(&package.slug, &version_text);
            let version = PackageVersion::new(&package, parsed, locator);
            state.store.create_version(&version)?;
            version
        }
    };

    if let Some((_, data)) = &upload.file {
        // Overwriting the blob invalidates any previously issued URL.
        let url = state.storage.cubby(&version.locator)?.store(data).await?;
        version.url = Some(url);
    }
    if upload.local.is_some() {
        version.local_path = upload.local;
    }
    if upload.run.is_some() {
        version.run_command = upload.run;
    }
    if upload.test.is_some() {
        version.test_command = upload.test;
    }
    state.store.update_version_metadata(&version)?;

    Ok(Json(version_response(&state, &package, version).await?))
}

pub async fn delete_version(
    State(state): State<Arc<AppState>>,
    Path((namespace_slug, package_slug, version_text)): Path<(String, String, String)>,
) -> ApiResult<Json<Value>> {
    let package = lookup(&state, &namespace_slug, &package_slug).await?;

    let Some(version) = state.store.get_version(&package.id, &version_text)? else {
        return Err(version_not_found(&version_text, &package_slug));
    };

    state.storage.cubby(&version.locator)?.delete().await?;
    state.store.delete_version(&version.id)?;

    Ok(Json(Value::Null))
}
