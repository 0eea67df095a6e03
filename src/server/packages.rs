use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::Value;

use crate::server::AppState;
use crate::server::dto::{PackageDetailResponse, PackageResponse};
use crate::server::response::{ApiError, ApiResult};
use crate::types::{Package, slugify};

use super::namespaces::namespace_not_found;
use super::versions::{delete_version_blobs, version_response};

pub async fn create_package(
    State(state): State<Arc<AppState>>,
    Path((namespace_slug, name)): Path<(String, String)>,
) -> ApiResult<Json<PackageResponse>> {
    let Some(namespace) = state.store.get_namespace(&namespace_slug)? else {
        return Err(namespace_not_found(&namespace_slug));
    };

    let slug = slugify(&name);
    if state.store.get_package(&namespace_slug, &slug)?.is_some() {
        return Err(ApiError::already_exists(
            "Package Already Exists",
            format!("A package named '{slug}' in namespace '{namespace_slug}' already exists."),
        ));
    }

    let package = Package::new(&namespace, &name)?;
    state.store.create_package(&package)?;

    Ok(Json(PackageResponse::from(package)))
}

pub async fn get_package(
    State(state): State<Arc<AppState>>,
    Path((namespace_slug, package_slug)): Path<(String, String)>,
) -> ApiResult<Json<PackageDetailResponse>> {
    let Some(package) = state.store.get_package(&namespace_slug, &package_slug)? else {
        return Err(package_not_found(&namespace_slug, &package_slug));
    };

    let mut versions = Vec::new();
    for version in state.store.list_versions(&package.id)? {
        versions.push(version_response(&state, &package, version).await?);
    }

    Ok(Json(PackageDetailResponse {
        name: package.name,
        slug: package.slug,
        path: package.path,
        versions,
    }))
}

pub async fn delete_package(
    State(state): State<Arc<AppState>>,
    Path((namespace_slug, package_slug)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let Some(package) = state.store.get_package(&namespace_slug, &package_slug)? else {
        return Err(package_not_found(&namespace_slug, &package_slug));
    };

    delete_version_blobs(&state, &package.id).await?;
    state.store.delete_package(&package.id)?;

    Ok(Json(Value::Null))
}

pub(super) fn package_not_found(namespace_slug: &str, package_slug: &str) -> ApiError {
    ApiError::not_found(
        "Package Not Found",
        format!("No package with slug '{package_slug}' exists in '{namespace_slug}'."),
    )
}
