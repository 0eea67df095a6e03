use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::Value;

use crate::server::AppState;
use crate::server::dto::{NamespaceResponse, PackageResponse};
use crate::server::response::{ApiError, ApiResult};
use crate::types::{Namespace, slugify};

use super::versions::delete_version_blobs;

pub async fn list_namespaces(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<NamespaceResponse>>> {
    let namespaces = state.store.list_namespaces()?;
    Ok(Json(
        namespaces.into_iter().map(NamespaceResponse::from).collect(),
    ))
}

pub async fn create_namespace(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<NamespaceResponse>> {
    let slug = slugify(&name);
    if state.store.get_namespace(&slug)?.is_some() {
        return Err(ApiError::already_exists(
            "Namespace Already Exists",
            format!("A namespace with slug '{slug}' already exists."),
        ));
    }

    let namespace = Namespace::new(&name)?;
    state.store.create_namespace(&namespace)?;

    Ok(Json(NamespaceResponse::from(namespace)))
}

pub async fn get_namespace(
    State(state): State<Arc<AppState>>,
    Path(namespace_slug): Path<String>,
) -> ApiResult<Json<Vec<PackageResponse>>> {
    if state.store.get_namespace(&namespace_slug)?.is_none() {
        return Err(namespace_not_found(&namespace_slug));
    }

    let packages = state.store.list_packages(&namespace_slug)?;
    Ok(Json(
        packages.into_iter().map(PackageResponse::from).collect(),
    ))
}

pub async fn delete_namespace(
    State(state): State<Arc<AppState>>,
    Path(namespace_slug): Path<String>,
) -> ApiResult<Json<Value>> {
    if state.store.get_namespace(&namespace_slug)?.is_none() {
        return Err(namespace_not_found(&namespace_slug));
    }

    // Blobs first; the row cascade below makes their locators unreachable.
    for package in state.store.list_packages(&namespace_slug)? {
        delete_version_blobs(&state, &package.id).await?;
    }
    state.store.delete_namespace(&namespace_slug)?;

    Ok(Json(Value::Null))
}

pub(super) fn namespace_not_found(namespace_slug: &str) -> ApiError {
    ApiError::not_found(
        "Namespace Not Found",
        format!("No namespace with slug '{namespace_slug}' exists."),
    )
}
