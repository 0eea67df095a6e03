use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde_json::Value;

use crate::server::AppState;
use crate::server::dto::{ManifestResponse, SuiteResponse};
use crate::server::response::{ApiError, ApiResult, ErrorBody};
use crate::store::ReleaseScope;
use crate::types::{Suite, slugify};

use super::releases::manifest;

pub(super) fn suite_not_found(suite_slug: &str) -> ApiError {
    ApiError::not_found(
        "Suite Not Found",
        format!("No suite with slug '{suite_slug}' exists."),
    )
}

pub async fn list_suites(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<SuiteResponse>>> {
    let mut suites = Vec::new();
    for suite in state.store.list_suites()? {
        let packages = state.store.list_suite_packages(&suite.slug)?;
        suites.push(SuiteResponse::new(suite, packages));
    }
    Ok(Json(suites))
}

pub async fn create_suite(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<SuiteResponse>> {
    let slug = slugify(&name);
    if state.store.get_suite(&slug)?.is_some() {
        return Err(ApiError::already_exists(
            "Suite Already Exists",
            format!("A suite with slug '{slug}' already exists."),
        ));
    }

    let suite = Suite::new(&name)?;
    state.store.create_suite(&suite)?;

    Ok(Json(SuiteResponse::new(suite, Vec::new())))
}

pub async fn get_suite(
    State(state): State<Arc<AppState>>,
    Path(suite_slug): Path<String>,
) -> ApiResult<Json<SuiteResponse>> {
    let Some(suite) = state.store.get_suite(&suite_slug)? else {
        return Err(suite_not_found(&suite_slug));
    };

    let packages = state.store.list_suite_packages(&suite.slug)?;
    Ok(Json(SuiteResponse::new(suite, packages)))
}

pub async fn delete_suite(
    State(state): State<Arc<AppState>>,
    Path(suite_slug): Path<String>,
) -> ApiResult<Json<Value>> {
    if !state.store.delete_suite(&suite_slug)? {
        return Err(suite_not_found(&suite_slug));
    }
    Ok(Json(Value::Null))
}

pub async fn set_suite_packages(
    State(state): State<Arc<AppState>>,
    Path(suite_slug): Path<String>,
    Json(paths): Json<Vec<String>>,
) -> ApiResult<Json<SuiteResponse>> {
    let Some(suite) = state.store.get_suite(&suite_slug)? else {
        return Err(suite_not_found(&suite_slug));
    };

    let packages = state.store.lookup_paths(&paths)?;

    // All-or-nothing: report every unresolved path and leave the
    // membership untouched.
    let resolved: Vec<&str> = packages.iter().map(|p| p.path.as_str()).collect();
    let missing: Vec<ErrorBody> = paths
        .iter()
        .filter(|path| !resolved.contains(&path.as_str()))
        .map(|path| {
            ErrorBody::not_found(
                "Package Not Found",
                format!("No package with path '{path}' exists."),
            )
        })
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::many(StatusCode::BAD_REQUEST, missing));
    }

    let package_ids: Vec<String> = packages.iter().map(|p| p.id.clone()).collect();
    state.store.set_suite_packages(&suite.slug, &package_ids)?;

    Ok(Json(SuiteResponse::new(suite, packages)))
}

pub async fn current_suite_release(
    State(state): State<Arc<AppState>>,
    Path(suite_slug): Path<String>,
) -> ApiResult<Json<ManifestResponse>> {
    if state.store.get_suite(&suite_slug)?.is_none() {
        return Err(suite_not_found(&suite_slug));
    }

    let Some(release) = state
        .store
        .current_release(ReleaseScope::Suite(&suite_slug), Utc::now())?
    else {
        return Err(ApiError::not_found(
            "Release Not Found",
            format!("No current release exists for suite '{suite_slug}'."),
        ));
    };

    Ok(Json(manifest(&state, release).await?))
}
