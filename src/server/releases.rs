use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};

use crate::server::AppState;
use crate::server::dto::{
    CreateReleaseRequest, ManifestResponse, ReleaseVersionRef, ScheduleReleaseRequest,
};
use crate::server::response::{ApiError, ApiResult, ErrorBody};
use crate::store::ReleaseScope;
use crate::types::{Release, ScheduledRelease};

use super::suites::suite_not_found;
use super::versions::version_response;

fn release_not_found(id: &str) -> ApiError {
    ApiError::not_found("Release Not Found", format!("No release with id '{id}' exists."))
}

/// Resolves a release id, where the literal id `current` means "the latest
/// globally scheduled release whose activation time has passed".
fn resolve_release(state: &AppState, id: &str) -> ApiResult<Release> {
    let release = if id == "current" {
        state.store.current_release(ReleaseScope::Global, Utc::now())?
    } else {
        state.store.get_release(id)?
    };
    release.ok_or_else(|| release_not_found(id))
}

pub(super) async fn manifest(state: &AppState, release: Release) -> ApiResult<ManifestResponse> {
    let mut packages = Vec::new();
    for version in state.store.list_release_versions(&release.id)? {
        let Some(package) = state.store.get_package_by_id(&version.package_id)? else {
            // FK cascades remove association rows with their package.
            continue;
        };
        packages.push(version_response(state, &package, version).await?);
    }

    Ok(ManifestResponse {
        id: release.id,
        title: release.title,
        suite: release.suite_slug,
        packages,
    })
}

pub async fn create_release(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateReleaseRequest>,
) -> ApiResult<Json<ManifestResponse>> {
    if let Some(suite_slug) = &req.suite {
        if state.store.get_suite(suite_slug)?.is_none() {
            return Err(suite_not_found(suite_slug));
        }
    }

    let release = Release::new(req.title, req.suite);
    state.store.create_release(&release)?;

    Ok(Json(manifest(&state, release).await?))
}

pub async fn get_release(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ManifestResponse>> {
    let release = resolve_release(&state, &id)?;
    Ok(Json(manifest(&state, release).await?))
}

pub async fn set_release_versions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(refs): Json<Vec<ReleaseVersionRef>>,
) -> ApiResult<Json<ManifestResponse>> {
    let release = resolve_release(&state, &id)?;

    // Resolve strictly: every unresolved reference is reported, and on any
    // failure the release is left untouched.
    let mut versions = Vec::new();
    let mut errors = Vec::new();
    let mut seen_packages = Vec::new();

    for version_ref in &refs {
        let package = match version_ref.path.split_once('/') {
            Some((namespace_slug, package_slug)) => {
                state.store.get_package(namespace_slug, package_slug)?
            }
            None => None,
        };
        let Some(package) = package else {
            errors.push(ErrorBody::not_found(
                "Package Not Found",
                format!("No package with path '{}' exists.", version_ref.path),
            ));
            continue;
        };

        if seen_packages.contains(&package.id) {
            return Err(ApiError::invalid_argument(
                "Duplicate Package",
                format!(
                    "Package '{}' appears more than once; a release holds one version per package.",
                    version_ref.path
                ),
            ));
        }
        seen_packages.push(package.id.clone());

        match state.store.get_version(&package.id, &version_ref.version)? {
            Some(version) => versions.push(version),
            None => errors.push(ErrorBody::not_found(
                "Version Not Found",
                format!(
                    "No version {} exists for package '{}'.",
                    version_ref.version, version_ref.path
                ),
            )),
        }
    }

    if !errors.is_empty() {
        return Err(ApiError::many(axum::http::StatusCode::BAD_REQUEST, errors));
    }

    state.store.set_release_versions(&release.id, &versions)?;

    Ok(Json(manifest(&state, release).await?))
}

pub async fn schedule_release(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ScheduleReleaseRequest>,
) -> ApiResult<Json<ManifestResponse>> {
    let release = resolve_release(&state, &id)?;

    // Offset-less timestamps fail here, before anything is written.
    let activates_at: DateTime<chrono::FixedOffset> = DateTime::parse_from_rfc3339(&req.datetime)
        .map_err(|_| {
            ApiError::invalid_argument(
                "Invalid Timestamp",
                "Scheduled times must be RFC 3339 timestamps with a UTC offset.",
            )
        })?;

    let scheduled = ScheduledRelease::new(&release.id, activates_at);
    state.store.create_scheduled_release(&scheduled)?;

    Ok(Json(manifest(&state, release).await?))
}
