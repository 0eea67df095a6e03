use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{get, post, put},
};

use super::{namespaces, packages, releases, suites, versions};
use crate::storage::Storage;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub storage: Arc<Storage>,
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

const MAX_ARTIFACT_BYTES: usize = 512 * 1024 * 1024;

fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Namespaces. POST takes a display name, GET/DELETE the slug it
        // produced.
        .route("/namespaces", get(namespaces::list_namespaces))
        .route(
            "/namespaces/{namespace}",
            post(namespaces::create_namespace)
                .get(namespaces::get_namespace)
                .delete(namespaces::delete_namespace),
        )
        // Packages
        .route(
            "/namespaces/{namespace}/{package}",
            post(packages::create_package)
                .get(packages::get_package)
                .delete(packages::delete_package),
        )
        // Versions
        .route(
            "/namespaces/{namespace}/{package}/{version}",
            get(versions::get_version)
                .post(versions::create_version)
                .put(versions::update_version)
                .delete(versions::delete_version),
        )
        // Suites
        .route("/suites", get(suites::list_suites))
        .route(
            "/suites/{suite}",
            post(suites::create_suite)
                .get(suites::get_suite)
                .delete(suites::delete_suite),
        )
        .route("/suites/{suite}/packages", put(suites::set_suite_packages))
        .route(
            "/suites/{suite}/releases/current",
            get(suites::current_suite_release),
        )
        // Releases
        .route("/releases", post(releases::create_release))
        .route("/releases/{id}", get(releases::get_release))
        .route(
            "/releases/{id}/versions",
            put(releases::set_release_versions),
        )
        .route("/releases/{id}/schedule", post(releases::schedule_release))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .layer(DefaultBodyLimit::max(MAX_ARTIFACT_BYTES))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
