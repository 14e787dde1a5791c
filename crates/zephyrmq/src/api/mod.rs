//! HTTP transport (`spec.md` §6.1). Validates at the boundary
//! (`spec.md` §9, "validation lives at the transport boundary, not the
//! storage contract") and translates [`crate::service::ZephyrError`] into
//! the wire error shape; the storage contracts themselves stay
//! transport-agnostic.

mod claims;
mod error;
mod messages;
mod partitions;
mod queues;
mod validation;

use std::sync::Arc;

use axum::{routing::get, Router};
use http::HeaderName;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    normalize_path::NormalizePathLayer,
    sensitive_headers::SetSensitiveHeadersLayer,
    timeout::TimeoutLayer,
    trace::{self, TraceLayer},
    ServiceBuilderExt,
};

use crate::{
    request_tracing::{MakeRequestUuid7, RestMakeSpan},
    service::{Driver, ProxyDriver},
    CONFIG,
};

pub const X_REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
pub const X_PROJECT_ID_HEADER: HeaderName = HeaderName::from_static("x-project-id");

/// Shared application state handed to every handler. `driver` backs the
/// project-scoped controllers (`spec.md` §4.1-§4.3); `proxy` backs the
/// operator-facing ones (`spec.md` §4.4-§4.5).
#[derive(Clone)]
pub struct AppState {
    pub driver: Arc<dyn Driver>,
    pub proxy: Arc<dyn ProxyDriver>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

/// Builds the full router. `spec.md` §6.1's surface is project-scoped under
/// `/v1/{project_id}/...`; partitions are an operator-level concern and sit
/// outside any project prefix.
#[must_use]
pub fn router(state: AppState) -> Router {
    let project_routes = Router::new()
        .merge(queues::router())
        .merge(messages::router())
        .merge(claims::router());

    Router::new()
        .nest("/v1/{project_id}", project_routes)
        .nest("/v1/partitions", partitions::router())
        .route("/health", get(|| async { "ok" }))
        .layer(axum::extract::DefaultBodyLimit::max(
            CONFIG.max_message_body_bytes * 4,
        ))
        .layer(
            ServiceBuilder::new()
                .set_x_request_id(MakeRequestUuid7)
                .layer(SetSensitiveHeadersLayer::new([
                    http::header::AUTHORIZATION,
                ]))
                .layer(CompressionLayer::new())
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(RestMakeSpan::new(tracing::Level::INFO))
                        .on_response(trace::DefaultOnResponse::new().level(tracing::Level::DEBUG)),
                )
                .layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
                .layer(CatchPanicLayer::new())
                .propagate_x_request_id(),
        )
        .layer(NormalizePathLayer::trim_trailing_slash())
        .with_state(state)
}
