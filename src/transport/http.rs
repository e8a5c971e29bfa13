pub mod errors;

use {
    crate::{
        AppState,
        adapters::{admin, kiwify::webhook},
        domain::error::PipelineError,
        transport::http::errors::ApiError,
    },
    axum::{
        BoxError, Router,
        error_handling::HandleErrorLayer,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    std::time::Duration,
    tower::ServiceBuilder,
    tower_http::trace::TraceLayer,
};

/// 64 KB; purchase notifications are a few KB at most.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            webhook::ENDPOINT,
            post(webhook::wh_handler).get(webhook::liveness),
        )
        .route("/admin/stats", get(admin::stats_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(HandleErrorLayer::new(handle_layer_error))
                .timeout(request_timeout),
        )
        .with_state(state)
}

/// A request cut off by the timeout was not applied; answer 5xx so the
/// provider redelivers it.
async fn handle_layer_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        PipelineError::Timeout.into()
    } else {
        PipelineError::Internal(err.to_string()).into()
    }
}
