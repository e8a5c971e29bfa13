use {
    crate::{
        AppState,
        adapters::auth::{Verdict, verify_shared_secret},
        domain::error::PipelineError,
        transport::http::errors::ApiError,
    },
    axum::{Json, extract::State, http::HeaderMap},
};

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Subscriber numbers for the admin dashboard. Disabled unless an admin
/// token is configured.
pub async fn stats_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    let secret = state.admin_token.as_deref().unwrap_or("");
    if verify_shared_secret(presented, secret) == Verdict::Rejected {
        tracing::warn!("rejected admin stats request");
        return Err(PipelineError::Unauthorized.into());
    }

    let stats = state.ledger.subscriber_stats().await?;
    Ok(Json(stats.to_json()))
}
