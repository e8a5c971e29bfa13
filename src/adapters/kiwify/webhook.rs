use {
    crate::{
        AppState,
        adapters::auth::{Verdict, verify_shared_secret},
        adapters::kiwify::{best_effort_order_id, normalize, presented_token},
        domain::{
            error::PipelineError,
            purchase::{ReconcileOutcome, RejectedEvent, RejectionReason},
        },
        transport::http::errors::ApiError,
    },
    axum::{Json, body::Bytes, extract::State, http::HeaderMap},
};

pub const ENDPOINT: &str = "/webhook/kiwify";

#[tracing::instrument(
    name = "webhook",
    skip_all,
    fields(order_id = tracing::field::Empty, order_status = tracing::field::Empty)
)]
pub async fn wh_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    if verify_shared_secret(presented_token(&headers), &state.webhook_token) == Verdict::Rejected {
        tracing::warn!("missing or invalid webhook token");
        return Err(PipelineError::Unauthorized.into());
    }

    let event = match normalize(&body) {
        Ok(event) => event,
        Err(err) => {
            park_malformed(&state, &body, &err).await;
            return Err(err.into());
        }
    };

    tracing::Span::current()
        .record("order_id", tracing::field::display(&event.order_id))
        .record("order_status", tracing::field::display(&event.status));
    tracing::info!(customer = %event.customer.email, "purchase event received");

    let outcome = state.ledger.reconcile(&event).await?;

    match &outcome {
        ReconcileOutcome::Created { account_id, .. } => {
            tracing::info!(account_id = ?account_id, "transaction created")
        }
        ReconcileOutcome::Updated { account_id, .. } => {
            tracing::info!(account_id = ?account_id, "transaction updated")
        }
        ReconcileOutcome::AlreadyApplied { .. } => {
            tracing::info!("event already applied, nothing to do")
        }
        ReconcileOutcome::Anomaly { current, .. } => {
            tracing::warn!(current = ?current, "anomalous transition, parked for review")
        }
    }

    Ok(Json(serde_json::json!({
        "status": outcome.label(),
        "order_id": event.order_id.as_str(),
        "order_status": outcome.final_status().map(|s| s.as_str()),
        "account_id": outcome.account_id(),
    })))
}

/// Append a malformed body to the review log. The client still gets a 400
/// even when the log write fails.
async fn park_malformed(state: &AppState, body: &[u8], err: &PipelineError) {
    tracing::warn!(error = %err, "malformed webhook payload");

    let rejected = RejectedEvent {
        reason: RejectionReason::Malformed,
        order_id: best_effort_order_id(body),
        detail: err.to_string(),
        raw_body: String::from_utf8_lossy(body).replace('\0', "\u{FFFD}"),
    };
    if let Err(e) = state.ledger.record_rejected(&rejected).await {
        tracing::error!(error = %e, "failed to record malformed event for review");
    }
}

pub async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "online",
        "endpoint": ENDPOINT,
        "methods": ["POST"],
    }))
}
