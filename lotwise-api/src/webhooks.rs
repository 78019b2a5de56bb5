use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use lotwise_booking::CallbackDisposition;
use lotwise_core::PaymentCallback;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments", post(handle_payment_callback))
}

/// POST /v1/webhooks/payments
///
/// Receives the push-payment gateway's asynchronous verdict. Always
/// answers 200, including for duplicate or unknown correlation ids —
/// gateways redeliver on anything else.
async fn handle_payment_callback(
    State(state): State<AppState>,
    Json(payload): Json<PaymentCallback>,
) -> StatusCode {
    tracing::info!(
        correlation_id = %payload.correlation_id,
        result_code = payload.result_code,
        "received payment callback"
    );

    match state.reconciler.on_callback(&payload) {
        CallbackDisposition::Applied => {}
        CallbackDisposition::Duplicate => {
            tracing::info!(
                correlation_id = %payload.correlation_id,
                "duplicate payment callback ignored"
            );
        }
        CallbackDisposition::Stale => {
            tracing::warn!(
                correlation_id = %payload.correlation_id,
                "stale payment callback acknowledged"
            );
        }
    }

    StatusCode::OK
}
